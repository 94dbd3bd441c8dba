use crate::compositor::{self, CapturedPixels};
use crate::layout::LayoutPlan;
use anyhow::Result;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use std::time::Duration;

/// External animated-image encoder boundary: ordered fixed-size frames in,
/// encoded bytes out. Implementations may fail; callers degrade a failed
/// row to an empty slot instead of aborting the remaining rows.
pub trait AnimationEncoder {
    fn encode(&self, frames: &[RgbaImage], seconds_per_frame: f32) -> Result<Vec<u8>>;
}

/// Default encoder backed by the `image` crate's GIF codec. Encoded
/// rows loop forever.
#[derive(Debug, Default)]
pub struct GifRowEncoder;

impl AnimationEncoder for GifRowEncoder {
    fn encode(&self, frames: &[RgbaImage], seconds_per_frame: f32) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut bytes);
            encoder.set_repeat(Repeat::Infinite)?;
            let delay = Delay::from_saturating_duration(Duration::from_secs_f32(seconds_per_frame));
            for frame in frames {
                encoder.encode_frame(Frame::from_parts(frame.clone(), 0, 0, delay))?;
            }
        }
        Ok(bytes)
    }
}

#[derive(Debug, Clone)]
pub struct EncodedAnimation {
    pub bytes: Vec<u8>,
}

/// Per-row encode outcomes for one animation snapshot, in row order. A
/// `None` slot records a row whose encode failed.
#[derive(Debug, Clone)]
pub struct AnimationResult {
    pub generation: u64,
    pub frame_seconds: f32,
    pub rows: Vec<Option<EncodedAnimation>>,
}

impl AnimationResult {
    pub fn encoded_rows(&self) -> usize {
        self.rows.iter().filter(|row| row.is_some()).count()
    }

    pub fn failed_rows(&self) -> usize {
        self.rows.len() - self.encoded_rows()
    }
}

/// Encodes every row of `plan`, strictly in row order. Row `r + 1` is only
/// attempted after row `r` has settled; a failed row is logged and left
/// empty without touching the others.
pub fn encode_rows(
    plan: &LayoutPlan,
    pixels: &CapturedPixels,
    frame_seconds: f32,
    background: [u8; 4],
    encoder: &dyn AnimationEncoder,
    generation: u64,
) -> AnimationResult {
    let mut rows = Vec::with_capacity(plan.rows as usize);
    for row in 0..plan.rows {
        let encoded = compositor::row_frames(plan, row, pixels, background)
            .and_then(|frames| encoder.encode(&frames, frame_seconds));
        match encoded {
            Ok(bytes) => rows.push(Some(EncodedAnimation { bytes })),
            Err(err) => {
                eprintln!("[encoder] row {row} failed to encode: {err}. Leaving the row empty.");
                rows.push(None);
            }
        }
    }
    AnimationResult { generation, frame_seconds, rows }
}
