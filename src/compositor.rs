use crate::layout::{CellSource, LayoutPlan};
use crate::registry::ImageKey;
use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

/// Pixels captured for a pass, keyed by source identity. A key that is
/// absent (load failed or never resolved) renders as a blank cell.
pub type CapturedPixels = HashMap<ImageKey, Arc<RgbaImage>>;

/// The rendered grid raster. Owned by whoever took the snapshot it was
/// produced from; replaced wholesale, never redrawn in place.
#[derive(Debug, Clone)]
pub struct CompositedSurface {
    image: RgbaImage,
}

impl CompositedSurface {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Content digest over dimensions and raw pixels. Two passes over the
    /// same snapshot must produce the same digest.
    pub fn digest_hex(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.image.width().to_le_bytes());
        hasher.update(&self.image.height().to_le_bytes());
        hasher.update(self.image.as_raw());
        hasher.finalize().to_hex().to_string()
    }
}

/// Explicit join over the per-cell operations of one composite pass. Cells
/// resolve independently and in any order; the pass counts as complete
/// only once every cell has settled as drawn, blank, or failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub total_cells: usize,
    pub drawn: usize,
    pub blank: usize,
    pub failed: usize,
}

impl PassReport {
    fn new(total_cells: usize) -> Self {
        Self { total_cells, ..Self::default() }
    }

    fn resolve_drawn(&mut self) {
        self.drawn += 1;
    }

    fn resolve_blank(&mut self) {
        self.blank += 1;
    }

    fn resolve_failed(&mut self) {
        self.failed += 1;
    }

    pub fn settled(&self) -> usize {
        self.drawn + self.blank + self.failed
    }

    pub fn is_complete(&self) -> bool {
        self.settled() == self.total_cells
    }
}

/// Renders the full static spritesheet for `plan`.
///
/// Every cell settles exactly once: padding cells and failed loads fill
/// with the background and count toward completion, so one bad image can
/// neither block nor corrupt the rest of the grid.
pub fn composite(plan: &LayoutPlan, pixels: &CapturedPixels, background: [u8; 4]) -> (CompositedSurface, PassReport) {
    let (width, height) = plan.surface_size();
    let mut image = RgbaImage::from_pixel(width, height, Rgba(background));
    let mut report = PassReport::new(plan.cells.len());
    for (index, cell) in plan.cells.iter().enumerate() {
        let col = index as u32 % plan.columns;
        let row = index as u32 / plan.columns;
        let origin_x = col * plan.cell_width;
        let origin_y = row * plan.cell_height;
        match cell {
            CellSource::Empty => report.resolve_blank(),
            CellSource::Image(key) => match pixels.get(key) {
                Some(source) => {
                    draw_cell(&mut image, origin_x, origin_y, plan.cell_width, plan.cell_height, source);
                    report.resolve_drawn();
                }
                None => report.resolve_failed(),
            },
        }
    }
    debug_assert!(report.is_complete(), "every cell must settle before the pass completes");
    (CompositedSurface { image }, report)
}

/// Renders the animation input frames for one grid row: exactly `columns`
/// frames of `cell_width x cell_height`, same fit-and-center rule as the
/// static pass. Empty and failed cells become fully blank frames.
pub fn row_frames(
    plan: &LayoutPlan,
    row: u32,
    pixels: &CapturedPixels,
    background: [u8; 4],
) -> Result<SmallVec<[RgbaImage; 8]>> {
    if row >= plan.rows {
        return Err(anyhow!("Row {row} is out of range for a {}-row plan", plan.rows));
    }
    let mut frames = SmallVec::new();
    for col in 0..plan.columns {
        let mut frame = RgbaImage::from_pixel(plan.cell_width, plan.cell_height, Rgba(background));
        if let Some(CellSource::Image(key)) = plan.cell_at(row, col) {
            if let Some(source) = pixels.get(&key) {
                draw_cell(&mut frame, 0, 0, plan.cell_width, plan.cell_height, source);
            }
        }
        frames.push(frame);
    }
    Ok(frames)
}

fn draw_cell(target: &mut RgbaImage, origin_x: u32, origin_y: u32, cell_w: u32, cell_h: u32, source: &RgbaImage) {
    let (draw_w, draw_h, offset_x, offset_y) = fit_rect(cell_w, cell_h, source.width(), source.height());
    let scaled = if (draw_w, draw_h) == source.dimensions() {
        source.clone()
    } else {
        imageops::resize(source, draw_w, draw_h, FilterType::Triangle)
    };
    imageops::overlay(target, &scaled, (origin_x + offset_x) as i64, (origin_y + offset_y) as i64);
}

/// Aspect-preserving fit of an `img_w x img_h` image inside a cell, plus
/// the centering offset. Never crops and never exceeds the cell bounds.
fn fit_rect(cell_w: u32, cell_h: u32, img_w: u32, img_h: u32) -> (u32, u32, u32, u32) {
    let fit = (cell_w as f64 / img_w as f64).min(cell_h as f64 / img_h as f64);
    let draw_w = ((img_w as f64 * fit).round() as u32).clamp(1, cell_w);
    let draw_h = ((img_h as f64 * fit).round() as u32).clamp(1, cell_h);
    let offset_x = (cell_w - draw_w + 1) / 2;
    let offset_y = (cell_h - draw_h + 1) / 2;
    (draw_w, draw_h, offset_x, offset_y)
}
