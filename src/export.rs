use crate::compositor::CompositedSurface;
use crate::encoder::AnimationResult;
use crate::layout::LayoutPlan;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub const EXPORT_NOT_MULTIPLE: &str = "number of images must be a multiple of 8 to export";
pub const EXPORT_NO_SURFACE: &str = "no composited spritesheet to export";

/// Why exporting the spritesheet is blocked for this plan, if it is.
///
/// Padding is an internal layout device only: export demands that the
/// real (un-padded) image count already fills whole rows.
pub fn export_blocked(plan: &LayoutPlan) -> Option<&'static str> {
    (plan.real_count % plan.columns as usize != 0).then_some(EXPORT_NOT_MULTIPLE)
}

pub fn encode_png(surface: &CompositedSurface) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    surface
        .image()
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .context("Failed to encode spritesheet PNG")?;
    Ok(bytes)
}

pub fn write_spritesheet(surface: &CompositedSurface, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_png(surface)?;
    fs::write(path, bytes).with_context(|| format!("Failed to write spritesheet to {}", path.display()))
}

/// Writes each encoded row animation as `row-<n>.gif` under `dir`,
/// skipping rows whose encode failed. Returns the paths written.
pub fn write_row_animations(result: &AnimationResult, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create animation directory {}", dir.display()))?;
    let mut written = Vec::new();
    for (row, encoded) in result.rows.iter().enumerate() {
        let Some(animation) = encoded else {
            continue;
        };
        let path = dir.join(format!("row-{row}.gif"));
        fs::write(&path, &animation.bytes)
            .with_context(|| format!("Failed to write row animation to {}", path.display()))?;
        written.push(path);
    }
    if written.is_empty() {
        return Err(anyhow!("No row animations were encoded; nothing to write"));
    }
    Ok(written)
}
