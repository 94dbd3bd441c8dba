use crate::config::{self, MIN_IMAGES};
use crate::registry::{ImageKey, SourceImage};
use serde::Serialize;

/// One slot in the padded grid: either a real source image or an explicit
/// padding marker filling out the final row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellSource {
    Image(ImageKey),
    Empty,
}

impl CellSource {
    pub fn is_empty(self) -> bool {
        matches!(self, CellSource::Empty)
    }
}

/// Immutable grid layout derived from one ordered set of sources. Produced
/// fresh each time a snapshot is taken, never patched in place.
#[derive(Debug, Clone)]
pub struct LayoutPlan {
    pub cells: Vec<CellSource>,
    pub columns: u32,
    pub rows: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub scale_percent: u32,
    pub real_count: usize,
    pub padded_count: usize,
}

impl LayoutPlan {
    pub fn surface_size(&self) -> (u32, u32) {
        (self.cell_width * self.columns, self.cell_height * self.rows)
    }

    pub fn cell_at(&self, row: u32, col: u32) -> Option<CellSource> {
        if row >= self.rows || col >= self.columns {
            return None;
        }
        self.cells.get((row * self.columns + col) as usize).copied()
    }

    pub fn summary(&self) -> LayoutSummary {
        let (surface_width, surface_height) = self.surface_size();
        LayoutSummary {
            columns: self.columns,
            rows: self.rows,
            cell_width: self.cell_width,
            cell_height: self.cell_height,
            surface_width,
            surface_height,
            scale_percent: self.scale_percent,
            real_count: self.real_count,
            padded_count: self.padded_count,
        }
    }
}

/// Serializable shape of a plan, for reports and docs.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LayoutSummary {
    pub columns: u32,
    pub rows: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub surface_width: u32,
    pub surface_height: u32,
    pub scale_percent: u32,
    pub real_count: usize,
    pub padded_count: usize,
}

/// Computes a uniform-cell grid layout for the given ordered sources.
///
/// Returns `None` below the minimum image count; every other input yields
/// a valid plan (an all-failed collection degenerates to 1x1 cells, it
/// does not error). The cell is sized to fit the largest scaled image, so
/// cell dimensions are invariant to image order.
pub fn plan(images: &[SourceImage], scale_percent: u32, columns: u32) -> Option<LayoutPlan> {
    if images.len() < MIN_IMAGES || columns == 0 {
        return None;
    }
    let scale_percent = config::clamp_scale(scale_percent);
    let mut cell_width = 0u32;
    let mut cell_height = 0u32;
    for image in images {
        let (natural_w, natural_h) = image.natural_size();
        cell_width = cell_width.max(scale_dimension(natural_w, scale_percent));
        cell_height = cell_height.max(scale_dimension(natural_h, scale_percent));
    }
    // The 1x1 load fallback can still scale down to zero at 5%.
    let cell_width = cell_width.max(1);
    let cell_height = cell_height.max(1);

    let real_count = images.len();
    let padded_count = crate::ceil_div(real_count, columns as usize) * columns as usize;
    let mut cells: Vec<CellSource> = images.iter().map(|image| CellSource::Image(image.key())).collect();
    cells.resize(padded_count, CellSource::Empty);

    Some(LayoutPlan {
        cells,
        columns,
        rows: (padded_count / columns as usize) as u32,
        cell_width,
        cell_height,
        scale_percent,
        real_count,
        padded_count,
    })
}

/// `round(natural * scale / 100)` in integer arithmetic, rounding half
/// up.
fn scale_dimension(natural: u32, scale_percent: u32) -> u32 {
    ((natural as u64 * scale_percent as u64 + 50) / 100) as u32
}
