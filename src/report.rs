use crate::compositor::{CompositedSurface, PassReport};
use crate::encoder::AnimationResult;
use crate::layout::{LayoutPlan, LayoutSummary};
use anyhow::{Context, Result};
use serde::Serialize;

/// Deterministic snapshot of one finished composite (and optional
/// animation) pass, for docs, tests, and the CLI's `--report` output.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SheetReport {
    pub layout: LayoutSummary,
    pub surface_digest: String,
    pub cells_drawn: usize,
    pub cells_blank: usize,
    pub cells_failed: usize,
    pub animation: Option<AnimationReport>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnimationReport {
    pub frame_seconds: f32,
    pub rows_encoded: usize,
    pub rows_failed: usize,
}

impl SheetReport {
    pub fn from_parts(
        plan: &LayoutPlan,
        surface: &CompositedSurface,
        pass: &PassReport,
        animation: Option<&AnimationResult>,
    ) -> Self {
        Self {
            layout: plan.summary(),
            surface_digest: surface.digest_hex(),
            cells_drawn: pass.drawn,
            cells_blank: pass.blank,
            cells_failed: pass.failed,
            animation: animation.map(|result| AnimationReport {
                frame_seconds: result.frame_seconds,
                rows_encoded: result.encoded_rows(),
                rows_failed: result.failed_rows(),
            }),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize sheet report")
    }
}
