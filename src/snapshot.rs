use crate::compositor::{CapturedPixels, CompositedSurface, PassReport};
use crate::config::{self, MIN_IMAGES};
use crate::encoder::AnimationResult;
use crate::layout::{self, LayoutPlan};
use crate::registry::SourceImage;
use anyhow::{anyhow, Result};
use std::sync::Arc;

/// Lifecycle of the derived output. Live registry edits never move this
/// machine; only the explicit user commands do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPhase {
    Empty,
    StaticReady,
    Animating,
}

/// Immutable capture of the inputs for one static composite pass. Taken
/// on "update preview"; pixel handles are cloned at capture time so later
/// registry edits cannot leak into an in-flight pass.
#[derive(Debug, Clone)]
pub struct StaticSnapshot {
    pub generation: u64,
    pub plan: LayoutPlan,
    pub pixels: CapturedPixels,
    pub scale_percent: u32,
}

/// Capture for one animation pass, derived from the current static
/// snapshot (never from live state) plus the chosen frame duration.
#[derive(Debug, Clone)]
pub struct AnimationSnapshot {
    pub generation: u64,
    pub plan: LayoutPlan,
    pub pixels: CapturedPixels,
    pub frame_seconds: f32,
}

pub const UPDATE_PREVIEW_BLOCKED: &str = "at least 8 images are required to build a spritesheet";
pub const SIMULATE_BLOCKED_NO_PREVIEW: &str = "update the preview before simulating an animation";
pub const PASS_IN_FLIGHT: &str = "a composite pass is still in flight";

/// Owns the derived output and the snapshots that produced it. Each
/// snapshot carries a generation tag; results handed back under any other
/// generation are discarded rather than applied, so a superseded pass can
/// never overwrite newer state.
#[derive(Debug, Default)]
pub struct SnapshotManager {
    generation: u64,
    static_snapshot: Option<StaticSnapshot>,
    surface: Option<CompositedSurface>,
    pass_report: Option<PassReport>,
    composite_in_flight: bool,
    animation: Option<AnimationSnapshot>,
    animation_result: Option<AnimationResult>,
    encode_in_flight: bool,
}

impl SnapshotManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> OutputPhase {
        if self.static_snapshot.is_none() {
            OutputPhase::Empty
        } else if self.animation.is_some() {
            OutputPhase::Animating
        } else {
            OutputPhase::StaticReady
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn static_snapshot(&self) -> Option<&StaticSnapshot> {
        self.static_snapshot.as_ref()
    }

    pub fn animation_snapshot(&self) -> Option<&AnimationSnapshot> {
        self.animation.as_ref()
    }

    /// The composited surface, once its pass has completed. Withheld while
    /// a pass is in flight; a half-written surface is never readable.
    pub fn surface(&self) -> Option<&CompositedSurface> {
        if self.composite_in_flight {
            return None;
        }
        self.surface.as_ref()
    }

    pub fn pass_report(&self) -> Option<&PassReport> {
        if self.composite_in_flight {
            return None;
        }
        self.pass_report.as_ref()
    }

    pub fn animation_result(&self) -> Option<&AnimationResult> {
        if self.encode_in_flight {
            return None;
        }
        self.animation_result.as_ref()
    }

    /// Why "update preview" is currently unavailable, if it is.
    pub fn update_preview_blocked(&self, live_count: usize) -> Option<&'static str> {
        (live_count < MIN_IMAGES).then_some(UPDATE_PREVIEW_BLOCKED)
    }

    /// Why "simulate animation" is currently unavailable, if it is.
    pub fn simulate_blocked(&self) -> Option<&'static str> {
        if self.static_snapshot.is_none() {
            Some(SIMULATE_BLOCKED_NO_PREVIEW)
        } else if self.composite_in_flight {
            Some(PASS_IN_FLIGHT)
        } else {
            None
        }
    }

    /// "Update preview": replaces the static snapshot from the live
    /// ordering and scale, discarding the previous surface and any
    /// animation output. Returns the new snapshot's generation tag.
    pub fn take_static(&mut self, entries: &[SourceImage], scale_percent: u32) -> Result<u64> {
        if let Some(reason) = self.update_preview_blocked(entries.len()) {
            return Err(anyhow!(reason));
        }
        let plan = layout::plan(entries, scale_percent, config::GRID_COLUMNS)
            .ok_or_else(|| anyhow!(UPDATE_PREVIEW_BLOCKED))?;
        let pixels: CapturedPixels = entries
            .iter()
            .filter_map(|entry| entry.pixels().map(|pixels| (entry.key(), Arc::clone(pixels))))
            .collect();
        self.generation += 1;
        let scale_percent = plan.scale_percent;
        self.static_snapshot = Some(StaticSnapshot { generation: self.generation, plan, pixels, scale_percent });
        self.surface = None;
        self.pass_report = None;
        self.animation = None;
        self.animation_result = None;
        self.composite_in_flight = true;
        self.encode_in_flight = false;
        Ok(self.generation)
    }

    /// Applies a finished composite pass. Rejected (and logged) unless the
    /// generation tag matches the current static snapshot.
    pub fn apply_surface(&mut self, generation: u64, surface: CompositedSurface, report: PassReport) -> bool {
        let current = self.static_snapshot.as_ref().map(|snapshot| snapshot.generation);
        if current != Some(generation) {
            eprintln!(
                "[snapshot] discarding stale composite for generation {generation} (current: {current:?})"
            );
            return false;
        }
        if !report.is_complete() {
            eprintln!(
                "[snapshot] composite for generation {generation} applied with only {}/{} cells settled",
                report.settled(),
                report.total_cells
            );
        }
        self.surface = Some(surface);
        self.pass_report = Some(report);
        self.composite_in_flight = false;
        true
    }

    /// "Simulate animation": captures the static snapshot's plan and
    /// pixels plus a clamped frame duration. Returns the generation tag
    /// the eventual [`AnimationResult`] must carry.
    pub fn take_animation(&mut self, frame_seconds: f32) -> Result<u64> {
        if let Some(reason) = self.simulate_blocked() {
            return Err(anyhow!(reason));
        }
        let base = self.static_snapshot.as_ref().expect("static snapshot checked above");
        let frame_seconds = config::clamp_frame_seconds(frame_seconds);
        self.generation += 1;
        self.animation = Some(AnimationSnapshot {
            generation: self.generation,
            plan: base.plan.clone(),
            pixels: base.pixels.clone(),
            frame_seconds,
        });
        self.animation_result = None;
        self.encode_in_flight = true;
        Ok(self.generation)
    }

    /// Applies a finished per-row encode. Same staleness rule as
    /// [`SnapshotManager::apply_surface`].
    pub fn apply_animation(&mut self, result: AnimationResult) -> bool {
        let current = self.animation.as_ref().map(|snapshot| snapshot.generation);
        if current != Some(result.generation) {
            eprintln!(
                "[snapshot] discarding stale animation for generation {} (current: {current:?})",
                result.generation
            );
            return false;
        }
        self.animation_result = Some(result);
        self.encode_in_flight = false;
        true
    }

    /// "Reset output": drops every derived artifact. The live registry is
    /// not this manager's to touch.
    pub fn reset_output(&mut self) {
        self.generation += 1;
        self.static_snapshot = None;
        self.surface = None;
        self.pass_report = None;
        self.composite_in_flight = false;
        self.animation = None;
        self.animation_result = None;
        self.encode_in_flight = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor;
    use crate::registry::SourceRegistry;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn loaded_registry(count: usize) -> SourceRegistry {
        let mut registry = SourceRegistry::new();
        for i in 0..count {
            let img = RgbaImage::from_pixel(16, 16, Rgba([i as u8, 0, 0, 255]));
            let mut bytes = Vec::new();
            img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png).expect("encode png");
            registry.add_bytes(format!("img-{i}"), bytes);
        }
        registry.resolve_pending();
        registry
    }

    #[test]
    fn starts_empty_and_blocks_below_minimum() {
        let manager = SnapshotManager::new();
        assert_eq!(manager.phase(), OutputPhase::Empty);
        assert_eq!(manager.update_preview_blocked(7), Some(UPDATE_PREVIEW_BLOCKED));
        assert_eq!(manager.update_preview_blocked(8), None);
        assert_eq!(manager.simulate_blocked(), Some(SIMULATE_BLOCKED_NO_PREVIEW));
    }

    #[test]
    fn surface_is_withheld_until_the_pass_is_applied() {
        let registry = loaded_registry(8);
        let mut manager = SnapshotManager::new();
        let generation = manager.take_static(registry.entries(), 100).expect("take snapshot");
        assert!(manager.surface().is_none(), "in-flight pass must not expose a surface");
        let snapshot = manager.static_snapshot().expect("snapshot").clone();
        let (surface, report) = compositor::composite(&snapshot.plan, &snapshot.pixels, [0; 4]);
        assert!(manager.apply_surface(generation, surface, report));
        assert!(manager.surface().is_some());
        assert_eq!(manager.phase(), OutputPhase::StaticReady);
    }

    #[test]
    fn stale_composite_is_discarded() {
        let registry = loaded_registry(8);
        let mut manager = SnapshotManager::new();
        let old = manager.take_static(registry.entries(), 100).expect("first snapshot");
        let snapshot = manager.static_snapshot().expect("snapshot").clone();
        let (old_surface, old_report) = compositor::composite(&snapshot.plan, &snapshot.pixels, [0; 4]);

        // A second explicit preview supersedes the first before it lands.
        let new = manager.take_static(registry.entries(), 50).expect("second snapshot");
        assert_ne!(old, new);
        assert!(!manager.apply_surface(old, old_surface, old_report), "stale result must be ignored");
        assert!(manager.surface().is_none());

        let snapshot = manager.static_snapshot().expect("snapshot").clone();
        let (surface, report) = compositor::composite(&snapshot.plan, &snapshot.pixels, [0; 4]);
        assert!(manager.apply_surface(new, surface, report));
        assert!(manager.surface().is_some());
    }

    #[test]
    fn stale_animation_is_discarded() {
        let registry = loaded_registry(8);
        let mut manager = SnapshotManager::new();
        let generation = manager.take_static(registry.entries(), 100).expect("take snapshot");
        let snapshot = manager.static_snapshot().expect("snapshot").clone();
        let (surface, report) = compositor::composite(&snapshot.plan, &snapshot.pixels, [0; 4]);
        manager.apply_surface(generation, surface, report);

        let anim_generation = manager.take_animation(0.1).expect("take animation");
        let stale = AnimationResult { generation: anim_generation, frame_seconds: 0.1, rows: vec![None] };

        // A fresh preview supersedes the animation before its encode lands.
        let new_generation = manager.take_static(registry.entries(), 200).expect("second snapshot");
        assert_ne!(anim_generation, new_generation);
        assert!(!manager.apply_animation(stale), "stale animation result must be ignored");
        assert!(manager.animation_result().is_none());
        assert_eq!(manager.phase(), OutputPhase::StaticReady, "the superseding preview owns the output");
    }

    #[test]
    fn animation_derives_from_the_static_snapshot() {
        let registry = loaded_registry(9);
        let mut manager = SnapshotManager::new();
        let generation = manager.take_static(registry.entries(), 100).expect("take snapshot");
        let snapshot = manager.static_snapshot().expect("snapshot").clone();
        let (surface, report) = compositor::composite(&snapshot.plan, &snapshot.pixels, [0; 4]);
        manager.apply_surface(generation, surface, report);

        let anim_generation = manager.take_animation(5.0).expect("take animation");
        let animation = manager.animation_snapshot().expect("animation snapshot");
        assert_eq!(animation.plan.cell_width, snapshot.plan.cell_width);
        assert!(
            (animation.frame_seconds - crate::config::FRAME_SECONDS_MAX).abs() < f32::EPSILON,
            "frame duration should be clamped into range"
        );
        assert_eq!(manager.phase(), OutputPhase::Animating);
        assert!(anim_generation > generation);
    }

    #[test]
    fn reset_clears_everything() {
        let registry = loaded_registry(8);
        let mut manager = SnapshotManager::new();
        let generation = manager.take_static(registry.entries(), 100).expect("take snapshot");
        let snapshot = manager.static_snapshot().expect("snapshot").clone();
        let (surface, report) = compositor::composite(&snapshot.plan, &snapshot.pixels, [0; 4]);
        manager.apply_surface(generation, surface, report);

        manager.reset_output();
        assert_eq!(manager.phase(), OutputPhase::Empty);
        assert!(manager.surface().is_none());
        assert!(manager.animation_result().is_none());
        assert!(manager.static_snapshot().is_none());
    }
}
