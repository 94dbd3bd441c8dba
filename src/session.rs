use crate::cli::CliArgs;
use crate::compositor::{self, CompositedSurface, PassReport};
use crate::config::{self, AppConfig};
use crate::encoder::{self, AnimationEncoder, AnimationResult, GifRowEncoder};
use crate::export;
use crate::registry::{ImageKey, SourceRegistry};
use crate::report::SheetReport;
use crate::snapshot::{OutputPhase, SnapshotManager};
use anyhow::{anyhow, bail, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Live editing session: the registry plus the continuously-adjustable
/// scale and frame-duration values, and the snapshot manager holding the
/// derived output. Edits here are cheap and never trigger raster work;
/// only the explicit `update_preview` / `simulate_animation` commands do.
pub struct Session {
    config: AppConfig,
    registry: SourceRegistry,
    output: SnapshotManager,
    pending_scale: u32,
    pending_frame_seconds: f32,
    encoder: Box<dyn AnimationEncoder>,
}

impl Session {
    pub fn new(config: AppConfig) -> Self {
        Self::with_encoder(config, Box::new(GifRowEncoder))
    }

    pub fn with_encoder(config: AppConfig, encoder: Box<dyn AnimationEncoder>) -> Self {
        let pending_scale = config::clamp_scale(config.preview.scale_percent);
        let pending_frame_seconds = config::clamp_frame_seconds(config.preview.frame_seconds);
        Self {
            config,
            registry: SourceRegistry::new(),
            output: SnapshotManager::new(),
            pending_scale,
            pending_frame_seconds,
            encoder,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn phase(&self) -> OutputPhase {
        self.output.phase()
    }

    pub fn add_image_bytes(&mut self, label: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> ImageKey {
        self.registry.add_bytes(label, bytes)
    }

    pub fn add_image_file(&mut self, path: impl Into<PathBuf>) -> ImageKey {
        self.registry.add_file(path)
    }

    pub fn add_directory(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        Ok(self.registry.add_directory(dir)?.len())
    }

    pub fn remove_image(&mut self, position: usize) -> Option<ImageKey> {
        self.registry.remove(position)
    }

    pub fn reorder_image(&mut self, from: usize, to: usize) -> bool {
        self.registry.reorder(from, to)
    }

    /// Cooperative load pump; the only point where pending decodes settle.
    pub fn resolve_pending_loads(&mut self) -> usize {
        self.registry.resolve_pending()
    }

    /// Adjusts the live scale slider. Clamped, cheap, and without effect
    /// on any existing snapshot or surface.
    pub fn set_scale(&mut self, percent: u32) -> u32 {
        self.pending_scale = config::clamp_scale(percent);
        self.pending_scale
    }

    pub fn scale(&self) -> u32 {
        self.pending_scale
    }

    pub fn set_frame_seconds(&mut self, seconds: f32) -> f32 {
        self.pending_frame_seconds = config::clamp_frame_seconds(seconds);
        self.pending_frame_seconds
    }

    pub fn frame_seconds(&self) -> f32 {
        self.pending_frame_seconds
    }

    pub fn update_preview_blocked(&self) -> Option<&'static str> {
        self.output.update_preview_blocked(self.registry.len())
    }

    pub fn simulate_blocked(&self) -> Option<&'static str> {
        self.output.simulate_blocked()
    }

    /// "Update preview": snapshot the live ordering and scale, then run
    /// the full composite pass against that capture.
    pub fn update_preview(&mut self) -> Result<()> {
        self.registry.resolve_pending();
        let generation = self.output.take_static(self.registry.entries(), self.pending_scale)?;
        let snapshot = self.output.static_snapshot().expect("snapshot just taken");
        let plan = snapshot.plan.clone();
        let pixels = snapshot.pixels.clone();
        let (surface, report) = compositor::composite(&plan, &pixels, self.config.output.background);
        if !self.output.apply_surface(generation, surface, report) {
            bail!("Composite pass for generation {generation} was superseded before it completed");
        }
        Ok(())
    }

    /// "Simulate animation": snapshot the *static* snapshot's inputs plus
    /// the live frame duration, then encode every row in order.
    pub fn simulate_animation(&mut self) -> Result<()> {
        let generation = self.output.take_animation(self.pending_frame_seconds)?;
        let snapshot = self.output.animation_snapshot().expect("animation snapshot just taken");
        let plan = snapshot.plan.clone();
        let pixels = snapshot.pixels.clone();
        let frame_seconds = snapshot.frame_seconds;
        let result = encoder::encode_rows(
            &plan,
            &pixels,
            frame_seconds,
            self.config.output.background,
            self.encoder.as_ref(),
            generation,
        );
        if !self.output.apply_animation(result) {
            bail!("Animation pass for generation {generation} was superseded before it completed");
        }
        Ok(())
    }

    /// "Reset output": discards all derived output; the registry and the
    /// live slider values stay as they are.
    pub fn reset_output(&mut self) {
        self.output.reset_output();
    }

    pub fn surface(&self) -> Option<&CompositedSurface> {
        self.output.surface()
    }

    pub fn pass_report(&self) -> Option<&PassReport> {
        self.output.pass_report()
    }

    pub fn animation_result(&self) -> Option<&AnimationResult> {
        self.output.animation_result()
    }

    /// Why export is currently unavailable, if it is.
    pub fn export_blocked(&self) -> Option<&'static str> {
        if self.output.surface().is_none() {
            return Some(export::EXPORT_NO_SURFACE);
        }
        let snapshot = self.output.static_snapshot()?;
        export::export_blocked(&snapshot.plan)
    }

    pub fn export_spritesheet(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(reason) = self.export_blocked() {
            return Err(anyhow!(reason));
        }
        let surface = self.output.surface().expect("export gate checked the surface");
        export::write_spritesheet(surface, path)
    }

    pub fn write_row_animations(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let result = self
            .animation_result()
            .ok_or_else(|| anyhow!("No animation has been simulated for the current snapshot"))?;
        export::write_row_animations(result, dir)
    }

    pub fn report(&self) -> Result<SheetReport> {
        let snapshot = self
            .output
            .static_snapshot()
            .ok_or_else(|| anyhow!("No preview has been composited to report on"))?;
        let surface = self.output.surface().ok_or_else(|| anyhow!(export::EXPORT_NO_SURFACE))?;
        let pass = self.output.pass_report().ok_or_else(|| anyhow!("No completed pass to report on"))?;
        Ok(SheetReport::from_parts(&snapshot.plan, surface, pass, self.output.animation_result()))
    }
}

/// Headless CLI entry point: load a directory of images, composite, and
/// write the requested artifacts.
pub fn run(args: CliArgs) -> Result<()> {
    let mut config = match args.config_path() {
        Some(path) => AppConfig::load(path)?,
        None if Path::new(config::DEFAULT_CONFIG_PATH).exists() => {
            AppConfig::load_or_default(config::DEFAULT_CONFIG_PATH)
        }
        None => AppConfig::default(),
    };
    let overrides = args.config_overrides();
    if !overrides.is_empty() {
        config.apply_overrides(&overrides);
    }
    let sheet_path = config.output.sheet_path.clone();
    let animation_dir = config.output.animation_dir.clone();

    let input = args
        .input()
        .ok_or_else(|| anyhow!("An --input directory of source images is required"))?
        .to_path_buf();
    let mut session = Session::new(config);
    let added = session.add_directory(&input)?;
    if added == 0 {
        bail!("No files found in {}", input.display());
    }
    session.resolve_pending_loads();

    if let Some(reason) = session.update_preview_blocked() {
        bail!("Cannot build a spritesheet: {reason}");
    }
    session.update_preview()?;
    if let Some(reason) = session.export_blocked() {
        bail!("Cannot export: {reason}");
    }
    session.export_spritesheet(&sheet_path)?;
    let surface = session.surface().expect("surface exported above");
    println!("Wrote spritesheet {} ({}x{})", sheet_path.display(), surface.width(), surface.height());

    if args.animate() {
        session.simulate_animation()?;
        let written = session.write_row_animations(&animation_dir)?;
        println!("Wrote {} row animation(s) under {}", written.len(), animation_dir.display());
    }

    if args.wants_report() {
        println!("{}", session.report()?.to_json()?);
    }
    Ok(())
}
