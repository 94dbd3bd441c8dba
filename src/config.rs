use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is
/// not given.
pub const DEFAULT_CONFIG_PATH: &str = "sheetforge.json";

pub const GRID_COLUMNS: u32 = 8;
pub const MIN_IMAGES: usize = 8;
pub const SCALE_MIN: u32 = 5;
pub const SCALE_MAX: u32 = 400;
pub const FRAME_SECONDS_MIN: f32 = 0.05;
pub const FRAME_SECONDS_MAX: f32 = 0.5;

pub fn clamp_scale(percent: u32) -> u32 {
    percent.clamp(SCALE_MIN, SCALE_MAX)
}

pub fn clamp_frame_seconds(seconds: f32) -> f32 {
    if !seconds.is_finite() {
        return FRAME_SECONDS_MIN;
    }
    seconds.clamp(FRAME_SECONDS_MIN, FRAME_SECONDS_MAX)
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "OutputConfig::default_background")]
    pub background: [u8; 4],
    #[serde(default = "OutputConfig::default_sheet_path")]
    pub sheet_path: PathBuf,
    #[serde(default = "OutputConfig::default_animation_dir")]
    pub animation_dir: PathBuf,
}

impl OutputConfig {
    const fn default_background() -> [u8; 4] {
        [0, 0, 0, 0]
    }

    fn default_sheet_path() -> PathBuf {
        PathBuf::from("spritesheet.png")
    }

    fn default_animation_dir() -> PathBuf {
        PathBuf::from("rows")
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            background: Self::default_background(),
            sheet_path: Self::default_sheet_path(),
            animation_dir: Self::default_animation_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "PreviewConfig::default_scale_percent")]
    pub scale_percent: u32,
    #[serde(default = "PreviewConfig::default_frame_seconds")]
    pub frame_seconds: f32,
}

impl PreviewConfig {
    const fn default_scale_percent() -> u32 {
        100
    }

    const fn default_frame_seconds() -> f32 {
        0.1
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            scale_percent: Self::default_scale_percent(),
            frame_seconds: Self::default_frame_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfigOverrides {
    pub scale_percent: Option<u32>,
    pub frame_seconds: Option<f32>,
    pub sheet_path: Option<PathBuf>,
    pub animation_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                eprintln!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(scale) = overrides.scale_percent {
            self.preview.scale_percent = scale;
        }
        if let Some(seconds) = overrides.frame_seconds {
            self.preview.frame_seconds = seconds;
        }
        if let Some(path) = &overrides.sheet_path {
            self.output.sheet_path = path.clone();
        }
        if let Some(dir) = &overrides.animation_dir {
            self.output.animation_dir = dir.clone();
        }
    }
}

impl AppConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.scale_percent.is_none()
            && self.frame_seconds.is_none()
            && self.sheet_path.is_none()
            && self.animation_dir.is_none()
    }
}
