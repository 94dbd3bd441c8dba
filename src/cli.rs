use crate::config::AppConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliArgs {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    gif_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    scale: Option<u32>,
    frame_seconds: Option<f32>,
    report: bool,
}

impl CliArgs {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = CliArgs::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            if !flag.starts_with("--") {
                bail!("Unexpected argument '{flag}'. Flags start with '--'; see --input/--output.");
            }
            let key = &flag[2..];
            if key == "report" {
                parsed.report = true;
                continue;
            }
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "input" => parsed.input = Some(PathBuf::from(value)),
                "output" => parsed.output = Some(PathBuf::from(value)),
                "gif-dir" => parsed.gif_dir = Some(PathBuf::from(value)),
                "config" => parsed.config = Some(PathBuf::from(value)),
                "scale" => {
                    parsed.scale =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid scale '{value}'"))?);
                }
                "frame-seconds" => {
                    parsed.frame_seconds = Some(
                        value
                            .parse::<f32>()
                            .with_context(|| format!("Invalid frame duration '{value}'"))?,
                    );
                }
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --input, --output, --gif-dir, --config, --scale, --frame-seconds, --report."
                ),
            }
        }
        Ok(parsed)
    }

    pub fn input(&self) -> Option<&Path> {
        self.input.as_deref()
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    pub fn animate(&self) -> bool {
        self.gif_dir.is_some()
    }

    pub fn wants_report(&self) -> bool {
        self.report
    }

    pub fn config_overrides(&self) -> AppConfigOverrides {
        AppConfigOverrides {
            scale_percent: self.scale,
            frame_seconds: self.frame_seconds,
            sheet_path: self.output.clone(),
            animation_dir: self.gif_dir.clone(),
        }
    }
}
