use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use herald_core::Severity;

use crate::cli::{Cli, ColorMode, Verbosity};
use crate::render::RenderOptions;

/// Config file looked up in the current directory when `--config` is not given.
pub const CONFIG_FILE: &str = "herald.yaml";

/// Top-level herald.yaml configuration
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HeraldConfig {
    /// Hide diagnostics below this level (default: info)
    #[serde(default)]
    pub min_severity: Option<Severity>,

    /// Terminal color policy (default: auto)
    #[serde(default)]
    pub color: Option<ColorMode>,

    /// Emit JSON lines instead of styled text (default: false)
    #[serde(default)]
    pub json: Option<bool>,

    /// Print the warning/error tally at the end (default: true)
    #[serde(default)]
    pub summary: Option<bool>,
}

/// Parse config file contents. An empty file yields the defaults.
pub fn parse_config(content: &str) -> Result<HeraldConfig> {
    if content.trim().is_empty() {
        return Ok(HeraldConfig::default());
    }
    yaml_serde::from_str(content).context("Failed to parse herald config")
}

/// Load the config file.
///
/// An explicit path must exist. Without one, `herald.yaml` in `cwd` is used
/// when present and the defaults otherwise.
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<HeraldConfig> {
    let path: PathBuf = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = cwd.join(CONFIG_FILE);
            if !candidate.is_file() {
                return Ok(HeraldConfig::default());
            }
            candidate
        }
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config file {}", path.display()))
}

/// Effective settings after merging CLI flags over the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub render: RenderOptions,
    pub color: ColorMode,
}

impl Settings {
    /// Precedence: CLI flag > config file > default.
    ///
    /// `--verbose` lowers the threshold to debug; `--quiet` raises it to
    /// warning and turns the summary off.
    pub fn resolve(cli: &Cli, config: &HeraldConfig) -> Self {
        let defaults = RenderOptions::default();
        let mut min_severity = cli
            .min_severity
            .or(config.min_severity)
            .unwrap_or(defaults.min_severity);
        let mut summary = config.summary.unwrap_or(defaults.summary);

        match cli.verbosity() {
            Verbosity::Verbose => min_severity = Severity::Debug,
            Verbosity::Quiet => {
                min_severity = min_severity.max(Severity::Warning);
                summary = false;
            }
            Verbosity::Normal => {}
        }

        Settings {
            render: RenderOptions {
                min_severity,
                json: cli.json || config.json.unwrap_or(defaults.json),
                summary,
            },
            color: cli.color.or(config.color).unwrap_or_default(),
        }
    }

    /// Apply the color policy to the `colored` crate globally.
    pub fn apply_color(&self) {
        match self.color {
            ColorMode::Auto => colored::control::unset_override(),
            ColorMode::Always => colored::control::set_override(true),
            ColorMode::Never => colored::control::set_override(false),
        }
    }
}
