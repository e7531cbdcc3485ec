//! Thumbnailer configuration.
//!
//! Handles loading, validating, and merging a TOML config file. Stock
//! defaults are the base layer; a user file overrides just the keys it sets.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [tiling]
//! tile_width = 5000         # Max tile width in source pixels
//! tile_height = 5000        # Max tile height in source pixels
//!
//! [apportion]
//! height_guard = "source-width"   # or "source-height"
//!
//! [output]
//! quality = 90              # JPEG quality (1-100)
//!
//! [processing]
//! max_processes = 4         # Max parallel tile workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::grid::TileSize;
use crate::imaging::Quality;
use crate::rescale::HeightGuard;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full configuration. Every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbConfig {
    /// Tile partitioning.
    pub tiling: TilingConfig,
    /// Apportioned-size behavior.
    pub apportion: ApportionConfig,
    /// Encoder settings.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl ThumbConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tiling.tile_width == 0 || self.tiling.tile_height == 0 {
            return Err(ConfigError::Validation(
                "tiling.tile_width and tiling.tile_height must be non-zero".into(),
            ));
        }
        if self.output.quality == 0 || self.output.quality > 100 {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Tile partitioning settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TilingConfig {
    pub tile_width: u32,
    pub tile_height: u32,
}

impl TilingConfig {
    pub fn tile_size(&self) -> TileSize {
        TileSize::new(self.tile_width, self.tile_height)
    }
}

impl Default for TilingConfig {
    fn default() -> Self {
        let size = TileSize::default();
        Self {
            tile_width: size.width,
            tile_height: size.height,
        }
    }
}

/// Apportioned-size settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApportionConfig {
    /// Which source dimension guards the per-tile target height.
    pub height_guard: HeightGuard,
}

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// JPEG encoding quality (1 = worst, 100 = best). Lossless formats ignore it.
    pub quality: u32,
}

impl OutputConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default().value(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel tile workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ThumbConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse config text, merge it over the stock defaults, and validate.
pub fn parse_config(content: &str) -> Result<ThumbConfig, ConfigError> {
    let overlay: toml::Value = toml::from_str(content)?;
    let merged = merge_toml(stock_defaults_value()?, overlay);
    let config: ThumbConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file.
///
/// `None` yields the validated stock defaults.
pub fn load_config(path: Option<&Path>) -> Result<ThumbConfig, ConfigError> {
    match path {
        Some(path) => parse_config(&fs::read_to_string(path)?),
        None => {
            let config = ThumbConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# bigthumb Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Tiling
# ---------------------------------------------------------------------------
[tiling]
# Largest tile decoded and rescaled at once, in source pixels.
# Smaller tiles lower peak memory per worker; edge tiles may be smaller still.
tile_width = 5000
tile_height = 5000

# ---------------------------------------------------------------------------
# Apportioned size (the `size` command)
# ---------------------------------------------------------------------------
[apportion]
# Which source dimension a tile's height is compared against when deciding
# whether it receives the whole target height.
#   "source-width"  - established behavior (compares against the width)
#   "source-height" - symmetric rule
height_guard = "source-width"

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# JPEG encoding quality (1 = worst, 100 = best). PNG, TIFF, etc. ignore it.
quality = 90

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel tile workers. Each in-flight tile holds one decoded and
# one rescaled buffer. Omit to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
