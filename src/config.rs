//! Pipeline configuration.
//!
//! Loaded from an optional `config.toml` in the album root. Stock defaults are
//! the base layer; the user file is merged on top key-by-key, so it only needs
//! the values it wants to change:
//!
//! ```toml
//! # Thumbnails for two albums only, a little larger than stock.
//! [thumbnails]
//! size = 240
//! albums = ["ぽんちょねこ", "Nohn"]
//! ```
//!
//! Unknown keys are rejected to catch typos early, and the merged result is
//! validated before any stage runs. `album-assets gen-config` prints the full
//! documented file (see [`stock_config_toml`]).

use crate::orientation::OrientationPolicy;
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

/// Name of the config file inside the album root.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Album discovery and the catalog manifest allowlist.
    pub scan: ScanConfig,
    /// Square thumbnail generation.
    pub thumbnails: ThumbnailsConfig,
    /// Legacy-format conversion (HEIC/HEIF → WebP).
    pub convert: ConvertConfig,
    /// App icon export.
    pub icons: IconsConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "scan.extensions must not be empty".into(),
            ));
        }
        if self.thumbnails.size == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.size must be positive".into(),
            ));
        }
        if !(1..=100).contains(&self.thumbnails.quality) {
            return Err(ConfigError::Validation(
                "thumbnails.quality must be 1-100".into(),
            ));
        }
        if self.thumbnails.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "thumbnails.extensions must not be empty".into(),
            ));
        }
        if !(1..=100).contains(&self.convert.quality) {
            return Err(ConfigError::Validation(
                "convert.quality must be 1-100".into(),
            ));
        }
        if self.convert.method > 6 {
            return Err(ConfigError::Validation(
                "convert.method must be 0-6".into(),
            ));
        }
        if self.convert.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "convert.extensions must not be empty".into(),
            ));
        }
        let archive = &self.convert.archive_dir;
        if archive.is_empty()
            || archive.contains(['/', '\\'])
            || !crate::naming::is_hidden(archive, &self.scan.hidden_prefix)
        {
            return Err(ConfigError::Validation(format!(
                "convert.archive_dir must be a single directory name starting with \"{}\"",
                self.scan.hidden_prefix
            )));
        }
        if self.icons.sizes.iter().any(|&s| s == 0) {
            return Err(ConfigError::Validation(
                "icons.sizes values must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Album discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Entries whose name starts with this prefix are never albums or images.
    pub hidden_prefix: String,
    /// Extensions listed in the catalog manifest (case-insensitive).
    pub extensions: Vec<String>,
    /// Directory names in the album root that are not albums.
    pub exclude: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            hidden_prefix: ".".to_string(),
            extensions: ["jpg", "jpeg", "png", "webp", "avif", "gif"]
                .map(String::from)
                .to_vec(),
            exclude: vec!["thumbnails".to_string()],
        }
    }
}

/// Thumbnail generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    /// Edge length of the square output, in pixels.
    pub size: u32,
    /// JPEG quality (1-100).
    pub quality: u32,
    /// Source extensions considered for thumbnails.
    pub extensions: Vec<String>,
    /// Which orientations become thumbnails.
    pub orientation: OrientationPolicy,
    /// Albums to draw from, by name. Empty means every album.
    pub albums: Vec<String>,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            size: 200,
            quality: 85,
            extensions: ["jpg", "jpeg", "png"].map(String::from).to_vec(),
            orientation: OrientationPolicy::Portrait,
            albums: Vec::new(),
        }
    }
}

/// Legacy-format conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    /// Source extensions to convert.
    pub extensions: Vec<String>,
    /// WebP quality (1-100).
    pub quality: u32,
    /// WebP compression method, 0 (fast) to 6 (smallest).
    pub method: u32,
    /// Per-album directory that receives the originals.
    pub archive_dir: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["heic".to_string(), "heif".to_string()],
            quality: 85,
            method: 6,
            archive_dir: ".heic_archive".to_string(),
        }
    }
}

/// App icon export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IconsConfig {
    /// Square icon sizes to export, one `icon-<size>.png` each.
    pub sizes: Vec<u32>,
}

impl Default for IconsConfig {
    fn default() -> Self {
        Self {
            sizes: vec![192, 512],
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
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
// Loading, merging, validation
// =============================================================================

/// Stock defaults as a `toml::Value::Table`, the base layer for merging.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(PipelineConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
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

/// Read `config.toml` from `dir` as a raw TOML value, if present.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto `base`, deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PipelineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the pipeline config for an album root.
///
/// A missing root or missing file yields the stock defaults; the scan stage
/// reports a missing root on its own.
pub fn load_config(albums_root: &Path) -> Result<PipelineConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(albums_root)?)
}

/// Fully-commented stock `config.toml`, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# album-assets configuration
# ==========================
# Place this file at <albums>/config.toml. Every setting is optional; the
# values below are the defaults. Unknown keys are an error.

# ---------------------------------------------------------------------------
# Album discovery
# ---------------------------------------------------------------------------
[scan]
# Names starting with this prefix are skipped (albums and files alike).
hidden_prefix = "."

# Extensions listed in data/images.json (case-insensitive).
extensions = ["jpg", "jpeg", "png", "webp", "avif", "gif"]

# Directories in the album root that are not albums.
exclude = ["thumbnails"]

# ---------------------------------------------------------------------------
# Square thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Output edge length in pixels.
size = 200

# JPEG quality, 1-100.
quality = 85

# Source extensions considered for thumbnails.
extensions = ["jpg", "jpeg", "png"]

# portrait  - only images taller than wide
# landscape - images wider than tall, and squares
# any       - every image
orientation = "portrait"

# Albums to draw thumbnails from. Empty means every album.
albums = []

# ---------------------------------------------------------------------------
# HEIC/HEIF to WebP conversion
# ---------------------------------------------------------------------------
[convert]
extensions = ["heic", "heif"]

# WebP quality, 1-100.
quality = 85

# WebP compression method, 0 (fast) to 6 (smallest output).
method = 6

# Originals are moved here, inside each album. Must start with the hidden
# prefix so scans never pick archived files up again.
archive_dir = ".heic_archive"

# ---------------------------------------------------------------------------
# App icons
# ---------------------------------------------------------------------------
[icons]
sizes = [192, 512]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers. Omit to use every CPU core.
# max_processes = 4
"##
}
