//! High-level image operations.
//!
//! These functions combine configuration with backend execution: they decide
//! output paths and parameters, then hand the pixel work to the backend.

use super::backend::{BackendError, Dimensions, ImageBackend, TranscodeReport};
use super::params::{Quality, ThumbnailParams, TranscodeParams, WebpMethod};
use crate::config::{ConvertConfig, ThumbnailsConfig};
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<Dimensions> {
    backend.identify(path)
}

/// Encoding settings for square thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailConfig {
    pub size: u32,
    pub quality: Quality,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            size: 200,
            quality: Quality::default(),
        }
    }
}

impl From<&ThumbnailsConfig> for ThumbnailConfig {
    fn from(config: &ThumbnailsConfig) -> Self {
        Self {
            size: config.size,
            quality: Quality::new(config.quality),
        }
    }
}

/// Plan a thumbnail operation without executing it.
pub fn plan_thumbnail(
    source: &Path,
    output_dir: &Path,
    output_name: &str,
    config: &ThumbnailConfig,
) -> ThumbnailParams {
    ThumbnailParams {
        source: source.to_path_buf(),
        output: output_dir.join(output_name),
        size: config.size,
        quality: config.quality,
    }
}

/// Create one thumbnail. Returns the size of the written file.
pub fn create_thumbnail(
    backend: &impl ImageBackend,
    source: &Path,
    output_dir: &Path,
    output_name: &str,
    config: &ThumbnailConfig,
) -> Result<u64> {
    backend.thumbnail(&plan_thumbnail(source, output_dir, output_name, config))
}

/// Encoding settings for WebP conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TranscodeConfig {
    pub quality: Quality,
    pub method: WebpMethod,
}

impl From<&ConvertConfig> for TranscodeConfig {
    fn from(config: &ConvertConfig) -> Self {
        Self {
            quality: Quality::new(config.quality),
            method: WebpMethod::new(config.method),
        }
    }
}

/// `IMG_0001.HEIC` → `IMG_0001.webp`, same directory.
pub fn webp_sibling(source: &Path) -> PathBuf {
    source.with_extension("webp")
}

pub fn plan_transcode(source: &Path, config: &TranscodeConfig) -> TranscodeParams {
    TranscodeParams {
        source: source.to_path_buf(),
        output: webp_sibling(source),
        quality: config.quality,
        method: config.method,
    }
}

/// Convert `source` to a WebP sibling. Returns the output path.
pub fn transcode_to_webp(
    backend: &impl ImageBackend,
    source: &Path,
    config: &TranscodeConfig,
) -> Result<(PathBuf, TranscodeReport)> {
    let params = plan_transcode(source, config);
    let report = backend.transcode(&params)?;
    Ok((params.output, report))
}
