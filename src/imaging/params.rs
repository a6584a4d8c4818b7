//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides which files to produce and where) and the
//! [`backend`](super::backend) (which does the pixel work), so a mock backend
//! can stand in during tests without changing operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 85). Clamped on construction.
//! - [`WebpMethod`]: libwebp effort level (0–6, default 6). Clamped on construction.
//! - [`ThumbnailParams`]: Source, output, square edge, JPEG quality.
//! - [`TranscodeParams`]: Source, output, WebP quality and method.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// WebP compression effort, 0 (fastest) to 6 (smallest output).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebpMethod(pub u32);

impl WebpMethod {
    pub fn new(value: u32) -> Self {
        Self(value.min(6))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for WebpMethod {
    fn default() -> Self {
        Self(6)
    }
}

/// Parameters for a square thumbnail (center crop + resize + JPEG).
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Output edge length in pixels.
    pub size: u32,
    pub quality: Quality,
}

/// Parameters for a format conversion to lossy WebP.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub quality: Quality,
    pub method: WebpMethod,
}
