//! Image processing.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions`, libheif handle |
//! | **Thumbnail** | center crop + Lanczos3 resize + `jpeg-encoder` |
//! | **Transcode → WebP** | `webp` (libwebp) + RIFF `EXIF` chunk |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop geometry (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining configuration + backend
//! - **WebP mux**: EXIF chunk insertion for encoded WebP files

pub mod backend;
mod calculations;
pub mod heif;
pub mod operations;
mod params;
pub mod rust_backend;
pub mod webp_mux;

pub use backend::{BackendError, Dimensions, ImageBackend, TranscodeReport};
pub use calculations::{CropRect, center_square_crop, round_mebibytes};
pub use operations::{
    ThumbnailConfig, TranscodeConfig, create_thumbnail, get_dimensions, transcode_to_webp,
    webp_sibling,
};
pub use params::{Quality, ThumbnailParams, TranscodeParams, WebpMethod};
pub use rust_backend::{RustBackend, register_decoders};
pub(crate) use rust_backend::write_atomic;
