//! HEIC/HEIF decoding through libheif.
//!
//! Compiled only with the `heif` feature, since libheif is a system library.
//! Without it every call fails with a [`BackendError::Decode`] that names the
//! missing feature, so a batch converts what it can and counts the rest.

use super::backend::{BackendError, Dimensions};
use super::rust_backend::Decoded;
use std::path::Path;

#[cfg(feature = "heif")]
mod imp {
    use super::*;
    use image::{DynamicImage, RgbImage, RgbaImage};
    use libheif_rs::{ColorSpace, HeifContext, ItemId, LibHeif, RgbChroma};

    fn open(path: &Path) -> Result<HeifContext<'static>, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::decode(path, "path is not valid UTF-8"))?;
        HeifContext::read_from_file(path_str).map_err(|e| BackendError::decode(path, e))
    }

    pub fn identify(path: &Path) -> Result<Dimensions, BackendError> {
        let ctx = open(path)?;
        let handle = ctx
            .primary_image_handle()
            .map_err(|e| BackendError::decode(path, e))?;
        Ok(Dimensions {
            width: handle.width(),
            height: handle.height(),
        })
    }

    pub fn decode(path: &Path) -> Result<Decoded, BackendError> {
        let lib = LibHeif::new();
        let ctx = open(path)?;
        let handle = ctx
            .primary_image_handle()
            .map_err(|e| BackendError::decode(path, e))?;

        let alpha = handle.has_alpha_channel();
        let chroma = if alpha {
            RgbChroma::Rgba
        } else {
            RgbChroma::Rgb
        };
        let decoded = lib
            .decode(&handle, ColorSpace::Rgb(chroma), None)
            .map_err(|e| BackendError::decode(path, e))?;
        let plane = decoded
            .planes()
            .interleaved
            .ok_or_else(|| BackendError::decode(path, "no interleaved plane"))?;

        let (width, height) = (plane.width, plane.height);
        let channels = if alpha { 4 } else { 3 };
        let row_len = width as usize * channels;
        let pixels = pack_rows(plane.data, plane.stride, row_len, height as usize)
            .ok_or_else(|| BackendError::decode(path, "decoded plane is shorter than its stride"))?;

        let image = if alpha {
            RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8)
        } else {
            RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
        }
        .ok_or_else(|| BackendError::decode(path, "decoded plane has the wrong size"))?;

        let mut ids: Vec<ItemId> = vec![0; 1];
        let exif = match handle.metadata_block_ids(&mut ids, b"Exif") {
            0 => None,
            _ => handle.metadata(ids[0]).ok().and_then(|block| strip_tiff_offset(&block)),
        };

        Ok(Decoded { image, exif })
    }
}

#[cfg(not(feature = "heif"))]
mod imp {
    use super::*;

    const MISSING: &str = "HEIF support not compiled in (rebuild with --features heif)";

    pub fn identify(path: &Path) -> Result<Dimensions, BackendError> {
        Err(BackendError::decode(path, MISSING))
    }

    pub fn decode(path: &Path) -> Result<Decoded, BackendError> {
        Err(BackendError::decode(path, MISSING))
    }
}

pub use imp::{decode, identify};

/// HEIF Exif items start with a 4-byte big-endian offset to the TIFF header.
#[cfg_attr(not(feature = "heif"), allow(dead_code))]
fn strip_tiff_offset(block: &[u8]) -> Option<Vec<u8>> {
    let offset = u32::from_be_bytes(block.get(..4)?.try_into().ok()?) as usize;
    let tiff = block.get(offset.checked_add(4)?..)?;
    (!tiff.is_empty()).then(|| tiff.to_vec())
}

/// Copy `height` rows of `row_len` bytes out of a plane padded to `stride`.
#[cfg_attr(not(feature = "heif"), allow(dead_code))]
fn pack_rows(data: &[u8], stride: usize, row_len: usize, height: usize) -> Option<Vec<u8>> {
    if stride < row_len {
        return None;
    }
    let mut pixels = Vec::with_capacity(row_len * height);
    for y in 0..height {
        let start = y * stride;
        pixels.extend_from_slice(data.get(start..start + row_len)?);
    }
    Some(pixels)
}
