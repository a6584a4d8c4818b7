//! Pure calculation functions for image geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// A square region inside a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub side: u32,
}

/// Largest centered square that fits in `width × height`.
///
/// Offsets use integer division, so for odd margins the extra pixel lands on
/// the right or bottom edge.
///
/// # Examples
/// ```
/// # use album_assets::imaging::{CropRect, center_square_crop};
/// // 300×400 portrait → 300×300 starting 50px down
/// assert_eq!(center_square_crop(300, 400), CropRect { left: 0, top: 50, side: 300 });
/// ```
pub fn center_square_crop(width: u32, height: u32) -> CropRect {
    let side = width.min(height);
    CropRect {
        left: (width - side) / 2,
        top: (height - side) / 2,
        side,
    }
}

/// Bytes to mebibytes, rounded to two decimals.
pub fn round_mebibytes(bytes: u64) -> f64 {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    (mb * 100.0).round() / 100.0
}
