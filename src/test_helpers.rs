//! Shared test utilities.
//!
//! Album trees are built in a temp directory with [`setup_albums`]; the files
//! are placeholders unless a test needs real pixels, in which case the
//! `write_*` helpers produce small synthetic images with the `image` crate.
//!
//! ```rust,ignore
//! let tmp = TempDir::new().unwrap();
//! setup_albums(tmp.path(), &[("A", &["cat.png"]), ("B", &[])]);
//! write_png(&tmp.path().join("A/cat.png"), 300, 400);
//! ```

use image::{ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;

/// A minimal little-endian TIFF block: header plus one empty IFD.
pub const SAMPLE_EXIF: &[u8] = b"II*\0\x08\0\0\0\0\0\0\0\0\0";

// =========================================================================
// Fixture setup
// =========================================================================

/// Create one directory per album under `root` with placeholder files.
///
/// Each file's contents are its relative path, so no two files hash alike.
pub fn setup_albums(root: &Path, layout: &[(&str, &[&str])]) {
    for (album, files) in layout {
        let dir = root.join(album);
        std::fs::create_dir_all(&dir).unwrap();
        for file in *files {
            std::fs::write(dir.join(file), format!("{album}/{file}")).unwrap();
        }
    }
}

// =========================================================================
// Synthetic images
// =========================================================================

/// Opaque gradient PNG.
pub fn write_png(path: &Path, width: u32, height: u32) {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    })
    .save(path)
    .unwrap();
}

/// PNG with a transparent left half.
pub fn write_rgba_png(path: &Path, width: u32, height: u32) {
    RgbaImage::from_fn(width, height, |x, _| {
        let alpha = if x < width / 2 { 0 } else { 255 };
        Rgba([200, 100, 50, alpha])
    })
    .save(path)
    .unwrap();
}

/// JPEG carrying [`SAMPLE_EXIF`] in an APP1 segment.
pub fn write_jpeg_with_exif(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_pixel(width, height, Rgb([90, 140, 200]));
    let mut jpeg = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 90)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();

    let payload_len = (2 + 6 + SAMPLE_EXIF.len()) as u16;
    let mut app1 = vec![0xFF, 0xE1];
    app1.extend_from_slice(&payload_len.to_be_bytes());
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(SAMPLE_EXIF);

    // Right after SOI.
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    std::fs::write(path, out).unwrap();
}
