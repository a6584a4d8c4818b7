//! App icons.
//!
//! A cat face drawn from a fixed geometry, scaled to the requested size:
//! white round face on black, two triangular ears, black eyes, a pink nose
//! and two mouth strokes. Everything is derived from the face radius
//! (`0.35 × size`), so every size is the same picture.
//!
//! Shapes are rasterized directly into an `RgbImage` by testing each pixel
//! against the shape, then encoded as PNG.

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IconError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Icon size must be positive")]
    ZeroSize,
}

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const PINK: Rgb<u8> = Rgb([255, 105, 180]);

type Point = (f32, f32);

/// `icon-<size>.png`
pub fn icon_filename(size: u32) -> String {
    format!("icon-{size}.png")
}

/// Draw the icon at `size × size` pixels.
pub fn draw_icon(size: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(size, size, BLACK);

    let c = (size / 2) as f32;
    let r = (size as f32 * 0.35).floor();
    let part = |k: f32| (r * k).floor();

    fill_circle(&mut img, (c, c), r, WHITE);

    for side in [-1.0, 1.0] {
        fill_triangle(
            &mut img,
            [
                (c + side * r * 0.7, c - r * 0.7),
                (c + side * r * 0.3, c - r * 1.1),
                (c + side * r * 0.9, c - r * 1.1),
            ],
            WHITE,
        );
    }

    let eye_y = c - part(0.2);
    let eye_dx = part(0.4);
    let eye_r = part(0.15);
    fill_circle(&mut img, (c - eye_dx, eye_y), eye_r, BLACK);
    fill_circle(&mut img, (c + eye_dx, eye_y), eye_r, BLACK);

    let nose_y = c + part(0.1);
    let nose = part(0.2);
    let nose_tip = (c, nose_y + nose);
    fill_triangle(
        &mut img,
        [nose_tip, (c - nose, nose_y - nose), (c + nose, nose_y - nose)],
        PINK,
    );

    let mouth_y = nose_tip.1 + part(0.1);
    let mouth_w = part(0.5);
    let stroke = (size / 100).max(2) as f32;
    stroke_line(&mut img, nose_tip, (c - mouth_w, mouth_y), stroke, BLACK);
    stroke_line(&mut img, nose_tip, (c + mouth_w, mouth_y), stroke, BLACK);

    img
}

/// The icon at `size` as PNG bytes.
pub fn render_icon(size: u32) -> Result<Vec<u8>, IconError> {
    if size == 0 {
        return Err(IconError::ZeroSize);
    }
    let mut bytes = Vec::new();
    draw_icon(size).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Write one `icon-<size>.png` per size into `dir`. Returns the written paths.
pub fn export_icons(dir: &Path, sizes: &[u32]) -> Result<Vec<PathBuf>, IconError> {
    std::fs::create_dir_all(dir)?;
    sizes
        .iter()
        .map(|&size| {
            let path = dir.join(icon_filename(size));
            std::fs::write(&path, render_icon(size)?)?;
            tracing::info!(path = %path.display(), size, "icon written");
            Ok(path)
        })
        .collect()
}

// ============================================================================
// Rasterization
// ============================================================================

/// Paint every pixel whose coordinates satisfy `inside`, within a bounding box.
fn fill_where(
    img: &mut RgbImage,
    min: Point,
    max: Point,
    color: Rgb<u8>,
    inside: impl Fn(f32, f32) -> bool,
) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let x0 = min.0.floor().max(0.0) as u32;
    let y0 = min.1.floor().max(0.0) as u32;
    let x1 = (max.0.ceil().max(0.0) as u32).min(w - 1);
    let y1 = (max.1.ceil().max(0.0) as u32).min(h - 1);
    for y in y0..=y1 {
        for x in x0..=x1 {
            if inside(x as f32, y as f32) {
                img.put_pixel(x, y, color);
            }
        }
    }
}

fn fill_circle(img: &mut RgbImage, center: Point, radius: f32, color: Rgb<u8>) {
    let (cx, cy) = center;
    fill_where(
        img,
        (cx - radius, cy - radius),
        (cx + radius, cy + radius),
        color,
        |x, y| (x - cx).powi(2) + (y - cy).powi(2) <= radius * radius,
    );
}

fn fill_triangle(img: &mut RgbImage, [a, b, p]: [Point; 3], color: Rgb<u8>) {
    let edge =
        |u: Point, v: Point, x: f32, y: f32| (v.0 - u.0) * (y - u.1) - (v.1 - u.1) * (x - u.0);
    fill_where(
        img,
        (a.0.min(b.0).min(p.0), a.1.min(b.1).min(p.1)),
        (a.0.max(b.0).max(p.0), a.1.max(b.1).max(p.1)),
        color,
        |x, y| {
            let e = [edge(a, b, x, y), edge(b, p, x, y), edge(p, a, x, y)];
            e.iter().all(|&v| v >= 0.0) || e.iter().all(|&v| v <= 0.0)
        },
    );
}

/// A straight stroke of `width` pixels between `from` and `to`.
fn stroke_line(img: &mut RgbImage, from: Point, to: Point, width: f32, color: Rgb<u8>) {
    let half = width / 2.0;
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let len_sq = dx * dx + dy * dy;
    fill_where(
        img,
        (from.0.min(to.0) - half, from.1.min(to.1) - half),
        (from.0.max(to.0) + half, from.1.max(to.1) + half),
        color,
        |x, y| {
            let t = if len_sq == 0.0 {
                0.0
            } else {
                (((x - from.0) * dx + (y - from.1) * dy) / len_sq).clamp(0.0, 1.0)
            };
            let (px, py) = (from.0 + t * dx, from.1 + t * dy);
            (x - px).powi(2) + (y - py).powi(2) <= half * half
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn png_has_requested_size() {
        let bytes = render_icon(192).unwrap();
        let img = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
        assert_eq!((img.width(), img.height()), (192, 192));
    }

    #[test]
    fn rendering_is_deterministic() {
        assert_eq!(render_icon(64).unwrap(), render_icon(64).unwrap());
    }

    #[test]
    fn zero_size_is_error() {
        assert!(matches!(render_icon(0), Err(IconError::ZeroSize)));
    }

    #[test]
    fn tiny_sizes_do_not_panic() {
        for size in 1..8 {
            assert_eq!(draw_icon(size).dimensions(), (size, size));
        }
    }

    #[test]
    fn features_at_192() {
        // center 96, face radius 67
        let img = draw_icon(192);
        assert_eq!(*img.get_pixel(0, 0), BLACK, "background");
        assert_eq!(*img.get_pixel(96, 146), WHITE, "lower face");
        assert_eq!(*img.get_pixel(96, 96), PINK, "nose");
        assert_eq!(*img.get_pixel(70, 83), BLACK, "left eye");
        assert_eq!(*img.get_pixel(122, 83), BLACK, "right eye");
        // Outside the face circle, inside the ears.
        assert_eq!(*img.get_pixel(54, 31), WHITE, "left ear");
        assert_eq!(*img.get_pixel(138, 31), WHITE, "right ear");
        // Between the ears, above the face.
        assert_eq!(*img.get_pixel(96, 20), BLACK);
    }

    #[test]
    fn face_is_symmetric_below_the_ears() {
        let img = draw_icon(512);
        let c = 256;
        for y in (140..512).step_by(7) {
            for d in (1..200).step_by(5) {
                assert_eq!(
                    img.get_pixel(c - d, y),
                    img.get_pixel(c + d, y),
                    "asymmetry at y={y} d={d}"
                );
            }
        }
    }

    #[test]
    fn mouth_stroke_is_at_least_two_pixels() {
        // At 192 the strokes run from the nose tip (96,115) to (63,121) and (129,121).
        let img = draw_icon(192);
        let dark_rows = (110..130)
            .filter(|&y| *img.get_pixel(80, y) == BLACK)
            .count();
        assert!(dark_rows >= 2, "got {dark_rows}");
    }

    #[test]
    fn export_writes_one_file_per_size() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("icons");

        let written = export_icons(&dir, &[192, 512]).unwrap();

        assert_eq!(written, vec![dir.join("icon-192.png"), dir.join("icon-512.png")]);
        let (w, h) = image::image_dimensions(dir.join("icon-512.png")).unwrap();
        assert_eq!((w, h), (512, 512));
    }
}
