//! Production image backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP, GIF) | `image` crate decoders |
//! | Decode (HEIC, HEIF) | `libheif-rs` behind the `heif` feature ([`heif`](super::heif)) |
//! | EXIF extraction | `ImageDecoder::exif_metadata` / libheif metadata blocks |
//! | Crop + resize | `image::imageops::crop_imm` + `resize` with `Lanczos3` |
//! | Encode → JPEG | `jpeg-encoder` (baseline, optimized Huffman tables) |
//! | Encode → WebP | `webp` (libwebp, lossy, configurable method) |
//! | EXIF → WebP | [`webp_mux`](super::webp_mux) |
//!
//! Every output is encoded fully in memory, written to a temporary sibling and
//! renamed into place, so a failure never leaves a truncated file behind.

use super::backend::{BackendError, Dimensions, ImageBackend, TranscodeReport};
use super::calculations::center_square_crop;
use super::heif;
use super::params::{Quality, ThumbnailParams, TranscodeParams, WebpMethod};
use super::webp_mux;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, RgbImage};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;

/// How a registered extension is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    Image(ImageFormat),
    Heif,
}

/// Extensions the backend can decode, resolved once per process.
#[derive(Debug)]
pub struct DecoderRegistry {
    by_extension: BTreeMap<&'static str, DecoderKind>,
}

const IMAGE_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("webp", ImageFormat::WebP),
    ("gif", ImageFormat::Gif),
];

impl DecoderRegistry {
    fn detect() -> Self {
        let mut by_extension: BTreeMap<&'static str, DecoderKind> = IMAGE_CANDIDATES
            .iter()
            .filter(|(_, fmt)| fmt.reading_enabled())
            .map(|&(ext, fmt)| (ext, DecoderKind::Image(fmt)))
            .collect();
        // Always routed; heif::decode reports a missing feature per file.
        by_extension.insert("heic", DecoderKind::Heif);
        by_extension.insert("heif", DecoderKind::Heif);
        tracing::debug!(
            extensions = ?by_extension.keys().collect::<Vec<_>>(),
            heif = cfg!(feature = "heif"),
            "decoders registered"
        );
        Self { by_extension }
    }

    pub fn lookup(&self, path: &Path) -> Option<DecoderKind> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.by_extension.get(ext.as_str()).copied()
    }

    pub fn extensions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_extension.keys().copied()
    }
}

static REGISTRY: OnceLock<DecoderRegistry> = OnceLock::new();

/// Register the decoders for this process. Idempotent; every call returns
/// the same registry.
pub fn register_decoders() -> &'static DecoderRegistry {
    REGISTRY.get_or_init(DecoderRegistry::detect)
}

/// A decoded image plus its raw EXIF (TIFF) bytes, if the source had any.
#[derive(Debug)]
pub struct Decoded {
    pub image: DynamicImage,
    pub exif: Option<Vec<u8>>,
}

/// Backend built on the `image` crate plus dedicated JPEG and WebP encoders.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    registry: &'static DecoderRegistry,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            registry: register_decoders(),
        }
    }

    fn kind(&self, path: &Path) -> Result<DecoderKind, BackendError> {
        self.registry
            .lookup(path)
            .ok_or_else(|| BackendError::decode(path, "no decoder registered for this extension"))
    }

    fn load(&self, path: &Path) -> Result<Decoded, BackendError> {
        match self.kind(path)? {
            DecoderKind::Heif => heif::decode(path),
            DecoderKind::Image(format) => decode_with_image(path, format),
        }
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_with_image(path: &Path, format: ImageFormat) -> Result<Decoded, BackendError> {
    let mut reader = ImageReader::open(path)?;
    reader.set_format(format);
    // Content sniffing wins over the extension when they disagree.
    let reader = reader.with_guessed_format()?;
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| BackendError::decode(path, e))?;
    let exif = decoder
        .exif_metadata()
        .map_err(|e| BackendError::decode(path, e))?
        .map(strip_exif_header)
        .filter(|e| !e.is_empty());
    let image = DynamicImage::from_decoder(decoder).map_err(|e| BackendError::decode(path, e))?;
    Ok(Decoded { image, exif })
}

/// Drop a leading `Exif\0\0` (JPEG APP1 style) so only TIFF bytes remain.
fn strip_exif_header(mut exif: Vec<u8>) -> Vec<u8> {
    const HEADER: &[u8] = b"Exif\0\0";
    if exif.starts_with(HEADER) {
        exif.drain(..HEADER.len());
    }
    exif
}

/// libwebp only takes 8-bit RGB or RGBA.
fn to_webp_input(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image,
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

fn encode_jpeg(image: &RgbImage, quality: Quality, path: &Path) -> Result<Vec<u8>, BackendError> {
    let (w, h) = image.dimensions();
    let (w, h) = match (u16::try_from(w), u16::try_from(h)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => return Err(BackendError::encode(path, "JPEG dimensions exceed 65535")),
    };
    let mut out = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut out, quality.value() as u8);
    encoder.set_optimized_huffman_tables(true);
    encoder
        .encode(image.as_raw(), w, h, jpeg_encoder::ColorType::Rgb)
        .map_err(|e| BackendError::encode(path, e))?;
    Ok(out)
}

fn encode_webp(
    image: &DynamicImage,
    quality: Quality,
    method: WebpMethod,
    path: &Path,
) -> Result<Vec<u8>, BackendError> {
    let encoder = match image {
        DynamicImage::ImageRgb8(rgb) => webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height()),
        DynamicImage::ImageRgba8(rgba) => {
            webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
        }
        _ => return Err(BackendError::encode(path, "WebP input must be RGB8 or RGBA8")),
    };
    let mut config = libwebp_sys::WebPConfig::new()
        .map_err(|_| BackendError::encode(path, "libwebp version mismatch"))?;
    config.lossless = 0;
    config.quality = quality.value() as f32;
    config.method = method.value() as i32;
    let memory = encoder
        .encode_advanced(&config)
        .map_err(|e| BackendError::encode(path, format!("{e:?}")))?;
    Ok(memory.to_vec())
}

/// Write `bytes` to `path` through a temporary file in the same directory.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), BackendError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".partial-")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| BackendError::Io(e.error))?;
    Ok(())
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        match self.kind(path)? {
            DecoderKind::Heif => heif::identify(path),
            DecoderKind::Image(_) => {
                let (width, height) =
                    image::image_dimensions(path).map_err(|e| BackendError::decode(path, e))?;
                Ok(Dimensions { width, height })
            }
        }
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<u64, BackendError> {
        let Decoded { image, .. } = self.load(&params.source)?;
        // Alpha, palette and grey all flatten to opaque RGB.
        let rgb = image.to_rgb8();
        let crop = center_square_crop(rgb.width(), rgb.height());
        if crop.side == 0 {
            return Err(BackendError::decode(&params.source, "image has no pixels"));
        }
        let square = imageops::crop_imm(&rgb, crop.left, crop.top, crop.side, crop.side).to_image();
        let resized = imageops::resize(&square, params.size, params.size, FilterType::Lanczos3);

        let bytes = encode_jpeg(&resized, params.quality, &params.output)?;
        write_atomic(&params.output, &bytes)?;
        Ok(bytes.len() as u64)
    }

    fn transcode(&self, params: &TranscodeParams) -> Result<TranscodeReport, BackendError> {
        let Decoded { image, exif } = self.load(&params.source)?;
        let image = to_webp_input(image);
        let encoded = encode_webp(&image, params.quality, params.method, &params.output)?;

        let (bytes, exif) = match exif {
            Some(exif) => (
                webp_mux::embed_exif(&encoded, &exif)
                    .map_err(|e| BackendError::encode(&params.output, e))?,
                true,
            ),
            None => (encoded, false),
        };
        write_atomic(&params.output, &bytes)?;
        Ok(TranscodeReport {
            bytes: bytes.len() as u64,
            exif,
        })
    }
}
