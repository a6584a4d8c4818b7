//! # album-assets
//!
//! Asset pipeline for a static photo-album site. The album directory is the
//! data source: each subdirectory is an album, each image file in it a photo.
//! The pipeline derives everything the site needs from that tree:
//!
//! ```text
//! albums/                         data/
//! ├── config.toml                 └── images.json        catalog
//! ├── Nohn/
//! │   ├── IMG_0001.jpg
//! │   ├── IMG_0002.webp           ← converted from HEIC
//! │   └── .heic_archive/
//! │       └── IMG_0002.HEIC       ← original, moved aside
//! ├── ぽんちょねこ/
//! │   └── cat.png
//! └── thumbnails/
//!     ├── manifest.json           thumbnail manifest
//!     ├── Nohn_IMG_0001.jpg       200×200 square tiles
//!     └── ぽんちょねこ_cat.jpg
//! ```
//!
//! # Stages
//!
//! Every stage starts from a fresh scan of the album root and can run on its
//! own:
//!
//! - **manifest**: album → file list, written to `data/images.json`.
//! - **thumbnails**: center-cropped square JPEGs of portrait photos plus their
//!   manifest, cached by content hash.
//! - **convert**: HEIC/HEIF → WebP with EXIF carried over; originals archived;
//!   the catalog is regenerated afterwards.
//! - **icons**: the app icon PNGs.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | Unicode NFC normalization and thumbnail output names |
//! | [`scan`] | Album discovery with hidden/excluded filtering and extension allowlists |
//! | [`orientation`] | Portrait / landscape / square classification and the thumbnail policy |
//! | [`imaging`] | Decoding, cropping, resizing, JPEG and WebP encoding, EXIF muxing |
//! | [`cache`] | Content-hash cache that lets thumbnail re-runs skip encoding |
//! | [`thumbnails`] | The thumbnail batch |
//! | [`convert`] | The HEIC → WebP batch and original archiving |
//! | [`manifest`] | Catalog and thumbnail documents, atomic JSON writes |
//! | [`icons`] | App icon rasterization |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//! | [`types`] | Shared result counters |
//! | [`output`] | CLI output formatting |
//!
//! # Names
//!
//! Album and file names are compared, sorted and written in Unicode NFC. A
//! directory created on macOS (decomposed) and one synced from Linux
//! (precomposed) end up under the same catalog key and produce the same
//! thumbnail names.
//!
//! # Failure Policy
//!
//! A missing album root, a root without albums, an invalid config, or a failed
//! manifest write stops the command. Anything that goes wrong with a single
//! file is logged, reported and counted, and the batch continues.

pub mod cache;
pub mod config;
pub mod convert;
pub mod icons;
pub mod imaging;
pub mod manifest;
pub mod naming;
pub mod orientation;
pub mod output;
pub mod scan;
pub mod thumbnails;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
