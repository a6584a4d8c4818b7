//! JSON manifests consumed by the album site.
//!
//! Two documents with two schemas, written separately:
//!
//! - **Catalog** (`data/images.json`): every album and its image files.
//!   ```json
//!   {
//!     "Nohn": ["IMG_0001.jpg", "IMG_0002.webp"],
//!     "ぽんちょねこ": ["cat.png"]
//!   }
//!   ```
//! - **Thumbnails** (`<thumbnails>/manifest.json`): the square tiles for the
//!   background grid.
//!   ```json
//!   {
//!     "images": ["Nohn_IMG_0001.jpg"],
//!     "count": 1,
//!     "size": "200x200",
//!     "format": "JPEG",
//!     "total_size_mb": 0.02
//!   }
//!   ```
//!
//! Both are written with [`write_json`]: 2-space indentation, non-ASCII kept
//! literal, serialized fully in memory and renamed over the destination, so a
//! reader never sees half a document.

use crate::config::ScanConfig;
use crate::imaging::round_mebibytes;
use crate::scan::{Album, ScanError, Scanner};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Catalog file name inside the data directory.
pub const CATALOG_FILENAME: &str = "images.json";
/// Thumbnail manifest file name inside the thumbnail directory.
pub const THUMBNAIL_MANIFEST_FILENAME: &str = "manifest.json";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("No albums found in {0}")]
    NoAlbums(PathBuf),
}

/// Album name → image file names, both NFC, both sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogManifest(BTreeMap<String, Vec<String>>);

impl CatalogManifest {
    pub fn album_count(&self) -> usize {
        self.0.len()
    }

    pub fn image_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn get(&self, album: &str) -> Option<&[String]> {
        self.0.get(album).map(Vec::as_slice)
    }

    pub fn albums(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Build the catalog from scanned albums.
///
/// Directories whose names differ only in Unicode normalization land under one
/// key with their file lists merged.
pub fn build_catalog(albums: &[Album]) -> CatalogManifest {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for album in albums {
        map.entry(album.name.clone())
            .or_default()
            .extend(album.images.iter().map(|i| i.filename.clone()));
    }
    for files in map.values_mut() {
        files.sort();
        files.dedup();
    }
    CatalogManifest(map)
}

/// Scan `albums_root` and build its catalog. Zero albums is an error.
pub fn generate_catalog(
    albums_root: &Path,
    scanner: &Scanner,
) -> Result<CatalogManifest, ManifestError> {
    let albums = scanner.scan(albums_root)?;
    if albums.is_empty() {
        return Err(ManifestError::NoAlbums(albums_root.to_path_buf()));
    }
    Ok(build_catalog(&albums))
}

/// Rescan `albums_root` and rewrite the catalog at `output`.
pub fn regenerate_catalog(
    albums_root: &Path,
    output: &Path,
    config: &ScanConfig,
) -> Result<CatalogManifest, ManifestError> {
    let catalog = generate_catalog(albums_root, &Scanner::from_config(config))?;
    write_json(&catalog, output)?;
    tracing::info!(
        path = %output.display(),
        albums = catalog.album_count(),
        images = catalog.image_count(),
        "catalog written"
    );
    Ok(catalog)
}

/// The thumbnail grid document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailManifest {
    pub images: Vec<String>,
    pub count: usize,
    pub size: String,
    pub format: String,
    pub total_size_mb: f64,
}

impl ThumbnailManifest {
    pub fn new(images: Vec<String>, edge: u32, total_bytes: u64) -> Self {
        Self {
            count: images.len(),
            images,
            size: format!("{edge}x{edge}"),
            format: "JPEG".to_string(),
            total_size_mb: round_mebibytes(total_bytes),
        }
    }
}

/// Serialize `document` and atomically replace `path` with it.
///
/// Parent directories are created as needed.
pub fn write_json<T: Serialize>(document: &T, path: &Path) -> Result<(), ManifestError> {
    let json = serde_json::to_string_pretty(document)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".manifest-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| ManifestError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ImageAsset;
    use std::fs;
    use tempfile::TempDir;

    fn album(name: &str, files: &[&str]) -> Album {
        Album {
            name: name.to_string(),
            path: PathBuf::from(name),
            images: files
                .iter()
                .map(|f| ImageAsset {
                    filename: f.to_string(),
                    stem: f.rsplit_once('.').map(|(s, _)| s).unwrap_or(f).to_string(),
                    extension: f.rsplit_once('.').map(|(_, e)| e).unwrap_or("").to_string(),
                    path: PathBuf::from(name).join(f),
                })
                .collect(),
        }
    }

    #[test]
    fn catalog_maps_album_to_files() {
        let catalog = build_catalog(&[album("A", &["1.jpg", "2.png"]), album("B", &[])]);
        assert_eq!(catalog.get("A"), Some(&["1.jpg".to_string(), "2.png".to_string()][..]));
        assert!(catalog.get("B").unwrap().is_empty());
        assert_eq!(catalog.album_count(), 2);
        assert_eq!(catalog.image_count(), 2);
    }

    #[test]
    fn equivalent_album_names_merge() {
        // Two on-disk directories that both normalized to "ぽ".
        let catalog = build_catalog(&[
            album("\u{307D}", &["b.jpg", "a.jpg"]),
            album("\u{307D}", &["a.jpg", "c.jpg"]),
        ]);
        assert_eq!(catalog.album_count(), 1);
        assert_eq!(
            catalog.get("\u{307D}").unwrap(),
            &["a.jpg", "b.jpg", "c.jpg"].map(String::from)[..]
        );
    }

    #[test]
    fn catalog_json_is_indented_and_literal() {
        let catalog = build_catalog(&[album("\u{307D}んちょねこ", &["猫.png"])]);
        let json = serde_json::to_string_pretty(&catalog).unwrap();
        assert_eq!(json, "{\n  \"ぽんちょねこ\": [\n    \"猫.png\"\n  ]\n}");
    }

    #[test]
    fn thumbnail_manifest_fields() {
        let m = ThumbnailManifest::new(vec!["A_cat.jpg".into(), "B_cat.jpg".into()], 200, 20_971);
        assert_eq!(m.count, 2);
        assert_eq!(m.size, "200x200");
        assert_eq!(m.format, "JPEG");
        assert_eq!(m.total_size_mb, 0.02);

        let json = serde_json::to_value(&m).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        for key in ["images", "count", "size", "format", "total_size_mb"] {
            assert!(keys.contains(&key.to_string()), "missing {key}");
        }
    }

    #[test]
    fn empty_thumbnail_manifest() {
        let m = ThumbnailManifest::new(Vec::new(), 200, 0);
        assert_eq!(m.count, 0);
        assert_eq!(m.total_size_mb, 0.0);
    }

    #[test]
    fn write_json_creates_parent_and_replaces() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data/images.json");

        write_json(&build_catalog(&[album("A", &["1.jpg"])]), &path).unwrap();
        write_json(&build_catalog(&[album("B", &["2.jpg"])]), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"B\""));
        assert!(!content.contains("\"A\""));
        // No stray temp files left behind.
        assert_eq!(fs::read_dir(tmp.path().join("data")).unwrap().count(), 1);
    }

    #[test]
    fn write_json_failure_keeps_old_document() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("images.json");
        fs::write(&path, "{\"old\": []}").unwrap();

        // A directory where the parent should be makes the write fail.
        let blocked = tmp.path().join("images.json/child.json");
        assert!(write_json(&CatalogManifest::default(), &blocked).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"old\": []}");
    }

    #[test]
    fn generate_catalog_missing_root_is_scan_error() {
        let result = generate_catalog(Path::new("/nonexistent/albums"), &Scanner::default());
        assert!(matches!(
            result,
            Err(ManifestError::Scan(ScanError::DirectoryNotFound(_)))
        ));
    }

    #[test]
    fn generate_catalog_without_albums_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("stray.jpg"), "x").unwrap();
        let result = generate_catalog(tmp.path(), &Scanner::default());
        assert!(matches!(result, Err(ManifestError::NoAlbums(_))));
    }

    #[test]
    fn regenerate_catalog_writes_nothing_on_error() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("data/images.json");
        let result = regenerate_catalog(
            &tmp.path().join("missing"),
            &out,
            &ScanConfig::default(),
        );
        assert!(result.is_err());
        assert!(!out.exists());
    }
}
