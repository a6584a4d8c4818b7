//! Album discovery.
//!
//! First stage of every pipeline run. Walks the album root one level deep for
//! albums and each album one level deep for images:
//!
//! ```text
//! albums/                     # album root
//! ├── config.toml             # pipeline configuration (optional)
//! ├── Nohn/                   # album
//! │   ├── IMG_0001.jpg
//! │   ├── IMG_0002.HEIC       # matched case-insensitively
//! │   └── .heic_archive/      # hidden: never scanned
//! ├── ぽんちょねこ/            # album (name normalized to NFC)
//! │   └── cat.png
//! ├── thumbnails/             # excluded by name
//! └── .git/                   # hidden
//! ```
//!
//! ## Rules
//!
//! - Entries starting with the hidden prefix (default `.`) are skipped at both
//!   levels; so are album-level names in the `exclude` list.
//! - Only directories become albums. Symlinks are followed.
//! - Only regular files whose extension is in the active [`ExtensionSet`]
//!   become images. Extension matching is case-insensitive.
//! - Album and file names are normalized to NFC; albums and images are sorted
//!   by normalized name so every consumer sees the same order on every run.
//!
//! Dimensions are not read here. Stages that need them ask the
//! [`ImageBackend`](crate::imaging::ImageBackend) lazily.

use crate::config::ScanConfig;
use crate::naming::{self, normalize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Album directory not found: {0}")]
    DirectoryNotFound(PathBuf),
}

/// A set of lowercase file extensions, without the leading dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSet(BTreeSet<String>);

impl ExtensionSet {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.0.contains(&extension.to_lowercase())
    }

    /// Lowercase extension of `path` if it belongs to the set.
    pub fn match_path(&self, path: &Path) -> Option<String> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        self.0.contains(&ext).then_some(ext)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// A directory of images, one level below the album root.
#[derive(Debug, Clone, PartialEq)]
pub struct Album {
    /// Directory name, NFC.
    pub name: String,
    pub path: PathBuf,
    /// Sorted by normalized filename.
    pub images: Vec<ImageAsset>,
}

/// One image file inside an album.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    /// Full filename, NFC.
    pub filename: String,
    /// Filename without extension, NFC.
    pub stem: String,
    /// Lowercase extension.
    pub extension: String,
    pub path: PathBuf,
}

/// Configured album scanner.
#[derive(Debug, Clone)]
pub struct Scanner {
    hidden_prefix: String,
    exclude: BTreeSet<String>,
    extensions: ExtensionSet,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

impl Scanner {
    /// Scanner for the catalog allowlist in `config`.
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            hidden_prefix: config.hidden_prefix.clone(),
            exclude: config.exclude.iter().map(|n| normalize(n)).collect(),
            extensions: ExtensionSet::new(&config.extensions),
        }
    }

    /// Same filtering rules, different image allowlist.
    pub fn with_extensions(mut self, extensions: ExtensionSet) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn extensions(&self) -> &ExtensionSet {
        &self.extensions
    }

    /// Enumerate the albums under `root`.
    pub fn scan(&self, root: &Path) -> Result<Vec<Album>, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound(root.to_path_buf()));
        }

        let mut albums = Vec::new();
        for entry in self.children(root) {
            let Some(entry) = skip_unreadable(entry)? else {
                continue;
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let name = normalize(&entry.file_name().to_string_lossy());
            if self.exclude.contains(&name) {
                continue;
            }
            let images = self.scan_album(entry.path());
            albums.push(Album {
                name,
                path: entry.into_path(),
                images,
            });
        }

        // Ties only happen for names that differ before normalization.
        albums.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
        Ok(albums)
    }

    /// Images of one album. An unreadable album directory yields no images.
    fn scan_album(&self, dir: &Path) -> Vec<ImageAsset> {
        let mut images = Vec::new();
        for entry in self.children(dir) {
            let entry = match skip_unreadable(entry) {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(album = %dir.display(), error = %e, "cannot read album");
                    break;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(extension) = self.extensions.match_path(entry.path()) else {
                continue;
            };
            let filename = normalize(&entry.file_name().to_string_lossy());
            let stem = entry
                .path()
                .file_stem()
                .map(|s| normalize(&s.to_string_lossy()))
                .unwrap_or_default();
            images.push(ImageAsset {
                filename,
                stem,
                extension,
                path: entry.into_path(),
            });
        }
        images.sort_by(|a, b| a.filename.cmp(&b.filename).then_with(|| a.path.cmp(&b.path)));
        images
    }

    /// Direct, non-hidden children of `dir`, following symlinks.
    fn children(&self, dir: &Path) -> impl Iterator<Item = walkdir::Result<walkdir::DirEntry>> {
        let prefix = self.hidden_prefix.clone();
        WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_entry(move |e| !naming::is_hidden(&e.file_name().to_string_lossy(), &prefix))
    }
}

/// Unwrap a walk entry. Errors below the walked directory (dangling symlinks,
/// unreadable children) are logged and skipped; an error on the directory
/// itself is returned.
fn skip_unreadable(
    entry: walkdir::Result<walkdir::DirEntry>,
) -> Result<Option<walkdir::DirEntry>, ScanError> {
    match entry {
        Ok(entry) => Ok(Some(entry)),
        Err(e) if e.depth() == 0 => Err(e.into()),
        Err(e) => {
            let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
            tracing::warn!(path = %path, error = %e, "skipping unreadable entry");
            Ok(None)
        }
    }
}

/// Scan `root` with the stock catalog rules.
pub fn scan(root: &Path) -> Result<Vec<Album>, ScanError> {
    Scanner::default().scan(root)
}
