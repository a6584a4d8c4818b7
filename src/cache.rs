//! Thumbnail cache for idempotent re-runs.
//!
//! Decoding a full-size photo and running a Lanczos resize is by far the most
//! expensive thing the thumbnail stage does. This module lets the stage skip
//! that work when neither the source image nor the encoding parameters changed
//! since the last run.
//!
//! ## Cache keys
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Content-based
//!   rather than mtime-based so it survives `git checkout` (which resets
//!   modification times).
//! - **`params_hash`**: SHA-256 of the encoding parameters (edge size, JPEG
//!   quality). Changing either in `config.toml` re-encodes every thumbnail.
//!
//! Entries are keyed by output name (`<album>_<stem>.jpg`). A lookup prefers
//! the entry for the caller's own output name; failing that, any entry with the
//! same content key is returned so a renamed album copies its old thumbnails
//! instead of re-encoding them. Either way the stored file must still exist.
//!
//! ## Storage
//!
//! `<thumbnail_dir>/.cache-manifest.json`. The leading dot keeps it out of
//! every scan. Entries for outputs a run no longer produces are dropped with
//! [`CacheManifest::prune`] before saving.
//!
//! ## Bypassing the cache
//!
//! `--no-cache` starts from [`CacheManifest::empty`], so every thumbnail is
//! re-encoded and the old files are overwritten.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Name of the cache manifest file within the thumbnail directory.
const MANIFEST_FILENAME: &str = ".cache-manifest.json";

/// Version of the cache manifest format. Bump this to invalidate all
/// existing caches when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// A single cached output file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// On-disk cache manifest mapping output names to their cache entries.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: BTreeMap<String, CacheEntry>,
    /// Runtime reverse index: `"{source_hash}:{params_hash}"` → output name.
    /// Built at load time, maintained on insert. Never serialized.
    #[serde(skip)]
    content_index: HashMap<String, String>,
}

fn content_key(source_hash: &str, params_hash: &str) -> String {
    format!("{}:{}", source_hash, params_hash)
}

impl CacheManifest {
    /// Create an empty manifest (used for `--no-cache` or the first run).
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
            content_index: HashMap::new(),
        }
    }

    /// Load from the thumbnail directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(output_dir: &Path) -> Self {
        let path = manifest_path(output_dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let mut manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "ignoring unreadable cache manifest");
                return Self::empty();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest.rebuild_index();
        manifest
    }

    /// Save to the thumbnail directory. The file is replaced atomically.
    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".cache-manifest-")
            .tempfile_in(output_dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(manifest_path(output_dir)).map_err(|e| e.error)?;
        Ok(())
    }

    /// Look up a cached output by content hashes.
    ///
    /// Returns the stored output name if a matching entry exists **and** its
    /// file is still on disk. `output_name` itself is preferred; any other
    /// name means the caller has to copy that file into place.
    pub fn find_cached(
        &self,
        source_hash: &str,
        params_hash: &str,
        output_name: &str,
        output_dir: &Path,
    ) -> Option<String> {
        let own = self.entries.get(output_name).filter(|e| {
            e.source_hash == source_hash && e.params_hash == params_hash
        });
        let stored = match own {
            Some(_) => output_name,
            None => self
                .content_index
                .get(&content_key(source_hash, params_hash))?
                .as_str(),
        };
        output_dir
            .join(stored)
            .is_file()
            .then(|| stored.to_string())
    }

    /// Record a cache entry for an output file.
    pub fn insert(&mut self, output_name: String, source_hash: String, params_hash: String) {
        self.content_index.insert(
            content_key(&source_hash, &params_hash),
            output_name.clone(),
        );
        self.entries.insert(
            output_name,
            CacheEntry {
                source_hash,
                params_hash,
            },
        );
    }

    /// Drop entries whose output name is not in `live`.
    pub fn prune(&mut self, live: &HashSet<String>) {
        self.entries.retain(|name, _| live.contains(name));
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.content_index = self
            .entries
            .iter()
            .map(|(name, entry)| {
                (
                    content_key(&entry.source_hash, &entry.params_hash),
                    name.clone(),
                )
            })
            .collect();
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// SHA-256 hash of the thumbnail encoding parameters.
pub fn hash_thumbnail_params(size: u32, quality: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"square-jpeg\0");
    hasher.update(size.to_le_bytes());
    hasher.update(quality.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Summary of cache performance for a thumbnail run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub copies: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn copy(&mut self) {
        self.copies += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.copies + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.hits, self.copies) {
            (0, 0) => write!(f, "{} encoded", self.misses),
            (_, 0) => write!(
                f,
                "{} cached, {} encoded ({} total)",
                self.hits,
                self.misses,
                self.total()
            ),
            _ => write!(
                f,
                "{} cached, {} copied, {} encoded ({} total)",
                self.hits,
                self.copies,
                self.misses,
                self.total()
            ),
        }
    }
}

/// Resolve the cache manifest path for a thumbnail directory.
pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}
