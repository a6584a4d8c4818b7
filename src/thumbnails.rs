//! Square thumbnail batch.
//!
//! Produces the tiles for the site's background grid:
//!
//! ```text
//! albums/thumbnails/
//! ├── manifest.json          # ThumbnailManifest
//! ├── .cache-manifest.json   # content-hash cache
//! ├── Nohn_IMG_0001.jpg      # <album>_<stem>.jpg, 200×200
//! └── ぽんちょねこ_cat.jpg
//! ```
//!
//! ## Stages
//!
//! 1. Scan with the thumbnail allowlist and keep the configured albums.
//! 2. Read every candidate's dimensions in parallel and apply the
//!    [`OrientationPolicy`](crate::orientation::OrientationPolicy).
//! 3. Assign output names sequentially, in scan order, so collisions resolve
//!    the same way on every run.
//! 4. Produce admitted thumbnails in parallel: reuse, copy, or encode,
//!    depending on the cache.
//! 5. After all workers join, prune and save the cache and write the manifest.
//!
//! Per-file failures are logged, reported as events and counted. Only a
//! missing root, an album-less root, or a failed manifest write abort the run.

use crate::cache::{self, CacheManifest, CacheStats};
use crate::config::PipelineConfig;
use crate::imaging::{
    BackendError, ImageBackend, RustBackend, ThumbnailConfig, create_thumbnail, write_atomic,
};
use crate::manifest::{self, ManifestError, THUMBNAIL_MANIFEST_FILENAME, ThumbnailManifest};
use crate::naming::{ThumbnailNamer, normalize};
use crate::orientation::{Orientation, classify};
use crate::scan::{Album, ExtensionSet, ScanError, Scanner};
use crate::types::Tally;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("No albums found in {0}")]
    NoAlbums(PathBuf),
}

/// How a thumbnail came to exist in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailStatus {
    /// Existing output matched source and parameters.
    Cached,
    /// Copied from another output with the same content key.
    Copied,
    /// Decoded, cropped, resized, encoded.
    Encoded,
}

/// Progress reported while the batch runs.
#[derive(Debug, Clone)]
pub enum ThumbnailEvent {
    /// A name in `thumbnails.albums` matched no album directory.
    AlbumMissing { album: String },
    Produced {
        album: String,
        filename: String,
        output_name: String,
        status: ThumbnailStatus,
    },
    Skipped {
        album: String,
        filename: String,
        orientation: Orientation,
    },
    Failed {
        album: String,
        filename: String,
        error: String,
    },
}

/// One admitted source and the name it will be written under.
#[derive(Debug, Clone)]
pub struct ThumbnailJob {
    pub album: String,
    pub filename: String,
    pub stem: String,
    pub source: PathBuf,
    pub output_name: String,
}

/// A thumbnail present in the output directory after the run.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailAsset {
    pub album: String,
    pub stem: String,
    pub output_name: String,
    pub size_bytes: u64,
    pub status: ThumbnailStatus,
}

/// Everything a thumbnail run produced.
#[derive(Debug)]
pub struct ThumbnailRun {
    pub manifest: ThumbnailManifest,
    pub thumbnails: Vec<ThumbnailAsset>,
    pub tally: Tally,
    pub cache_stats: CacheStats,
}

pub fn generate_thumbnails(
    albums_root: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
    use_cache: bool,
    progress: Option<Sender<ThumbnailEvent>>,
) -> Result<ThumbnailRun, ThumbnailError> {
    let backend = RustBackend::new();
    generate_thumbnails_with_backend(&backend, albums_root, output_dir, config, use_cache, progress)
}

/// Run the batch with a specific backend (allows testing with mock).
pub fn generate_thumbnails_with_backend(
    backend: &impl ImageBackend,
    albums_root: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
    use_cache: bool,
    progress: Option<Sender<ThumbnailEvent>>,
) -> Result<ThumbnailRun, ThumbnailError> {
    let emit = |event: ThumbnailEvent| {
        if let Some(tx) = &progress {
            tx.send(event).ok();
        }
    };

    let scanner = Scanner::from_config(&config.scan)
        .with_extensions(ExtensionSet::new(&config.thumbnails.extensions));
    let albums = scanner.scan(albums_root)?;
    if albums.is_empty() {
        return Err(ThumbnailError::NoAlbums(albums_root.to_path_buf()));
    }
    let albums = select_albums(albums, &config.thumbnails.albums, &emit);
    std::fs::create_dir_all(output_dir)?;

    let candidates: Vec<_> = albums
        .iter()
        .flat_map(|album| album.images.iter().map(move |image| (album, image)))
        .collect();
    tracing::info!(candidates = candidates.len(), "classifying thumbnail sources");

    let orientations: Vec<Result<Orientation, BackendError>> = candidates
        .par_iter()
        .map(|(_, image)| classify(backend, image).map(|(orientation, _)| orientation))
        .collect();

    let mut tally = Tally::default();
    let mut namer = ThumbnailNamer::new();
    let mut jobs = Vec::new();
    for ((album, image), orientation) in candidates.iter().zip(orientations) {
        tally.processed += 1;
        match orientation {
            Ok(o) if config.thumbnails.orientation.admits(o) => jobs.push(ThumbnailJob {
                album: album.name.clone(),
                filename: image.filename.clone(),
                stem: image.stem.clone(),
                source: image.path.clone(),
                output_name: namer.claim(&album.name, &image.stem),
            }),
            Ok(o) => {
                tally.skipped += 1;
                emit(ThumbnailEvent::Skipped {
                    album: album.name.clone(),
                    filename: image.filename.clone(),
                    orientation: o,
                });
            }
            Err(e) => {
                tally.failed += 1;
                tracing::warn!(path = %image.path.display(), error = %e, "cannot read dimensions");
                emit(ThumbnailEvent::Failed {
                    album: album.name.clone(),
                    filename: image.filename.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let thumb_config = ThumbnailConfig::from(&config.thumbnails);
    let params_hash = cache::hash_thumbnail_params(thumb_config.size, thumb_config.quality.value());
    let mut cache = if use_cache {
        CacheManifest::load(output_dir)
    } else {
        CacheManifest::empty()
    };

    let results: Vec<Result<(ThumbnailStatus, u64, String), BackendError>> = jobs
        .par_iter()
        .map(|job| {
            let result = produce(backend, job, output_dir, &thumb_config, &params_hash, &cache);
            match &result {
                Ok((status, _, _)) => emit(ThumbnailEvent::Produced {
                    album: job.album.clone(),
                    filename: job.filename.clone(),
                    output_name: job.output_name.clone(),
                    status: *status,
                }),
                Err(e) => {
                    tracing::warn!(path = %job.source.display(), error = %e, "thumbnail failed");
                    emit(ThumbnailEvent::Failed {
                        album: job.album.clone(),
                        filename: job.filename.clone(),
                        error: e.to_string(),
                    });
                }
            }
            result
        })
        .collect();

    let mut stats = CacheStats::default();
    let mut thumbnails = Vec::new();
    for (job, result) in jobs.into_iter().zip(results) {
        let Ok((status, size_bytes, source_hash)) = result else {
            tally.failed += 1;
            continue;
        };
        tally.converted += 1;
        match status {
            ThumbnailStatus::Cached => stats.hit(),
            ThumbnailStatus::Copied => stats.copy(),
            ThumbnailStatus::Encoded => stats.miss(),
        }
        cache.insert(job.output_name.clone(), source_hash, params_hash.clone());
        thumbnails.push(ThumbnailAsset {
            album: job.album,
            stem: job.stem,
            output_name: job.output_name,
            size_bytes,
            status,
        });
    }

    let live: HashSet<String> = thumbnails.iter().map(|t| t.output_name.clone()).collect();
    cache.prune(&live);
    if let Err(e) = cache.save(output_dir) {
        tracing::warn!(dir = %output_dir.display(), error = %e, "could not save thumbnail cache");
    }

    let total_bytes = thumbnails.iter().map(|t| t.size_bytes).sum();
    let manifest = ThumbnailManifest::new(
        thumbnails.iter().map(|t| t.output_name.clone()).collect(),
        thumb_config.size,
        total_bytes,
    );
    manifest::write_json(&manifest, &output_dir.join(THUMBNAIL_MANIFEST_FILENAME))?;
    tracing::info!(count = manifest.count, cache = %stats, "thumbnail manifest written");

    Ok(ThumbnailRun {
        manifest,
        thumbnails,
        tally,
        cache_stats: stats,
    })
}

/// Keep the albums named in `wanted`, or all of them when it is empty.
fn select_albums(
    albums: Vec<Album>,
    wanted: &[String],
    emit: &impl Fn(ThumbnailEvent),
) -> Vec<Album> {
    if wanted.is_empty() {
        return albums;
    }
    let wanted: Vec<String> = wanted.iter().map(|n| normalize(n)).collect();
    for name in &wanted {
        if !albums.iter().any(|a| &a.name == name) {
            tracing::warn!(album = %name, "configured thumbnail album not found");
            emit(ThumbnailEvent::AlbumMissing {
                album: name.clone(),
            });
        }
    }
    albums
        .into_iter()
        .filter(|a| wanted.contains(&a.name))
        .collect()
}

/// Make `job.output_name` exist in `output_dir`.
///
/// Returns the status, the output size, and the source hash for the cache.
fn produce(
    backend: &impl ImageBackend,
    job: &ThumbnailJob,
    output_dir: &Path,
    config: &ThumbnailConfig,
    params_hash: &str,
    cache: &CacheManifest,
) -> Result<(ThumbnailStatus, u64, String), BackendError> {
    let source_hash = cache::hash_file(&job.source)?;
    let output = output_dir.join(&job.output_name);

    match cache.find_cached(&source_hash, params_hash, &job.output_name, output_dir) {
        Some(stored) if stored == job.output_name => {
            tracing::debug!(output = %job.output_name, "cache hit");
            let bytes = std::fs::metadata(&output)?.len();
            Ok((ThumbnailStatus::Cached, bytes, source_hash))
        }
        Some(stored) => {
            tracing::debug!(from = %stored, to = %job.output_name, "cache copy");
            let bytes = std::fs::read(output_dir.join(&stored))?;
            write_atomic(&output, &bytes)?;
            Ok((ThumbnailStatus::Copied, bytes.len() as u64, source_hash))
        }
        None => {
            let bytes = create_thumbnail(backend, &job.source, output_dir, &job.output_name, config)?;
            Ok((ThumbnailStatus::Encoded, bytes, source_hash))
        }
    }
}
