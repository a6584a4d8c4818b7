//! Legacy-format conversion.
//!
//! Turns every HEIC/HEIF photo in every album into a lossy WebP next to it and
//! moves the original out of the way:
//!
//! ```text
//! Nohn/IMG_0002.HEIC  →  Nohn/IMG_0002.webp
//!                        Nohn/.heic_archive/IMG_0002.HEIC
//! ```
//!
//! The run has two halves. [`plan_conversion`] only scans and counts, which is
//! what `convert` prints without `--yes`. [`convert_all`] executes a plan on the
//! worker pool. The batch is not transactional: each file ends up in exactly
//! one of three states ([`FileOutcome`]) and the rest of the batch carries on.
//!
//! Two sources with the same stem in one album (`IMG.heic`, `IMG.HEIF`) would
//! share one output. The first in scan order keeps it; the others are planned
//! as [`Collision`]s and fail without being touched.
//!
//! When at least one WebP was written the catalog is regenerated at the end so
//! it lists the new files instead of the archived originals.

use crate::config::PipelineConfig;
use crate::imaging::{
    ImageBackend, RustBackend, TranscodeConfig, register_decoders, transcode_to_webp, webp_sibling,
};
use crate::manifest::{self, CatalogManifest, ManifestError};
use crate::scan::{ExtensionSet, ImageAsset, ScanError, Scanner};
use crate::types::Tally;
use rayon::prelude::*;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("No albums found in {0}")]
    NoAlbums(PathBuf),
}

/// Moving an original into the archive failed.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("archive destination already exists: {}", .0.display())]
    Exists(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sources to convert in one album.
#[derive(Debug, Clone)]
pub struct PlannedAlbum {
    pub name: String,
    pub path: PathBuf,
    pub sources: Vec<ImageAsset>,
    pub collisions: Vec<Collision>,
}

/// A source whose WebP output is already claimed by an earlier source.
#[derive(Debug, Clone)]
pub struct Collision {
    pub source: ImageAsset,
    /// Filename of the source that keeps the output.
    pub claimed_by: String,
}

impl Collision {
    pub fn error(&self) -> String {
        format!(
            "{} is already the output of {}",
            webp_sibling(Path::new(&self.source.filename)).display(),
            self.claimed_by
        )
    }
}

/// What a conversion run would touch. Only albums with sources are listed.
#[derive(Debug, Clone, Default)]
pub struct ConversionPlan {
    pub albums: Vec<PlannedAlbum>,
}

impl ConversionPlan {
    pub fn total(&self) -> usize {
        self.albums
            .iter()
            .map(|a| a.sources.len() + a.collisions.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Final state of one source file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// WebP written and original archived.
    Converted { output: PathBuf, exif: bool },
    /// WebP written; the original could not be archived and is still in place.
    Partial { output: PathBuf, error: String },
    /// Nothing written.
    Failed { error: String },
}

#[derive(Debug, Clone)]
pub struct ConvertEvent {
    pub album: String,
    pub filename: String,
    pub outcome: FileOutcome,
}

#[derive(Debug)]
pub struct ConvertRun {
    pub tally: Tally,
    pub outcomes: Vec<(PathBuf, FileOutcome)>,
    /// The regenerated catalog, when anything was written.
    pub catalog: Option<CatalogManifest>,
}

/// Scan `albums_root` for conversion sources without touching anything.
pub fn plan_conversion(
    albums_root: &Path,
    config: &PipelineConfig,
) -> Result<ConversionPlan, ConvertError> {
    let scanner = Scanner::from_config(&config.scan)
        .with_extensions(ExtensionSet::new(&config.convert.extensions));
    let albums = scanner.scan(albums_root)?;
    if albums.is_empty() {
        return Err(ConvertError::NoAlbums(albums_root.to_path_buf()));
    }

    let albums = albums
        .into_iter()
        .filter(|a| !a.images.is_empty())
        .map(|a| {
            let (sources, collisions) = split_collisions(a.images);
            PlannedAlbum {
                name: a.name,
                path: a.path,
                sources,
                collisions,
            }
        })
        .collect();
    Ok(ConversionPlan { albums })
}

/// Keep the first source for each output path, in scan order.
fn split_collisions(images: Vec<ImageAsset>) -> (Vec<ImageAsset>, Vec<Collision>) {
    let mut owners: HashMap<PathBuf, String> = HashMap::new();
    let mut sources = Vec::new();
    let mut collisions = Vec::new();
    for image in images {
        match owners.entry(webp_sibling(&image.path)) {
            Entry::Occupied(owner) => collisions.push(Collision {
                claimed_by: owner.get().clone(),
                source: image,
            }),
            Entry::Vacant(slot) => {
                slot.insert(image.filename.clone());
                sources.push(image);
            }
        }
    }
    (sources, collisions)
}

pub fn convert_all(
    plan: &ConversionPlan,
    albums_root: &Path,
    catalog_path: &Path,
    config: &PipelineConfig,
    progress: Option<Sender<ConvertEvent>>,
) -> Result<ConvertRun, ConvertError> {
    register_decoders();
    let backend = RustBackend::new();
    convert_all_with_backend(&backend, plan, albums_root, catalog_path, config, progress)
}

/// Execute `plan` with a specific backend (allows testing with mock).
pub fn convert_all_with_backend(
    backend: &impl ImageBackend,
    plan: &ConversionPlan,
    albums_root: &Path,
    catalog_path: &Path,
    config: &PipelineConfig,
    progress: Option<Sender<ConvertEvent>>,
) -> Result<ConvertRun, ConvertError> {
    let transcode = TranscodeConfig::from(&config.convert);
    let archive_dir = config.convert.archive_dir.as_str();

    let jobs: Vec<(&PlannedAlbum, &ImageAsset)> = plan
        .albums
        .iter()
        .flat_map(|album| album.sources.iter().map(move |source| (album, source)))
        .collect();
    tracing::info!(files = jobs.len(), "converting");

    let mut outcomes: Vec<(PathBuf, FileOutcome)> = jobs
        .par_iter()
        .map(|(album, source)| {
            let outcome = convert_one(backend, &source.path, archive_dir, &transcode);
            if let Some(tx) = &progress {
                tx.send(ConvertEvent {
                    album: album.name.clone(),
                    filename: source.filename.clone(),
                    outcome: outcome.clone(),
                })
                .ok();
            }
            (source.path.clone(), outcome)
        })
        .collect();

    for album in &plan.albums {
        for collision in &album.collisions {
            let error = collision.error();
            tracing::warn!(path = %collision.source.path.display(), error = %error, "output name taken");
            let outcome = FileOutcome::Failed { error };
            if let Some(tx) = &progress {
                tx.send(ConvertEvent {
                    album: album.name.clone(),
                    filename: collision.source.filename.clone(),
                    outcome: outcome.clone(),
                })
                .ok();
            }
            outcomes.push((collision.source.path.clone(), outcome));
        }
    }

    let mut tally = Tally::default();
    for (_, outcome) in &outcomes {
        tally.processed += 1;
        match outcome {
            FileOutcome::Converted { .. } => tally.converted += 1,
            FileOutcome::Partial { .. } => tally.partial += 1,
            FileOutcome::Failed { .. } => tally.failed += 1,
        }
    }

    let catalog = if tally.converted + tally.partial > 0 {
        Some(manifest::regenerate_catalog(
            albums_root,
            catalog_path,
            &config.scan,
        )?)
    } else {
        None
    };

    Ok(ConvertRun {
        tally,
        outcomes,
        catalog,
    })
}

/// Transcode one file and archive its original.
fn convert_one(
    backend: &impl ImageBackend,
    source: &Path,
    archive_dir: &str,
    config: &TranscodeConfig,
) -> FileOutcome {
    let (output, report) = match transcode_to_webp(backend, source, config) {
        Ok(done) => done,
        Err(e) => {
            tracing::warn!(path = %source.display(), error = %e, "conversion failed");
            return FileOutcome::Failed {
                error: e.to_string(),
            };
        }
    };

    match archive_original(source, archive_dir) {
        Ok(archived) => {
            tracing::debug!(from = %source.display(), to = %archived.display(), "archived original");
            FileOutcome::Converted {
                output,
                exif: report.exif,
            }
        }
        Err(e) => {
            tracing::warn!(path = %source.display(), error = %e, "converted but not archived");
            FileOutcome::Partial {
                output,
                error: e.to_string(),
            }
        }
    }
}

/// Move `source` into `<its directory>/<archive_dir>/`, keeping its file name.
///
/// Never overwrites an earlier archived file of the same name.
pub fn archive_original(source: &Path, archive_dir: &str) -> Result<PathBuf, ArchiveError> {
    let parent = source.parent().unwrap_or_else(|| Path::new("."));
    let file_name = source
        .file_name()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"))?;

    let dir = parent.join(archive_dir);
    std::fs::create_dir_all(&dir)?;

    let destination = dir.join(file_name);
    if destination.exists() {
        return Err(ArchiveError::Exists(destination));
    }
    std::fs::rename(source, &destination)?;
    Ok(destination)
}
