//! CLI output formatting for all pipeline stages.
//!
//! Every stage has a pure `format_*` function returning display lines and, for
//! one-shot output, a `print_*` wrapper. Progress events from the parallel
//! stages arrive over a channel; `main` feeds them through the matching
//! `format_*_event` on a printer thread.
//!
//! Entities lead with a positional index and their name; paths follow as
//! indented context.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Albums
//! 001 Nohn (2 photos)
//!     Source: albums/Nohn
//!     001 IMG_0001.jpg
//!     002 IMG_0002.webp
//! 002 ぽんちょねこ (1 photos)
//!     Source: albums/ぽんちょねこ
//!     001 cat.png
//! ```
//!
//! ## Thumbnails
//!
//! ```text
//! Nohn/IMG_0001.jpg → Nohn_IMG_0001.jpg: encoded
//! Nohn/IMG_0003.jpg: skipped (landscape)
//! Nohn/broken.jpg: FAILED Failed to decode ...: ...
//! Thumbnails: 1 → albums/thumbnails/manifest.json (0.02 MB)
//! Cache: 1 encoded
//! Summary: 3 processed, 1 converted, 1 failed, 1 skipped
//! ```
//!
//! ## Convert
//!
//! ```text
//! Nohn: 2 files
//! Total: 2 files to convert
//! Nohn/IMG_0002.HEIC → IMG_0002.webp (EXIF kept)
//! Nohn/IMG_0004.HEIC → IMG_0004.webp: PARTIAL archive destination already exists: ...
//! Summary: 2 processed, 1 converted, 0 failed, 0 skipped, 1 partial
//! ```

use crate::convert::{ConversionPlan, ConvertEvent, ConvertRun, FileOutcome};
use crate::manifest::CatalogManifest;
use crate::orientation::Orientation;
use crate::scan::Album;
use crate::thumbnails::{ThumbnailEvent, ThumbnailRun, ThumbnailStatus};
use crate::types::Tally;
use std::path::{Path, PathBuf};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// ```text
/// 001 Nohn (5 photos)
/// ```
fn entity_header(index: usize, title: &str, count: usize) -> String {
    format!("{} {} ({} photos)", format_index(index), title, count)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

pub fn format_summary(tally: &Tally) -> String {
    format!("Summary: {}", tally)
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_output(albums: &[Album]) -> Vec<String> {
    let mut lines = vec!["Albums".to_string()];
    for (i, album) in albums.iter().enumerate() {
        lines.push(entity_header(i + 1, &album.name, album.images.len()));
        lines.push(format!("{}Source: {}", indent(1), album.path.display()));
        for (j, image) in album.images.iter().enumerate() {
            lines.push(format!("{}{} {}", indent(1), format_index(j + 1), image.filename));
        }
    }
    let images: usize = albums.iter().map(|a| a.images.len()).sum();
    lines.push(String::new());
    lines.push(format!(
        "{}, {}",
        plural(albums.len(), "album"),
        plural(images, "image")
    ));
    lines
}

pub fn print_check_output(albums: &[Album]) {
    for line in format_check_output(albums) {
        println!("{}", line);
    }
}

// ============================================================================
// Catalog
// ============================================================================

pub fn format_catalog_output(catalog: &CatalogManifest, path: &Path) -> Vec<String> {
    vec![format!(
        "Catalog: {}, {} → {}",
        plural(catalog.album_count(), "album"),
        plural(catalog.image_count(), "image"),
        path.display()
    )]
}

pub fn print_catalog_output(catalog: &CatalogManifest, path: &Path) {
    for line in format_catalog_output(catalog, path) {
        println!("{}", line);
    }
}

// ============================================================================
// Thumbnails
// ============================================================================

/// Format a single thumbnail progress event as display lines.
pub fn format_thumbnail_event(event: &ThumbnailEvent) -> Vec<String> {
    match event {
        ThumbnailEvent::AlbumMissing { album } => {
            vec![format!("warning: album {} not found, skipped", album)]
        }
        ThumbnailEvent::Produced {
            album,
            filename,
            output_name,
            status,
        } => {
            let status_str = match status {
                ThumbnailStatus::Cached => "cached",
                ThumbnailStatus::Copied => "copied",
                ThumbnailStatus::Encoded => "encoded",
            };
            vec![format!("{}/{} → {}: {}", album, filename, output_name, status_str)]
        }
        ThumbnailEvent::Skipped {
            album,
            filename,
            orientation,
        } => {
            let orientation = match orientation {
                Orientation::Portrait => "portrait",
                Orientation::Landscape => "landscape",
                Orientation::Square => "square",
            };
            vec![format!("{}/{}: skipped ({})", album, filename, orientation)]
        }
        ThumbnailEvent::Failed {
            album,
            filename,
            error,
        } => vec![format!("{}/{}: FAILED {}", album, filename, error)],
    }
}

pub fn format_thumbnail_summary(run: &ThumbnailRun, manifest_path: &Path) -> Vec<String> {
    vec![
        format!(
            "Thumbnails: {} → {} ({:.2} MB)",
            run.manifest.count,
            manifest_path.display(),
            run.manifest.total_size_mb
        ),
        format!("Cache: {}", run.cache_stats),
        format_summary(&run.tally),
    ]
}

pub fn print_thumbnail_summary(run: &ThumbnailRun, manifest_path: &Path) {
    for line in format_thumbnail_summary(run, manifest_path) {
        println!("{}", line);
    }
}

// ============================================================================
// Convert
// ============================================================================

/// Per-album counts, shown before anything is changed.
pub fn format_convert_plan(plan: &ConversionPlan) -> Vec<String> {
    if plan.is_empty() {
        return vec!["Nothing to convert".to_string()];
    }
    let mut lines = Vec::new();
    for album in &plan.albums {
        let count = album.sources.len() + album.collisions.len();
        lines.push(format!("{}: {}", album.name, plural(count, "file")));
        for collision in &album.collisions {
            lines.push(format!(
                "{}{}: will fail, {}",
                indent(1),
                collision.source.filename,
                collision.error()
            ));
        }
    }
    lines.push(format!("Total: {} to convert", plural(plan.total(), "file")));
    lines
}

pub fn print_convert_plan(plan: &ConversionPlan) {
    for line in format_convert_plan(plan) {
        println!("{}", line);
    }
}

pub fn format_convert_event(event: &ConvertEvent) -> Vec<String> {
    let source = format!("{}/{}", event.album, event.filename);
    match &event.outcome {
        FileOutcome::Converted { output, exif } => {
            let exif = if *exif { " (EXIF kept)" } else { "" };
            vec![format!("{} → {}{}", source, file_name(output), exif)]
        }
        FileOutcome::Partial { output, error } => vec![format!(
            "{} → {}: PARTIAL {}",
            source,
            file_name(output),
            error
        )],
        FileOutcome::Failed { error } => vec![format!("{}: FAILED {}", source, error)],
    }
}

pub fn format_convert_summary(run: &ConvertRun, catalog_path: &Path) -> Vec<String> {
    let mut lines = vec![format_summary(&run.tally)];
    match &run.catalog {
        Some(catalog) => lines.extend(format_catalog_output(catalog, catalog_path)),
        None => lines.push("Catalog unchanged".to_string()),
    }
    lines
}

pub fn print_convert_summary(run: &ConvertRun, catalog_path: &Path) {
    for line in format_convert_summary(run, catalog_path) {
        println!("{}", line);
    }
}

// ============================================================================
// Icons
// ============================================================================

pub fn format_icons_output(written: &[PathBuf]) -> Vec<String> {
    written
        .iter()
        .map(|p| format!("Icon: {}", p.display()))
        .collect()
}

pub fn print_icons_output(written: &[PathBuf]) {
    for line in format_icons_output(written) {
        println!("{}", line);
    }
}
