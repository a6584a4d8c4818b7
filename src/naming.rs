//! Name normalization and thumbnail naming.
//!
//! Album directories and image files arrive from many places: a Mac writes
//! `ぽ` as `ほ` + U+309A (decomposed), a Linux box or a phone upload writes the
//! single precomposed code point. Both render identically but compare unequal
//! as bytes. Every name is passed through [`normalize`] (Unicode NFC) before it
//! is used as a manifest key, a sort key, or part of an output filename.
//!
//! ## Thumbnail names
//!
//! Thumbnails from all albums share one flat directory, so the output name
//! carries the album: `<album>_<stem>.jpg`. [`ThumbnailNamer`] hands out these
//! names in scan order and resolves the rare collision (`cat.png` next to
//! `cat.jpg`, or album `a_b` + stem `c` against album `a` + stem `b_c`) with a
//! numeric suffix:
//!
//! - `A/cat.png` → `A_cat.jpg`
//! - `A/cat.jpg` → `A_cat-2.jpg`
//! - `B/cat.png` → `B_cat.jpg`

use std::collections::HashSet;
use unicode_normalization::{UnicodeNormalization, is_nfc};

/// Canonicalize `text` to Unicode NFC.
pub fn normalize(text: &str) -> String {
    if is_nfc(text) {
        return text.to_string();
    }
    text.nfc().collect()
}

/// True when `name` starts with the hidden-entry prefix.
///
/// An empty prefix hides nothing.
pub fn is_hidden(name: &str, prefix: &str) -> bool {
    !prefix.is_empty() && name.starts_with(prefix)
}

/// `<album>_<stem>.jpg`, from normalized parts.
pub fn thumbnail_name(album: &str, stem: &str) -> String {
    format!("{}_{}.jpg", normalize(album), normalize(stem))
}

/// Hands out collision-free thumbnail names for one run.
///
/// Names are claimed in call order; call it in scan order and every run
/// produces the same assignment.
#[derive(Debug, Default)]
pub struct ThumbnailNamer {
    taken: HashSet<String>,
}

impl ThumbnailNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a name for `(album, stem)`.
    pub fn claim(&mut self, album: &str, stem: &str) -> String {
        let base = thumbnail_name(album, stem);
        if self.taken.insert(base.clone()) {
            return base;
        }
        let prefix = format!("{}_{}", normalize(album), normalize(stem));
        let mut n = 2u32;
        loop {
            let candidate = format!("{prefix}-{n}.jpg");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECOMPOSED: &str = "\u{307B}\u{309A}んちょねこ"; // ほ + ◌゚
    const COMPOSED: &str = "\u{307D}んちょねこ"; // ぽ

    #[test]
    fn decomposed_and_composed_normalize_equal() {
        assert_ne!(DECOMPOSED, COMPOSED);
        assert_eq!(normalize(DECOMPOSED), normalize(COMPOSED));
        assert_eq!(normalize(DECOMPOSED), COMPOSED);
    }

    #[test]
    fn latin_combining_accent_composes() {
        assert_eq!(normalize("Cafe\u{0301}"), "Caf\u{00E9}");
    }

    #[test]
    fn normalize_is_idempotent() {
        for s in [DECOMPOSED, COMPOSED, "Cafe\u{0301}", "plain", "", "A\u{030A}ngstr\u{00F6}m"] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn ascii_passes_through() {
        assert_eq!(normalize("IMG_0001.jpg"), "IMG_0001.jpg");
    }

    #[test]
    fn hidden_prefix() {
        assert!(is_hidden(".heic_archive", "."));
        assert!(is_hidden(".DS_Store", "."));
        assert!(!is_hidden("Nohn", "."));
        assert!(!is_hidden(".anything", ""));
    }

    #[test]
    fn thumbnail_name_joins_album_and_stem() {
        assert_eq!(thumbnail_name("Nohn", "IMG_0001"), "Nohn_IMG_0001.jpg");
    }

    #[test]
    fn thumbnail_name_normalizes_parts() {
        assert_eq!(
            thumbnail_name(DECOMPOSED, "cat"),
            format!("{COMPOSED}_cat.jpg")
        );
    }

    #[test]
    fn namer_keeps_distinct_albums_apart() {
        let mut namer = ThumbnailNamer::new();
        assert_eq!(namer.claim("A", "cat"), "A_cat.jpg");
        assert_eq!(namer.claim("B", "cat"), "B_cat.jpg");
    }

    #[test]
    fn namer_suffixes_repeated_stem() {
        let mut namer = ThumbnailNamer::new();
        assert_eq!(namer.claim("A", "cat"), "A_cat.jpg");
        assert_eq!(namer.claim("A", "cat"), "A_cat-2.jpg");
        assert_eq!(namer.claim("A", "cat"), "A_cat-3.jpg");
    }

    #[test]
    fn namer_resolves_underscore_ambiguity() {
        let mut namer = ThumbnailNamer::new();
        assert_eq!(namer.claim("a", "b_c"), "a_b_c.jpg");
        assert_eq!(namer.claim("a_b", "c"), "a_b_c-2.jpg");
    }

    #[test]
    fn namer_skips_suffix_taken_by_real_stem() {
        let mut namer = ThumbnailNamer::new();
        assert_eq!(namer.claim("A", "cat-2"), "A_cat-2.jpg");
        assert_eq!(namer.claim("A", "cat"), "A_cat.jpg");
        assert_eq!(namer.claim("A", "cat"), "A_cat-3.jpg");
    }

    #[test]
    fn namer_treats_equivalent_spellings_as_one_name() {
        let mut namer = ThumbnailNamer::new();
        assert_eq!(namer.claim(DECOMPOSED, "x"), format!("{COMPOSED}_x.jpg"));
        assert_eq!(namer.claim(COMPOSED, "x"), format!("{COMPOSED}_x-2.jpg"));
    }
}
