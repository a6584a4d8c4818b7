//! Shared types used across batch stages.

use serde::Serialize;
use std::fmt;
use std::ops::AddAssign;

/// Final counters for a batch stage.
///
/// - `processed`: files the stage looked at
/// - `converted`: outputs produced (thumbnails written or reused, WebPs written)
/// - `failed`: files that produced nothing because of a decode/encode/IO error
/// - `skipped`: files the stage chose not to handle (orientation policy)
/// - `partial`: converted files whose original could not be archived
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub processed: u32,
    pub converted: u32,
    pub failed: u32,
    pub skipped: u32,
    pub partial: u32,
}

impl AddAssign for Tally {
    fn add_assign(&mut self, other: Self) {
        self.processed += other.processed;
        self.converted += other.converted;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.partial += other.partial;
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} converted, {} failed, {} skipped",
            self.processed, self.converted, self.failed, self.skipped
        )?;
        if self.partial > 0 {
            write!(f, ", {} partial", self.partial)?;
        }
        Ok(())
    }
}
