//! Orientation classification.
//!
//! A picture is portrait when it is strictly taller than wide. Squares fall in
//! the landscape bucket: they are never thumbnail candidates under the default
//! [`OrientationPolicy::Portrait`].

use crate::imaging::{BackendError, Dimensions, ImageBackend};
use crate::scan::ImageAsset;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Portrait,
    Landscape,
    Square,
}

impl Orientation {
    pub fn of(dims: Dimensions) -> Self {
        use std::cmp::Ordering::*;
        match dims.height.cmp(&dims.width) {
            Greater => Orientation::Portrait,
            Less => Orientation::Landscape,
            Equal => Orientation::Square,
        }
    }
}

/// `height > width`.
pub fn is_portrait(dims: Dimensions) -> bool {
    Orientation::of(dims) == Orientation::Portrait
}

/// Which orientations a thumbnail batch admits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationPolicy {
    /// Strictly taller than wide.
    #[default]
    Portrait,
    /// Wider than tall, or square.
    Landscape,
    Any,
}

impl OrientationPolicy {
    pub fn admits(self, orientation: Orientation) -> bool {
        match self {
            OrientationPolicy::Portrait => orientation == Orientation::Portrait,
            OrientationPolicy::Landscape => orientation != Orientation::Portrait,
            OrientationPolicy::Any => true,
        }
    }
}

/// Read the dimensions of `asset` and classify them.
pub fn classify(
    backend: &impl ImageBackend,
    asset: &ImageAsset,
) -> Result<(Orientation, Dimensions), BackendError> {
    let dims = backend.identify(&asset.path)?;
    Ok((Orientation::of(dims), dims))
}
