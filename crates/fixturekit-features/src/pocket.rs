//! Machining classification of features.

use crate::decomposition::Feature;
use fixturekit_core::Tolerances;
use std::fmt;

/// How a feature is cut once its setup is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PocketKind {
    /// Open feature starting at the stock's entry plane: surface the top.
    Face,
    /// Open feature below the entry plane: profile around part walls.
    Contour,
    /// Closed pocket or through cut.
    Flat,
}

impl PocketKind {
    /// Classify against the entry plane distance of the feature's decomposition
    pub fn classify(feature: &Feature, entry_distance: f64, tolerances: &Tolerances) -> Self {
        if feature.is_closed() {
            PocketKind::Flat
        } else if feature.top_distance() >= entry_distance - tolerances.distance {
            PocketKind::Face
        } else {
            PocketKind::Contour
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PocketKind::Face => "face",
            PocketKind::Contour => "contour",
            PocketKind::Flat => "flat",
        }
    }
}

impl fmt::Display for PocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
