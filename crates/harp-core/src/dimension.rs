//! Dimension kinds.
//!
//! Some prior art represents "independent" as a sentinel value (`-1`)
//! alongside the real dimension kinds. Here it is a distinct
//! `Independent` variant instead, so the type system rather than a
//! convention keeps it from being mixed up with a real kind.

use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimensionKind {
    /// Anonymous, length-only axis. Only kind allowed to repeat within
    /// one variable's dimension list.
    Independent,
    Time,
    Latitude,
    Longitude,
    Vertical,
    Spectral,
}

impl DimensionKind {
    pub fn is_independent(self) -> bool {
        matches!(self, DimensionKind::Independent)
    }

    pub fn from_name(s: &str) -> Option<DimensionKind> {
        Some(match s {
            "independent" => DimensionKind::Independent,
            "time" => DimensionKind::Time,
            "latitude" => DimensionKind::Latitude,
            "longitude" => DimensionKind::Longitude,
            "vertical" => DimensionKind::Vertical,
            "spectral" => DimensionKind::Spectral,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            DimensionKind::Independent => "independent",
            DimensionKind::Time => "time",
            DimensionKind::Latitude => "latitude",
            DimensionKind::Longitude => "longitude",
            DimensionKind::Vertical => "vertical",
            DimensionKind::Spectral => "spectral",
        }
    }
}

/// Checks that no non-independent kind repeats within a variable's
/// dimension list.
pub fn validate_dimension_kinds(kinds: &[DimensionKind]) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for &kind in kinds {
        if kind.is_independent() {
            continue;
        }
        if !seen.insert(kind) {
            return Err(format!(
                "dimension kind '{}' appears more than once in a variable's dimension list",
                kind.name()
            ));
        }
    }
    Ok(())
}
