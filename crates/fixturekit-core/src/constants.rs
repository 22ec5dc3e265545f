//! Numeric tolerances used throughout planning.
//!
//! All lengths are in model units (normally millimetres), areas in square
//! model units and angles in degrees.

use serde::{Deserialize, Serialize};

/// Default angular tolerance in degrees.
pub const DEFAULT_ANGLE_TOLERANCE_DEG: f64 = 1.0;

/// Default distance tolerance.
pub const DEFAULT_DISTANCE_TOLERANCE: f64 = 1e-3;

/// Default area below which a polygon difference counts as "no change".
pub const DEFAULT_NO_CHANGE_AREA: f64 = 1e-3;

/// Default distance the entry plane sits below the stock's far face.
pub const DEFAULT_ENTRY_EPSILON: f64 = 1e-4;

/// Default offset applied to side-wall centroids before ray casting.
pub const DEFAULT_SIDE_WALL_OFFSET: f64 = 1e-3;

/// Planning tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Angular tolerance (degrees) for parallel, antiparallel and orthogonal tests.
    pub angle_deg: f64,
    /// Distance tolerance for depth comparisons and plane coincidence.
    pub distance: f64,
    /// Area tolerance for "no change" and coverage tests.
    pub no_change_area: f64,
    /// Entry plane offset below the stock's far face.
    pub entry_epsilon: f64,
    /// Offset from a side wall along its own normal for millability rays.
    pub side_wall_offset: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            angle_deg: DEFAULT_ANGLE_TOLERANCE_DEG,
            distance: DEFAULT_DISTANCE_TOLERANCE,
            no_change_area: DEFAULT_NO_CHANGE_AREA,
            entry_epsilon: DEFAULT_ENTRY_EPSILON,
            side_wall_offset: DEFAULT_SIDE_WALL_OFFSET,
        }
    }
}

impl Tolerances {
    /// Cosine of the angular tolerance, the threshold for "parallel" dot products.
    pub fn cos_angle(&self) -> f64 {
        self.angle_deg.to_radians().cos()
    }

    /// Sine of the angular tolerance, the threshold for "orthogonal" dot products.
    pub fn sin_angle(&self) -> f64 {
        self.angle_deg.to_radians().sin()
    }

    /// Check that every tolerance is finite and positive.
    pub fn is_valid(&self) -> bool {
        [
            self.angle_deg,
            self.distance,
            self.no_change_area,
            self.entry_epsilon,
            self.side_wall_offset,
        ]
        .iter()
        .all(|v| v.is_finite() && *v > 0.0)
            && self.angle_deg < 45.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let tol = Tolerances::default();
        assert!(tol.is_valid());
        assert!((tol.cos_angle() - 1.0_f64.to_radians().cos()).abs() < 1e-12);
        assert!(tol.sin_angle() > 0.0 && tol.sin_angle() < 0.02);
    }

    #[test]
    fn test_rejects_non_positive() {
        let tol = Tolerances {
            distance: 0.0,
            ..Tolerances::default()
        };
        assert!(!tol.is_valid());

        let tol = Tolerances {
            angle_deg: 60.0,
            ..Tolerances::default()
        };
        assert!(!tol.is_valid());
    }
}
