//! Error handling for FixtureKit
//!
//! Provides the error types for every planning layer:
//! - Geometry errors (degenerate polygons, unreadable boolean results)
//! - Plan errors (invariant defects and expected planning failures)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Geometry error type
///
/// Details of a degenerate polygon, ring or surface encountered while
/// projecting, tracing or combining planar regions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Ring has fewer than three usable vertices
    #[error("Polygon ring collapsed to {vertices} vertices")]
    TooFewVertices {
        /// Vertices left after cleanup.
        vertices: usize,
    },

    /// Ring crosses itself
    #[error("Polygon ring self-intersects near ({x:.4}, {y:.4})")]
    SelfIntersecting {
        /// X coordinate of the crossing in the polygon plane.
        x: f64,
        /// Y coordinate of the crossing in the polygon plane.
        y: f64,
    },

    /// Boolean operation produced output that is not a set of polygons
    #[error("Polygon {operation} produced an unreadable result: {reason}")]
    UnreadableBoolean {
        /// The operation name.
        operation: String,
        /// Why the result could not be read.
        reason: String,
    },

    /// Operation produced a different number of polygons than required
    #[error("Expected {expected} polygon(s), found {found}")]
    UnexpectedPolygonCount {
        /// Number of polygons expected.
        expected: usize,
        /// Number of polygons produced.
        found: usize,
    },

    /// Boundary edges of a face set do not close into rings
    #[error("Face boundary is open at vertex {vertex}")]
    OpenBoundary {
        /// Mesh vertex where the boundary walk stopped.
        vertex: usize,
    },

    /// Hole ring is not enclosed by any outer ring
    #[error("Hole ring with {vertices} vertices lies outside every outer ring")]
    OrphanHole {
        /// Vertex count of the hole ring.
        vertices: usize,
    },

    /// Surface construction failed
    #[error("Invalid surface: {reason}")]
    InvalidSurface {
        /// The reason the surface is invalid.
        reason: String,
    },

    /// Direction vector has zero length
    #[error("Direction vector has zero length")]
    ZeroDirection,
}

/// Plan error type
///
/// Failures of the planning engine. The first two variants are defects of
/// the input geometry or of the engine itself; the last three are expected
/// outcomes for some parts and can be retried with other fixture choices.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// Polygon or surface geometry could not be interpreted
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(#[from] GeometryError),

    /// A feature tree edge or feature normal broke the depth ordering
    #[error("Depth invariant violated: {reason}")]
    DepthInvariantViolated {
        /// What was found.
        reason: String,
    },

    /// Some surfaces are reachable from no candidate direction
    #[error("No millable direction for surfaces {surfaces:?}")]
    NoMillableDirection {
        /// Indices of the unreachable surfaces.
        surfaces: Vec<usize>,
    },

    /// No stable vice orientation exists
    #[error("Part cannot be fixtured: {reason}")]
    Unfixturable {
        /// Why no fixture could be built.
        reason: String,
    },

    /// The candidate fixtures cannot cover every surface
    #[error("Fixtures cannot cover surfaces {uncovered:?}")]
    CoveringInfeasible {
        /// Indices of the surfaces left uncovered.
        uncovered: Vec<usize>,
    },
}

impl PlanError {
    /// Build a depth invariant defect.
    pub fn depth(reason: impl Into<String>) -> Self {
        PlanError::DepthInvariantViolated {
            reason: reason.into(),
        }
    }

    /// Check if the planner may retry with other fixture choices
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PlanError::NoMillableDirection { .. }
                | PlanError::Unfixturable { .. }
                | PlanError::CoveringInfeasible { .. }
        )
    }

    /// Check if this is an internal invariant defect
    pub fn is_defect(&self) -> bool {
        matches!(self, PlanError::DepthInvariantViolated { .. })
    }
}

/// Main error type for FixtureKit
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Planning error
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<GeometryError> for Error {
    fn from(err: GeometryError) -> Self {
        Error::Plan(PlanError::DegenerateGeometry(err))
    }
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a planning error
    pub fn is_plan_error(&self) -> bool {
        matches!(self, Error::Plan(_))
    }

    /// Check if this error can be retried with other fixture choices
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Plan(err) if err.is_recoverable())
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

/// Result type used by the planning engine
pub type PlanResult<T> = std::result::Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_error_display() {
        let err = GeometryError::TooFewVertices { vertices: 2 };
        assert_eq!(err.to_string(), "Polygon ring collapsed to 2 vertices");

        let err = GeometryError::SelfIntersecting { x: 1.0, y: 2.5 };
        assert_eq!(
            err.to_string(),
            "Polygon ring self-intersects near (1.0000, 2.5000)"
        );

        let err = GeometryError::OpenBoundary { vertex: 7 };
        assert_eq!(err.to_string(), "Face boundary is open at vertex 7");
    }

    #[test]
    fn test_plan_error_display() {
        let err = PlanError::CoveringInfeasible {
            uncovered: vec![3, 5],
        };
        assert_eq!(err.to_string(), "Fixtures cannot cover surfaces [3, 5]");

        let err = PlanError::from(GeometryError::ZeroDirection);
        assert_eq!(
            err.to_string(),
            "Degenerate geometry: Direction vector has zero length"
        );
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(PlanError::NoMillableDirection { surfaces: vec![1] }.is_recoverable());
        assert!(PlanError::Unfixturable {
            reason: "no pairs".into()
        }
        .is_recoverable());
        assert!(PlanError::CoveringInfeasible { uncovered: vec![] }.is_recoverable());
        assert!(!PlanError::depth("child above parent").is_recoverable());
        assert!(PlanError::depth("child above parent").is_defect());
        assert!(!PlanError::from(GeometryError::ZeroDirection).is_recoverable());
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = GeometryError::TooFewVertices { vertices: 1 }.into();
        assert!(err.is_plan_error());
        assert!(!err.is_recoverable());

        let err: Error = PlanError::Unfixturable {
            reason: "flat".into(),
        }
        .into();
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "Part cannot be fixtured: flat");

        let err = Error::other("boom");
        assert_eq!(err.to_string(), "boom");
    }
}
