//! # FixtureKit Core
//!
//! Core types shared by every FixtureKit crate.
//! Provides the triangle mesh model, planar surface grouping, the planning
//! tolerances and the error taxonomy used by the planning engine.

pub mod constants;
pub mod error;
pub mod mesh;
pub mod primitives;
pub mod surface;

pub use constants::Tolerances;
pub use error::{Error, GeometryError, PlanError, PlanResult, Result};
pub use mesh::{Aabb, FaceIndex, Mesh};
pub use primitives::VoxelPart;
pub use surface::{connected_components, planar_surfaces, Surface};
