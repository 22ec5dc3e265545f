//! # FixtureKit Geometry
//!
//! Geometry kernel for the planner: projection of mesh regions into planes
//! perpendicular to a machining direction, 2D polygon booleans and offsets,
//! convex hulls, segment casting against meshes and boundary tracing of
//! face sets.

pub mod boundary;
pub mod frame;
pub mod hull;
pub mod kernel;
pub mod polygon;
pub mod ray;

pub use boundary::{boundary_loops, boundary_polygons};
pub use frame::PlanarFrame;
pub use hull::convex_hull;
pub use kernel::{CsgKernel, PolygonKernel};
pub use polygon::{signed_area, total_area, Polygon, Polygon2};
pub use ray::{cast_segment, segment_triangle_intersection, RayHit, Segment};
