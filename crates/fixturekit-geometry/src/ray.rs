//! Segment casting against triangle meshes.

use fixturekit_core::{FaceIndex, Mesh};
use nalgebra::{Point3, Vector3};

const DETERMINANT_EPSILON: f64 = 1e-12;
const BARYCENTRIC_SLACK: f64 = 1e-9;

/// A finite line segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point3<f64>,
    pub end: Point3<f64>,
}

impl Segment {
    pub fn new(start: Point3<f64>, end: Point3<f64>) -> Self {
        Self { start, end }
    }

    /// Segment through `point` along `direction`, `half_length` each way
    pub fn through(point: &Point3<f64>, direction: &Vector3<f64>, half_length: f64) -> Self {
        let d = direction.normalize() * half_length;
        Self {
            start: point - d,
            end: point + d,
        }
    }

    pub fn vector(&self) -> Vector3<f64> {
        self.end - self.start
    }

    pub fn point_at(&self, t: f64) -> Point3<f64> {
        self.start + self.vector() * t
    }
}

/// Möller–Trumbore test; returns the segment parameter of the hit in `[0, 1]`.
///
/// Hits on triangle edges count. Segments lying in the triangle plane never hit.
pub fn segment_triangle_intersection(segment: &Segment, triangle: &[Point3<f64>; 3]) -> Option<f64> {
    let dir = segment.vector();
    let e1 = triangle[1] - triangle[0];
    let e2 = triangle[2] - triangle[0];
    let p = dir.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < DETERMINANT_EPSILON {
        return None;
    }
    let inv = 1.0 / det;
    let s = segment.start - triangle[0];
    let u = s.dot(&p) * inv;
    if u < -BARYCENTRIC_SLACK || u > 1.0 + BARYCENTRIC_SLACK {
        return None;
    }
    let q = s.cross(&e1);
    let v = dir.dot(&q) * inv;
    if v < -BARYCENTRIC_SLACK || u + v > 1.0 + BARYCENTRIC_SLACK {
        return None;
    }
    let t = e2.dot(&q) * inv;
    (0.0..=1.0).contains(&t).then_some(t)
}

/// A face crossed by a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub face: FaceIndex,
    pub point: Point3<f64>,
}

/// Every face the segment crosses, in face order
pub fn cast_segment(mesh: &Mesh, segment: &Segment) -> Vec<RayHit> {
    (0..mesh.face_count())
        .filter_map(|face| {
            segment_triangle_intersection(segment, &mesh.triangle(face)).map(|t| RayHit {
                face,
                point: segment.point_at(t),
            })
        })
        .collect()
}
