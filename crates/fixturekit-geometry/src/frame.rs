//! Planar coordinate frames perpendicular to a direction.

use fixturekit_core::GeometryError;
use nalgebra::{Point2, Point3, Rotation3, Vector3};
use std::f64::consts::PI;

/// Rotation taking a unit direction onto +Z.
///
/// Points project to the frame's XY plane; their Z coordinate is their
/// distance along the direction ("depth").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarFrame {
    normal: Vector3<f64>,
    rotation: Rotation3<f64>,
}

impl PlanarFrame {
    pub fn new(direction: &Vector3<f64>) -> Result<Self, GeometryError> {
        let length = direction.norm();
        if !length.is_finite() || length < 1e-12 {
            return Err(GeometryError::ZeroDirection);
        }
        let normal = direction / length;
        let rotation = if normal.z < -1.0 + 1e-12 {
            Rotation3::from_axis_angle(&Vector3::x_axis(), PI)
        } else {
            Rotation3::rotation_between(&normal, &Vector3::z())
                .unwrap_or_else(|| Rotation3::from_axis_angle(&Vector3::x_axis(), PI))
        };
        Ok(Self { normal, rotation })
    }

    /// Unit direction of the frame
    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    pub fn rotation(&self) -> &Rotation3<f64> {
        &self.rotation
    }

    /// Position in the plane perpendicular to the normal
    pub fn project(&self, p: &Point3<f64>) -> Point2<f64> {
        let q = self.rotation * p;
        Point2::new(q.x, q.y)
    }

    /// Distance along the normal
    pub fn depth(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&p.coords)
    }

    /// Inverse of `project` + `depth`
    pub fn lift(&self, p: &Point2<f64>, depth: f64) -> Point3<f64> {
        self.rotation.inverse() * Point3::new(p.x, p.y, depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_for_axis_directions() {
        let p = Point3::new(1.5, -2.0, 3.25);
        for dir in [
            Vector3::x(),
            -Vector3::x(),
            Vector3::y(),
            -Vector3::y(),
            Vector3::z(),
            -Vector3::z(),
            Vector3::new(1.0, 2.0, -0.5),
        ] {
            let frame = PlanarFrame::new(&dir).unwrap();
            let q = frame.project(&p);
            let back = frame.lift(&q, frame.depth(&p));
            assert!((back - p).norm() < 1e-9, "direction {:?}", dir);
        }
    }

    #[test]
    fn test_depth_is_along_normal() {
        let frame = PlanarFrame::new(&Vector3::new(0.0, 0.0, -2.0)).unwrap();
        assert!((frame.depth(&Point3::new(4.0, 5.0, 3.0)) + 3.0).abs() < 1e-12);
        assert_eq!(frame.normal(), -Vector3::z());
    }

    #[test]
    fn test_zero_direction_rejected() {
        assert_eq!(
            PlanarFrame::new(&Vector3::zeros()).unwrap_err(),
            GeometryError::ZeroDirection
        );
    }

    #[test]
    fn test_projection_preserves_handedness() {
        // A ring counter-clockwise around +x stays counter-clockwise in the frame.
        let frame = PlanarFrame::new(&Vector3::x()).unwrap();
        let ring = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        let a = frame.project(&ring[0]);
        let b = frame.project(&ring[1]);
        let c = frame.project(&ring[2]);
        let cross = (b - a).perp(&(c - a));
        assert!(cross > 0.0);
    }
}
