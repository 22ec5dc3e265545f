//! Reachability of mesh faces by a tool travelling along a direction.
//!
//! A face is millable from direction `n` when nothing of the part lies
//! beyond it along `n`. Faces roughly parallel to `n` (side walls) are
//! tested from a point just in front of them so the wall itself does not
//! hide the result.

use fixturekit_core::{FaceIndex, Mesh, Surface, Tolerances};
use fixturekit_geometry::{segment_triangle_intersection, Segment};
use nalgebra::Vector3;
use rayon::prelude::*;
use tracing::debug;

/// Millability queries against one mesh
#[derive(Debug, Clone)]
pub struct MillabilityAnalyzer<'m> {
    mesh: &'m Mesh,
    tolerances: Tolerances,
    half_length: f64,
}

impl<'m> MillabilityAnalyzer<'m> {
    pub fn new(mesh: &'m Mesh, tolerances: Tolerances) -> Self {
        Self {
            mesh,
            tolerances,
            half_length: mesh.bounds().diagonal() + 1.0,
        }
    }

    pub fn mesh(&self) -> &'m Mesh {
        self.mesh
    }

    /// Whether `face` can be reached along `direction`
    pub fn is_millable(&self, direction: &Vector3<f64>, face: FaceIndex) -> bool {
        match unit(direction) {
            Some(n) => self.check_face(&n, face),
            None => false,
        }
    }

    fn check_face(&self, n: &Vector3<f64>, face: FaceIndex) -> bool {
        let normal = self.mesh.normal(face);
        let centroid = self.mesh.centroid(face);
        let side_wall = normal.dot(n).abs() < self.tolerances.sin_angle();
        let origin = if side_wall {
            centroid + normal * self.tolerances.side_wall_offset
        } else {
            centroid
        };
        let reference = n.dot(&centroid.coords) + self.tolerances.distance;
        let segment = Segment::through(&origin, n, self.half_length);

        !(0..self.mesh.face_count()).any(|other| {
            other != face
                && segment_triangle_intersection(&segment, &self.mesh.triangle(other))
                    .is_some_and(|t| n.dot(&segment.point_at(t).coords) > reference)
        })
    }

    /// Sorted indices of every millable face; empty when the direction is unusable
    pub fn millable_faces(&self, direction: &Vector3<f64>) -> Vec<FaceIndex> {
        let Some(n) = unit(direction) else {
            return Vec::new();
        };
        let faces: Vec<FaceIndex> = (0..self.mesh.face_count())
            .into_par_iter()
            .filter(|&face| self.check_face(&n, face))
            .collect();
        debug!(
            "{} of {} faces millable along ({:.3}, {:.3}, {:.3})",
            faces.len(),
            self.mesh.face_count(),
            n.x,
            n.y,
            n.z
        );
        faces
    }

    /// Indices of surfaces whose faces are all millable.
    ///
    /// Stock-attached surfaces are never reported.
    pub fn millable_surfaces(&self, direction: &Vector3<f64>, surfaces: &[Surface<'_>]) -> Vec<usize> {
        let faces = self.millable_faces(direction);
        surfaces
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_stock_attached())
            .filter(|(_, s)| s.faces().iter().all(|f| faces.binary_search(f).is_ok()))
            .map(|(i, _)| i)
            .collect()
    }
}

fn unit(direction: &Vector3<f64>) -> Option<Vector3<f64>> {
    let length = direction.norm();
    (length.is_finite() && length > 1e-12).then(|| direction / length)
}

/// Millable faces of `mesh` along `direction` with default tolerances
pub fn millable_faces(direction: &Vector3<f64>, mesh: &Mesh) -> Vec<FaceIndex> {
    MillabilityAnalyzer::new(mesh, Tolerances::default()).millable_faces(direction)
}

/// Single-face query with default tolerances
pub fn is_millable(direction: &Vector3<f64>, mesh: &Mesh, face: FaceIndex) -> bool {
    MillabilityAnalyzer::new(mesh, Tolerances::default()).is_millable(direction, face)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixturekit_core::{planar_surfaces, VoxelPart};
    use nalgebra::Point3;

    #[test]
    fn test_cube_from_above() {
        let mesh = Mesh::cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let faces = millable_faces(&Vector3::z(), &mesh);
        // Top and the four sides are reachable, the bottom is not.
        assert_eq!(faces.len(), 10);
        for f in faces {
            assert!(mesh.normal(f).z > -0.5);
        }
    }

    #[test]
    fn test_zero_direction_is_unusable() {
        let mesh = Mesh::cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        assert!(millable_faces(&Vector3::zeros(), &mesh).is_empty());
        assert!(!is_millable(&Vector3::zeros(), &mesh, 0));
    }

    #[test]
    fn test_step_floor_is_millable_from_above_only() {
        // Tall block on the left, low step on the right.
        let mesh = VoxelPart::solid([2, 1, 2]).without_box([1, 0, 1], [2, 1, 2]).to_mesh();
        let step: Vec<usize> = (0..mesh.face_count())
            .filter(|&f| mesh.normal(f).z > 0.99 && mesh.centroid(f).z < 1.5)
            .collect();
        assert_eq!(step.len(), 2);
        for &f in &step {
            assert!(is_millable(&Vector3::z(), &mesh, f));
            assert!(!is_millable(&-Vector3::z(), &mesh, f));
        }
    }

    #[test]
    fn test_overhang_hides_floor() {
        // A C-shaped profile: the slot floor is covered by the upper arm.
        let mesh = VoxelPart::solid([2, 1, 3]).without_box([1, 0, 1], [2, 1, 2]).to_mesh();
        let floor: Vec<usize> = (0..mesh.face_count())
            .filter(|&f| mesh.normal(f).z > 0.99 && (mesh.centroid(f).z - 1.0).abs() < 1e-9)
            .collect();
        assert!(!floor.is_empty());
        for &f in &floor {
            assert!(!is_millable(&Vector3::z(), &mesh, f));
            assert!(is_millable(&Vector3::x(), &mesh, f));
        }
    }

    #[test]
    fn test_hole_walls_are_side_walls() {
        let mesh = VoxelPart::solid([3, 3, 2]).without_box([1, 1, 0], [2, 2, 2]).to_mesh();
        let surfaces = planar_surfaces(&mesh, 1.0);
        let analyzer = MillabilityAnalyzer::new(&mesh, Tolerances::default());
        let from_top = analyzer.millable_surfaces(&Vector3::z(), &surfaces);
        // Everything except the bottom face.
        assert_eq!(from_top.len(), surfaces.len() - 1);
        let from_side = analyzer.millable_surfaces(&Vector3::x(), &surfaces);
        // Faces looking toward -x and the hole wall facing +x are hidden.
        assert!(from_side.iter().all(|&i| surfaces[i].normal().x > -0.5));
        assert!(!from_side
            .iter()
            .any(|&i| surfaces[i].normal().x > 0.99 && surfaces[i].plane_offset() < 2.0));
    }

    #[test]
    fn test_stock_attached_surfaces_excluded() {
        let mesh = Mesh::cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let mut surfaces = planar_surfaces(&mesh, 1.0);
        let analyzer = MillabilityAnalyzer::new(&mesh, Tolerances::default());
        assert_eq!(analyzer.millable_surfaces(&Vector3::z(), &surfaces).len(), 5);
        for s in &mut surfaces {
            s.set_stock_attached(true);
        }
        assert!(analyzer.millable_surfaces(&Vector3::z(), &surfaces).is_empty());
    }
}
