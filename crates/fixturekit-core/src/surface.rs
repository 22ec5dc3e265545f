//! Surfaces: sets of mesh faces treated as one machining target.

use crate::error::GeometryError;
use crate::mesh::{FaceIndex, Mesh};
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// A non-empty set of faces of one mesh
#[derive(Clone)]
pub struct Surface<'m> {
    mesh: &'m Mesh,
    faces: Vec<FaceIndex>,
    stock_attached: bool,
}

impl<'m> Surface<'m> {
    /// Create a surface from face indices; sorts and deduplicates them.
    pub fn new(mesh: &'m Mesh, mut faces: Vec<FaceIndex>) -> Result<Self, GeometryError> {
        faces.sort_unstable();
        faces.dedup();
        if faces.is_empty() {
            return Err(GeometryError::InvalidSurface {
                reason: "no faces".to_string(),
            });
        }
        if let Some(&bad) = faces.iter().find(|&&f| f >= mesh.face_count()) {
            return Err(GeometryError::InvalidSurface {
                reason: format!(
                    "face {} out of range for mesh with {} faces",
                    bad,
                    mesh.face_count()
                ),
            });
        }
        Ok(Self {
            mesh,
            faces,
            stock_attached: false,
        })
    }

    pub fn mesh(&self) -> &'m Mesh {
        self.mesh
    }

    pub fn faces(&self) -> &[FaceIndex] {
        &self.faces
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn contains(&self, face: FaceIndex) -> bool {
        self.faces.binary_search(&face).is_ok()
    }

    /// Whether the surface is a face of the raw stock and needs no cutting
    pub fn is_stock_attached(&self) -> bool {
        self.stock_attached
    }

    pub fn set_stock_attached(&mut self, attached: bool) {
        self.stock_attached = attached;
    }

    pub fn area(&self) -> f64 {
        self.faces.iter().map(|&f| self.mesh.area(f)).sum()
    }

    /// Area-weighted unit normal
    pub fn normal(&self) -> Vector3<f64> {
        let sum: Vector3<f64> = self
            .faces
            .iter()
            .map(|&f| self.mesh.normal(f) * self.mesh.area(f))
            .sum();
        let norm = sum.norm();
        if norm > 0.0 {
            sum / norm
        } else {
            self.mesh.normal(self.faces[0])
        }
    }

    /// Area-weighted centroid
    pub fn centroid(&self) -> Point3<f64> {
        let area = self.area();
        let sum: Vector3<f64> = self
            .faces
            .iter()
            .map(|&f| self.mesh.centroid(f).coords * self.mesh.area(f))
            .sum();
        Point3::from(sum / area)
    }

    /// Signed distance of the surface plane from the origin along its normal
    pub fn plane_offset(&self) -> f64 {
        self.normal().dot(&self.centroid().coords)
    }

    /// All faces share the surface normal within the angular tolerance
    pub fn is_planar(&self, angle_tol_deg: f64) -> bool {
        let n = self.normal();
        let cos = angle_tol_deg.to_radians().cos();
        self.faces.iter().all(|&f| self.mesh.normal(f).dot(&n) >= cos)
    }

    /// The surface plane supports the whole mesh: no vertex lies in front of it.
    pub fn is_outer(&self, distance_tol: f64) -> bool {
        let n = self.normal();
        let offset = self.plane_offset();
        self.mesh
            .vertices()
            .iter()
            .all(|v| n.dot(&v.coords) <= offset + distance_tol)
    }

    /// Minimum and maximum of `direction · v` over the surface's vertices
    pub fn extent_along(&self, direction: &Vector3<f64>) -> (f64, f64) {
        self.vertex_indices()
            .into_iter()
            .map(|v| direction.dot(&self.mesh.vertex(v).coords))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| {
                (lo.min(d), hi.max(d))
            })
    }

    /// Sorted unique mesh vertex indices used by the surface
    pub fn vertex_indices(&self) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .faces
            .iter()
            .flat_map(|&f| self.mesh.face(f))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Some face of `self` shares a mesh edge with some face of `other`
    pub fn is_edge_connected(&self, other: &Surface<'_>) -> bool {
        self.faces.iter().any(|&f| {
            self.mesh
                .neighbors(f)
                .iter()
                .any(|&g| other.contains(g) && !self.contains(g))
        })
    }

    /// Same plane as `other`: parallel normals and equal offsets
    pub fn is_coplanar_with(&self, other: &Surface<'_>, angle_tol_deg: f64, distance_tol: f64) -> bool {
        let cos = angle_tol_deg.to_radians().cos();
        self.normal().dot(&other.normal()) >= cos
            && (self.plane_offset() - other.plane_offset()).abs() <= distance_tol
    }
}

impl PartialEq for Surface<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.mesh, other.mesh) && self.faces == other.faces
    }
}

impl fmt::Debug for Surface<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("faces", &self.faces)
            .field("stock_attached", &self.stock_attached)
            .finish()
    }
}

/// Group a mesh into edge-connected regions whose faces share a normal.
///
/// Faces join a region when their normal is within `angle_tol_deg` of the
/// region's seed face. Regions are returned in order of their lowest face.
pub fn planar_surfaces(mesh: &Mesh, angle_tol_deg: f64) -> Vec<Surface<'_>> {
    let cos = angle_tol_deg.to_radians().cos();
    let mut assigned = vec![false; mesh.face_count()];
    let mut surfaces = Vec::new();

    for seed in 0..mesh.face_count() {
        if assigned[seed] {
            continue;
        }
        let seed_normal = mesh.normal(seed);
        let mut faces = vec![seed];
        let mut stack = vec![seed];
        assigned[seed] = true;
        while let Some(face) = stack.pop() {
            for &next in mesh.neighbors(face) {
                if !assigned[next] && mesh.normal(next).dot(&seed_normal) >= cos {
                    assigned[next] = true;
                    faces.push(next);
                    stack.push(next);
                }
            }
        }
        faces.sort_unstable();
        surfaces.push(Surface {
            mesh,
            faces,
            stock_attached: false,
        });
    }

    debug!(
        "Grouped {} faces into {} planar surfaces",
        mesh.face_count(),
        surfaces.len()
    );
    surfaces
}

/// Split `members` (indices into `surfaces`) into edge-connected components.
///
/// Components are listed in order of their first member; members keep
/// their relative order inside a component.
pub fn connected_components(surfaces: &[Surface<'_>], members: &[usize]) -> Vec<Vec<usize>> {
    let mut face_owner: HashMap<FaceIndex, usize> = HashMap::new();
    for (slot, &index) in members.iter().enumerate() {
        for &f in surfaces[index].faces() {
            face_owner.insert(f, slot);
        }
    }

    let mut component = vec![usize::MAX; members.len()];
    let mut out: Vec<Vec<usize>> = Vec::new();
    for start in 0..members.len() {
        if component[start] != usize::MAX {
            continue;
        }
        let id = out.len();
        component[start] = id;
        let mut stack = vec![start];
        let mut slots = vec![start];
        while let Some(slot) = stack.pop() {
            let surface = &surfaces[members[slot]];
            for &f in surface.faces() {
                for g in surface.mesh().neighbors(f) {
                    if let Some(&other) = face_owner.get(g) {
                        if component[other] == usize::MAX {
                            component[other] = id;
                            slots.push(other);
                            stack.push(other);
                        }
                    }
                }
            }
        }
        slots.sort_unstable();
        out.push(slots.into_iter().map(|s| members[s]).collect());
    }
    out
}
