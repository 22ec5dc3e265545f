//! # Triangle Mesh Module
//!
//! Immutable indexed triangle mesh used as the part and stock model.
//!
//! ## Features
//! - Vertex welding and zero-area face removal on construction
//! - Per-face normals, areas and centroids
//! - Edge adjacency between faces
//! - Rigid transformation into fixture frames

use nalgebra::{Matrix4, Point2, Point3, Vector3};
use std::collections::HashMap;
use tracing::debug;

/// Index of a triangle in a [`Mesh`].
pub type FaceIndex = usize;

/// Grid used to weld coincident vertices.
const WELD_RESOLUTION: f64 = 1e-6;

/// Faces with a smaller doubled area are dropped.
const MIN_DOUBLE_AREA: f64 = 1e-12;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Bounding box of a point set, `None` when the set is empty
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut min = first;
        let mut max = first;
        for p in iter {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        Some(Self { min, max })
    }

    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn diagonal(&self) -> f64 {
        self.extent().norm()
    }

    pub fn volume(&self) -> f64 {
        let e = self.extent();
        e.x * e.y * e.z
    }

    /// The eight corners, x varying fastest
    pub fn corners(&self) -> [Point3<f64>; 8] {
        let mut out = [self.min; 8];
        for (i, corner) in out.iter_mut().enumerate() {
            corner.x = if i & 1 == 0 { self.min.x } else { self.max.x };
            corner.y = if i & 2 == 0 { self.min.y } else { self.max.y };
            corner.z = if i & 4 == 0 { self.min.z } else { self.max.z };
        }
        out
    }

    pub fn contains(&self, p: &Point3<f64>, tolerance: f64) -> bool {
        (0..3).all(|axis| {
            p[axis] >= self.min[axis] - tolerance && p[axis] <= self.max[axis] + tolerance
        })
    }
}

/// An indexed triangle mesh
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Point3<f64>>,
    faces: Vec<[usize; 3]>,
    normals: Vec<Vector3<f64>>,
    areas: Vec<f64>,
    bounds: Aabb,
    neighbors: Vec<Vec<FaceIndex>>,
}

impl Mesh {
    /// Build a mesh from loose triangles, welding shared corners.
    pub fn from_triangles(triangles: impl IntoIterator<Item = [Point3<f64>; 3]>) -> Self {
        let mut vertices = Vec::new();
        let mut lookup: HashMap<(i64, i64, i64), usize> = HashMap::new();
        let mut faces = Vec::new();
        let mut dropped = 0usize;

        for tri in triangles {
            let mut face = [0usize; 3];
            for (slot, p) in face.iter_mut().zip(tri.iter()) {
                let key = weld_key(p);
                *slot = *lookup.entry(key).or_insert_with(|| {
                    vertices.push(*p);
                    vertices.len() - 1
                });
            }
            if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
                dropped += 1;
                continue;
            }
            faces.push(face);
        }

        let mesh = Self::build(vertices, faces);
        if dropped > 0 {
            debug!("Dropped {} collapsed triangles while welding", dropped);
        }
        mesh
    }

    /// Build a mesh from an indexed vertex and face list.
    ///
    /// Faces referring to missing vertices are skipped.
    pub fn from_indexed(vertices: &[Point3<f64>], faces: &[[usize; 3]]) -> Self {
        Self::from_triangles(faces.iter().filter_map(|f| {
            Some([
                *vertices.get(f[0])?,
                *vertices.get(f[1])?,
                *vertices.get(f[2])?,
            ])
        }))
    }

    /// Axis-aligned box mesh with outward normals
    pub fn cuboid(min: Point3<f64>, max: Point3<f64>) -> Self {
        let b = Aabb::new(min, max);
        let c = b.corners();
        // Corner i has x bit 1, y bit 2, z bit 4.
        let quads: [[usize; 4]; 6] = [
            [0, 2, 3, 1], // -z
            [4, 5, 7, 6], // +z
            [0, 1, 5, 4], // -y
            [2, 6, 7, 3], // +y
            [0, 4, 6, 2], // -x
            [1, 3, 7, 5], // +x
        ];
        Self::from_triangles(quads.iter().flat_map(|q| {
            [[c[q[0]], c[q[1]], c[q[2]]], [c[q[0]], c[q[2]], c[q[3]]]]
        }))
    }

    /// Straight prism over a convex outline in the XY plane, from `bottom` to `top` in z.
    ///
    /// Round bar stock is a prism over a many-sided polygon.
    pub fn prism(outline: &[Point2<f64>], bottom: f64, top: f64) -> Self {
        let mut ring = outline.to_vec();
        let twice_area: f64 = (0..ring.len())
            .map(|i| {
                let (p, q) = (ring[i], ring[(i + 1) % ring.len()]);
                p.x * q.y - q.x * p.y
            })
            .sum();
        if twice_area < 0.0 {
            ring.reverse();
        }
        let low = |p: &Point2<f64>| Point3::new(p.x, p.y, bottom);
        let high = |p: &Point2<f64>| Point3::new(p.x, p.y, top);

        let mut triangles = Vec::with_capacity(4 * ring.len());
        for i in 1..ring.len().saturating_sub(1) {
            triangles.push([high(&ring[0]), high(&ring[i]), high(&ring[i + 1])]);
            triangles.push([low(&ring[0]), low(&ring[i + 1]), low(&ring[i])]);
        }
        for i in 0..ring.len() {
            let (a, b) = (&ring[i], &ring[(i + 1) % ring.len()]);
            triangles.push([low(a), low(b), high(b)]);
            triangles.push([low(a), high(b), high(a)]);
        }
        Self::from_triangles(triangles)
    }

    fn build(vertices: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Self {
        let mut kept = Vec::with_capacity(faces.len());
        let mut normals = Vec::with_capacity(faces.len());
        let mut areas = Vec::with_capacity(faces.len());

        for face in faces {
            let a = vertices[face[0]];
            let cross = (vertices[face[1]] - a).cross(&(vertices[face[2]] - a));
            let double_area = cross.norm();
            if double_area <= MIN_DOUBLE_AREA {
                continue;
            }
            kept.push(face);
            normals.push(cross / double_area);
            areas.push(double_area * 0.5);
        }

        let mut edges: HashMap<(usize, usize), Vec<FaceIndex>> = HashMap::new();
        for (index, face) in kept.iter().enumerate() {
            for k in 0..3 {
                let (a, b) = (face[k], face[(k + 1) % 3]);
                edges.entry((a.min(b), a.max(b))).or_default().push(index);
            }
        }
        let mut neighbors = vec![Vec::new(); kept.len()];
        for shared in edges.values() {
            for &f in shared {
                for &g in shared {
                    if f != g {
                        neighbors[f].push(g);
                    }
                }
            }
        }
        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }

        let bounds = Aabb::from_points(&vertices)
            .unwrap_or_else(|| Aabb::new(Point3::origin(), Point3::origin()));

        Self {
            vertices,
            faces: kept,
            normals,
            areas,
            bounds,
            neighbors,
        }
    }

    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn vertex(&self, index: usize) -> &Point3<f64> {
        &self.vertices[index]
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    pub fn face(&self, face: FaceIndex) -> [usize; 3] {
        self.faces[face]
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Corner positions of a face
    pub fn triangle(&self, face: FaceIndex) -> [Point3<f64>; 3] {
        let [a, b, c] = self.faces[face];
        [self.vertices[a], self.vertices[b], self.vertices[c]]
    }

    /// Outward unit normal of a face
    pub fn normal(&self, face: FaceIndex) -> Vector3<f64> {
        self.normals[face]
    }

    pub fn area(&self, face: FaceIndex) -> f64 {
        self.areas[face]
    }

    pub fn centroid(&self, face: FaceIndex) -> Point3<f64> {
        let [a, b, c] = self.triangle(face);
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Faces sharing an edge with `face`, sorted
    pub fn neighbors(&self, face: FaceIndex) -> &[FaceIndex] {
        &self.neighbors[face]
    }

    pub fn shares_edge(&self, a: FaceIndex, b: FaceIndex) -> bool {
        self.neighbors[a].binary_search(&b).is_ok()
    }

    /// Minimum and maximum of `direction · v` over all vertices
    pub fn extent_along(&self, direction: &Vector3<f64>) -> (f64, f64) {
        self.vertices
            .iter()
            .map(|v| direction.dot(&v.coords))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| {
                (lo.min(d), hi.max(d))
            })
    }

    pub fn surface_area(&self) -> f64 {
        self.areas.iter().sum()
    }

    /// Enclosed volume, positive for closed meshes with outward normals
    pub fn volume(&self) -> f64 {
        self.faces
            .iter()
            .map(|f| {
                let a = self.vertices[f[0]].coords;
                let b = self.vertices[f[1]].coords;
                let c = self.vertices[f[2]].coords;
                a.dot(&b.cross(&c)) / 6.0
            })
            .sum()
    }

    /// Copy of the mesh with every vertex transformed
    pub fn transformed(&self, transform: &Matrix4<f64>) -> Self {
        let vertices: Vec<Point3<f64>> = self
            .vertices
            .iter()
            .map(|v| transform.transform_point(v))
            .collect();
        Self::build(vertices, self.faces.clone())
    }
}

fn weld_key(p: &Point3<f64>) -> (i64, i64, i64) {
    (
        (p.x / WELD_RESOLUTION).round() as i64,
        (p.y / WELD_RESOLUTION).round() as i64,
        (p.z / WELD_RESOLUTION).round() as i64,
    )
}
