//! Test-part builders.
//!
//! [`VoxelPart`] describes a part as filled cells of a regular grid and
//! emits a closed, outward-oriented mesh of the boundary. Stepped blocks,
//! pockets, holes and slots are all expressible this way, which makes it
//! the workhorse for planner tests and benchmarks.

use crate::mesh::Mesh;
use nalgebra::{Point3, Vector3};

/// A part made of filled grid cells
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelPart {
    dims: [usize; 3],
    cell: Vector3<f64>,
    origin: Point3<f64>,
    filled: Vec<bool>,
}

impl VoxelPart {
    /// Empty grid of `dims` cells of size `cell`, with its minimum corner at `origin`
    pub fn new(dims: [usize; 3], cell: Vector3<f64>, origin: Point3<f64>) -> Self {
        Self {
            dims,
            cell,
            origin,
            filled: vec![false; dims[0] * dims[1] * dims[2]],
        }
    }

    /// Fully filled grid of unit cells at the origin
    pub fn solid(dims: [usize; 3]) -> Self {
        let mut part = Self::new(dims, Vector3::new(1.0, 1.0, 1.0), Point3::origin());
        part.filled.iter_mut().for_each(|c| *c = true);
        part
    }

    /// Fill every cell in `[min, max)`
    pub fn with_box(mut self, min: [usize; 3], max: [usize; 3]) -> Self {
        self.set_box(min, max, true);
        self
    }

    /// Clear every cell in `[min, max)`
    pub fn without_box(mut self, min: [usize; 3], max: [usize; 3]) -> Self {
        self.set_box(min, max, false);
        self
    }

    pub fn set(&mut self, cell: [usize; 3], filled: bool) {
        if let Some(i) = self.index(cell) {
            self.filled[i] = filled;
        }
    }

    fn set_box(&mut self, min: [usize; 3], max: [usize; 3], filled: bool) {
        for x in min[0]..max[0].min(self.dims[0]) {
            for y in min[1]..max[1].min(self.dims[1]) {
                for z in min[2]..max[2].min(self.dims[2]) {
                    self.set([x, y, z], filled);
                }
            }
        }
    }

    fn index(&self, cell: [usize; 3]) -> Option<usize> {
        if (0..3).all(|a| cell[a] < self.dims[a]) {
            Some(cell[0] + self.dims[0] * (cell[1] + self.dims[1] * cell[2]))
        } else {
            None
        }
    }

    pub fn is_filled(&self, cell: [i64; 3]) -> bool {
        if cell.iter().any(|&c| c < 0) {
            return false;
        }
        self.index([cell[0] as usize, cell[1] as usize, cell[2] as usize])
            .map(|i| self.filled[i])
            .unwrap_or(false)
    }

    pub fn filled_count(&self) -> usize {
        self.filled.iter().filter(|&&c| c).count()
    }

    pub fn volume(&self) -> f64 {
        self.filled_count() as f64 * self.cell.x * self.cell.y * self.cell.z
    }

    /// Box spanned by the whole grid, filled or not
    pub fn grid_bounds(&self) -> (Point3<f64>, Point3<f64>) {
        let max = self.origin
            + Vector3::new(
                self.dims[0] as f64 * self.cell.x,
                self.dims[1] as f64 * self.cell.y,
                self.dims[2] as f64 * self.cell.z,
            );
        (self.origin, max)
    }

    /// Boundary mesh: one quad per cell face not shared with a filled neighbour
    pub fn to_mesh(&self) -> Mesh {
        let mut triangles = Vec::new();
        for z in 0..self.dims[2] {
            for y in 0..self.dims[1] {
                for x in 0..self.dims[0] {
                    let cell = [x as i64, y as i64, z as i64];
                    if !self.is_filled(cell) {
                        continue;
                    }
                    for axis in 0..3 {
                        for sign in [-1i64, 1] {
                            let mut next = cell;
                            next[axis] += sign;
                            if self.is_filled(next) {
                                continue;
                            }
                            let quad = self.cell_face(cell, axis, sign > 0);
                            triangles.push([quad[0], quad[1], quad[2]]);
                            triangles.push([quad[0], quad[2], quad[3]]);
                        }
                    }
                }
            }
        }
        Mesh::from_triangles(triangles)
    }

    /// Corners of one cell face, counter-clockwise seen from outside
    fn cell_face(&self, cell: [i64; 3], axis: usize, positive: bool) -> [Point3<f64>; 4] {
        let lo = Point3::new(
            self.origin.x + cell[0] as f64 * self.cell.x,
            self.origin.y + cell[1] as f64 * self.cell.y,
            self.origin.z + cell[2] as f64 * self.cell.z,
        );
        let u = (axis + 1) % 3;
        let v = (axis + 2) % 3;
        let corner = |du: f64, dv: f64| {
            let mut p = lo;
            if positive {
                p[axis] += self.cell[axis];
            }
            p[u] += du * self.cell[u];
            p[v] += dv * self.cell[v];
            p
        };
        if positive {
            [corner(0.0, 0.0), corner(1.0, 0.0), corner(1.0, 1.0), corner(0.0, 1.0)]
        } else {
            [corner(0.0, 0.0), corner(0.0, 1.0), corner(1.0, 1.0), corner(1.0, 0.0)]
        }
    }
}
