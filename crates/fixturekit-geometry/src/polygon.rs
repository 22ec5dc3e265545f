//! Polygons with holes, in a plane (`Polygon2`) and embedded in 3D (`Polygon`).

use crate::frame::PlanarFrame;
use fixturekit_core::GeometryError;
use nalgebra::{Matrix4, Point2, Point3, Vector3};

/// Distance below which ring points are merged or treated as collinear.
const RING_TOLERANCE: f64 = 1e-9;

/// Signed area of a ring, positive when counter-clockwise
pub fn signed_area(ring: &[Point2<f64>]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    (0..n)
        .map(|i| {
            let p = ring[i];
            let q = ring[(i + 1) % n];
            p.x * q.y - q.x * p.y
        })
        .sum::<f64>()
        * 0.5
}

/// Sum of the areas of a polygon set
pub fn total_area(polygons: &[Polygon2]) -> f64 {
    polygons.iter().map(Polygon2::area).sum()
}

/// Remove duplicate, collinear and spike ("antenna") vertices.
pub fn clean_ring(ring: &[Point2<f64>], tolerance: f64) -> Vec<Point2<f64>> {
    let mut pts: Vec<Point2<f64>> = Vec::with_capacity(ring.len());
    for p in ring {
        if pts.last().is_none_or(|q| (p - q).norm() > tolerance) {
            pts.push(*p);
        }
    }
    while pts.len() > 1 && (pts[0] - pts[pts.len() - 1]).norm() <= tolerance {
        pts.pop();
    }

    let mut changed = true;
    while changed && pts.len() >= 3 {
        changed = false;
        let mut i = 0;
        while i < pts.len() && pts.len() >= 3 {
            let n = pts.len();
            let prev = pts[(i + n - 1) % n];
            let cur = pts[i];
            let next = pts[(i + 1) % n];
            let a = cur - prev;
            let b = next - cur;
            let span = a.norm() + b.norm();
            let degenerate = b.norm() <= tolerance || a.perp(&b).abs() <= tolerance * span;
            if degenerate {
                pts.remove(i);
                changed = true;
            } else {
                i += 1;
            }
        }
    }
    if pts.len() < 3 {
        pts.clear();
    }
    pts
}

/// Point-in-ring test by ray crossing
pub fn ring_contains(ring: &[Point2<f64>], p: &Point2<f64>) -> bool {
    let n = ring.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let a = ring[i];
        let b = ring[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// First proper crossing between non-adjacent edges, if any
fn find_self_intersection(ring: &[Point2<f64>]) -> Option<Point2<f64>> {
    let n = ring.len();
    for i in 0..n {
        let (a, b) = (ring[i], ring[(i + 1) % n]);
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (c, d) = (ring[j], ring[(j + 1) % n]);
            let d1 = (b - a).perp(&(c - a));
            let d2 = (b - a).perp(&(d - a));
            let d3 = (d - c).perp(&(a - c));
            let d4 = (d - c).perp(&(b - c));
            if d1 * d2 < 0.0 && d3 * d4 < 0.0 {
                let t = d3 / (d3 - d4);
                return Some(a + (b - a) * t);
            }
        }
    }
    None
}

fn prepare_ring(ring: &[Point2<f64>], counter_clockwise: bool) -> Result<Vec<Point2<f64>>, GeometryError> {
    let mut cleaned = clean_ring(ring, RING_TOLERANCE);
    if cleaned.len() < 3 {
        return Err(GeometryError::TooFewVertices {
            vertices: cleaned.len(),
        });
    }
    if (signed_area(&cleaned) > 0.0) != counter_clockwise {
        cleaned.reverse();
    }
    if let Some(p) = find_self_intersection(&cleaned) {
        return Err(GeometryError::SelfIntersecting { x: p.x, y: p.y });
    }
    Ok(cleaned)
}

/// A planar polygon: counter-clockwise outer ring, clockwise holes
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon2 {
    outer: Vec<Point2<f64>>,
    holes: Vec<Vec<Point2<f64>>>,
}

impl Polygon2 {
    /// Clean and orient the rings, rejecting degenerate or self-crossing ones.
    pub fn new(outer: Vec<Point2<f64>>, holes: Vec<Vec<Point2<f64>>>) -> Result<Self, GeometryError> {
        let outer = prepare_ring(&outer, true)?;
        let holes = holes
            .iter()
            .map(|h| prepare_ring(h, false))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { outer, holes })
    }

    /// Axis-aligned rectangle
    pub fn rectangle(min: Point2<f64>, max: Point2<f64>) -> Result<Self, GeometryError> {
        Self::new(
            vec![
                min,
                Point2::new(max.x, min.y),
                max,
                Point2::new(min.x, max.y),
            ],
            Vec::new(),
        )
    }

    pub fn outer(&self) -> &[Point2<f64>] {
        &self.outer
    }

    pub fn holes(&self) -> &[Vec<Point2<f64>>] {
        &self.holes
    }

    pub fn outer_area(&self) -> f64 {
        signed_area(&self.outer)
    }

    /// Area enclosed by the outer ring minus the holes
    pub fn area(&self) -> f64 {
        self.outer_area() + self.holes.iter().map(|h| signed_area(h)).sum::<f64>()
    }

    pub fn contains_point(&self, p: &Point2<f64>) -> bool {
        ring_contains(&self.outer, p) && !self.holes.iter().any(|h| ring_contains(h, p))
    }

    pub fn vertex_count(&self) -> usize {
        self.outer.len() + self.holes.iter().map(Vec::len).sum::<usize>()
    }

    /// Lower-left and upper-right corners of the outer ring
    pub fn bounds(&self) -> (Point2<f64>, Point2<f64>) {
        let mut min = self.outer[0];
        let mut max = self.outer[0];
        for p in &self.outer {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        (min, max)
    }
}

/// Newell normal of a 3D ring, scaled by twice its area
fn newell(ring: &[Point3<f64>]) -> Vector3<f64> {
    let n = ring.len();
    let mut sum = Vector3::zeros();
    for i in 0..n {
        let p = ring[i];
        let q = ring[(i + 1) % n];
        sum.x += (p.y - q.y) * (p.z + q.z);
        sum.y += (p.z - q.z) * (p.x + q.x);
        sum.z += (p.x - q.x) * (p.y + q.y);
    }
    sum
}

/// A planar polygon embedded in 3D with a unit normal.
///
/// The outer ring is counter-clockwise seen from the normal and holes are
/// clockwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    outer: Vec<Point3<f64>>,
    holes: Vec<Vec<Point3<f64>>>,
    normal: Vector3<f64>,
}

impl Polygon {
    /// Lift a planar polygon to `depth` along the frame normal
    pub fn from_planar(frame: &PlanarFrame, polygon: &Polygon2, depth: f64) -> Self {
        let lift = |ring: &[Point2<f64>]| -> Vec<Point3<f64>> {
            ring.iter().map(|p| frame.lift(p, depth)).collect()
        };
        Self {
            outer: lift(polygon.outer()),
            holes: polygon.holes().iter().map(|h| lift(h)).collect(),
            normal: frame.normal(),
        }
    }

    /// Build from 3D rings, correcting their winding to match `normal`.
    ///
    /// Points are projected onto the plane through the outer ring's mean
    /// depth.
    pub fn new(
        outer: Vec<Point3<f64>>,
        holes: Vec<Vec<Point3<f64>>>,
        normal: Vector3<f64>,
    ) -> Result<Self, GeometryError> {
        let frame = PlanarFrame::new(&normal)?;
        if outer.is_empty() {
            return Err(GeometryError::TooFewVertices { vertices: 0 });
        }
        let depth = outer.iter().map(|p| frame.depth(p)).sum::<f64>() / outer.len() as f64;
        let project = |ring: &[Point3<f64>]| -> Vec<Point2<f64>> {
            ring.iter().map(|p| frame.project(p)).collect()
        };
        let planar = Polygon2::new(project(&outer), holes.iter().map(|h| project(h)).collect())?;
        Ok(Self::from_planar(&frame, &planar, depth))
    }

    pub fn outer(&self) -> &[Point3<f64>] {
        &self.outer
    }

    pub fn holes(&self) -> &[Vec<Point3<f64>>] {
        &self.holes
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    /// Distance of the polygon plane along its own normal
    pub fn distance(&self) -> f64 {
        self.distance_along(&self.normal)
    }

    /// Distance of the polygon plane along an arbitrary direction
    pub fn distance_along(&self, direction: &Vector3<f64>) -> f64 {
        direction.dot(&self.outer[0].coords)
    }

    /// Area of the outer ring alone
    pub fn outer_area(&self) -> f64 {
        newell(&self.outer).dot(&self.normal) * 0.5
    }

    pub fn area(&self) -> f64 {
        self.outer_area()
            + self
                .holes
                .iter()
                .map(|h| newell(h).dot(&self.normal) * 0.5)
                .sum::<f64>()
    }

    /// Planar polygon in `frame`; winding is re-oriented for that frame.
    pub fn to_planar(&self, frame: &PlanarFrame) -> Result<Polygon2, GeometryError> {
        let project = |ring: &[Point3<f64>]| -> Vec<Point2<f64>> {
            ring.iter().map(|p| frame.project(p)).collect()
        };
        Polygon2::new(
            project(&self.outer),
            self.holes.iter().map(|h| project(h)).collect(),
        )
    }

    /// Planar polygon in the frame of the polygon's own normal
    pub fn footprint(&self) -> Result<Polygon2, GeometryError> {
        self.to_planar(&PlanarFrame::new(&self.normal)?)
    }

    /// Apply a rigid transform to every point and to the normal
    pub fn transformed(&self, transform: &Matrix4<f64>) -> Self {
        let map = |ring: &[Point3<f64>]| -> Vec<Point3<f64>> {
            ring.iter().map(|p| transform.transform_point(p)).collect()
        };
        let normal = transform.transform_vector(&self.normal);
        let length = normal.norm();
        Self {
            outer: map(&self.outer),
            holes: self.holes.iter().map(|h| map(h)).collect(),
            normal: if length > 0.0 { normal / length } else { self.normal },
        }
    }
}
