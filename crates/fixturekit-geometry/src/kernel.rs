//! 2D polygon booleans and offsets.
//!
//! The planner only talks to [`PolygonKernel`]; [`CsgKernel`] implements it
//! with `csgrs` sketches for booleans and `cavalier_contours` polylines for
//! offsets.

use crate::polygon::{signed_area, total_area, Polygon2};
use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use csgrs::sketch::Sketch;
use csgrs::traits::CSG;
use fixturekit_core::{GeometryError, Tolerances};
use nalgebra::Point2;
use tracing::debug;

/// Planar polygon operations used by the decomposer and selector
pub trait PolygonKernel {
    /// Union of a polygon set
    fn union(&self, polygons: &[Polygon2]) -> Result<Vec<Polygon2>, GeometryError>;

    /// `subject` minus `clip`
    fn difference(&self, subject: &[Polygon2], clip: &[Polygon2]) -> Result<Vec<Polygon2>, GeometryError>;

    /// Common region of `a` and `b`
    fn intersection(&self, a: &[Polygon2], b: &[Polygon2]) -> Result<Vec<Polygon2>, GeometryError>;

    /// Grow (positive) or shrink (negative) a polygon by `distance`
    fn offset(&self, polygon: &Polygon2, distance: f64) -> Result<Vec<Polygon2>, GeometryError>;

    fn intersection_area(&self, a: &[Polygon2], b: &[Polygon2]) -> Result<f64, GeometryError> {
        Ok(total_area(&self.intersection(a, b)?))
    }

    fn difference_area(&self, subject: &[Polygon2], clip: &[Polygon2]) -> Result<f64, GeometryError> {
        Ok(total_area(&self.difference(subject, clip)?))
    }
}

/// Default kernel backed by csgrs and cavalier_contours
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CsgKernel {
    /// Result polygons and holes at or below this area are discarded.
    sliver_area: f64,
    /// Maximum chord deviation when flattening offset arcs.
    arc_tolerance: f64,
}

impl Default for CsgKernel {
    fn default() -> Self {
        Self {
            sliver_area: 1e-9,
            arc_tolerance: 1e-3,
        }
    }
}

impl CsgKernel {
    pub fn new(sliver_area: f64, arc_tolerance: f64) -> Self {
        Self {
            sliver_area,
            arc_tolerance,
        }
    }

    /// Kernel discarding slivers smaller than the no-change area
    pub fn from_tolerances(tolerances: &Tolerances) -> Self {
        Self {
            sliver_area: tolerances.no_change_area,
            arc_tolerance: tolerances.distance,
        }
    }

    fn to_sketch(polygons: &[Polygon2]) -> Sketch<()> {
        let mut sketch: Sketch<()> = Sketch::new();
        for polygon in polygons {
            let mut piece: Sketch<()> = Sketch::polygon(&ring_coords(polygon.outer()), None);
            for hole in polygon.holes() {
                piece = piece.difference(&Sketch::polygon(&ring_coords(hole), None));
            }
            sketch = sketch.union(&piece);
        }
        sketch
    }

    fn from_sketch(&self, sketch: &Sketch<()>, operation: &str) -> Result<Vec<Polygon2>, GeometryError> {
        let unreadable = |reason: &str| GeometryError::UnreadableBoolean {
            operation: operation.to_string(),
            reason: reason.to_string(),
        };

        let mp = sketch.to_multipolygon();
        let mut out = Vec::new();
        for poly in mp.0 {
            let outer: Vec<Point2<f64>> = poly.exterior().0.iter().map(|c| Point2::new(c.x, c.y)).collect();
            if outer.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
                return Err(unreadable("non-finite coordinate"));
            }
            if signed_area(&outer).abs() <= self.sliver_area {
                continue;
            }
            let holes: Vec<Vec<Point2<f64>>> = poly
                .interiors()
                .iter()
                .map(|ring| ring.0.iter().map(|c| Point2::new(c.x, c.y)).collect::<Vec<_>>())
                .filter(|ring: &Vec<Point2<f64>>| signed_area(ring).abs() > self.sliver_area)
                .collect();
            let polygon = Polygon2::new(outer, holes)?;
            if polygon.area() > self.sliver_area {
                out.push(polygon);
            }
        }
        Ok(out)
    }

    /// Offset one ring; the ring is walked clockwise so positive distances grow it.
    fn offset_ring(&self, ring: &[Point2<f64>], distance: f64) -> Vec<Vec<Point2<f64>>> {
        let mut clockwise: Vec<Point2<f64>> = ring.to_vec();
        if signed_area(&clockwise) > 0.0 {
            clockwise.reverse();
        }

        let mut polyline = Polyline::new();
        for p in &clockwise {
            polyline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
        }
        polyline.set_is_closed(true);

        polyline
            .parallel_offset(distance)
            .iter()
            .map(|result| self.flatten(result))
            .filter(|points| points.len() >= 3)
            .collect()
    }

    /// Replace arc segments (non-zero bulge) by chords
    fn flatten(&self, polyline: &Polyline<f64>) -> Vec<Point2<f64>> {
        let vertices = &polyline.vertex_data;
        let n = vertices.len();
        let mut points = Vec::with_capacity(n);
        for (i, v) in vertices.iter().enumerate() {
            let start = Point2::new(v.x, v.y);
            points.push(start);
            if v.bulge.abs() < 1e-12 || n < 2 {
                continue;
            }
            let next = &vertices[(i + 1) % n];
            let end = Point2::new(next.x, next.y);
            points.extend(arc_points(&start, &end, v.bulge, self.arc_tolerance));
        }
        points
    }
}

fn ring_coords(ring: &[Point2<f64>]) -> Vec<[f64; 2]> {
    ring.iter().map(|p| [p.x, p.y]).collect()
}

/// Interior points of a bulge arc from `start` to `end`
fn arc_points(start: &Point2<f64>, end: &Point2<f64>, bulge: f64, tolerance: f64) -> Vec<Point2<f64>> {
    let chord = end - start;
    let length = chord.norm();
    if length < 1e-12 {
        return Vec::new();
    }
    let sweep = 4.0 * bulge.atan();
    let left = nalgebra::Vector2::new(-chord.y, chord.x) / length;
    let center = nalgebra::center(start, end) + left * (length * 0.5) * (1.0 - bulge * bulge) / (2.0 * bulge);
    let radius = (start - center).norm();
    let start_angle = (start.y - center.y).atan2(start.x - center.x);

    let max_step = if tolerance < radius {
        2.0 * (1.0 - tolerance / radius).acos()
    } else {
        sweep.abs()
    };
    let segments = ((sweep.abs() / max_step.max(1e-3)).ceil() as usize).clamp(1, 256);
    (1..segments)
        .map(|k| {
            let a = start_angle + sweep * k as f64 / segments as f64;
            Point2::new(center.x + radius * a.cos(), center.y + radius * a.sin())
        })
        .collect()
}

impl PolygonKernel for CsgKernel {
    fn union(&self, polygons: &[Polygon2]) -> Result<Vec<Polygon2>, GeometryError> {
        if polygons.len() <= 1 {
            return Ok(polygons.to_vec());
        }
        self.from_sketch(&Self::to_sketch(polygons), "union")
    }

    fn difference(&self, subject: &[Polygon2], clip: &[Polygon2]) -> Result<Vec<Polygon2>, GeometryError> {
        if subject.is_empty() || clip.is_empty() {
            return Ok(subject.to_vec());
        }
        let result = Self::to_sketch(subject).difference(&Self::to_sketch(clip));
        self.from_sketch(&result, "difference")
    }

    fn intersection(&self, a: &[Polygon2], b: &[Polygon2]) -> Result<Vec<Polygon2>, GeometryError> {
        if a.is_empty() || b.is_empty() {
            return Ok(Vec::new());
        }
        let result = Self::to_sketch(a).intersection(&Self::to_sketch(b));
        self.from_sketch(&result, "intersection")
    }

    fn offset(&self, polygon: &Polygon2, distance: f64) -> Result<Vec<Polygon2>, GeometryError> {
        if distance == 0.0 {
            return Ok(vec![polygon.clone()]);
        }
        let outers = self
            .offset_ring(polygon.outer(), distance)
            .into_iter()
            .filter(|ring| signed_area(ring).abs() > self.sliver_area)
            .map(|ring| Polygon2::new(ring, Vec::new()))
            .collect::<Result<Vec<_>, _>>()?;
        if outers.is_empty() {
            debug!("Offset by {:.4} consumed the polygon", distance);
            return Ok(Vec::new());
        }

        // A hole grows when the polygon shrinks.
        let mut grown_holes = Vec::new();
        for hole in polygon.holes() {
            for ring in self.offset_ring(hole, -distance) {
                if signed_area(&ring).abs() > self.sliver_area {
                    grown_holes.push(Polygon2::new(ring, Vec::new())?);
                }
            }
        }
        let outers = self.union(&outers)?;
        self.difference(&outers, &grown_holes)
    }
}
