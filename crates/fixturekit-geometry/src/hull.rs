//! Convex hull of planar points (Andrew's monotone chain).

use fixturekit_core::GeometryError;
use nalgebra::Point2;

fn cross(o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    (a - o).perp(&(b - o))
}

/// Counter-clockwise hull without collinear vertices.
///
/// Fails with `TooFewVertices` when the points do not span an area.
pub fn convex_hull(points: &[Point2<f64>]) -> Result<Vec<Point2<f64>>, GeometryError> {
    let mut pts: Vec<Point2<f64>> = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup_by(|a, b| (*a - *b).norm() <= 1e-12);

    if pts.len() < 3 {
        return Err(GeometryError::TooFewVertices {
            vertices: pts.len(),
        });
    }

    let mut lower: Vec<Point2<f64>> = Vec::new();
    for p in &pts {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 1e-12 {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<Point2<f64>> = Vec::new();
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 1e-12 {
            upper.pop();
        }
        upper.push(*p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);

    if lower.len() < 3 {
        return Err(GeometryError::TooFewVertices {
            vertices: lower.len(),
        });
    }
    Ok(lower)
}
