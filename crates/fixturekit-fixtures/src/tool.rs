//! Flat end mills and per-feature tool choice.

use fixturekit_core::{PlanResult, Tolerances};
use fixturekit_features::Feature;
use fixturekit_geometry::{total_area, PolygonKernel};
use std::fmt;
use tracing::debug;

/// A flat end mill
#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    name: String,
    diameter: f64,
    cutting_length: f64,
}

impl Tool {
    pub fn new(name: impl Into<String>, diameter: f64, cutting_length: f64) -> Self {
        Self {
            name: name.into(),
            diameter,
            cutting_length,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    pub fn radius(&self) -> f64 {
        self.diameter * 0.5
    }

    pub fn cutting_length(&self) -> f64 {
        self.cutting_length
    }

    /// Flutes are long enough to reach `depth`
    pub fn reaches(&self, depth: f64, tolerance: f64) -> bool {
        self.cutting_length + tolerance >= depth
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (D{:.3}, L{:.3})", self.name, self.diameter, self.cutting_length)
    }
}

/// Largest tool that fits inside a closed feature and reaches its floor.
///
/// Open features only need the reach check. Ties in diameter keep the
/// earlier tool.
pub fn pick_tool<'t, K: PolygonKernel>(
    tools: &'t [Tool],
    feature: &Feature,
    kernel: &K,
    tolerances: &Tolerances,
) -> PlanResult<Option<&'t Tool>> {
    let mut ordered: Vec<&Tool> = tools.iter().collect();
    ordered.sort_by(|a, b| b.diameter.total_cmp(&a.diameter));

    let footprint = if feature.is_closed() {
        Some(feature.base().footprint()?)
    } else {
        None
    };

    for tool in ordered {
        if !tool.reaches(feature.depth(), tolerances.distance) {
            continue;
        }
        if let Some(footprint) = &footprint {
            let inset = kernel.offset(footprint, -tool.radius())?;
            if total_area(&inset) <= tolerances.no_change_area {
                debug!("{} does not fit a {:.4} footprint", tool, footprint.area());
                continue;
            }
        }
        return Ok(Some(tool));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixturekit_geometry::{CsgKernel, PlanarFrame, Polygon, Polygon2};
    use nalgebra::{Point2, Vector3};

    fn square_feature(size: f64, depth: f64, closed: bool) -> Feature {
        let frame = PlanarFrame::new(&Vector3::z()).unwrap();
        let square = Polygon2::rectangle(Point2::new(0.0, 0.0), Point2::new(size, size)).unwrap();
        Feature::new(Polygon::from_planar(&frame, &square, 0.0), depth, closed, false).unwrap()
    }

    fn tools() -> Vec<Tool> {
        vec![
            Tool::new("quarter", 0.25, 1.0),
            Tool::new("half", 0.5, 1.0),
            Tool::new("long eighth", 0.125, 3.0),
        ]
    }

    #[test]
    fn test_largest_fitting_tool() {
        let tol = Tolerances::default();
        let kernel = CsgKernel::from_tolerances(&tol);
        let tools = tools();
        let pick = pick_tool(&tools, &square_feature(2.0, 0.5, true), &kernel, &tol).unwrap();
        assert_eq!(pick.map(Tool::name), Some("half"));
        // 0.4 wide: the half-inch mill no longer fits.
        let pick = pick_tool(&tools, &square_feature(0.4, 0.5, true), &kernel, &tol).unwrap();
        assert_eq!(pick.map(Tool::name), Some("quarter"));
    }

    #[test]
    fn test_depth_limits_choice() {
        let tol = Tolerances::default();
        let kernel = CsgKernel::from_tolerances(&tol);
        let tools = tools();
        let pick = pick_tool(&tools, &square_feature(2.0, 2.5, true), &kernel, &tol).unwrap();
        assert_eq!(pick.map(Tool::name), Some("long eighth"));
        assert!(pick_tool(&tools, &square_feature(2.0, 4.0, true), &kernel, &tol).unwrap().is_none());
    }

    #[test]
    fn test_open_feature_skips_inset() {
        let tol = Tolerances::default();
        let kernel = CsgKernel::from_tolerances(&tol);
        let tools = tools();
        let pick = pick_tool(&tools, &square_feature(0.1, 0.5, false), &kernel, &tol).unwrap();
        assert_eq!(pick.map(Tool::name), Some("half"));
    }
}
