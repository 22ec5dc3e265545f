//! Fixture plans.
//!
//! A plan is the ordered list of setups needed to cut a part from its
//! stock. Each setup names the fixture, the part placed in the vice frame
//! and the pockets to machine there, with the tool chosen for each.

use crate::covering::{pick_orientations, Assignment};
use crate::orientation::{stable_orientations_with, ClampOrientation, Fixture};
use crate::tool::{pick_tool, Tool};
use crate::vice::ViceSetup;
use fixturekit_core::{planar_surfaces, Aabb, Mesh, PlanError, PlanResult, Surface, Tolerances};
use fixturekit_features::{Feature, FeatureDecomposer, FeatureDecomposition, FeatureSelector, MillabilityAnalyzer, PocketKind};
use fixturekit_geometry::{CsgKernel, PlanarFrame};
use nalgebra::{Matrix4, Vector3};
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Inputs of a planning run besides the geometry
#[derive(Debug, Clone, PartialEq)]
pub struct PlanOptions {
    pub tolerances: Tolerances,
    pub vice: ViceSetup,
    /// Flat end mills available, in any order.
    pub tools: Vec<Tool>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            vice: ViceSetup::default(),
            tools: vec![
                Tool::new("1/2 flat end mill", 0.5, 1.25),
                Tool::new("1/4 flat end mill", 0.25, 0.75),
                Tool::new("1/8 flat end mill", 0.125, 0.5),
            ],
        }
    }
}

/// One machining operation of a setup
#[derive(Debug, Clone, PartialEq)]
pub enum Pocket {
    /// Surfacing the open top of the stock.
    Face { feature: Feature, tool: Option<Tool> },
    /// Profiling an open region below the entry plane.
    Contour { feature: Feature, tool: Option<Tool> },
    /// Clearing a closed pocket or through cut.
    Flat { feature: Feature, tool: Option<Tool> },
}

impl Pocket {
    pub fn new(kind: PocketKind, feature: Feature, tool: Option<Tool>) -> Self {
        match kind {
            PocketKind::Face => Pocket::Face { feature, tool },
            PocketKind::Contour => Pocket::Contour { feature, tool },
            PocketKind::Flat => Pocket::Flat { feature, tool },
        }
    }

    pub fn kind(&self) -> PocketKind {
        match self {
            Pocket::Face { .. } => PocketKind::Face,
            Pocket::Contour { .. } => PocketKind::Contour,
            Pocket::Flat { .. } => PocketKind::Flat,
        }
    }

    /// The feature in the setup's vice frame
    pub fn feature(&self) -> &Feature {
        match self {
            Pocket::Face { feature, .. } | Pocket::Contour { feature, .. } | Pocket::Flat { feature, .. } => feature,
        }
    }

    pub fn tool(&self) -> Option<&Tool> {
        match self {
            Pocket::Face { tool, .. } | Pocket::Contour { tool, .. } | Pocket::Flat { tool, .. } => tool.as_ref(),
        }
    }
}

/// A fixture with the part placed in it and the pockets cut there
#[derive(Debug, Clone)]
pub struct FixtureSetup<'m> {
    fixture: Fixture<'m>,
    transform: Matrix4<f64>,
    mesh: Mesh,
    pockets: Vec<Pocket>,
    surfaces: Vec<usize>,
}

impl<'m> FixtureSetup<'m> {
    pub fn fixture(&self) -> &Fixture<'m> {
        &self.fixture
    }

    pub fn orientation(&self) -> &ClampOrientation<'m> {
        self.fixture.orientation()
    }

    /// Part-to-vice transform
    pub fn transform(&self) -> &Matrix4<f64> {
        &self.transform
    }

    /// The part in the vice frame
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn pockets(&self) -> &[Pocket] {
        &self.pockets
    }

    /// Indices into [`FixturePlan::surfaces`] finished in this setup
    pub fn surfaces(&self) -> &[usize] {
        &self.surfaces
    }

    pub fn removed_volume(&self) -> f64 {
        self.pockets.iter().map(|p| p.feature().volume()).sum()
    }
}

/// Ordered setups covering every surface that needs cutting
#[derive(Debug, Clone)]
pub struct FixturePlan<'m> {
    surfaces: Vec<Surface<'m>>,
    setups: Vec<FixtureSetup<'m>>,
}

impl<'m> FixturePlan<'m> {
    pub fn setups(&self) -> &[FixtureSetup<'m>] {
        &self.setups
    }

    /// Planar surfaces of the part; setups refer to them by index
    pub fn surfaces(&self) -> &[Surface<'m>] {
        &self.surfaces
    }

    pub fn len(&self) -> usize {
        self.setups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.setups.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FixtureSetup<'m>> {
        self.setups.iter()
    }

    /// Pocket count of each setup, in plan order
    pub fn pocket_counts(&self) -> Vec<usize> {
        self.setups.iter().map(|s| s.pockets.len()).collect()
    }

    pub fn removed_volume(&self) -> f64 {
        self.setups.iter().map(FixtureSetup::removed_volume).sum()
    }
}

impl<'a, 'm> IntoIterator for &'a FixturePlan<'m> {
    type Item = &'a FixtureSetup<'m>;
    type IntoIter = std::slice::Iter<'a, FixtureSetup<'m>>;

    fn into_iter(self) -> Self::IntoIter {
        self.setups.iter()
    }
}

/// Plan the setups that turn `stock` into `part`.
///
/// The stock is cut along its convex silhouette, so round bar and other
/// non-box stock is followed. Part surfaces lying in a stock face are left
/// uncut. A stock mesh without faces stands for the part's bounding box.
pub fn make_fixture_plan<'m>(part: &'m Mesh, stock: &Mesh, options: &PlanOptions) -> PlanResult<FixturePlan<'m>> {
    let tol = &options.tolerances;
    let boxed;
    let stock = if stock.is_empty() {
        warn!("Stock mesh has no faces, using the part's bounding box");
        let bounds = part.bounds();
        boxed = Mesh::cuboid(bounds.min, bounds.max);
        &boxed
    } else {
        stock
    };

    let mut surfaces = planar_surfaces(part, tol.angle_deg);
    let stock_faces = planar_surfaces(stock, tol.angle_deg);
    mark_stock_attached(&mut surfaces, &stock_faces, tol);
    let to_cut: Vec<usize> = (0..surfaces.len()).filter(|&i| !surfaces[i].is_stock_attached()).collect();
    info!(
        "Planning {} of {} surfaces against stock {:?} with {} planar faces",
        to_cut.len(),
        surfaces.len(),
        stock.bounds().extent(),
        stock_faces.len()
    );

    let orientations = stable_orientations_with(&surfaces, options.vice.vice(), tol);
    if orientations.is_empty() {
        return Err(PlanError::Unfixturable {
            reason: format!(
                "no clamp orientation fits a {:.3} jaw opening",
                options.vice.vice().max_opening()
            ),
        });
    }
    check_reachable(part, &surfaces, &to_cut, &orientations, tol)?;

    let preferred: Vec<Fixture<'m>> = orientations
        .iter()
        .filter_map(|o| {
            let vice = options.vice.best_vice(o.part_height());
            if vice.is_none() {
                debug!("No plate holds the part {:.3} tall", o.part_height());
            }
            vice.map(|v| Fixture::new(o.clone(), v))
        })
        .collect();
    if preferred.is_empty() {
        return Err(PlanError::Unfixturable {
            reason: "no parallel plate holds the part in any orientation".to_string(),
        });
    }

    let (fixtures, assignments) = match pick_orientations(&surfaces, &to_cut, &preferred, tol) {
        Ok(assignments) => (preferred, assignments),
        Err(PlanError::CoveringInfeasible { uncovered }) => {
            warn!(
                "{} surfaces uncovered with the highest plates, retrying with every plate",
                uncovered.len()
            );
            let all: Vec<Fixture<'m>> = orientations
                .iter()
                .flat_map(|o| {
                    options
                        .vice
                        .feasible_vices(o.part_height())
                        .into_iter()
                        .map(move |v| Fixture::new(o.clone(), v))
                })
                .collect();
            let assignments = pick_orientations(&surfaces, &to_cut, &all, tol)?;
            (all, assignments)
        }
        Err(e) => return Err(e),
    };

    let setups = build_setups(part, stock, &fixtures, &assignments, options)?;
    info!("Fixture plan: {} setups, pockets {:?}", setups.len(), pocket_counts(&setups));
    Ok(FixturePlan { surfaces, setups })
}

fn pocket_counts(setups: &[FixtureSetup<'_>]) -> Vec<usize> {
    setups.iter().map(|s| s.pockets.len()).collect()
}

/// Flag part surfaces lying in the plane of a stock face with the same facing
fn mark_stock_attached(surfaces: &mut [Surface<'_>], stock_faces: &[Surface<'_>], tol: &Tolerances) {
    for surface in surfaces.iter_mut() {
        let attached = stock_faces
            .iter()
            .any(|face| surface.is_coplanar_with(face, tol.angle_deg, tol.distance));
        surface.set_stock_attached(attached);
    }
}

/// Every surface to cut must be millable along some orientation's top normal
fn check_reachable(
    part: &Mesh,
    surfaces: &[Surface<'_>],
    to_cut: &[usize],
    orientations: &[ClampOrientation<'_>],
    tol: &Tolerances,
) -> PlanResult<()> {
    let cos = tol.cos_angle();
    let mut directions: Vec<Vector3<f64>> = Vec::new();
    for o in orientations {
        let n = o.top_normal();
        if !directions.iter().any(|d| d.dot(&n) >= cos) {
            directions.push(n);
        }
    }

    let analyzer = MillabilityAnalyzer::new(part, *tol);
    let reachable: BTreeSet<usize> = directions
        .par_iter()
        .map(|n| analyzer.millable_surfaces(n, surfaces))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();
    let unreachable: Vec<usize> = to_cut.iter().copied().filter(|s| !reachable.contains(s)).collect();
    if unreachable.is_empty() {
        Ok(())
    } else {
        Err(PlanError::NoMillableDirection { surfaces: unreachable })
    }
}

/// Clamp the stock box to the part extent along every axis-aligned direction in `others`
fn trim_stock(stock: &Aabb, part: &Aabb, others: &[Vector3<f64>], tol: &Tolerances) -> Aabb {
    let cos = tol.cos_angle();
    let mut trimmed = *stock;
    for n in others {
        let Some(axis) = (0..3).find(|&a| n[a].abs() >= cos) else {
            debug!("Direction ({:.3}, {:.3}, {:.3}) is not axis aligned, stock left untrimmed", n.x, n.y, n.z);
            continue;
        };
        if n[axis] > 0.0 {
            trimmed.max[axis] = trimmed.max[axis].min(part.max[axis]);
        } else {
            trimmed.min[axis] = trimmed.min[axis].max(part.min[axis]);
        }
    }
    trimmed
}

fn build_setups<'m>(
    part: &'m Mesh,
    stock: &Mesh,
    fixtures: &[Fixture<'m>],
    assignments: &[Assignment],
    options: &PlanOptions,
) -> PlanResult<Vec<FixtureSetup<'m>>> {
    let tol = &options.tolerances;
    let used: Vec<&Fixture<'m>> = assignments.iter().map(|a| &fixtures[a.fixture]).collect();
    let decomposer = FeatureDecomposer::new(*tol);

    let decomposed: Vec<(FeatureDecomposition, f64)> = (0..used.len())
        .into_par_iter()
        .map(|i| -> PlanResult<(FeatureDecomposition, f64)> {
            let n = used[i].top_normal();
            let others: Vec<Vector3<f64>> = (0..used.len())
                .filter(|&j| j != i)
                .map(|j| used[j].top_normal())
                .collect();
            let trimmed = trim_stock(stock.bounds(), part.bounds(), &others, tol);
            let frame = PlanarFrame::new(&n)?;
            let entry = decomposer
                .clipped_outline(stock, &trimmed, &frame)?
                .map_or(f64::NEG_INFINITY, |outline| outline.entry_depth);
            let tree = decomposer.decompose_within(stock, &trimmed, part, &n)?;
            Ok((tree, entry))
        })
        .collect::<PlanResult<Vec<_>>>()?;
    let (mut trees, entries): (Vec<FeatureDecomposition>, Vec<f64>) = decomposed.into_iter().unzip();

    let selector = FeatureSelector::new(*tol);
    let cos = tol.cos_angle();
    for i in 0..used.len() {
        for j in (i + 1)..used.len() {
            if used[i].top_normal().dot(&used[j].top_normal()) <= -cos {
                let (top, bottom) = selector.select(&trees[i], &trees[j])?;
                trees[i] = top;
                trees[j] = bottom;
            }
        }
    }

    let kernel = CsgKernel::from_tolerances(tol);
    let mut setups = Vec::with_capacity(used.len());
    for ((assignment, tree), entry) in assignments.iter().zip(&trees).zip(entries) {
        let fixture = fixtures[assignment.fixture].clone();
        let transform = fixture.part_transform(part);
        let pockets = tree
            .features()
            .into_iter()
            .map(|feature| -> PlanResult<Pocket> {
                let kind = PocketKind::classify(feature, entry, tol);
                let tool = pick_tool(&options.tools, feature, &kernel, tol)?.cloned();
                if tool.is_none() {
                    warn!(
                        "No tool fits the {} pocket of depth {:.4} and area {:.4}",
                        kind,
                        feature.depth(),
                        feature.footprint_area()
                    );
                }
                Ok(Pocket::new(kind, feature.transformed(&transform), tool))
            })
            .collect::<PlanResult<Vec<_>>>()?;

        if pockets.is_empty() && assignment.surfaces.is_empty() {
            continue;
        }
        setups.push(FixtureSetup {
            mesh: part.transformed(&transform),
            fixture,
            transform,
            pockets,
            surfaces: assignment.surfaces.clone(),
        });
    }
    setups.sort_by(|a, b| b.pockets.len().cmp(&a.pockets.len()));
    Ok(setups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vice::Vice;
    use fixturekit_core::VoxelPart;
    use nalgebra::{Point2, Point3};

    fn options() -> PlanOptions {
        PlanOptions {
            vice: ViceSetup::new(Vice::new(8.0, 1.0, 0.0), [0.5, 0.7]),
            ..PlanOptions::default()
        }
    }

    #[test]
    fn test_trim_stock_axis_aligned_only() {
        let stock = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(5.0, 5.0, 5.0));
        let part = Aabb::new(Point3::origin(), Point3::new(4.0, 4.0, 4.0));
        let tol = Tolerances::default();
        let others = [-Vector3::z(), Vector3::x(), Vector3::new(1.0, 1.0, 0.0).normalize()];
        let trimmed = trim_stock(&stock, &part, &others, &tol);
        assert_eq!(trimmed.min, Point3::new(-1.0, -1.0, 0.0));
        assert_eq!(trimmed.max, Point3::new(4.0, 5.0, 5.0));
    }

    #[test]
    fn test_stock_attached_faces() {
        let part = Mesh::cuboid(Point3::origin(), Point3::new(2.0, 2.0, 2.0));
        let stock = Mesh::cuboid(Point3::new(0.0, 0.0, -1.0), Point3::new(2.0, 2.0, 3.0));
        let mut surfaces = planar_surfaces(&part, 1.0);
        mark_stock_attached(&mut surfaces, &planar_surfaces(&stock, 1.0), &Tolerances::default());
        let attached = surfaces.iter().filter(|s| s.is_stock_attached()).count();
        assert_eq!(attached, 4);
        assert!(surfaces
            .iter()
            .filter(|s| !s.is_stock_attached())
            .all(|s| s.normal().z.abs() > 0.99));
    }

    fn octagon(apothem: f64) -> Vec<Point2<f64>> {
        let radius = apothem / std::f64::consts::FRAC_PI_8.cos();
        (0..8)
            .map(|k| {
                let a = std::f64::consts::FRAC_PI_8 + std::f64::consts::FRAC_PI_4 * k as f64;
                Point2::new(radius * a.cos(), radius * a.sin())
            })
            .collect()
    }

    #[test]
    fn test_chamfered_faces_of_round_stock_are_attached() {
        // The diagonal flats of an octagonal bar do not lie in any bounding box face.
        let part = Mesh::prism(&octagon(1.5), 0.0, 2.0);
        let stock = Mesh::prism(&octagon(1.5), 0.0, 3.0);
        let mut surfaces = planar_surfaces(&part, 1.0);
        mark_stock_attached(&mut surfaces, &planar_surfaces(&stock, 1.0), &Tolerances::default());
        let loose: Vec<&Surface<'_>> = surfaces.iter().filter(|s| !s.is_stock_attached()).collect();
        assert_eq!(surfaces.len(), 10);
        assert_eq!(loose.len(), 1);
        assert!(loose[0].normal().z > 0.99);
    }

    #[test]
    fn test_round_stock_is_faced_along_its_outline() {
        let part = Mesh::prism(&octagon(1.5), 0.0, 2.0);
        let stock = Mesh::prism(&octagon(1.5), 0.0, 3.0);
        let plan = make_fixture_plan(&part, &stock, &options()).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.pocket_counts(), vec![1]);

        let facing = plan.setups()[0].pockets()[0].feature();
        let octagon_area = stock.volume() / 3.0;
        // A bounding box model would face a 3x3 square.
        assert!((facing.footprint_area() - octagon_area).abs() < 1e-6);
        let removed = stock.volume() - part.volume();
        assert!((plan.removed_volume() - removed).abs() < 1e-2);
    }

    #[test]
    fn test_faceless_stock_falls_back_to_part_box() {
        let part = Mesh::cuboid(Point3::origin(), Point3::new(2.0, 2.0, 2.0));
        let stock = Mesh::from_triangles(std::iter::empty());
        let plan = make_fixture_plan(&part, &stock, &options()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_part_equal_to_stock_needs_nothing() {
        let part = Mesh::cuboid(Point3::origin(), Point3::new(2.0, 2.0, 2.0));
        let plan = make_fixture_plan(&part, &part, &options()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.removed_volume(), 0.0);
    }

    #[test]
    fn test_facing_top_only() {
        let part = Mesh::cuboid(Point3::origin(), Point3::new(4.0, 4.0, 2.0));
        let stock = Mesh::cuboid(Point3::origin(), Point3::new(4.0, 4.0, 2.5));
        let plan = make_fixture_plan(&part, &stock, &options()).unwrap();
        assert_eq!(plan.len(), 1);
        let setup = &plan.setups()[0];
        assert_eq!(setup.pockets().len(), 1);
        let pocket = &setup.pockets()[0];
        assert_eq!(pocket.kind(), PocketKind::Face);
        assert_eq!(pocket.tool().map(Tool::name), Some("1/2 flat end mill"));
        // In the vice frame the facing cut sits on top of the part.
        assert!(pocket.feature().normal().z > 0.99);
        assert!((pocket.feature().bottom_distance() - setup.mesh().bounds().max.z).abs() < 1e-6);
    }

    #[test]
    fn test_narrow_vice_is_unfixturable() {
        let part = VoxelPart::solid([3, 3, 3]).to_mesh();
        let stock = Mesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 3.0, 4.0));
        let options = PlanOptions {
            vice: ViceSetup::new(Vice::new(2.0, 1.0, 0.0), [0.5]),
            ..PlanOptions::default()
        };
        let err = make_fixture_plan(&part, &stock, &options).unwrap_err();
        assert!(matches!(err, PlanError::Unfixturable { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_pocket_constructors() {
        let plan_feature = {
            let part = Mesh::cuboid(Point3::origin(), Point3::new(4.0, 4.0, 2.0));
            let stock = Mesh::cuboid(Point3::origin(), Point3::new(4.0, 4.0, 2.5));
            fixturekit_features::build_feature_decomposition(&stock, &part, &Vector3::z())
                .unwrap()
                .features()[0]
                .clone()
        };
        for kind in [PocketKind::Face, PocketKind::Contour, PocketKind::Flat] {
            let pocket = Pocket::new(kind, plan_feature.clone(), None);
            assert_eq!(pocket.kind(), kind);
            assert!(pocket.tool().is_none());
            assert_eq!(pocket.feature(), &plan_feature);
        }
    }
}
