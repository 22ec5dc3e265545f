//! Features and the feature decomposition tree.

use fixturekit_core::{PlanError, PlanResult, Tolerances};
use fixturekit_geometry::{PlanarFrame, Polygon};
use nalgebra::{Matrix4, Point3, Vector3};
use std::collections::{HashSet, VecDeque};

/// A prism of material removed along its base polygon's normal.
///
/// The base polygon sits at the feature's bottom; the prism extends
/// `depth` along the normal from there.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    base: Polygon,
    depth: f64,
    closed: bool,
    through: bool,
}

impl Feature {
    pub fn new(base: Polygon, depth: f64, closed: bool, through: bool) -> PlanResult<Self> {
        if !depth.is_finite() || depth < -1e-12 {
            return Err(PlanError::depth(format!("feature depth {depth} is negative")));
        }
        Ok(Self {
            base,
            depth: depth.max(0.0),
            closed,
            through,
        })
    }

    pub fn base(&self) -> &Polygon {
        &self.base
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    /// Enclosed by part material on every side
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Runs down to the stock base
    pub fn is_through(&self) -> bool {
        self.through
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.base.normal()
    }

    /// Distance of the bottom plane along the normal
    pub fn bottom_distance(&self) -> f64 {
        self.base.distance()
    }

    /// Distance of the top plane along the normal
    pub fn top_distance(&self) -> f64 {
        self.bottom_distance() + self.depth
    }

    /// Interval covered along `direction`, which must be parallel or
    /// antiparallel to the feature normal
    pub fn range_along(&self, direction: &Vector3<f64>) -> (f64, f64) {
        let sign = if direction.dot(&self.normal()) >= 0.0 { 1.0 } else { -1.0 };
        let a = sign * self.bottom_distance();
        let b = sign * self.top_distance();
        (a.min(b), a.max(b))
    }

    pub fn footprint_area(&self) -> f64 {
        self.base.area()
    }

    /// Whether `p` lies inside the removed prism
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        let n = self.normal();
        let d = n.dot(&p.coords);
        if d < self.bottom_distance() || d > self.top_distance() {
            return false;
        }
        let Ok(frame) = PlanarFrame::new(&n) else {
            return false;
        };
        self.base
            .to_planar(&frame)
            .is_ok_and(|footprint| footprint.contains_point(&frame.project(p)))
    }

    pub fn volume(&self) -> f64 {
        self.footprint_area() * self.depth
    }

    pub(crate) fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
    }

    pub fn transformed(&self, transform: &Matrix4<f64>) -> Self {
        Self {
            base: self.base.transformed(transform),
            ..self.clone()
        }
    }
}

/// Position of a node: child indices from the root
pub type NodePath = Vec<usize>;

/// Tree of features; the root carries none, every other node exactly one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureDecomposition {
    feature: Option<Feature>,
    children: Vec<FeatureDecomposition>,
}

impl FeatureDecomposition {
    /// Empty root
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaf(feature: Feature) -> Self {
        Self {
            feature: Some(feature),
            children: Vec::new(),
        }
    }

    pub fn feature(&self) -> Option<&Feature> {
        self.feature.as_ref()
    }

    pub fn children(&self) -> &[FeatureDecomposition] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut [FeatureDecomposition] {
        &mut self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Attach a child and return it for further nesting
    pub fn add_child(&mut self, child: FeatureDecomposition) -> &mut FeatureDecomposition {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Every feature with its node path, breadth-first
    pub fn features_with_paths(&self) -> Vec<(NodePath, &Feature)> {
        let mut out = Vec::new();
        let mut queue: VecDeque<(NodePath, &FeatureDecomposition)> = VecDeque::new();
        queue.push_back((Vec::new(), self));
        while let Some((path, node)) = queue.pop_front() {
            if let Some(feature) = &node.feature {
                out.push((path.clone(), feature));
            }
            for (i, child) in node.children.iter().enumerate() {
                let mut child_path = path.clone();
                child_path.push(i);
                queue.push_back((child_path, child));
            }
        }
        out
    }

    /// Every feature, breadth-first
    pub fn features(&self) -> Vec<&Feature> {
        self.features_with_paths().into_iter().map(|(_, f)| f).collect()
    }

    /// Features of leaf nodes, breadth-first
    pub fn leaf_features(&self) -> Vec<&Feature> {
        let mut out = Vec::new();
        let mut queue: VecDeque<&FeatureDecomposition> = VecDeque::from([self]);
        while let Some(node) = queue.pop_front() {
            if node.children.is_empty() {
                if let Some(feature) = &node.feature {
                    out.push(feature);
                }
            }
            queue.extend(node.children.iter());
        }
        out
    }

    /// Number of features in the tree
    pub fn len(&self) -> usize {
        usize::from(self.feature.is_some()) + self.children.iter().map(Self::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Height of the tree below this node
    pub fn depth(&self) -> usize {
        self.children.iter().map(|c| c.depth() + 1).max().unwrap_or(0)
    }

    /// Total volume of every feature
    pub fn removed_volume(&self) -> f64 {
        self.features().iter().map(|f| f.volume()).sum()
    }

    pub(crate) fn for_each_feature_mut(&mut self, f: &mut impl FnMut(&mut Feature)) {
        if let Some(feature) = &mut self.feature {
            f(feature);
        }
        for child in &mut self.children {
            child.for_each_feature_mut(f);
        }
    }

    /// Check feature normals against `direction` and depth ordering on every edge
    pub fn validate(&self, direction: &Vector3<f64>, tolerances: &Tolerances) -> PlanResult<()> {
        let n = direction.normalize();
        if let Some(feature) = &self.feature {
            if feature.normal().dot(&n) < tolerances.cos_angle() {
                return Err(PlanError::depth(format!(
                    "feature normal ({:.3}, {:.3}, {:.3}) differs from decomposition direction",
                    feature.normal().x,
                    feature.normal().y,
                    feature.normal().z
                )));
            }
        }
        for child in &self.children {
            if let (Some(parent), Some(feature)) = (&self.feature, &child.feature) {
                if feature.top_distance() > parent.top_distance() + tolerances.distance {
                    return Err(PlanError::depth(format!(
                        "child reaches {:.4} above parent top {:.4}",
                        feature.top_distance(),
                        parent.top_distance()
                    )));
                }
            }
            child.validate(&n, tolerances)?;
        }
        Ok(())
    }

    /// Remove leaves whose path is in `marked`; parents emptied this way
    /// are removed too when marked. Returns the number of removed nodes.
    pub fn prune_leaves(&mut self, marked: &HashSet<NodePath>) -> usize {
        let mut path = Vec::new();
        self.prune_below(&mut path, marked)
    }

    fn prune_below(&mut self, path: &mut NodePath, marked: &HashSet<NodePath>) -> usize {
        let mut removed = 0;
        let children = std::mem::take(&mut self.children);
        for (i, mut child) in children.into_iter().enumerate() {
            path.push(i);
            removed += child.prune_below(path, marked);
            let drop = child.children.is_empty() && marked.contains(path.as_slice());
            path.pop();
            if drop {
                removed += 1;
            } else {
                self.children.push(child);
            }
        }
        removed
    }

    /// Copy of the tree with every feature transformed
    pub fn transformed(&self, transform: &Matrix4<f64>) -> Self {
        Self {
            feature: self.feature.as_ref().map(|f| f.transformed(transform)),
            children: self.children.iter().map(|c| c.transformed(transform)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixturekit_geometry::{PlanarFrame, Polygon2};
    use nalgebra::Point2;

    fn square_feature(size: f64, bottom: f64, depth: f64) -> Feature {
        let frame = PlanarFrame::new(&Vector3::z()).unwrap();
        let planar = Polygon2::rectangle(Point2::new(0.0, 0.0), Point2::new(size, size)).unwrap();
        Feature::new(Polygon::from_planar(&frame, &planar, bottom), depth, true, false).unwrap()
    }

    fn sample_tree() -> FeatureDecomposition {
        let mut root = FeatureDecomposition::new();
        let top = root.add_child(FeatureDecomposition::leaf(square_feature(4.0, 3.0, 1.0)));
        top.add_child(FeatureDecomposition::leaf(square_feature(2.0, 1.0, 2.0)));
        top.add_child(FeatureDecomposition::leaf(square_feature(1.0, 2.0, 1.0)));
        root.add_child(FeatureDecomposition::leaf(square_feature(1.0, 0.0, 4.0)));
        root
    }

    #[test]
    fn test_feature_measures() {
        let f = square_feature(2.0, 1.0, 3.0);
        assert!((f.volume() - 12.0).abs() < 1e-9);
        assert!((f.top_distance() - 4.0).abs() < 1e-12);
        assert_eq!(f.range_along(&Vector3::z()), (1.0, 4.0));
        assert_eq!(f.range_along(&-Vector3::z()), (-4.0, -1.0));
    }

    #[test]
    fn test_negative_depth_rejected() {
        let frame = PlanarFrame::new(&Vector3::z()).unwrap();
        let planar = Polygon2::rectangle(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)).unwrap();
        let err = Feature::new(Polygon::from_planar(&frame, &planar, 0.0), -1.0, true, false).unwrap_err();
        assert!(err.is_defect());
    }

    #[test]
    fn test_breadth_first_order() {
        let tree = sample_tree();
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.depth(), 2);
        let depths: Vec<f64> = tree.features().iter().map(|f| f.depth()).collect();
        assert_eq!(depths, vec![1.0, 4.0, 2.0, 1.0]);
        let leaves: Vec<f64> = tree.leaf_features().iter().map(|f| f.depth()).collect();
        assert_eq!(leaves, vec![4.0, 2.0, 1.0]);
        let paths: Vec<NodePath> = tree.features_with_paths().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec![vec![0], vec![1], vec![0, 0], vec![0, 1]]);
    }

    #[test]
    fn test_validate_accepts_and_rejects() {
        let tol = Tolerances::default();
        assert!(sample_tree().validate(&Vector3::z(), &tol).is_ok());
        assert!(sample_tree().validate(&Vector3::x(), &tol).is_err());

        let mut bad = FeatureDecomposition::new();
        bad.add_child(FeatureDecomposition::leaf(square_feature(2.0, 0.0, 1.0)))
            .add_child(FeatureDecomposition::leaf(square_feature(1.0, 0.5, 2.0)));
        let err = bad.validate(&Vector3::z(), &tol).unwrap_err();
        assert!(matches!(err, PlanError::DepthInvariantViolated { .. }));
    }

    #[test]
    fn test_prune_cascades_to_marked_parents() {
        let mut tree = sample_tree();
        let marked: HashSet<NodePath> = [vec![0], vec![0, 0], vec![0, 1]].into_iter().collect();
        assert_eq!(tree.prune_leaves(&marked), 3);
        assert_eq!(tree.len(), 1);

        let mut tree = sample_tree();
        let marked: HashSet<NodePath> = [vec![0], vec![0, 1]].into_iter().collect();
        // The parent keeps an unmarked child, so only one leaf goes.
        assert_eq!(tree.prune_leaves(&marked), 1);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_removed_volume() {
        let tree = sample_tree();
        assert!((tree.removed_volume() - (16.0 + 8.0 + 1.0 + 4.0)).abs() < 1e-9);
    }
}
