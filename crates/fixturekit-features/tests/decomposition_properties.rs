use fixturekit_core::{Mesh, Tolerances, VoxelPart};
use fixturekit_features::{build_feature_decomposition, FeatureDecomposition, FeatureSelector};
use nalgebra::{Point3, Vector3};
use proptest::prelude::*;
use std::collections::HashMap;

/// Part cells a column may rise to; the stock adds one more layer
const TOP: usize = 4;

/// A staircase machined along one of the six axis directions.
///
/// Column `i` rises `heights[i]` cells from the stock base toward the
/// direction and spans `width` cells across it.
#[derive(Debug, Clone)]
struct Staircase {
    axis: usize,
    positive: bool,
    heights: Vec<usize>,
    width: usize,
}

impl Staircase {
    fn all_directions(heights: &[usize], width: usize) -> Vec<Self> {
        (0..3)
            .flat_map(|axis| {
                [true, false].map(|positive| Self {
                    axis,
                    positive,
                    heights: heights.to_vec(),
                    width,
                })
            })
            .collect()
    }

    fn direction(&self) -> Vector3<f64> {
        let mut n = Vector3::zeros();
        n[self.axis] = if self.positive { 1.0 } else { -1.0 };
        n
    }

    fn dims(&self) -> [usize; 3] {
        let mut dims = [0; 3];
        dims[self.axis] = TOP + 1;
        dims[(self.axis + 1) % 3] = self.heights.len();
        dims[(self.axis + 2) % 3] = self.width;
        dims
    }

    /// Grid cell of column `i`, row `j` and layer `k` above the stock base
    fn cell(&self, i: usize, j: usize, k: usize) -> [usize; 3] {
        let mut cell = [0; 3];
        cell[self.axis] = if self.positive { k } else { TOP - k };
        cell[(self.axis + 1) % 3] = i;
        cell[(self.axis + 2) % 3] = j;
        cell
    }

    fn cells(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        (0..self.heights.len())
            .flat_map(move |i| (0..self.width).flat_map(move |j| (0..=TOP).map(move |k| self.cell(i, j, k))))
    }

    fn part(&self) -> VoxelPart {
        let mut part = VoxelPart::solid(self.dims());
        for (i, &h) in self.heights.iter().enumerate() {
            for j in 0..self.width {
                for k in h..=TOP {
                    part.set(self.cell(i, j, k), false);
                }
            }
        }
        part
    }

    fn stock(&self) -> Mesh {
        let d = self.dims();
        Mesh::cuboid(Point3::origin(), Point3::new(d[0] as f64, d[1] as f64, d[2] as f64))
    }

    /// The stock with every cell inside a feature removed
    fn carve(&self, tree: &FeatureDecomposition) -> VoxelPart {
        let features = tree.features();
        let mut rest = VoxelPart::solid(self.dims());
        for cell in self.cells() {
            let center = Point3::new(cell[0] as f64 + 0.5, cell[1] as f64 + 0.5, cell[2] as f64 + 0.5);
            if features.iter().any(|f| f.contains(&center)) {
                rest.set(cell, false);
            }
        }
        rest
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn staircase_is_fully_decomposed_along_every_axis(
        heights in prop::collection::vec(1usize..=TOP, 2..5),
        width in 1usize..3,
    ) {
        let tol = Tolerances::default();
        for stairs in Staircase::all_directions(&heights, width) {
            let n = stairs.direction();
            let part = stairs.part();
            let mesh = part.to_mesh();
            let stock = stairs.stock();
            let tree = build_feature_decomposition(&stock, &mesh, &n).unwrap();
            prop_assert!(!tree.is_empty(), "{:?}", stairs);
            prop_assert!(tree.validate(&n, &tol).is_ok());

            // No child reaches above its parent.
            let tops: HashMap<Vec<usize>, f64> = tree
                .features_with_paths()
                .into_iter()
                .map(|(path, f)| (path, f.top_distance()))
                .collect();
            for (path, feature) in tree.features_with_paths() {
                prop_assert!(feature.normal().dot(&n) > 0.99);
                prop_assert!(feature.depth() > 0.0);
                prop_assert!(!feature.is_through());
                if path.len() > 1 {
                    let parent = tops[&path[..path.len() - 1]];
                    prop_assert!(feature.top_distance() <= parent + tol.distance);
                }
            }

            // Features account for all of stock minus part, less the entry slab.
            let cross_section = (stairs.heights.len() * stairs.width) as f64;
            let expected = stock.volume() - part.volume();
            prop_assert!(
                (tree.removed_volume() - expected).abs() <= 2.0 * tol.entry_epsilon * cross_section + 1e-6,
                "{:?}: removed {} expected {}",
                stairs,
                tree.removed_volume(),
                expected
            );
            let leaves: f64 = tree.leaf_features().iter().map(|f| f.volume()).sum();
            prop_assert!(leaves <= tree.removed_volume() + 1e-9);
        }
    }

    #[test]
    fn carved_stock_decomposes_to_nothing(
        heights in prop::collection::vec(1usize..=TOP, 2..5),
    ) {
        for stairs in Staircase::all_directions(&heights, 1) {
            let n = stairs.direction();
            let part = stairs.part();
            let mesh = part.to_mesh();
            let tree = build_feature_decomposition(&stairs.stock(), &mesh, &n).unwrap();

            let carved = stairs.carve(&tree);
            prop_assert_eq!(&carved, &part);
            let again = build_feature_decomposition(&carved.to_mesh(), &mesh, &n).unwrap();
            prop_assert!(again.is_empty(), "{:?} left {} features", stairs, again.len());
        }
    }
}

#[test]
fn through_hole_is_cut_from_one_side_only() {
    let part = VoxelPart::solid([3, 3, 2]).without_box([1, 1, 0], [2, 2, 2]).to_mesh();
    let stock = Mesh::cuboid(Point3::new(0.0, 0.0, -1.0), Point3::new(3.0, 3.0, 3.0));

    let top = build_feature_decomposition(&stock, &part, &Vector3::z()).unwrap();
    let bottom = build_feature_decomposition(&stock, &part, &-Vector3::z()).unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(bottom.len(), 2);

    let selector = FeatureSelector::new(Tolerances::default());
    let (top, bottom) = selector.select(&top, &bottom).unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(bottom.len(), 1);
    assert!(top.features().iter().any(|f| f.is_through()));
    assert!(!bottom.features()[0].is_closed());
}
