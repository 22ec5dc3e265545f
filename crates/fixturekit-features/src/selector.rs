//! Redundancy elimination between two opposite-direction decompositions.
//!
//! Material reachable from both the top and the bottom appears in both
//! trees. Features are visited largest first; a feature whose whole
//! volume is already removed by accepted features of the other side is
//! marked covered, and covered leaves are pruned.

use crate::decomposition::{FeatureDecomposition, NodePath};
use fixturekit_core::{PlanResult, Tolerances};
use fixturekit_geometry::{CsgKernel, PlanarFrame, Polygon2, PolygonKernel};
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Side {
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Unclassified,
    Accepted,
    Covered,
}

#[derive(Debug)]
struct Candidate {
    side: Side,
    path: NodePath,
    order: usize,
    footprint: Polygon2,
    range: (f64, f64),
    volume: f64,
}

/// Picks the features of a top/bottom decomposition pair that are needed
#[derive(Debug, Clone)]
pub struct FeatureSelector<K: PolygonKernel = CsgKernel> {
    kernel: K,
    tolerances: Tolerances,
}

impl FeatureSelector<CsgKernel> {
    pub fn new(tolerances: Tolerances) -> Self {
        Self {
            kernel: CsgKernel::from_tolerances(&tolerances),
            tolerances,
        }
    }
}

impl<K: PolygonKernel> FeatureSelector<K> {
    pub fn with_kernel(kernel: K, tolerances: Tolerances) -> Self {
        Self { kernel, tolerances }
    }

    /// Prune features of either tree that the other tree already removes.
    ///
    /// `bottom` must be decomposed along the opposite of `top`'s direction.
    pub fn select(
        &self,
        top: &FeatureDecomposition,
        bottom: &FeatureDecomposition,
    ) -> PlanResult<(FeatureDecomposition, FeatureDecomposition)> {
        let top_features = top.features();
        let (Some(first), false) = (top_features.first(), bottom.is_empty()) else {
            return Ok((top.clone(), bottom.clone()));
        };
        let n = first.normal();
        let cos = self.tolerances.cos_angle();
        if bottom.features().iter().any(|f| f.normal().dot(&n) > -cos) {
            warn!("Bottom decomposition is not opposite to the top; keeping both unchanged");
            return Ok((top.clone(), bottom.clone()));
        }
        let frame = PlanarFrame::new(&n)?;

        let mut candidates = Vec::new();
        for (side, tree) in [(Side::Top, top), (Side::Bottom, bottom)] {
            for (order, (path, feature)) in tree.features_with_paths().into_iter().enumerate() {
                candidates.push(Candidate {
                    side,
                    path,
                    order,
                    footprint: feature.base().to_planar(&frame)?,
                    range: feature.range_along(&n),
                    volume: feature.volume(),
                });
            }
        }

        let count = candidates.len();
        let mut overlaps: Vec<Vec<usize>> = vec![Vec::new(); count];
        for i in 0..count {
            for j in (i + 1)..count {
                if candidates[i].side != candidates[j].side && self.overlaps(&candidates[i], &candidates[j])? {
                    overlaps[i].push(j);
                    overlaps[j].push(i);
                }
            }
        }

        let quantum = self.tolerances.no_change_area;
        let volume_key = |c: &Candidate| (c.volume / quantum).round() as i64;
        let mut order: Vec<usize> = (0..count).collect();
        order.sort_by(|&a, &b| {
            let (ca, cb) = (&candidates[a], &candidates[b]);
            volume_key(cb)
                .cmp(&volume_key(ca))
                .then(ca.side.cmp(&cb.side))
                .then(ca.order.cmp(&cb.order))
        });

        let mut status = vec![Status::Unclassified; count];
        for &i in &order {
            if status[i] != Status::Unclassified {
                continue;
            }
            if self.covered_by_accepted(i, &candidates, &overlaps, &status)? {
                status[i] = Status::Covered;
                continue;
            }
            status[i] = Status::Accepted;
            for &j in &overlaps[i] {
                if status[j] == Status::Unclassified && self.covered_by_accepted(j, &candidates, &overlaps, &status)? {
                    status[j] = Status::Covered;
                }
            }
        }

        let mut marked_top: HashSet<NodePath> = HashSet::new();
        let mut marked_bottom: HashSet<NodePath> = HashSet::new();
        for (candidate, state) in candidates.iter().zip(&status) {
            if *state == Status::Covered {
                debug!("{:?} feature {:?} is covered by the other side", candidate.side, candidate.path);
                match candidate.side {
                    Side::Top => marked_top.insert(candidate.path.clone()),
                    Side::Bottom => marked_bottom.insert(candidate.path.clone()),
                };
            }
        }

        let mut top = top.clone();
        let mut bottom = bottom.clone();
        let removed = top.prune_leaves(&marked_top) + bottom.prune_leaves(&marked_bottom);
        info!(
            "Feature selection kept {} top and {} bottom features, pruned {}",
            top.len(),
            bottom.len(),
            removed
        );
        Ok((top, bottom))
    }

    fn overlaps(&self, a: &Candidate, b: &Candidate) -> PlanResult<bool> {
        let shared = a.range.1.min(b.range.1) - a.range.0.max(b.range.0);
        if shared <= self.tolerances.distance {
            return Ok(false);
        }
        let area = self
            .kernel
            .intersection_area(std::slice::from_ref(&a.footprint), std::slice::from_ref(&b.footprint))?;
        Ok(area > self.tolerances.no_change_area)
    }

    fn covered_by_accepted(
        &self,
        index: usize,
        candidates: &[Candidate],
        overlaps: &[Vec<usize>],
        status: &[Status],
    ) -> PlanResult<bool> {
        let cover: Vec<&Candidate> = overlaps[index]
            .iter()
            .filter(|&&j| status[j] == Status::Accepted)
            .map(|&j| &candidates[j])
            .collect();
        if cover.is_empty() {
            return Ok(false);
        }
        self.is_covered(&candidates[index], &cover)
    }

    /// Every slab of `a` between cover breakpoints lies inside the cover's footprints
    fn is_covered(&self, a: &Candidate, cover: &[&Candidate]) -> PlanResult<bool> {
        let tol = self.tolerances.distance;
        let (lo, hi) = a.range;
        let mut cuts = vec![lo, hi];
        for c in cover {
            for x in [c.range.0, c.range.1] {
                if x > lo + tol && x < hi - tol {
                    cuts.push(x);
                }
            }
        }
        cuts.sort_by(f64::total_cmp);
        cuts.dedup_by(|x, y| (*x - *y).abs() <= tol);

        for slab in cuts.windows(2) {
            let (start, end) = (slab[0], slab[1]);
            if end - start <= tol {
                continue;
            }
            let spanning: Vec<Polygon2> = cover
                .iter()
                .filter(|c| c.range.0 <= start + tol && c.range.1 >= end - tol)
                .map(|c| c.footprint.clone())
                .collect();
            if spanning.is_empty() {
                return Ok(false);
            }
            let left = self
                .kernel
                .difference_area(std::slice::from_ref(&a.footprint), &spanning)?;
            if left > self.tolerances.no_change_area {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Select with the default kernel and tolerances
pub fn select_top_and_bottom_features(
    top: &FeatureDecomposition,
    bottom: &FeatureDecomposition,
) -> PlanResult<(FeatureDecomposition, FeatureDecomposition)> {
    FeatureSelector::new(Tolerances::default()).select(top, bottom)
}
