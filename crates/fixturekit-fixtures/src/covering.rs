//! Assignment of surfaces to as few fixtures as the greedy cover finds.
//!
//! Each fixture can mill the surfaces reachable along its top normal that
//! are not held by the jaws. Fixtures are picked greedily by how many
//! uncovered surfaces they add, then edge-connected groups of surfaces
//! are consolidated onto the fuller fixtures.

use crate::orientation::Fixture;
use fixturekit_core::{connected_components, PlanError, PlanResult, Surface, Tolerances};
use fixturekit_features::MillabilityAnalyzer;
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Surfaces cut in one fixture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Index into the candidate fixture list.
    pub fixture: usize,
    /// Sorted indices into the surface list.
    pub surfaces: Vec<usize>,
}

/// Sorted surfaces each fixture can mill, in fixture order
pub fn millable_sets(surfaces: &[Surface<'_>], fixtures: &[Fixture<'_>], tolerances: &Tolerances) -> Vec<Vec<usize>> {
    let Some(mesh) = surfaces.first().map(|s| s.mesh()) else {
        return vec![Vec::new(); fixtures.len()];
    };
    let analyzer = MillabilityAnalyzer::new(mesh, *tolerances);
    fixtures
        .par_iter()
        .map(|fixture| {
            analyzer
                .millable_surfaces(&fixture.top_normal(), surfaces)
                .into_iter()
                .filter(|&i| !fixture.is_jaw_occluded(&surfaces[i], tolerances))
                .collect()
        })
        .collect()
}

/// Cover `to_cut` (indices into `surfaces`) with fixtures.
///
/// Assignments come back in pick order; every listed surface appears in
/// exactly one of them.
pub fn pick_orientations(
    surfaces: &[Surface<'_>],
    to_cut: &[usize],
    fixtures: &[Fixture<'_>],
    tolerances: &Tolerances,
) -> PlanResult<Vec<Assignment>> {
    let sets = millable_sets(surfaces, fixtures, tolerances);
    let targets: BTreeSet<usize> = to_cut.iter().copied().collect();

    let unreachable: Vec<usize> = targets
        .iter()
        .copied()
        .filter(|s| !sets.iter().any(|set| set.binary_search(s).is_ok()))
        .collect();
    if !unreachable.is_empty() {
        return Err(PlanError::CoveringInfeasible { uncovered: unreachable });
    }

    let mut uncovered = targets;
    let mut used = vec![false; fixtures.len()];
    let mut assignments: Vec<Assignment> = Vec::new();
    while !uncovered.is_empty() {
        let mut best: Option<(usize, usize, f64)> = None;
        for (f, set) in sets.iter().enumerate() {
            if used[f] {
                continue;
            }
            let gain: Vec<usize> = set.iter().copied().filter(|s| uncovered.contains(s)).collect();
            let area: f64 = gain.iter().map(|&s| surfaces[s].area()).sum();
            let better = match best {
                None => !gain.is_empty(),
                Some((_, count, best_area)) => {
                    gain.len() > count || (gain.len() == count && area > best_area + tolerances.no_change_area)
                }
            };
            if better {
                best = Some((f, gain.len(), area));
            }
        }
        let Some((fixture, count, _)) = best else {
            return Err(PlanError::CoveringInfeasible {
                uncovered: uncovered.into_iter().collect(),
            });
        };
        used[fixture] = true;
        let gained: Vec<usize> = sets[fixture].iter().copied().filter(|s| uncovered.contains(s)).collect();
        for s in &gained {
            uncovered.remove(s);
        }
        debug!("Fixture {} covers {} new surfaces", fixture, count);
        assignments.push(Assignment {
            fixture,
            surfaces: gained,
        });
    }

    let picked = assignments.len();
    consolidate(&mut assignments, surfaces, &sets);
    info!(
        "Covered {} surfaces with {} fixtures ({} before consolidation)",
        to_cut.len(),
        assignments.len(),
        picked
    );
    Ok(assignments)
}

/// Move edge-connected groups onto fixtures holding at least as many
/// surfaces when those fixtures can mill the whole group; drop emptied
/// assignments.
fn consolidate(assignments: &mut Vec<Assignment>, surfaces: &[Surface<'_>], sets: &[Vec<usize>]) {
    loop {
        let mut order: Vec<usize> = (0..assignments.len()).collect();
        order.sort_by_key(|&i| assignments[i].surfaces.len());

        let mut moved = None;
        'search: for &from in &order {
            let size = assignments[from].surfaces.len();
            for component in connected_components(surfaces, &assignments[from].surfaces) {
                let target = (0..assignments.len())
                    .filter(|&to| to != from && assignments[to].surfaces.len() >= size)
                    .filter(|&to| {
                        let set = &sets[assignments[to].fixture];
                        component.iter().all(|s| set.binary_search(s).is_ok())
                    })
                    .max_by(|&a, &b| {
                        assignments[a]
                            .surfaces
                            .len()
                            .cmp(&assignments[b].surfaces.len())
                            .then(b.cmp(&a))
                    });
                if let Some(to) = target {
                    moved = Some((from, to, component));
                    break 'search;
                }
            }
        }

        let Some((from, to, component)) = moved else {
            break;
        };
        debug!(
            "Moving {} surfaces from fixture {} to fixture {}",
            component.len(),
            assignments[from].fixture,
            assignments[to].fixture
        );
        assignments[from].surfaces.retain(|s| !component.contains(s));
        assignments[to].surfaces.extend(component);
        assignments[to].surfaces.sort_unstable();
    }
    assignments.retain(|a| !a.surfaces.is_empty());
}
