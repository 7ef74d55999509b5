//! # Combination Builder
//!
//! Enumerates every run of consecutive sections on a route as a candidate
//! shared sub-path and attributes freight to it.
//!
//! ## Algorithm
//! For each start section `i` and each end section `j >= i`:
//! 1. Merge section `j` into the accumulated geometry of `i..j`
//! 2. Skip the pair `(from(i), to(j))` if it is already recorded. The key
//!    is the endpoint pair, not the route, so the first route to produce a
//!    pair wins
//! 3. Distance = route length × (position of `to(j)` − position of `from(i)`)
//! 4. Freight = sum of the qualifying freight of every route passing through
//!    both endpoints
//!
//! ## Complexity
//! O(S²) combinations per route and O(R) freight attribution each, so
//! O(R²·S²) overall. This is fine for networks of tens to low hundreds of
//! routes; beyond that the freight attribution dominates.

use std::collections::{HashMap, HashSet};

use geo::LineString;
use log::{debug, info};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ConsolidationError, Diagnostics};
use crate::freight::FreightIndex;
use crate::geometry;
use crate::intersections::IntersectionPointSet;
use crate::progress::{PipelinePhase, ProgressCallback};
use crate::sections::Section;
use crate::{Route, RouteId};

/// Key of a combination: its pair of boundary intersection points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinationKey {
    pub from_point_index: usize,
    pub to_point_index: usize,
}

impl CombinationKey {
    pub fn new(from_point_index: usize, to_point_index: usize) -> Self {
        Self {
            from_point_index,
            to_point_index,
        }
    }
}

impl std::fmt::Display for CombinationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.from_point_index, self.to_point_index)
    }
}

/// One or more consecutive sections of a route: a candidate shared sub-path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContiguousSectionCombination {
    pub from_point_index: usize,
    pub to_point_index: usize,
    /// Route whose sections produced this combination first
    pub route_id: RouteId,
    pub section_count: usize,
    pub geometry: LineString<f64>,
    /// Length in the unit of the route's `total_length`
    pub distance: f64,
    /// Utilization-filtered freight of all routes passing both endpoints
    pub freight_amount: f64,
}

impl ContiguousSectionCombination {
    pub fn key(&self) -> CombinationKey {
        CombinationKey::new(self.from_point_index, self.to_point_index)
    }
}

/// Combinations keyed by endpoint pair, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct CombinationStore {
    combinations: Vec<ContiguousSectionCombination>,
    index: HashMap<CombinationKey, usize>,
}

impl CombinationStore {
    pub fn new() -> Self {
        Self {
            combinations: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn contains(&self, key: &CombinationKey) -> bool {
        self.index.contains_key(key)
    }

    /// Record a combination unless its key is taken. Returns `true` if recorded.
    pub fn insert(&mut self, combination: ContiguousSectionCombination) -> bool {
        let key = combination.key();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.combinations.len());
        self.combinations.push(combination);
        true
    }

    pub fn get(&self, key: &CombinationKey) -> Option<&ContiguousSectionCombination> {
        self.index.get(key).map(|&i| &self.combinations[i])
    }

    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContiguousSectionCombination> {
        self.combinations.iter()
    }

    pub fn as_slice(&self) -> &[ContiguousSectionCombination] {
        &self.combinations
    }
}

impl FromIterator<ContiguousSectionCombination> for CombinationStore {
    fn from_iter<I: IntoIterator<Item = ContiguousSectionCombination>>(iter: I) -> Self {
        let mut store = Self::new();
        for combination in iter {
            store.insert(combination);
        }
        store
    }
}

// ============================================================================
// Freight attribution
// ============================================================================

/// Which intersection points each route passes through, plus its freight.
pub struct FreightAttribution<'a> {
    freight: &'a FreightIndex,
    members: Vec<(RouteId, HashSet<usize>)>,
}

impl<'a> FreightAttribution<'a> {
    /// Record, for every route, the intersection points lying on it.
    pub fn new(routes: &[Route], points: &IntersectionPointSet, freight: &'a FreightIndex) -> Self {
        let locate = |route: &Route| -> (RouteId, HashSet<usize>) {
            (
                route.id,
                points.indices_on_line(&route.geometry).into_iter().collect(),
            )
        };

        #[cfg(feature = "parallel")]
        let members: Vec<(RouteId, HashSet<usize>)> = routes.par_iter().map(locate).collect();
        #[cfg(not(feature = "parallel"))]
        let members: Vec<(RouteId, HashSet<usize>)> = routes.iter().map(locate).collect();

        Self { freight, members }
    }

    /// Routes whose geometry contains both points.
    pub fn routes_through(&self, from: usize, to: usize) -> impl Iterator<Item = RouteId> + '_ {
        self.members
            .iter()
            .filter(move |(_, on_route)| on_route.contains(&from) && on_route.contains(&to))
            .map(|(route_id, _)| *route_id)
    }

    /// Qualifying freight of every route passing through both points.
    pub fn freight_between(&self, from: usize, to: usize) -> f64 {
        self.routes_through(from, to)
            .map(|route_id| self.freight.qualifying_freight(&route_id))
            .sum()
    }
}

// ============================================================================
// Builder
// ============================================================================

fn route_candidates(
    route: &Route,
    sections: &[Section],
    known: &CombinationStore,
    attribution: &FreightAttribution<'_>,
    tol: f64,
    diagnostics: &mut Diagnostics,
) -> Vec<ContiguousSectionCombination> {
    let mut produced: Vec<ContiguousSectionCombination> = Vec::new();
    let mut seen: HashSet<CombinationKey> = HashSet::new();

    for (i, first) in sections.iter().enumerate() {
        let mut accumulated = first.geometry.clone();

        for (j, last) in sections.iter().enumerate().skip(i) {
            if j > i {
                match geometry::join(&accumulated, &last.geometry, tol) {
                    Some(merged) => accumulated = merged,
                    None => {
                        diagnostics.report(ConsolidationError::MergeFailed {
                            route_id: route.id,
                            from_point_index: first.from_point_index,
                            to_point_index: last.to_point_index,
                        });
                        continue;
                    }
                }
            }

            let key = CombinationKey::new(first.from_point_index, last.to_point_index);
            if key.from_point_index == key.to_point_index {
                continue;
            }
            if known.contains(&key) || !seen.insert(key) {
                debug!("[Combinations] {} already recorded, skipping", key);
                continue;
            }

            let distance = route.total_length * (last.to_fraction - first.from_fraction);
            produced.push(ContiguousSectionCombination {
                from_point_index: key.from_point_index,
                to_point_index: key.to_point_index,
                route_id: route.id,
                section_count: j - i + 1,
                geometry: accumulated.clone(),
                distance,
                freight_amount: attribution.freight_between(
                    key.from_point_index,
                    key.to_point_index,
                ),
            });
        }
    }

    debug!(
        "[Combinations] {} sections on {} -> {} new combinations",
        sections.len(),
        route.id,
        produced.len()
    );
    produced
}

fn check_distance(
    route: &Route,
    combination: &ContiguousSectionCombination,
    diagnostics: &mut Diagnostics,
) {
    let distance = combination.distance;
    if distance < 0.0 || distance > route.total_length {
        diagnostics.report(ConsolidationError::DistanceOutOfRange {
            route_id: route.id,
            from_point_index: combination.from_point_index,
            to_point_index: combination.to_point_index,
            distance,
            total_length: route.total_length,
        });
    }
}

/// Enumerate the new contiguous section combinations of one route.
///
/// Keys already in `known`, and keys seen earlier on this route, are
/// skipped. Combinations whose endpoints coincide (a route returning to a
/// point) are never produced. A distance outside `[0, total_length]` is
/// reported and the combination is still returned.
pub fn build_route_combinations(
    route: &Route,
    sections: &[Section],
    known: &CombinationStore,
    attribution: &FreightAttribution<'_>,
    tol: f64,
    diagnostics: &mut Diagnostics,
) -> Vec<ContiguousSectionCombination> {
    let produced = route_candidates(route, sections, known, attribution, tol, diagnostics);
    for combination in &produced {
        check_distance(route, combination, diagnostics);
    }
    produced
}

/// Insert a combination unless its key is taken, checking its distance first.
fn record(
    store: &mut CombinationStore,
    route: &Route,
    combination: ContiguousSectionCombination,
    diagnostics: &mut Diagnostics,
) {
    if store.contains(&combination.key()) {
        return;
    }
    check_distance(route, &combination, diagnostics);
    store.insert(combination);
}

/// Build combinations for every route and record them in `store`.
///
/// `sections` holds one section list per route, aligned with `routes`.
/// Results are inserted in route order with first-writer-wins, so the
/// parallel and sequential paths record the same combinations and report
/// the same diagnostics. Distances are only checked for combinations that
/// get recorded. Returns the number of newly recorded combinations.
pub fn build_combinations(
    routes: &[Route],
    sections: &[Vec<Section>],
    store: &mut CombinationStore,
    attribution: &FreightAttribution<'_>,
    tol: f64,
    diagnostics: &mut Diagnostics,
    progress: &dyn ProgressCallback,
) -> usize {
    progress.on_phase(PipelinePhase::BuildingCombinations, routes.len() as u32);
    let before = store.len();

    #[cfg(feature = "parallel")]
    {
        let known: &CombinationStore = store;
        let results: Vec<(Vec<ContiguousSectionCombination>, Diagnostics)> = routes
            .par_iter()
            .zip(sections.par_iter())
            .map(|(route, route_sections)| {
                let mut local = Diagnostics::new();
                let built =
                    route_candidates(route, route_sections, known, attribution, tol, &mut local);
                progress.on_progress();
                (built, local)
            })
            .collect();

        for (route, (built, local)) in routes.iter().zip(results) {
            diagnostics.absorb(local);
            for combination in built {
                record(store, route, combination, diagnostics);
            }
        }
    }

    #[cfg(not(feature = "parallel"))]
    for (route, route_sections) in routes.iter().zip(sections) {
        let built = route_candidates(route, route_sections, store, attribution, tol, diagnostics);
        for combination in built {
            record(store, route, combination, diagnostics);
        }
        progress.on_progress();
    }

    let added = store.len() - before;
    info!(
        "[Combinations] {} new combinations ({} total)",
        added,
        store.len()
    );
    added
}
