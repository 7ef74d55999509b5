//! # Consolidation Engine
//!
//! Incremental driver owning the route network and every derived cache.
//!
//! ## Architecture
//!
//! - `RouteStore` - insertion-ordered routes with input validation
//! - `IntersectionPointSet` / `ComparedPairs` - append-only point cache and
//!   the record of which route pairs were already intersected
//! - per-route sections, recomputed each run since new points may cut old routes
//! - `CombinationStore` - first-writer-wins combinations keyed by endpoint pair
//!
//! Adding routes never invalidates earlier work: the next [`run`] only
//! compares the new pairs, and existing combinations keep their freight.
//!
//! [`run`]: ConsolidationEngine::run

pub mod route_store;

pub use route_store::RouteStore;

use std::collections::{HashMap, HashSet};

use log::info;

use crate::combinations::{self, CombinationStore, FreightAttribution};
use crate::error::{ConsolidationError, Diagnostics, Result};
use crate::evaluation::{self, Evaluation, EvaluationConfig};
use crate::freight::FreightIndex;
use crate::intersections::{self, ComparedPairs, IntersectionPointSet};
use crate::persistence::EngineSnapshot;
use crate::progress::{NoopProgress, ProgressCallback};
use crate::sections::{self, Section};
use crate::{ConsolidationConfig, Route, RouteId, Shipment};

/// Counts and diagnostics of one engine run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Intersection points added to the point set
    pub new_points: usize,
    /// Route pairs intersected for the first time
    pub new_compared_pairs: usize,
    /// Sections whose endpoint pair did not exist on their route before
    pub new_sections: usize,
    /// Combinations recorded in the store
    pub new_combinations: usize,
    /// Recoverable problems met along the way
    pub diagnostics: Vec<ConsolidationError>,
}

impl RunReport {
    /// True if the run added nothing.
    pub fn is_unchanged(&self) -> bool {
        self.new_points == 0
            && self.new_compared_pairs == 0
            && self.new_sections == 0
            && self.new_combinations == 0
    }
}

/// Route network decomposition engine.
pub struct ConsolidationEngine {
    routes: RouteStore,
    shipments: Vec<Shipment>,

    // Caches
    points: IntersectionPointSet,
    compared: ComparedPairs,
    sections: HashMap<RouteId, Vec<Section>>,
    combinations: CombinationStore,

    config: ConsolidationConfig,
}

impl Default for ConsolidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsolidationEngine {
    /// Create a new engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(ConsolidationConfig::default())
    }

    /// Create a new engine with custom configuration.
    pub fn with_config(config: ConsolidationConfig) -> Self {
        Self {
            routes: RouteStore::new(),
            shipments: Vec::new(),
            points: IntersectionPointSet::new(config.coordinate_tolerance),
            compared: ComparedPairs::new(),
            sections: HashMap::new(),
            combinations: CombinationStore::new(),
            config,
        }
    }

    pub fn config(&self) -> &ConsolidationConfig {
        &self.config
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Add a route. Duplicates and malformed routes are rejected.
    pub fn add_route(&mut self, route: Route) -> Result<()> {
        self.routes.add(route, self.config.coordinate_tolerance)
    }

    /// Add several routes, stopping at the first rejected one.
    pub fn add_routes(&mut self, routes: impl IntoIterator<Item = Route>) -> Result<()> {
        for route in routes {
            self.add_route(route)?;
        }
        Ok(())
    }

    /// Append shipments. Shipments of unknown routes are kept but never attributed.
    pub fn add_shipments(&mut self, shipments: Vec<Shipment>) {
        self.shipments.extend(shipments);
    }

    pub fn routes(&self) -> &RouteStore {
        &self.routes
    }

    pub fn shipments(&self) -> &[Shipment] {
        &self.shipments
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Run the pipeline over all routes added so far.
    pub fn run(&mut self) -> RunReport {
        self.run_with_progress(&NoopProgress)
    }

    /// Run the pipeline, reporting phase transitions and per-item progress.
    pub fn run_with_progress(&mut self, progress: &dyn ProgressCallback) -> RunReport {
        let mut diagnostics = Diagnostics::new();
        let tol = self.config.coordinate_tolerance;
        let routes = self.routes.as_slice();

        let scan = intersections::scan_routes(
            routes,
            &mut self.compared,
            &mut self.points,
            &mut diagnostics,
            progress,
        );

        let sectioned = sections::section_routes(routes, &self.points, &mut diagnostics, progress);
        let new_sections: usize = routes
            .iter()
            .zip(&sectioned)
            .map(|(route, current)| count_new_sections(self.sections.get(&route.id), current))
            .sum();

        let freight = FreightIndex::build(&self.shipments, &self.config);
        let attribution = FreightAttribution::new(routes, &self.points, &freight);
        let new_combinations = combinations::build_combinations(
            routes,
            &sectioned,
            &mut self.combinations,
            &attribution,
            tol,
            &mut diagnostics,
            progress,
        );

        self.sections = routes
            .iter()
            .map(|route| route.id)
            .zip(sectioned)
            .collect();

        let report = RunReport {
            new_points: scan.new_points,
            new_compared_pairs: scan.compared_pairs,
            new_sections,
            new_combinations,
            diagnostics: diagnostics.into_vec(),
        };

        info!(
            "[Engine] Run over {} routes: {} new points, {} new pairs, {} new sections, {} new combinations, {} diagnostics",
            routes.len(),
            report.new_points,
            report.new_compared_pairs,
            report.new_sections,
            report.new_combinations,
            report.diagnostics.len()
        );
        report
    }

    /// Filter the recorded combinations and optionally compute their Pareto front.
    pub fn evaluate(&self, config: &EvaluationConfig) -> Evaluation {
        evaluation::evaluate(self.combinations.as_slice(), config)
    }

    // ========================================================================
    // Cache access
    // ========================================================================

    pub fn intersection_points(&self) -> &IntersectionPointSet {
        &self.points
    }

    pub fn compared_pairs(&self) -> &ComparedPairs {
        &self.compared
    }

    /// Sections of a route from the last run, in travel order.
    pub fn sections_for(&self, route_id: &RouteId) -> &[Section] {
        self.sections
            .get(route_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of sections from the last run.
    pub fn section_count(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }

    pub fn combinations(&self) -> &CombinationStore {
        &self.combinations
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Copy the caches into a serializable snapshot.
    ///
    /// Sections are listed in route insertion order.
    pub fn snapshot(&self) -> EngineSnapshot {
        let mut sections: Vec<Section> = self
            .routes
            .ids()
            .flat_map(|id| self.sections_for(&id).iter().cloned())
            .collect();
        // Sections of restored routes that were not added again
        let mut orphaned: Vec<&RouteId> = self
            .sections
            .keys()
            .filter(|id| !self.routes.contains(id))
            .collect();
        orphaned.sort();
        for id in orphaned {
            sections.extend(self.sections_for(id).iter().cloned());
        }

        EngineSnapshot {
            intersection_points: self.points.points().to_vec(),
            already_compared: self.compared.to_sorted_vec(),
            sections,
            combinations: self.combinations.as_slice().to_vec(),
        }
    }

    /// Replace the caches with a snapshot. Routes and shipments are untouched.
    pub fn restore(&mut self, snapshot: EngineSnapshot) {
        self.points = IntersectionPointSet::from_points(
            snapshot.intersection_points,
            self.config.coordinate_tolerance,
        );
        self.compared = snapshot.already_compared.into_iter().collect();

        let mut sections: HashMap<RouteId, Vec<Section>> = HashMap::new();
        for section in snapshot.sections {
            sections.entry(section.route_id).or_default().push(section);
        }
        self.sections = sections;
        self.combinations = snapshot.combinations.into_iter().collect();

        info!(
            "[Engine] Restored {} points, {} compared pairs, {} sections, {} combinations",
            self.points.len(),
            self.compared.len(),
            self.section_count(),
            self.combinations.len()
        );
    }
}

fn count_new_sections(previous: Option<&Vec<Section>>, current: &[Section]) -> usize {
    let known: HashSet<(usize, usize)> = previous
        .into_iter()
        .flatten()
        .map(|s| (s.from_point_index, s.to_point_index))
        .collect();
    current
        .iter()
        .filter(|s| !known.contains(&(s.from_point_index, s.to_point_index)))
        .count()
}
