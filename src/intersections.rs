//! # Intersection Finder
//!
//! Computes the canonical, deduplicated set of intersection points of a
//! route network:
//! 1. Every route contributes its own start and end point
//! 2. Every unordered pair of routes is intersected exactly once
//! 3. Shared line pieces contribute their endpoints; point-only crossings
//!    carry no length and are ignored
//! 4. Candidates are merged into the point set in one serialized step
//!
//! Point indices are stable once assigned. Later stages identify points by
//! index only and never re-derive them from geometry.

use std::collections::HashSet;

use geo::{Coord, LineString};
use log::{debug, info};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::error::{ConsolidationError, Diagnostics, Result};
use crate::geometry::{self, Intersection};
use crate::progress::{PipelinePhase, ProgressCallback};
use crate::{Route, RoutePair};

// ============================================================================
// Point set
// ============================================================================

/// An intersection point with its index for R-tree queries
#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    idx: usize,
    x: f64,
    y: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

/// Append-only, index-addressed collection of intersection points.
///
/// No two points are within the tolerance of each other.
#[derive(Debug, Clone)]
pub struct IntersectionPointSet {
    points: Vec<Coord<f64>>,
    tree: RTree<IndexedPoint>,
    tolerance: f64,
}

impl IntersectionPointSet {
    pub fn new(tolerance: f64) -> Self {
        Self {
            points: Vec::new(),
            tree: RTree::new(),
            tolerance,
        }
    }

    /// Rebuild a set from stored points, dropping any duplicates.
    pub fn from_points(points: impl IntoIterator<Item = Coord<f64>>, tolerance: f64) -> Self {
        let mut set = Self::new(tolerance);
        for p in points {
            set.insert(p);
        }
        set
    }

    /// Index of the stored point equal to `p` within tolerance.
    pub fn find(&self, p: Coord<f64>) -> Option<usize> {
        let query = [p.x, p.y];
        self.tree
            .nearest_neighbor(&query)
            .filter(|nearest| nearest.distance_2(&query) <= self.tolerance * self.tolerance)
            .map(|nearest| nearest.idx)
    }

    /// Insert a point unless an equal one exists.
    ///
    /// Returns the point's index and whether it was newly added.
    pub fn insert(&mut self, p: Coord<f64>) -> (usize, bool) {
        if let Some(idx) = self.find(p) {
            return (idx, false);
        }
        let idx = self.points.len();
        self.points.push(p);
        self.tree.insert(IndexedPoint { idx, x: p.x, y: p.y });
        (idx, true)
    }

    pub fn get(&self, idx: usize) -> Option<Coord<f64>> {
        self.points.get(idx).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn points(&self) -> &[Coord<f64>] {
        &self.points
    }

    /// Indices of all points lying on a line, in ascending index order.
    pub fn indices_on_line(&self, line: &LineString<f64>) -> Vec<usize> {
        let Some(bounds) = crate::Bounds::from_coords(&line.0) else {
            return Vec::new();
        };
        let bounds = bounds.expanded(self.tolerance);
        let envelope = AABB::from_corners([bounds.min_x, bounds.min_y], [bounds.max_x, bounds.max_y]);

        let mut indices: Vec<usize> = self
            .tree
            .locate_in_envelope(&envelope)
            .filter(|p| geometry::point_on_line(line, Coord { x: p.x, y: p.y }, self.tolerance))
            .map(|p| p.idx)
            .collect();
        indices.sort_unstable();
        indices
    }
}

// ============================================================================
// Compared-pair cache
// ============================================================================

/// Unordered route pairs whose intersection has already been computed.
#[derive(Debug, Clone, Default)]
pub struct ComparedPairs {
    pairs: HashSet<RoutePair>,
}

impl ComparedPairs {
    pub fn new() -> Self {
        Self {
            pairs: HashSet::new(),
        }
    }

    pub fn contains(&self, pair: &RoutePair) -> bool {
        self.pairs.contains(pair)
    }

    /// Returns `true` if the pair was not recorded before.
    pub fn insert(&mut self, pair: RoutePair) -> bool {
        self.pairs.insert(pair)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// All pairs in sorted order.
    pub fn to_sorted_vec(&self) -> Vec<RoutePair> {
        let mut pairs: Vec<RoutePair> = self.pairs.iter().copied().collect();
        pairs.sort_unstable();
        pairs
    }
}

impl FromIterator<RoutePair> for ComparedPairs {
    fn from_iter<I: IntoIterator<Item = RoutePair>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

fn endpoints(line: &LineString<f64>) -> Option<[Coord<f64>; 2]> {
    Some([*line.0.first()?, *line.0.last()?])
}

fn line_endpoints(
    pair: RoutePair,
    lines: Vec<LineString<f64>>,
    tol: f64,
) -> Result<Vec<Coord<f64>>> {
    let merged = geometry::merge_lines(lines, tol);
    if merged.len() > 1 {
        debug!("[Intersections] {} shares {} disjoint lines", pair, merged.len());
    }

    let mut boundary = Vec::with_capacity(merged.len() * 2);
    for line in &merged {
        if geometry::is_degenerate(line, tol) {
            return Err(ConsolidationError::UnexpectedGeometry {
                pair,
                detail: format!("degenerate shared line with {} coordinates", line.0.len()),
            });
        }
        if let Some(ends) = endpoints(line) {
            boundary.extend(ends);
        }
    }

    if boundary.is_empty() {
        return Err(ConsolidationError::UnexpectedGeometry {
            pair,
            detail: "shared lines merged into nothing".to_string(),
        });
    }
    Ok(boundary)
}

/// Boundary points contributed by the intersection of a route pair.
///
/// Only shared line pieces produce points: a connected piece contributes its
/// two endpoints, disjoint pieces contribute the endpoints of each. A single
/// crossing point is ignored, as are the point parts of a mixed result.
/// Several crossing points without any shared line are unexpected geometry.
pub fn boundary_points(
    pair: RoutePair,
    intersection: Intersection,
    tol: f64,
) -> Result<Vec<Coord<f64>>> {
    match intersection {
        Intersection::Empty | Intersection::Point(_) => Ok(vec![]),
        Intersection::MultiPoint(points) => Err(ConsolidationError::UnexpectedGeometry {
            pair,
            detail: format!("{} isolated crossing points", points.len()),
        }),
        Intersection::Line(line) => line_endpoints(pair, vec![line], tol),
        Intersection::MultiLine(lines) => line_endpoints(pair, lines, tol),
        Intersection::Collection { lines, .. } => line_endpoints(pair, lines, tol),
    }
}

/// Intersect a single route pair and classify the result.
pub fn compare_pair(a: &Route, b: &Route, tol: f64) -> Result<Vec<Coord<f64>>> {
    let pair = RoutePair::new(a.id, b.id);

    let disjoint = match (a.bounds(), b.bounds()) {
        (Some(ba), Some(bb)) => !ba.expanded(tol).intersects(&bb),
        _ => true,
    };
    if disjoint {
        return Ok(vec![]);
    }

    let intersection = geometry::intersection(&a.geometry, &b.geometry, tol);
    debug!("[Intersections] {} -> {}", pair, intersection.kind());
    boundary_points(pair, intersection, tol)
}

// ============================================================================
// Scan
// ============================================================================

/// Summary of one intersection scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntersectionScan {
    /// Route pairs intersected in this scan
    pub compared_pairs: usize,
    /// Candidate coordinates produced before deduplication
    pub candidate_points: usize,
    /// Points added to the set
    pub new_points: usize,
}

/// Compare every route pair not yet in `compared` and merge the results into `points`.
///
/// Pair intersections run in parallel with the `parallel` feature. The merge
/// into the point set is sequential and follows route order: each route's
/// endpoints, then the candidates of its pairs with later routes. A pair
/// whose result cannot be classified is reported and still marked compared.
pub fn scan_routes(
    routes: &[Route],
    compared: &mut ComparedPairs,
    points: &mut IntersectionPointSet,
    diagnostics: &mut Diagnostics,
    progress: &dyn ProgressCallback,
) -> IntersectionScan {
    let tol = points.tolerance();

    let pending: Vec<(usize, usize)> = (0..routes.len())
        .flat_map(|i| ((i + 1)..routes.len()).map(move |j| (i, j)))
        .filter(|&(i, j)| !compared.contains(&RoutePair::new(routes[i].id, routes[j].id)))
        .collect();

    progress.on_phase(PipelinePhase::ComparingRoutes, pending.len() as u32);

    let compare = |&(i, j): &(usize, usize)| {
        let result = compare_pair(&routes[i], &routes[j], tol);
        progress.on_progress();
        (i, j, result)
    };

    #[cfg(feature = "parallel")]
    let results: Vec<(usize, usize, Result<Vec<Coord<f64>>>)> =
        pending.par_iter().map(compare).collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<(usize, usize, Result<Vec<Coord<f64>>>)> =
        pending.iter().map(compare).collect();

    let mut scan = IntersectionScan {
        compared_pairs: results.len(),
        ..IntersectionScan::default()
    };

    let mut results = results.into_iter().peekable();
    for (i, route) in routes.iter().enumerate() {
        for end in [route.start(), route.end()].into_iter().flatten() {
            scan.candidate_points += 1;
            if points.insert(end).1 {
                scan.new_points += 1;
            }
        }

        while let Some((_, j, result)) = results.next_if(|(first, _, _)| *first == i) {
            compared.insert(RoutePair::new(route.id, routes[j].id));
            match result {
                Ok(candidates) => {
                    for p in candidates {
                        scan.candidate_points += 1;
                        if points.insert(p).1 {
                            scan.new_points += 1;
                        }
                    }
                }
                Err(e) => diagnostics.report(e),
            }
        }
    }

    info!(
        "[Intersections] Compared {} route pairs, {} candidates, {} new points ({} total)",
        scan.compared_pairs,
        scan.candidate_points,
        scan.new_points,
        points.len()
    );

    scan
}

/// One-shot intersection of a route network from empty caches.
pub fn find_intersection_points(
    routes: &[Route],
    tolerance: f64,
) -> (IntersectionPointSet, Diagnostics) {
    let mut compared = ComparedPairs::new();
    let mut points = IntersectionPointSet::new(tolerance);
    let mut diagnostics = Diagnostics::new();
    scan_routes(
        routes,
        &mut compared,
        &mut points,
        &mut diagnostics,
        &crate::progress::NoopProgress,
    );
    (points, diagnostics)
}
