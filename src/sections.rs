//! # Route Sectioner
//!
//! Cuts a route into intersection-free sections between consecutive
//! intersection points.
//!
//! ## Algorithm
//! 1. Select every intersection point lying on the route
//! 2. Order them by normalized projected distance; the route's own start
//!    point always comes first and its end point last
//! 3. Walk the ordered points, splitting the remaining tail of the route at
//!    each one; the head becomes the section ending at that point
//! 4. The tail left after the last interior point becomes the final section
//!
//! A point the tail cannot be split at is reported and skipped, so the next
//! section simply starts further back.

use geo::{Coord, LineString};
use log::debug;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ConsolidationError, Diagnostics};
use crate::geometry;
use crate::intersections::IntersectionPointSet;
use crate::progress::{PipelinePhase, ProgressCallback};
use crate::{Route, RouteId};

/// A maximal sub-path of one route between two consecutive intersection points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub route_id: RouteId,
    pub from_point_index: usize,
    pub to_point_index: usize,
    /// Normalized position of the from point along the route (0..1)
    pub from_fraction: f64,
    /// Normalized position of the to point along the route (0..1)
    pub to_fraction: f64,
    pub geometry: LineString<f64>,
}

/// A boundary point on a route: index into the point set and its position.
#[derive(Debug, Clone, Copy)]
struct Boundary {
    index: usize,
    coord: Coord<f64>,
    fraction: f64,
}

/// Intersection points on a route in travel order.
///
/// The route's start and end points are pinned to fractions 0 and 1; for a
/// closed route both are the same point index.
fn ordered_boundaries(route: &Route, points: &IntersectionPointSet) -> Vec<Boundary> {
    let on_route = points.indices_on_line(&route.geometry);
    let start = route.start().and_then(|c| points.find(c));
    let end = route.end().and_then(|c| points.find(c));

    let mut interior: Vec<Boundary> = on_route
        .into_iter()
        .filter(|idx| Some(*idx) != start && Some(*idx) != end)
        .filter_map(|index| {
            let coord = points.get(index)?;
            let projection = geometry::project(&route.geometry, coord)?;
            Some(Boundary {
                index,
                coord,
                fraction: projection.fraction,
            })
        })
        .collect();
    interior.sort_by(|a, b| a.fraction.total_cmp(&b.fraction));

    let boundary = |index: usize, fraction: f64| {
        points.get(index).map(|coord| Boundary {
            index,
            coord,
            fraction,
        })
    };

    let mut ordered = Vec::with_capacity(interior.len() + 2);
    ordered.extend(start.and_then(|idx| boundary(idx, 0.0)));
    ordered.extend(interior);
    ordered.extend(end.and_then(|idx| boundary(idx, 1.0)));
    ordered
}

fn make_section(
    route_id: RouteId,
    from: Boundary,
    to: Boundary,
    geometry: &LineString<f64>,
    tol: f64,
) -> Section {
    Section {
        route_id,
        from_point_index: from.index,
        to_point_index: to.index,
        from_fraction: from.fraction,
        to_fraction: to.fraction,
        geometry: geometry::ensure_endpoints(geometry, from.coord, to.coord, tol),
    }
}

/// Split one route into its ordered sections.
///
/// A route without any intersection point on it (not even its own
/// endpoints) is reported and yields no sections.
pub fn section_route(
    route: &Route,
    points: &IntersectionPointSet,
    diagnostics: &mut Diagnostics,
) -> Vec<Section> {
    let tol = points.tolerance();
    let ordered = ordered_boundaries(route, points);

    let Some((&first, rest)) = ordered.split_first() else {
        diagnostics.report(ConsolidationError::NoIntersectionPoints { route_id: route.id });
        return Vec::new();
    };

    let start_pinned = route
        .start()
        .is_some_and(|c| geometry::coords_equal(c, first.coord, tol));
    let end_pinned = route.end().and_then(|c| points.find(c)).is_some();

    let mut tail = route.geometry.clone();
    if !start_pinned {
        // Without the route start in the set, the first point is only a marker
        debug!("[Sections] {} start is not an intersection point", route.id);
        let mut pieces = geometry::split_at(&tail, first.coord, tol);
        if pieces.len() == 2 {
            tail = pieces.remove(1);
        }
    }

    let mut sections = Vec::with_capacity(rest.len());
    let mut previous = first;

    for (position, &boundary) in rest.iter().enumerate() {
        let is_last = position + 1 == rest.len();

        if is_last && end_pinned {
            sections.push(make_section(route.id, previous, boundary, &tail, tol));
            return sections;
        }

        let pieces = geometry::split_at(&tail, boundary.coord, tol);
        let [head, remainder] = match <[LineString<f64>; 2]>::try_from(pieces) {
            Ok(pair) => pair,
            Err(pieces) => {
                diagnostics.report(ConsolidationError::SplitFailed {
                    route_id: route.id,
                    point_index: boundary.index,
                    piece_count: pieces.len(),
                });
                continue;
            }
        };

        sections.push(make_section(route.id, previous, boundary, &head, tol));
        tail = remainder;
        previous = boundary;
    }

    debug!(
        "[Sections] {} end is not an intersection point, dropping the remaining tail",
        route.id
    );
    sections
}

/// Section every route, returning one section list per route in input order.
pub fn section_routes(
    routes: &[Route],
    points: &IntersectionPointSet,
    diagnostics: &mut Diagnostics,
    progress: &dyn ProgressCallback,
) -> Vec<Vec<Section>> {
    progress.on_phase(PipelinePhase::SectioningRoutes, routes.len() as u32);

    let section_one = |route: &Route| {
        let mut local = Diagnostics::new();
        let sections = section_route(route, points, &mut local);
        progress.on_progress();
        (sections, local)
    };

    #[cfg(feature = "parallel")]
    let results: Vec<(Vec<Section>, Diagnostics)> = routes.par_iter().map(section_one).collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<(Vec<Section>, Diagnostics)> = routes.iter().map(section_one).collect();

    results
        .into_iter()
        .map(|(sections, local)| {
            diagnostics.absorb(local);
            sections
        })
        .collect()
}
