//! # Freight Match
//!
//! Route network decomposition and freight consolidation candidate detection.
//!
//! Given a set of point-to-point road routes (polylines) and the shipments
//! travelling each of them, this library finds sub-paths shared by many
//! routes that carry enough freight to justify consolidating shipments onto
//! a common leg.
//!
//! This library provides:
//! - A planar geometry kernel (intersection, projection, splitting, merging)
//! - All-pairs route intersection with tolerant point deduplication
//! - Route sectioning at intersection points
//! - Contiguous section combinations with utilization-filtered freight
//! - Threshold filtering and Pareto frontier evaluation
//! - An incremental engine with JSON cache persistence
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel processing with rayon (default)
//! - **`synthetic`** - Seeded synthetic networks for benchmarks
//! - **`cli`** - Build the `freightmatch-cli` binary
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use freightmatch::{ConsolidationEngine, Route, Shipment};
//!
//! let mut engine = ConsolidationEngine::new();
//! engine
//!     .add_route(Route::new(1, 2, vec![(0.0, 0.0), (10.0, 0.0)], 10.0))
//!     .unwrap();
//! engine
//!     .add_route(Route::new(3, 4, vec![(2.0, 0.0), (8.0, 0.0)], 6.0))
//!     .unwrap();
//! let date = NaiveDate::from_ymd_opt(2021, 3, 2).unwrap();
//! engine.add_shipments(vec![Shipment::new(date, 1, 2, 25.0)]);
//!
//! let report = engine.run();
//! assert!(report.new_combinations > 0);
//! ```

use geo::{Coord, LineString};
use rstar::{AABB, RTreeObject};
use serde::{Deserialize, Serialize};

// Unified error handling and recoverable diagnostics
pub mod error;
pub use error::{ConsolidationError, Diagnostics, OptionExt, Result};

// Planar geometry kernel
pub mod geometry;
pub use geometry::{Intersection, Projection};

// All-pairs route intersection and the canonical point set
pub mod intersections;
pub use intersections::{ComparedPairs, IntersectionPointSet, IntersectionScan};

// Splitting routes into intersection-free sections
pub mod sections;
pub use sections::{Section, section_route};

// Weekly utilization aggregation of shipments
pub mod freight;
pub use freight::{CalendarWeek, FreightIndex, WeeklyLoad};

// Contiguous section combinations and freight attribution
pub mod combinations;
pub use combinations::{CombinationKey, CombinationStore, ContiguousSectionCombination};

// Threshold filtering and Pareto frontier
pub mod evaluation;
pub use evaluation::{Evaluation, EvaluationConfig, evaluate, pareto_front};

// Progress reporting for the long-running stages
pub mod progress;
pub use progress::{AtomicProgressTracker, NoopProgress, PipelinePhase, ProgressCallback};

// Incremental engine owning the caches
pub mod engine;
pub use engine::{ConsolidationEngine, RouteStore, RunReport};

// JSON snapshot of the engine caches
pub mod persistence;
pub use persistence::{EngineSnapshot, load_snapshot, save_snapshot};

// Synthetic grid networks for benchmarks
#[cfg(feature = "synthetic")]
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// Identifier of a route: the ordered (origin, destination) location pair.
///
/// # Example
/// ```
/// use freightmatch::RouteId;
/// let id = RouteId::new(4, 17);
/// assert_eq!(id.to_string(), "r4_r17");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteId {
    pub origin_id: u64,
    pub destination_id: u64,
}

impl RouteId {
    pub fn new(origin_id: u64, destination_id: u64) -> Self {
        Self {
            origin_id,
            destination_id,
        }
    }
}

impl std::fmt::Display for RouteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}_r{}", self.origin_id, self.destination_id)
    }
}

/// Unordered pair of routes, used as the key of the compared-pair cache.
///
/// Construction normalizes the order, so `(a, b)` and `(b, a)` are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoutePair {
    pub first: RouteId,
    pub second: RouteId,
}

impl RoutePair {
    pub fn new(a: RouteId, b: RouteId) -> Self {
        if a <= b {
            Self {
                first: a,
                second: b,
            }
        } else {
            Self {
                first: b,
                second: a,
            }
        }
    }
}

impl std::fmt::Display for RoutePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} x {}", self.first, self.second)
    }
}

/// A geocoded location referenced by routes and shipments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub location_id: u64,
    pub coord: Coord<f64>,
}

impl Location {
    pub fn new(location_id: u64, x: f64, y: f64) -> Self {
        Self {
            location_id,
            coord: Coord { x, y },
        }
    }
}

/// A driving route between two locations.
///
/// The geometry is the routing service's polyline in a single planar
/// projection; `total_length` is the routing service's reported length
/// (e.g. km) and is what combination distances are scaled by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: RouteId,
    pub geometry: LineString<f64>,
    pub total_length: f64,
}

impl Route {
    /// Create a route from a list of `(x, y)` coordinates.
    pub fn new(
        origin_id: u64,
        destination_id: u64,
        coords: Vec<(f64, f64)>,
        total_length: f64,
    ) -> Self {
        Self {
            id: RouteId::new(origin_id, destination_id),
            geometry: LineString::from(coords),
            total_length,
        }
    }

    /// First coordinate of the polyline.
    pub fn start(&self) -> Option<Coord<f64>> {
        self.geometry.0.first().copied()
    }

    /// Last coordinate of the polyline.
    pub fn end(&self) -> Option<Coord<f64>> {
        self.geometry.0.last().copied()
    }

    /// Bounding box of the polyline.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_coords(&self.geometry.0)
    }
}

/// A single shipment travelling a route on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub date: chrono::NaiveDate,
    pub origin_id: u64,
    pub destination_id: u64,
    /// Weight in tons
    pub weight: f64,
}

impl Shipment {
    pub fn new(date: chrono::NaiveDate, origin_id: u64, destination_id: u64, weight: f64) -> Self {
        Self {
            date,
            origin_id,
            destination_id,
            weight,
        }
    }

    /// The route this shipment travels on.
    pub fn route_id(&self) -> RouteId {
        RouteId::new(self.origin_id, self.destination_id)
    }
}

/// Axis-aligned bounding box in route coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Create bounds from coordinates.
    pub fn from_coords(coords: &[Coord<f64>]) -> Option<Self> {
        if coords.is_empty() {
            return None;
        }
        let mut min_x = f64::MAX;
        let mut max_x = f64::MIN;
        let mut min_y = f64::MAX;
        let mut max_y = f64::MIN;

        for c in coords {
            min_x = min_x.min(c.x);
            max_x = max_x.max(c.x);
            min_y = min_y.min(c.y);
            max_y = max_y.max(c.y);
        }

        Some(Self {
            min_x,
            max_x,
            min_y,
            max_y,
        })
    }

    /// Grow the box by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            max_x: self.max_x + margin,
            min_y: self.min_y - margin,
            max_y: self.max_y + margin,
        }
    }

    /// Check whether two boxes overlap (touching counts).
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

impl RTreeObject for Bounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

/// Configuration for network decomposition and freight attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationConfig {
    /// Two coordinates closer than this are the same point.
    /// Also the maximum offset for a point to count as lying on a line.
    /// Default: 1e-7 (about 1cm when coordinates are degrees)
    pub coordinate_tolerance: f64,

    /// Capacity of the smallest load unit, in tons.
    /// Default: 28.3 (one TEU by weight)
    pub unit_capacity: f64,

    /// Weekly utilization a route must exceed for that week's freight to count.
    /// Default: 0.8
    pub min_utilization: f64,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            coordinate_tolerance: 1e-7,
            unit_capacity: 28.3,
            min_utilization: 0.8,
        }
    }
}
