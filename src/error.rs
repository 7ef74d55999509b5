//! Error types and the recoverable diagnostics channel.
//!
//! Fatal conditions (I/O, malformed input) are returned through [`Result`].
//! Geometric and data-quality problems found while processing a single
//! route pair or combination are never fatal: they are reported into a
//! [`Diagnostics`] sink, logged, and the run continues with fewer results.

use log::warn;
use thiserror::Error;

use crate::{RouteId, RoutePair};

/// Result alias for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, ConsolidationError>;

#[derive(Debug, Error)]
pub enum ConsolidationError {
    /// An intersection or merge produced a shape outside the classification rules.
    #[error("unexpected geometry for {pair}: {detail}")]
    UnexpectedGeometry { pair: RoutePair, detail: String },

    /// Splitting a route at a boundary point did not yield exactly two pieces.
    #[error("splitting route {route_id} at point {point_index} produced {piece_count} pieces")]
    SplitFailed {
        route_id: RouteId,
        point_index: usize,
        piece_count: usize,
    },

    /// Consecutive sections could not be merged into one connected line.
    #[error("sections of route {route_id} from point {from_point_index} to {to_point_index} do not merge into one line")]
    MergeFailed {
        route_id: RouteId,
        from_point_index: usize,
        to_point_index: usize,
    },

    /// A combination distance fell outside `[0, total_length]`.
    #[error("distance {distance:.3} of combination {from_point_index}->{to_point_index} on route {route_id} is outside [0, {total_length:.3}]")]
    DistanceOutOfRange {
        route_id: RouteId,
        from_point_index: usize,
        to_point_index: usize,
        distance: f64,
        total_length: f64,
    },

    /// No intersection point lies on a route, not even its own endpoints.
    #[error("no intersection points found on route {route_id}")]
    NoIntersectionPoints { route_id: RouteId },

    #[error("route {route_id} was already added")]
    DuplicateRoute { route_id: RouteId },

    #[error("invalid route {route_id}: {reason}")]
    InvalidRoute { route_id: RouteId, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConsolidationError {
    /// Whether the pipeline can skip the offending item and carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ConsolidationError::UnexpectedGeometry { .. }
                | ConsolidationError::SplitFailed { .. }
                | ConsolidationError::MergeFailed { .. }
                | ConsolidationError::DistanceOutOfRange { .. }
                | ConsolidationError::NoIntersectionPoints { .. }
        )
    }
}

/// Extension for turning missing values into [`ConsolidationError::InvalidRoute`].
pub trait OptionExt<T> {
    fn ok_or_invalid_route(self, route_id: RouteId, reason: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_invalid_route(self, route_id: RouteId, reason: &str) -> Result<T> {
        self.ok_or_else(|| ConsolidationError::InvalidRoute {
            route_id,
            reason: reason.to_string(),
        })
    }
}

/// Collector for recoverable conditions raised during a run.
///
/// Every report is logged at `warn` level as it arrives.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<ConsolidationError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn report(&mut self, error: ConsolidationError) {
        warn!("{}", error);
        self.entries.push(error);
    }

    /// Move all entries of `other` into this sink without logging them again.
    pub fn absorb(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConsolidationError> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<ConsolidationError> {
        self.entries
    }
}
