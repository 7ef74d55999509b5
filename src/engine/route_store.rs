//! Route storage for the consolidation engine.
//!
//! Routes are kept in insertion order. That order drives the serialized
//! merges of the pipeline, so point indices and first-writer-wins
//! combinations depend on it.

use std::collections::HashMap;

use log::debug;

use crate::error::{ConsolidationError, OptionExt, Result};
use crate::{Route, RouteId};

/// Insertion-ordered set of routes, unique by [`RouteId`].
#[derive(Debug, Clone, Default)]
pub struct RouteStore {
    routes: Vec<Route>,
    index: HashMap<RouteId, usize>,
}

impl RouteStore {
    /// Create a new empty route store.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Validate and add a route.
    ///
    /// Fails with [`ConsolidationError::DuplicateRoute`] if the id is taken,
    /// and with [`ConsolidationError::InvalidRoute`] if the route has fewer
    /// than two distinct coordinates, non-finite coordinates, or a length
    /// that is negative or not finite.
    pub fn add(&mut self, route: Route, tolerance: f64) -> Result<()> {
        if self.index.contains_key(&route.id) {
            return Err(ConsolidationError::DuplicateRoute { route_id: route.id });
        }
        Self::validate(&route, tolerance)?;

        debug!(
            "[RouteStore] Added {} ({} coords, length {})",
            route.id,
            route.geometry.0.len(),
            route.total_length
        );
        self.index.insert(route.id, self.routes.len());
        self.routes.push(route);
        Ok(())
    }

    fn validate(route: &Route, tolerance: f64) -> Result<()> {
        if !route.total_length.is_finite() || route.total_length < 0.0 {
            return Err(ConsolidationError::InvalidRoute {
                route_id: route.id,
                reason: format!("length {} is not a finite non-negative number", route.total_length),
            });
        }
        if route
            .geometry
            .0
            .iter()
            .any(|c| !c.x.is_finite() || !c.y.is_finite())
        {
            return Err(ConsolidationError::InvalidRoute {
                route_id: route.id,
                reason: "geometry contains non-finite coordinates".to_string(),
            });
        }

        let start = route
            .start()
            .ok_or_invalid_route(route.id, "geometry has no coordinates")?;
        route
            .geometry
            .0
            .iter()
            .find(|c| !crate::geometry::coords_equal(**c, start, tolerance))
            .ok_or_invalid_route(route.id, "geometry has fewer than two distinct coordinates")?;
        Ok(())
    }

    /// Get a route by ID.
    pub fn get(&self, id: &RouteId) -> Option<&Route> {
        self.index.get(id).map(|&i| &self.routes[i])
    }

    /// Check if a route exists.
    pub fn contains(&self, id: &RouteId) -> bool {
        self.index.contains_key(id)
    }

    /// All routes in insertion order.
    pub fn as_slice(&self) -> &[Route] {
        &self.routes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Get all route IDs in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = RouteId> + '_ {
        self.routes.iter().map(|r| r.id)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
