//! Synthetic route networks for stress testing and benchmarking.
//!
//! Locations sit on a square grid and every route drives an L-shaped path
//! along the grid lines (first along x, then along y). Routes running
//! along the same grid line share sub-paths, so the generated networks
//! have plenty of shared legs to decompose.
//!
//! Feature-gated behind `synthetic`.
//!
//! # Example
//!
//! ```rust
//! use freightmatch::synthetic::SyntheticNetwork;
//!
//! let network = SyntheticNetwork {
//!     grid_size: 6,
//!     route_count: 20,
//!     ..SyntheticNetwork::default()
//! };
//!
//! let dataset = network.generate();
//! assert_eq!(dataset.routes.len(), 20);
//! ```

use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Location, Route, RouteId, Shipment};

/// Configuration of a generated network.
#[derive(Debug, Clone)]
pub struct SyntheticNetwork {
    /// Number of grid nodes along each axis.
    pub grid_size: u64,
    /// Distance between neighbouring grid nodes in coordinate units.
    pub spacing: f64,
    /// Reported route length per coordinate unit travelled.
    pub length_per_unit: f64,
    /// Number of distinct routes to generate (capped by the grid).
    pub route_count: usize,
    /// Shipments generated per route.
    pub shipments_per_route: usize,
    /// First possible shipment date.
    pub start_date: NaiveDate,
    /// Shipment dates are spread over this many days.
    pub days: u64,
    /// Upper bound of a single shipment weight in tons.
    pub max_weight: f64,
    /// RNG seed for deterministic reproduction.
    pub seed: u64,
}

impl Default for SyntheticNetwork {
    fn default() -> Self {
        Self {
            grid_size: 10,
            spacing: 1.0,
            length_per_unit: 100.0,
            route_count: 50,
            shipments_per_route: 20,
            start_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default(),
            days: 90,
            max_weight: 30.0,
            seed: 42,
        }
    }
}

/// A generated network.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub locations: Vec<Location>,
    pub routes: Vec<Route>,
    pub shipments: Vec<Shipment>,
}

impl SyntheticNetwork {
    fn location_id(&self, col: u64, row: u64) -> u64 {
        row * self.grid_size + col
    }

    fn node(&self, col: u64, row: u64) -> (f64, f64) {
        (col as f64 * self.spacing, row as f64 * self.spacing)
    }

    fn route(&self, from: (u64, u64), to: (u64, u64)) -> Route {
        let start = self.node(from.0, from.1);
        let corner = self.node(to.0, from.1);
        let end = self.node(to.0, to.1);

        let mut coords = vec![start];
        if corner != start && corner != end {
            coords.push(corner);
        }
        coords.push(end);

        let travelled = (end.0 - start.0).abs() + (end.1 - start.1).abs();
        Route::new(
            self.location_id(from.0, from.1),
            self.location_id(to.0, to.1),
            coords,
            travelled * self.length_per_unit,
        )
    }

    /// Generate the network. The same configuration always yields the same data.
    pub fn generate(&self) -> SyntheticDataset {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let n = self.grid_size.max(2);

        let locations: Vec<Location> = (0..n)
            .flat_map(|row| (0..n).map(move |col| (col, row)))
            .map(|(col, row)| {
                let (x, y) = self.node(col, row);
                Location::new(self.location_id(col, row), x, y)
            })
            .collect();

        let node_count = (n * n) as usize;
        let target = self.route_count.min(node_count * (node_count - 1));

        let mut seen: HashSet<RouteId> = HashSet::with_capacity(target);
        let mut routes = Vec::with_capacity(target);
        while routes.len() < target {
            let from = (rng.random_range(0..n), rng.random_range(0..n));
            let to = (rng.random_range(0..n), rng.random_range(0..n));
            if from == to {
                continue;
            }
            let route = self.route(from, to);
            if seen.insert(route.id) {
                routes.push(route);
            }
        }

        let mut shipments = Vec::with_capacity(routes.len() * self.shipments_per_route);
        for route in &routes {
            for _ in 0..self.shipments_per_route {
                let offset = rng.random_range(0..self.days.max(1));
                let date = self
                    .start_date
                    .checked_add_days(Days::new(offset))
                    .unwrap_or(self.start_date);
                let weight = rng.random_range(0.5..self.max_weight.max(1.0));
                shipments.push(Shipment::new(
                    date,
                    route.id.origin_id,
                    route.id.destination_id,
                    weight,
                ));
            }
        }

        SyntheticDataset {
            locations,
            routes,
            shipments,
        }
    }
}
