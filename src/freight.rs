//! Weekly utilization of route freight.
//!
//! Shipments of a route are grouped by calendar week; a week's utilization
//! is its total weight divided by the capacity of one load unit. Only weeks
//! whose utilization exceeds the minimum count as consolidatable freight.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{ConsolidationConfig, RouteId, Shipment};

/// Sunday-based week of the year (`%U`): days before the first Sunday are week 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CalendarWeek {
    pub year: i32,
    pub week: u32,
}

impl CalendarWeek {
    pub fn of(date: NaiveDate) -> Self {
        let day_of_year = date.ordinal0();
        let weekday = date.weekday().num_days_from_sunday();
        Self {
            year: date.year(),
            week: (day_of_year + 7 - weekday) / 7,
        }
    }
}

impl std::fmt::Display for CalendarWeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// Aggregated freight of one route in one calendar week.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyLoad {
    pub week: CalendarWeek,
    /// Total weight in tons
    pub weight: f64,
    /// `weight / unit_capacity`
    pub utilization: f64,
}

/// Group shipments by calendar week, in chronological order.
pub fn weekly_loads<'a>(
    shipments: impl IntoIterator<Item = &'a Shipment>,
    unit_capacity: f64,
) -> Vec<WeeklyLoad> {
    let mut by_week: BTreeMap<CalendarWeek, f64> = BTreeMap::new();
    for shipment in shipments {
        *by_week.entry(CalendarWeek::of(shipment.date)).or_default() += shipment.weight;
    }

    by_week
        .into_iter()
        .map(|(week, weight)| WeeklyLoad {
            week,
            weight,
            utilization: if unit_capacity > 0.0 {
                weight / unit_capacity
            } else {
                0.0
            },
        })
        .collect()
}

/// Total weight of the weeks whose utilization is strictly above `min_utilization`.
pub fn qualifying_weight(loads: &[WeeklyLoad], min_utilization: f64) -> f64 {
    loads
        .iter()
        .filter(|load| load.utilization > min_utilization)
        .map(|load| load.weight)
        .sum()
}

/// Per-route weekly loads and qualifying freight.
///
/// Qualifying freight depends only on a route's own shipments and is
/// computed once per route.
#[derive(Debug, Clone, Default)]
pub struct FreightIndex {
    loads: HashMap<RouteId, Vec<WeeklyLoad>>,
    qualifying: HashMap<RouteId, f64>,
}

impl FreightIndex {
    pub fn build(shipments: &[Shipment], config: &ConsolidationConfig) -> Self {
        let mut by_route: HashMap<RouteId, Vec<&Shipment>> = HashMap::new();
        for shipment in shipments {
            by_route.entry(shipment.route_id()).or_default().push(shipment);
        }

        let mut loads = HashMap::with_capacity(by_route.len());
        let mut qualifying = HashMap::with_capacity(by_route.len());
        for (route_id, route_shipments) in by_route {
            let weekly = weekly_loads(route_shipments, config.unit_capacity);
            qualifying.insert(route_id, qualifying_weight(&weekly, config.min_utilization));
            loads.insert(route_id, weekly);
        }

        Self { loads, qualifying }
    }

    /// Weekly loads of a route (empty if it has no shipments).
    pub fn weekly_loads(&self, route_id: &RouteId) -> &[WeeklyLoad] {
        self.loads.get(route_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Freight of a route counted towards consolidation.
    pub fn qualifying_freight(&self, route_id: &RouteId) -> f64 {
        self.qualifying.get(route_id).copied().unwrap_or(0.0)
    }

    pub fn route_count(&self) -> usize {
        self.loads.len()
    }
}
