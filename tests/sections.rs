//! Tests for the route sectioner

use freightmatch::geometry::point_on_line;
use freightmatch::intersections::find_intersection_points;
use freightmatch::sections::section_routes;
use freightmatch::{
    ConsolidationError, Diagnostics, IntersectionPointSet, NoopProgress, Route, section_route,
};
use geo::{Coord, LineString};

const TOL: f64 = 1e-7;

fn c(x: f64, y: f64) -> Coord<f64> {
    Coord { x, y }
}

fn line(coords: &[(f64, f64)]) -> LineString<f64> {
    LineString::from(coords.to_vec())
}

fn crossing_routes() -> (Route, Route) {
    (
        Route::new(1, 2, vec![(0.0, 0.0), (10.0, 0.0)], 10.0),
        Route::new(3, 4, vec![(5.0, -5.0), (5.0, 5.0)], 10.0),
    )
}

/// Endpoints of both crossing routes plus their crossing point.
fn crossing_points() -> IntersectionPointSet {
    IntersectionPointSet::from_points(
        vec![
            c(0.0, 0.0),
            c(10.0, 0.0),
            c(5.0, -5.0),
            c(5.0, 5.0),
            c(5.0, 0.0),
        ],
        TOL,
    )
}

#[test]
fn test_crossing_routes_split_at_crossing_point() {
    let (a, b) = crossing_routes();
    let points = crossing_points();
    let mut diagnostics = Diagnostics::new();

    let sections_a = section_route(&a, &points, &mut diagnostics);
    assert_eq!(sections_a.len(), 2);
    assert_eq!(sections_a[0].geometry, line(&[(0.0, 0.0), (5.0, 0.0)]));
    assert_eq!(sections_a[1].geometry, line(&[(5.0, 0.0), (10.0, 0.0)]));
    assert_eq!(
        (sections_a[0].from_point_index, sections_a[0].to_point_index),
        (0, 4)
    );
    assert_eq!(
        (sections_a[1].from_point_index, sections_a[1].to_point_index),
        (4, 1)
    );

    let sections_b = section_route(&b, &points, &mut diagnostics);
    assert_eq!(sections_b.len(), 2);
    assert_eq!(sections_b[0].geometry, line(&[(5.0, -5.0), (5.0, 0.0)]));
    assert_eq!(sections_b[1].geometry, line(&[(5.0, 0.0), (5.0, 5.0)]));

    assert!(diagnostics.is_empty());
}

#[test]
fn test_section_fractions_follow_travel_order() {
    let (a, _) = crossing_routes();
    let mut diagnostics = Diagnostics::new();
    let sections = section_route(&a, &crossing_points(), &mut diagnostics);

    assert_eq!(sections[0].from_fraction, 0.0);
    assert!((sections[0].to_fraction - 0.5).abs() < 1e-12);
    assert!((sections[1].from_fraction - 0.5).abs() < 1e-12);
    assert_eq!(sections[1].to_fraction, 1.0);
}

#[test]
fn test_lone_route_is_one_section() {
    let route = Route::new(1, 2, vec![(0.0, 0.0), (3.0, 4.0), (6.0, 0.0)], 10.0);
    let (points, _) = find_intersection_points(std::slice::from_ref(&route), TOL);
    assert_eq!(points.len(), 2);

    let mut diagnostics = Diagnostics::new();
    let sections = section_route(&route, &points, &mut diagnostics);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].geometry, route.geometry);
    assert_eq!(sections[0].from_point_index, 0);
    assert_eq!(sections[0].to_point_index, 1);
}

#[test]
fn test_route_without_points_is_reported() {
    let (a, _) = crossing_routes();
    let points = IntersectionPointSet::new(TOL);
    let mut diagnostics = Diagnostics::new();

    assert!(section_route(&a, &points, &mut diagnostics).is_empty());
    assert_eq!(diagnostics.len(), 1);
    assert!(matches!(
        diagnostics.iter().next(),
        Some(ConsolidationError::NoIntersectionPoints { .. })
    ));
}

#[test]
fn test_start_outside_point_set_is_cut_off() {
    let route = Route::new(1, 2, vec![(0.0, 0.0), (10.0, 0.0)], 10.0);
    let points = IntersectionPointSet::from_points(vec![c(2.0, 0.0), c(10.0, 0.0)], TOL);
    let mut diagnostics = Diagnostics::new();

    let sections = section_route(&route, &points, &mut diagnostics);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].geometry, line(&[(2.0, 0.0), (10.0, 0.0)]));
    assert!((sections[0].from_fraction - 0.2).abs() < 1e-12);
}

#[test]
fn test_closed_route_returns_to_its_start_point() {
    let route = Route::new(
        1,
        1,
        vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 0.0)],
        35.0,
    );
    let points = IntersectionPointSet::from_points(vec![c(0.0, 0.0), c(10.0, 0.0)], TOL);
    let mut diagnostics = Diagnostics::new();

    let sections = section_route(&route, &points, &mut diagnostics);
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].from_point_index, 0);
    assert_eq!(sections[0].to_point_index, 1);
    assert_eq!(sections[1].from_point_index, 1);
    assert_eq!(sections[1].to_point_index, 0);
    assert_eq!(sections[1].to_fraction, 1.0);
    assert_eq!(
        sections[1].geometry,
        line(&[(10.0, 0.0), (10.0, 10.0), (0.0, 0.0)])
    );
}

#[test]
fn test_section_endpoints_lie_on_section_geometry() {
    let routes = vec![
        Route::new(1, 2, vec![(0.0, 0.0), (4.0, 0.0), (10.0, 0.0)], 100.0),
        Route::new(3, 4, vec![(2.0, 0.0), (8.0, 0.0), (8.0, 6.0)], 120.0),
        Route::new(5, 6, vec![(3.0, -2.0), (3.0, 0.0), (6.0, 0.0), (6.0, 3.0)], 80.0),
    ];
    let (points, _) = find_intersection_points(&routes, TOL);
    let mut diagnostics = Diagnostics::new();
    let all = section_routes(&routes, &points, &mut diagnostics, &NoopProgress);

    assert_eq!(all.len(), routes.len());
    for sections in &all {
        assert!(!sections.is_empty());
        for section in sections {
            let from = points.get(section.from_point_index).unwrap();
            let to = points.get(section.to_point_index).unwrap();
            assert!(point_on_line(&section.geometry, from, TOL));
            assert!(point_on_line(&section.geometry, to, TOL));
            assert!(section.from_fraction <= section.to_fraction);
        }
    }
    assert!(diagnostics.is_empty());
}

#[test]
fn test_consecutive_sections_share_boundary_points() {
    let routes = vec![
        Route::new(1, 2, vec![(0.0, 0.0), (10.0, 0.0)], 100.0),
        Route::new(3, 4, vec![(2.0, 0.0), (8.0, 0.0)], 60.0),
    ];
    let (points, _) = find_intersection_points(&routes, TOL);
    let mut diagnostics = Diagnostics::new();
    let sections = section_route(&routes[0], &points, &mut diagnostics);

    assert_eq!(sections.len(), 3);
    for window in sections.windows(2) {
        assert_eq!(window[0].to_point_index, window[1].from_point_index);
    }
    assert_eq!(sections[1].geometry, line(&[(2.0, 0.0), (8.0, 0.0)]));
}
