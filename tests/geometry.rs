//! Tests for the planar geometry kernel

use freightmatch::Intersection;
use freightmatch::geometry::{
    coords_equal, ensure_endpoints, intersection, is_degenerate, join, line_length, merge_lines,
    point_on_line, project, split_at,
};
use geo::{Coord, LineString};

const TOL: f64 = 1e-7;

fn c(x: f64, y: f64) -> Coord<f64> {
    Coord { x, y }
}

fn line(coords: &[(f64, f64)]) -> LineString<f64> {
    LineString::from(coords.to_vec())
}

// ============================================================================
// Points
// ============================================================================

#[test]
fn test_coords_equal_within_tolerance() {
    assert!(coords_equal(c(1.0, 1.0), c(1.0, 1.0 + 5e-8), TOL));
    assert!(!coords_equal(c(1.0, 1.0), c(1.0, 1.0 + 2e-7), TOL));
}

#[test]
fn test_point_on_line() {
    let l = line(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
    assert!(point_on_line(&l, c(5.0, 0.0), TOL));
    assert!(point_on_line(&l, c(10.0, 4.0), TOL));
    assert!(point_on_line(&l, c(5.0, 5e-8), TOL));
    assert!(!point_on_line(&l, c(5.0, 1.0), TOL));
    assert!(!point_on_line(&line(&[]), c(0.0, 0.0), TOL));
}

#[test]
fn test_line_length_and_degenerate() {
    assert!((line_length(&line(&[(0.0, 0.0), (3.0, 4.0), (3.0, 10.0)])) - 11.0).abs() < 1e-12);
    assert!(is_degenerate(&line(&[(1.0, 1.0), (1.0, 1.0)]), TOL));
    assert!(is_degenerate(&line(&[]), TOL));
    assert!(!is_degenerate(&line(&[(1.0, 1.0), (2.0, 1.0)]), TOL));
}

// ============================================================================
// Projection
// ============================================================================

#[test]
fn test_project_onto_single_segment() {
    let p = project(&line(&[(0.0, 0.0), (10.0, 0.0)]), c(4.0, 3.0)).unwrap();
    assert!((p.distance - 4.0).abs() < 1e-12);
    assert!((p.fraction - 0.4).abs() < 1e-12);
    assert!((p.offset - 3.0).abs() < 1e-12);
}

#[test]
fn test_project_picks_closest_segment() {
    let l = line(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
    let p = project(&l, c(10.0, 5.0)).unwrap();
    assert!((p.distance - 15.0).abs() < 1e-12);
    assert!((p.fraction - 0.75).abs() < 1e-12);
    assert!(p.offset.abs() < 1e-12);
}

#[test]
fn test_project_needs_two_coordinates() {
    assert!(project(&line(&[(1.0, 1.0)]), c(0.0, 0.0)).is_none());
}

// ============================================================================
// Splitting
// ============================================================================

#[test]
fn test_split_inside_segment() {
    let pieces = split_at(&line(&[(0.0, 0.0), (10.0, 0.0)]), c(4.0, 0.0), TOL);
    assert_eq!(pieces.len(), 2);
    assert_eq!(pieces[0], line(&[(0.0, 0.0), (4.0, 0.0)]));
    assert_eq!(pieces[1], line(&[(4.0, 0.0), (10.0, 0.0)]));
}

#[test]
fn test_split_at_vertex() {
    let pieces = split_at(
        &line(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]),
        c(5.0, 0.0),
        TOL,
    );
    assert_eq!(pieces.len(), 2);
    assert_eq!(pieces[0], line(&[(0.0, 0.0), (5.0, 0.0)]));
    assert_eq!(pieces[1], line(&[(5.0, 0.0), (10.0, 0.0)]));
}

#[test]
fn test_split_at_endpoint_or_off_line_yields_one_piece() {
    let l = line(&[(0.0, 0.0), (10.0, 0.0)]);
    assert_eq!(split_at(&l, c(0.0, 0.0), TOL), vec![l.clone()]);
    assert_eq!(split_at(&l, c(10.0, 0.0), TOL).len(), 1);
    assert_eq!(split_at(&l, c(5.0, 3.0), TOL), vec![l]);
}

#[test]
fn test_split_contains_cut_point_exactly() {
    // Point slightly off the line, within tolerance
    let p = c(3.0, 4e-8);
    let pieces = split_at(&line(&[(0.0, 0.0), (10.0, 0.0)]), p, TOL);
    assert_eq!(pieces.len(), 2);
    assert_eq!(*pieces[0].0.last().unwrap(), p);
    assert_eq!(pieces[1].0[0], p);
}

#[test]
fn test_ensure_endpoints_extends_line() {
    let l = line(&[(1.0, 0.0), (4.0, 0.0)]);
    let extended = ensure_endpoints(&l, c(0.0, 0.0), c(5.0, 0.0), TOL);
    assert_eq!(
        extended,
        line(&[(0.0, 0.0), (1.0, 0.0), (4.0, 0.0), (5.0, 0.0)])
    );

    let unchanged = ensure_endpoints(&l, c(1.0, 0.0), c(4.0, 0.0), TOL);
    assert_eq!(unchanged, l);
}

// ============================================================================
// Merging
// ============================================================================

#[test]
fn test_merge_connects_pieces_in_any_order() {
    let merged = merge_lines(
        vec![line(&[(5.0, 0.0), (8.0, 0.0)]), line(&[(2.0, 0.0), (5.0, 0.0)])],
        TOL,
    );
    assert_eq!(merged, vec![line(&[(2.0, 0.0), (5.0, 0.0), (8.0, 0.0)])]);
}

#[test]
fn test_merge_reverses_pieces() {
    let merged = merge_lines(
        vec![line(&[(5.0, 0.0), (8.0, 0.0)]), line(&[(10.0, 0.0), (8.0, 0.0)])],
        TOL,
    );
    assert_eq!(merged, vec![line(&[(5.0, 0.0), (8.0, 0.0), (10.0, 0.0)])]);
}

#[test]
fn test_merge_keeps_disjoint_pieces_apart() {
    let merged = merge_lines(
        vec![line(&[(0.0, 0.0), (1.0, 0.0)]), line(&[(5.0, 0.0), (6.0, 0.0)])],
        TOL,
    );
    assert_eq!(merged.len(), 2);
}

#[test]
fn test_join() {
    let joined = join(
        &line(&[(0.0, 0.0), (5.0, 0.0)]),
        &line(&[(5.0, 0.0), (5.0, 8.0)]),
        TOL,
    );
    assert_eq!(joined, Some(line(&[(0.0, 0.0), (5.0, 0.0), (5.0, 8.0)])));

    let apart = join(
        &line(&[(0.0, 0.0), (5.0, 0.0)]),
        &line(&[(6.0, 0.0), (9.0, 0.0)]),
        TOL,
    );
    assert_eq!(apart, None);
}

// ============================================================================
// Intersection
// ============================================================================

#[test]
fn test_crossing_lines_intersect_in_a_point() {
    let result = intersection(
        &line(&[(0.0, 0.0), (10.0, 0.0)]),
        &line(&[(5.0, -5.0), (5.0, 5.0)]),
        TOL,
    );
    let Intersection::Point(p) = result.clone() else {
        panic!("expected a point, got {:?}", result);
    };
    assert!(coords_equal(p, c(5.0, 0.0), TOL));
}

#[test]
fn test_collinear_overlap_is_a_line() {
    let result = intersection(
        &line(&[(0.0, 0.0), (10.0, 0.0)]),
        &line(&[(8.0, 0.0), (2.0, 0.0)]),
        TOL,
    );
    // Oriented along the first line
    assert_eq!(result, Intersection::Line(line(&[(2.0, 0.0), (8.0, 0.0)])));
}

#[test]
fn test_overlap_across_vertices_merges_into_one_line() {
    let result = intersection(
        &line(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]),
        &line(&[(2.0, 0.0), (8.0, 0.0)]),
        TOL,
    );
    let Intersection::MultiLine(lines) = result.clone() else {
        panic!("expected a multi-line, got {:?}", result);
    };
    assert_eq!(lines.len(), 2);

    let merged = merge_lines(lines, TOL);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].0.first(), Some(&c(2.0, 0.0)));
    assert_eq!(merged[0].0.last(), Some(&c(8.0, 0.0)));
}

#[test]
fn test_mixed_overlap_and_crossing_is_a_collection() {
    let result = intersection(
        &line(&[(0.0, 0.0), (10.0, 0.0)]),
        &line(&[(2.0, 0.0), (4.0, 0.0), (4.0, 5.0), (7.0, 5.0), (7.0, -5.0)]),
        TOL,
    );
    let Intersection::Collection { lines, points } = result.clone() else {
        panic!("expected a collection, got {:?}", result);
    };
    assert_eq!(lines, vec![line(&[(2.0, 0.0), (4.0, 0.0)])]);
    assert_eq!(points.len(), 1);
    assert!(coords_equal(points[0], c(7.0, 0.0), TOL));
}

#[test]
fn test_overlap_within_tolerance_is_a_line() {
    // The middle vertices of the second line sit on the first up to rounding
    let result = intersection(
        &line(&[(0.1, 0.1), (0.7, 0.4)]),
        &line(&[(0.0, 0.5), (0.3, 0.2), (0.5, 0.3), (0.9, 0.0)]),
        1e-7,
    );
    let Intersection::Line(shared) = result.clone() else {
        panic!("expected a line, got {:?}", result);
    };
    assert_eq!(shared.0.len(), 2);
    assert!(coords_equal(shared.0[0], c(0.3, 0.2), 1e-7));
    assert!(coords_equal(shared.0[1], c(0.5, 0.3), 1e-7));
}

#[test]
fn test_disjoint_lines_do_not_intersect() {
    let parallel = intersection(
        &line(&[(0.0, 0.0), (10.0, 0.0)]),
        &line(&[(0.0, 1.0), (10.0, 1.0)]),
        TOL,
    );
    assert!(parallel.is_empty());

    let apart = intersection(
        &line(&[(0.0, 0.0), (1.0, 0.0)]),
        &line(&[(5.0, 5.0), (6.0, 6.0)]),
        TOL,
    );
    assert_eq!(apart, Intersection::Empty);
}

#[test]
fn test_touching_segments_report_one_point() {
    // Both segments of the second line touch the first at (5, 0)
    let result = intersection(
        &line(&[(0.0, 0.0), (10.0, 0.0)]),
        &line(&[(3.0, 4.0), (5.0, 0.0), (7.0, 4.0)]),
        TOL,
    );
    let Intersection::Point(p) = result.clone() else {
        panic!("expected a point, got {:?}", result);
    };
    assert!(coords_equal(p, c(5.0, 0.0), TOL));
}
