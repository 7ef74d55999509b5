//! # Planar Geometry Kernel
//!
//! Pure functions over `geo` line strings in a single planar projection:
//! - tolerant point equality and point-on-line tests
//! - line ∩ line intersection returning a tagged [`Intersection`]
//! - projection of a point onto a line (absolute and normalized distance)
//! - splitting a line at a point
//! - merging line pieces that share endpoints
//!
//! Floating-point coordinates coming out of a routing service are never
//! compared exactly. Every comparison takes a tolerance `tol`; two
//! coordinates within `tol` of each other are the same point.

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Coord, Distance, Euclidean, Line, LineString, Point};
use rstar::{AABB, RTree, RTreeObject};

/// Result of intersecting two polylines.
///
/// Line pieces are reported as found, one per overlapping segment pair;
/// callers decide whether to merge them. Points lying on a line piece are
/// not reported separately.
#[derive(Debug, Clone, PartialEq)]
pub enum Intersection {
    Empty,
    Point(Coord<f64>),
    MultiPoint(Vec<Coord<f64>>),
    Line(LineString<f64>),
    MultiLine(Vec<LineString<f64>>),
    Collection {
        lines: Vec<LineString<f64>>,
        points: Vec<Coord<f64>>,
    },
}

impl Intersection {
    pub fn is_empty(&self) -> bool {
        matches!(self, Intersection::Empty)
    }

    /// Human readable shape name, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Intersection::Empty => "empty",
            Intersection::Point(_) => "point",
            Intersection::MultiPoint(_) => "multi-point",
            Intersection::Line(_) => "line",
            Intersection::MultiLine(_) => "multi-line",
            Intersection::Collection { .. } => "collection",
        }
    }
}

/// Position of a point projected onto a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Distance along the line from its start, in coordinate units
    pub distance: f64,
    /// `distance` divided by the line length (0..1)
    pub fraction: f64,
    /// Offset of the point from the line
    pub offset: f64,
}

// ============================================================================
// Points
// ============================================================================

/// Euclidean distance between two coordinates.
pub fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Euclidean.distance(Point::from(a), Point::from(b))
}

/// Coordinate identity within tolerance.
pub fn coords_equal(a: Coord<f64>, b: Coord<f64>, tol: f64) -> bool {
    distance(a, b) <= tol
}

/// Closest position on a segment: `(t, distance)` with `t` in `[0, 1]`.
fn project_on_segment(segment: &Line<f64>, p: Coord<f64>) -> (f64, f64) {
    let d = segment.delta();
    let len_sq = d.x * d.x + d.y * d.y;
    if len_sq == 0.0 {
        return (0.0, distance(segment.start, p));
    }
    let t = (((p.x - segment.start.x) * d.x + (p.y - segment.start.y) * d.y) / len_sq)
        .clamp(0.0, 1.0);
    let closest = Coord {
        x: segment.start.x + d.x * t,
        y: segment.start.y + d.y * t,
    };
    (t, distance(closest, p))
}

/// Smallest distance from a point to a line, `None` for an empty line.
pub fn distance_to_line(line: &LineString<f64>, p: Coord<f64>) -> Option<f64> {
    match line.0.len() {
        0 => None,
        1 => Some(distance(line.0[0], p)),
        _ => line
            .lines()
            .map(|segment| project_on_segment(&segment, p).1)
            .reduce(f64::min),
    }
}

/// Whether a point lies on a line within tolerance.
pub fn point_on_line(line: &LineString<f64>, p: Coord<f64>, tol: f64) -> bool {
    distance_to_line(line, p).is_some_and(|d| d <= tol)
}

// ============================================================================
// Lines
// ============================================================================

/// Euclidean length of a polyline.
pub fn line_length(line: &LineString<f64>) -> f64 {
    line.lines().map(|l| distance(l.start, l.end)).sum()
}

/// A line is degenerate when it has no two distinct coordinates.
pub fn is_degenerate(line: &LineString<f64>, tol: f64) -> bool {
    match line.0.first() {
        None => true,
        Some(first) => line.0.iter().all(|c| coords_equal(*c, *first, tol)),
    }
}

/// Project a point onto a line.
///
/// The closest segment wins; on equal distance the earlier segment wins, so
/// a line passing the same place twice reports the first passage.
pub fn project(line: &LineString<f64>, p: Coord<f64>) -> Option<Projection> {
    if line.0.len() < 2 {
        return None;
    }

    let total = line_length(line);
    let mut walked = 0.0;
    let mut best: Option<(f64, f64)> = None; // (offset, along)

    for segment in line.lines() {
        let seg_len = distance(segment.start, segment.end);
        let (t, offset) = project_on_segment(&segment, p);
        if best.is_none_or(|(best_offset, _)| offset < best_offset) {
            best = Some((offset, walked + t * seg_len));
        }
        walked += seg_len;
    }

    best.map(|(offset, along)| Projection {
        distance: along,
        fraction: if total > 0.0 { along / total } else { 0.0 },
        offset,
    })
}

/// Split a line at a point.
///
/// The line is cut on the first segment that passes within `tol` of the
/// point; the cut coordinate is the point itself, so both pieces contain it
/// exactly. Degenerate pieces are dropped: splitting at an endpoint yields
/// one piece, a point off the line yields the line unchanged.
pub fn split_at(line: &LineString<f64>, p: Coord<f64>, tol: f64) -> Vec<LineString<f64>> {
    let coords = &line.0;
    let Some(cut) = line
        .lines()
        .position(|segment| project_on_segment(&segment, p).1 <= tol)
    else {
        return vec![line.clone()];
    };

    let mut head: Vec<Coord<f64>> = coords[..=cut].to_vec();
    if head.last().is_some_and(|last| coords_equal(*last, p, tol)) {
        head.pop();
    }
    head.push(p);

    let mut tail = vec![p];
    for c in &coords[cut + 1..] {
        if tail.len() == 1 && coords_equal(*c, p, tol) {
            continue;
        }
        tail.push(*c);
    }

    [LineString::new(head), LineString::new(tail)]
        .into_iter()
        .filter(|piece| !is_degenerate(piece, tol))
        .collect()
}

/// Make sure `from` and `to` lie on a line, prepending or appending them if not.
pub fn ensure_endpoints(
    line: &LineString<f64>,
    from: Coord<f64>,
    to: Coord<f64>,
    tol: f64,
) -> LineString<f64> {
    let mut coords = line.0.clone();
    if !point_on_line(line, from, tol) {
        coords.insert(0, from);
    }
    if !point_on_line(line, to, tol) {
        coords.push(to);
    }
    LineString::new(coords)
}

/// Merge line pieces whose endpoints coincide into as few lines as possible.
///
/// Pieces may be reversed to connect. The first piece keeps its orientation
/// where the merge allows it.
pub fn merge_lines(lines: Vec<LineString<f64>>, tol: f64) -> Vec<LineString<f64>> {
    let mut remaining: Vec<Vec<Coord<f64>>> = lines
        .into_iter()
        .map(|l| l.0)
        .filter(|c| c.len() >= 2)
        .collect();
    let mut merged = Vec::new();

    while !remaining.is_empty() {
        let mut chain = remaining.remove(0);

        loop {
            let mut extended = false;
            let mut i = 0;
            while i < remaining.len() {
                let head = chain[0];
                let tail = chain[chain.len() - 1];
                let piece = &remaining[i];
                let piece_start = piece[0];
                let piece_end = piece[piece.len() - 1];

                if coords_equal(tail, piece_start, tol) {
                    let piece = remaining.remove(i);
                    chain.extend(piece.into_iter().skip(1));
                } else if coords_equal(tail, piece_end, tol) {
                    let piece = remaining.remove(i);
                    chain.extend(piece.into_iter().rev().skip(1));
                } else if coords_equal(head, piece_end, tol) {
                    let mut piece = remaining.remove(i);
                    piece.pop();
                    piece.extend(chain);
                    chain = piece;
                } else if coords_equal(head, piece_start, tol) {
                    let mut piece = remaining.remove(i);
                    piece.reverse();
                    piece.pop();
                    piece.extend(chain);
                    chain = piece;
                } else {
                    i += 1;
                    continue;
                }
                extended = true;
            }
            if !extended {
                break;
            }
        }

        merged.push(LineString::new(chain));
    }

    merged
}

/// Append `next` to `line`, producing one connected line or `None`.
pub fn join(line: &LineString<f64>, next: &LineString<f64>, tol: f64) -> Option<LineString<f64>> {
    let (Some(tail), Some(head)) = (line.0.last(), next.0.first()) else {
        return None;
    };
    if coords_equal(*tail, *head, tol) {
        let mut coords = line.0.clone();
        coords.extend(next.0.iter().skip(1));
        return Some(LineString::new(coords));
    }

    let mut merged = merge_lines(vec![line.clone(), next.clone()], tol);
    if merged.len() == 1 { merged.pop() } else { None }
}

// ============================================================================
// Intersection
// ============================================================================

/// A polyline segment indexed for R-tree queries.
#[derive(Debug, Clone, Copy)]
struct IndexedSegment {
    line: Line<f64>,
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.line.start.x, self.line.start.y],
            [self.line.end.x, self.line.end.y],
        )
    }
}

/// Orient a collinear overlap along the direction of `along`.
fn orient_along(overlap: Line<f64>, along: &Line<f64>) -> Line<f64> {
    let d = along.delta();
    let delta = overlap.delta();
    if delta.x * d.x + delta.y * d.y < 0.0 {
        Line::new(overlap.end, overlap.start)
    } else {
        overlap
    }
}

/// Shared piece of two segments that are collinear within `tol`.
///
/// Collects the endpoints of either segment lying within `tol` of the other
/// and spans them along `along`. `None` when they collapse to one point.
fn near_overlap(along: &Line<f64>, other: &Line<f64>, tol: f64) -> Option<Line<f64>> {
    let mut touching: Vec<(f64, Coord<f64>)> = Vec::with_capacity(4);
    for (t, p) in [(0.0, along.start), (1.0, along.end)] {
        if project_on_segment(other, p).1 <= tol {
            touching.push((t, p));
        }
    }
    for p in [other.start, other.end] {
        let (t, d) = project_on_segment(along, p);
        if d <= tol {
            touching.push((t, p));
        }
    }

    let first = touching.iter().min_by(|x, y| x.0.total_cmp(&y.0))?;
    let last = touching.iter().max_by(|x, y| x.0.total_cmp(&y.0))?;
    if coords_equal(first.1, last.1, tol) {
        return None;
    }
    Some(Line::new(first.1, last.1))
}

/// Intersect two polylines.
///
/// Segment pairs are tested with `geo`'s robust segment intersection; an
/// R-tree over the segments of `b` prunes pairs whose envelopes are farther
/// apart than `tol`. Segments that are collinear only within `tol` still
/// yield their shared piece. Line pieces keep the orientation of `a`.
pub fn intersection(a: &LineString<f64>, b: &LineString<f64>, tol: f64) -> Intersection {
    if a.0.len() < 2 || b.0.len() < 2 {
        return Intersection::Empty;
    }

    let tree = RTree::bulk_load(b.lines().map(|line| IndexedSegment { line }).collect());

    let mut lines: Vec<LineString<f64>> = Vec::new();
    let mut points: Vec<Coord<f64>> = Vec::new();

    for segment_a in a.lines() {
        let query = AABB::from_corners(
            [
                segment_a.start.x.min(segment_a.end.x) - tol,
                segment_a.start.y.min(segment_a.end.y) - tol,
            ],
            [
                segment_a.start.x.max(segment_a.end.x) + tol,
                segment_a.start.y.max(segment_a.end.y) + tol,
            ],
        );

        for candidate in tree.locate_in_envelope_intersecting(&query) {
            let exact = line_intersection(segment_a, candidate.line);
            if !matches!(exact, Some(LineIntersection::Collinear { .. })) {
                if let Some(overlap) = near_overlap(&segment_a, &candidate.line, tol) {
                    lines.push(LineString::new(vec![overlap.start, overlap.end]));
                    continue;
                }
            }
            match exact {
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    points.push(intersection);
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    if coords_equal(intersection.start, intersection.end, tol) {
                        points.push(intersection.start);
                    } else {
                        let oriented = orient_along(intersection, &segment_a);
                        lines.push(LineString::new(vec![oriented.start, oriented.end]));
                    }
                }
                None => {}
            }
        }
    }

    let mut unique_points: Vec<Coord<f64>> = Vec::new();
    for p in points {
        if lines.iter().any(|l| point_on_line(l, p, tol)) {
            continue;
        }
        if unique_points.iter().any(|q| coords_equal(*q, p, tol)) {
            continue;
        }
        unique_points.push(p);
    }

    match (lines.len(), unique_points.len()) {
        (0, 0) => Intersection::Empty,
        (0, 1) => Intersection::Point(unique_points[0]),
        (0, _) => Intersection::MultiPoint(unique_points),
        (1, 0) => Intersection::Line(lines.remove(0)),
        (_, 0) => Intersection::MultiLine(lines),
        _ => Intersection::Collection {
            lines,
            points: unique_points,
        },
    }
}
