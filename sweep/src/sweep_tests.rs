//! End-to-end tests of the sweep pipeline: the concrete boolean
//! scenarios, and the structural properties the engine guarantees
//! (grid-integral, non-crossing output; boolean correctness; round trips;
//! triangulation coverage and outline flags).

use crate::{Mask, Polygon, Sweep, SweepError, TruthTable, Triangle};
use polysnap_geom::math::{point, Point};
use polysnap_geom::{cross, point_cmp, segment_intersection, LineSegment, SegmentIntersection};
use std::cmp::Ordering;

fn add_path(sweep: &mut Sweep, pts: &[(i32, i32)], mask: Mask) {
    for k in 0..pts.len() {
        let (ax, ay) = pts[k];
        let (bx, by) = pts[(k + 1) % pts.len()];
        sweep.add_edge(point(ax, ay), point(bx, by), mask);
    }
}

fn square(sweep: &mut Sweep, x0: i32, y0: i32, x1: i32, y1: i32, mask: Mask) {
    add_path(sweep, &[(x0, y0), (x1, y0), (x1, y1), (x0, y1)], mask);
}

/// The result as a sorted, canonical list of (from, to, mask).
fn segments(sweep: &Sweep) -> Vec<((i32, i32), (i32, i32), Mask)> {
    let mut out: Vec<_> = sweep
        .result_segments()
        .into_iter()
        .map(|(s, m)| ((s.from.x, s.from.y), (s.to.x, s.to.y), m))
        .collect();
    out.sort();
    out
}

fn geometry(sweep: &Sweep) -> Vec<((i32, i32), (i32, i32))> {
    let mut out: Vec<_> = segments(sweep).into_iter().map(|(a, b, _)| (a, b)).collect();
    out.sort();
    out
}

/// Property 3: result edges may meet only in shared endpoints.
fn assert_non_crossing(sweep: &Sweep) {
    let segs: Vec<(LineSegment, Mask)> = sweep.result_segments();
    for i in 0..segs.len() {
        for j in i + 1..segs.len() {
            let a = &segs[i].0;
            let b = &segs[j].0;
            match segment_intersection(a, b) {
                SegmentIntersection::None | SegmentIntersection::Shared => {}
                SegmentIntersection::Parallel => {
                    // Collinear segments must not overlap in more than a
                    // point.
                    if cross(a.from, a.to, b.from) == 0 && cross(a.from, a.to, b.to) == 0 {
                        let key = |p: Point| (i64::from(p.x), i64::from(p.y));
                        let (a0, a1) = (key(a.from).min(key(a.to)), key(a.from).max(key(a.to)));
                        let (b0, b1) = (key(b.from).min(key(b.to)), key(b.from).max(key(b.to)));
                        assert!(
                            a1.min(b1) <= a0.max(b0),
                            "collinear overlap between {:?} and {:?}",
                            a,
                            b
                        );
                    }
                }
                other => panic!("edges {:?} and {:?} cross: {:?}", a, b, other),
            }
        }
    }
}

/// Membership mask of a sample point: xor of the masks of all segments
/// straddling the upward ray from `q`. The point must not lie on any
/// segment.
fn mask_at(segs: &[(LineSegment, Mask)], q: Point) -> Mask {
    let mut mask = 0;
    for (s, m) in segs {
        if s.from.x <= q.x && q.x < s.to.x && cross(s.from, s.to, q) < 0 {
            mask ^= m;
        }
    }
    mask
}

fn doubled_path_area(poly: &Polygon, path: &crate::Path) -> i64 {
    let mut sum = 0i64;
    for k in 0..path.points.len() {
        let a = poly.points[path.points[k] as usize];
        let b = poly.points[path.points[(k + 1) % path.points.len()] as usize];
        sum += i64::from(a.x) * i64::from(b.y) - i64::from(a.y) * i64::from(b.x);
    }
    sum
}

fn doubled_triangle_area(poly: &Polygon, tri: &Triangle) -> i64 {
    let a = poly.points[tri.p[0] as usize];
    let b = poly.points[tri.p[1] as usize];
    let c = poly.points[tri.p[2] as usize];
    cross(a, b, c)
}

#[test]
fn overlap_collapse_merges_masks() {
    // S3: two coincident segments collapse into one with xored masks.
    let mut sweep = Sweep::new();
    sweep.add_edge(point(0, 0), point(10, 0), 0b01);
    sweep.add_edge(point(10, 0), point(0, 0), 0b10);
    sweep.intersect();
    assert_eq!(segments(&sweep), vec![((0, 0), (10, 0), 0b11)]);
}

#[test]
fn partial_overlap_splits() {
    // Overlap on [3,7] only; the matching sub-segment carries both masks.
    let mut sweep = Sweep::new();
    sweep.add_edge(point(0, 0), point(7, 0), 0b01);
    sweep.add_edge(point(3, 0), point(10, 0), 0b10);
    sweep.intersect();
    assert_eq!(
        segments(&sweep),
        vec![
            ((0, 0), (3, 0), 0b01),
            ((3, 0), (7, 0), 0b11),
            ((7, 0), (10, 0), 0b10),
        ]
    );
}

#[test]
fn integer_crossing_splits() {
    // S4: the crossing lies on the grid, so both edges split in phase 1.
    let mut sweep = Sweep::new();
    sweep.add_edge(point(0, 0), point(10, 10), 1);
    sweep.add_edge(point(0, 10), point(10, 0), 1);
    sweep.intersect();
    assert_eq!(
        segments(&sweep),
        vec![
            ((0, 0), (5, 5), 1),
            ((0, 10), (5, 5), 1),
            ((5, 5), (10, 0), 1),
            ((5, 5), (10, 10), 1),
        ]
    );
    assert_non_crossing(&sweep);
}

#[test]
fn fractional_crossing_snaps() {
    // S5: the exact crossing is (3.5, 5.5); snap rounding routes both
    // edges through the hot pixel at (4, 6).
    let mut sweep = Sweep::new();
    sweep.add_edge(point(0, 0), point(7, 11), 1);
    sweep.add_edge(point(0, 11), point(7, 0), 1);
    sweep.intersect();
    assert_eq!(
        segments(&sweep),
        vec![
            ((0, 0), (4, 6), 1),
            ((0, 11), (4, 6), 1),
            ((4, 6), (7, 0), 1),
            ((4, 6), (7, 11), 1),
        ]
    );
    assert_non_crossing(&sweep);
}

#[test]
fn hourglass_polygonizes_into_two_loops() {
    // S6: a self-crossing bowtie splits into two triangles at (5, 5).
    let mut sweep = Sweep::new();
    add_path(&mut sweep, &[(0, 0), (10, 10), (10, 0), (0, 10)], 1);
    sweep.intersect();
    assert_non_crossing(&sweep);

    let mut out = Polygon::new();
    sweep.polygonize(&mut out).unwrap();
    assert_eq!(out.paths.len(), 2);
    for path in &out.paths {
        assert_eq!(path.points.len(), 3);
        assert!(doubled_path_area(&out, path) > 0);
    }
    assert_eq!(
        out.paths.iter().map(|p| doubled_path_area(&out, p)).sum::<i64>(),
        100
    );
}

#[test]
fn hourglass_triangulates_with_full_outline() {
    let mut sweep = Sweep::new();
    add_path(&mut sweep, &[(0, 0), (10, 10), (10, 0), (0, 10)], 1);
    sweep.intersect();

    let mut out = Polygon::new();
    sweep.triangulate(&mut out).unwrap();
    assert_eq!(out.triangles.len(), 2);
    for tri in &out.triangles {
        assert!(doubled_triangle_area(&out, tri) > 0);
        // Every side of both triangles is an arrangement edge.
        assert_eq!(
            tri.flags,
            Triangle::OUTLINE_01 | Triangle::OUTLINE_12 | Triangle::OUTLINE_20
        );
    }
    assert_eq!(
        out.triangles.iter().map(|t| doubled_triangle_area(&out, t)).sum::<i64>(),
        100
    );
}

fn two_squares(mask_a: Mask, mask_b: Mask) -> Sweep {
    let mut sweep = Sweep::new();
    square(&mut sweep, 0, 0, 10, 10, mask_a);
    square(&mut sweep, 5, 5, 15, 15, mask_b);
    sweep
}

#[test]
fn two_squares_xor_reduces_to_both_l_shapes() {
    // S1: overlapping squares under xor. Every arrangement edge
    // separates inside from outside, so all twelve survive.
    let mut sweep = two_squares(0b01, 0b10);
    sweep.intersect();
    sweep.reduce(&TruthTable::symmetric_difference(2));
    assert_eq!(
        segments(&sweep),
        vec![
            ((0, 0), (0, 10), 0b01),
            ((0, 0), (10, 0), 0b01),
            ((0, 10), (5, 10), 0b01),
            ((5, 5), (5, 10), 0b10),
            ((5, 5), (10, 5), 0b10),
            ((5, 10), (5, 15), 0b10),
            ((5, 10), (10, 10), 0b01),
            ((5, 15), (15, 15), 0b10),
            ((10, 0), (10, 5), 0b01),
            ((10, 5), (10, 10), 0b01),
            ((10, 5), (15, 5), 0b10),
            ((15, 5), (15, 15), 0b10),
        ]
    );
    assert_non_crossing(&sweep);

    // Property 4: the reduced arrangement agrees with the truth table.
    let table = TruthTable::symmetric_difference(2);
    let mut input = two_squares(0b01, 0b10);
    input.intersect();
    let input_segs = input.result_segments();
    let reduced_segs = sweep.result_segments();
    for &(x, y) in &[(2, 2), (7, 2), (7, 7), (12, 7), (12, 12), (7, 12), (20, 20), (-3, 4)] {
        let q = point(x, y);
        let expect = table.get(mask_at(&input_segs, q));
        let got = mask_at(&reduced_segs, q) != 0;
        assert_eq!(expect, got, "sample {:?}", q);
    }
}

#[test]
fn two_squares_xor_polygonizes_into_two_hexagons() {
    let mut sweep = two_squares(0b01, 0b10);
    sweep.intersect();
    sweep.reduce(&TruthTable::symmetric_difference(2));
    let mut out = Polygon::new();
    sweep.polygonize(&mut out).unwrap();

    assert_eq!(out.paths.len(), 2);
    for path in &out.paths {
        assert_eq!(path.points.len(), 6);
        assert!(doubled_path_area(&out, path) > 0);
    }
    // Each L-shape covers 100 - 25 units.
    assert_eq!(
        out.paths.iter().map(|p| doubled_path_area(&out, p)).sum::<i64>(),
        300
    );
}

#[test]
fn two_squares_xor_triangulates() {
    let mut sweep = two_squares(0b01, 0b10);
    sweep.intersect();
    sweep.reduce(&TruthTable::symmetric_difference(2));

    // An identical sweep provides the reduced outline for flag checking.
    let mut reference = two_squares(0b01, 0b10);
    reference.intersect();
    reference.reduce(&TruthTable::symmetric_difference(2));
    let outline = geometry(&reference);

    let mut out = Polygon::new();
    sweep.triangulate(&mut out).unwrap();

    assert_eq!(out.triangles.len(), 8);
    assert_eq!(
        out.triangles.iter().map(|t| doubled_triangle_area(&out, t)).sum::<i64>(),
        300
    );

    // Property 7: a side is flagged exactly when it is an outline
    // segment.
    for tri in &out.triangles {
        assert!(doubled_triangle_area(&out, tri) > 0);
        for (k, flag) in [Triangle::OUTLINE_01, Triangle::OUTLINE_12, Triangle::OUTLINE_20]
            .iter()
            .enumerate()
        {
            let a = out.points[tri.p[k] as usize];
            let b = out.points[tri.p[(k + 1) % 3] as usize];
            let (a, b) = if point_cmp(a, b) == Ordering::Greater {
                (b, a)
            } else {
                (a, b)
            };
            let on_outline = outline.contains(&(((a.x, a.y)), ((b.x, b.y))));
            assert_eq!(
                tri.flags & flag != 0,
                on_outline,
                "triangle {:?} side {}",
                tri,
                k
            );
        }
    }
}

#[test]
fn triangle_subtract_snaps_and_reduces() {
    // S2: both triangles cut fractional crossings; the difference
    // A AND NOT B is three separate convex pieces after snap rounding.
    let mut sweep = Sweep::new();
    add_path(&mut sweep, &[(0, 0), (10, 0), (5, 10)], 0b01);
    add_path(&mut sweep, &[(0, 5), (10, 5), (5, -5)], 0b10);
    sweep.intersect();
    assert_non_crossing(&sweep);
    sweep.reduce(&TruthTable::difference(2));

    let mut out = Polygon::new();
    sweep.polygonize(&mut out).unwrap();
    assert_eq!(out.points.len(), 9);
    assert_eq!(out.paths.len(), 3);
    let mut areas: Vec<i64> = out
        .paths
        .iter()
        .map(|p| doubled_path_area(&out, p))
        .collect();
    areas.sort();
    // The two clipped bottom corners and the apex cap.
    assert_eq!(areas, vec![6, 9, 25]);

    let mut sweep = Sweep::new();
    add_path(&mut sweep, &[(0, 0), (10, 0), (5, 10)], 0b01);
    add_path(&mut sweep, &[(0, 5), (10, 5), (5, -5)], 0b10);
    sweep.intersect();
    sweep.reduce(&TruthTable::difference(2));
    let mut tris = Polygon::new();
    sweep.triangulate(&mut tris).unwrap();
    assert_eq!(tris.triangles.len(), 3);
    let mut areas: Vec<i64> = tris
        .triangles
        .iter()
        .map(|t| doubled_triangle_area(&tris, t))
        .collect();
    areas.sort();
    assert_eq!(areas, vec![6, 9, 25]);
    for tri in &tris.triangles {
        assert_eq!(
            tri.flags,
            Triangle::OUTLINE_01 | Triangle::OUTLINE_12 | Triangle::OUTLINE_20
        );
    }
}

#[test]
fn intersect_is_idempotent() {
    // Property 1: re-running the pipeline over its own output changes
    // nothing.
    let mut first = two_squares(0b01, 0b10);
    first.intersect();
    let output = segments(&first);

    let mut second = Sweep::new();
    for &(a, b, m) in &output {
        second.add_edge(point(a.0, a.1), point(b.0, b.1), m);
    }
    second.intersect();
    assert_eq!(segments(&second), output);
}

#[test]
fn polygonize_round_trips() {
    // Property 5: paths fed back into a fresh sweep reproduce the same
    // arrangement.
    let mut sweep = two_squares(0b01, 0b10);
    sweep.intersect();
    sweep.reduce(&TruthTable::symmetric_difference(2));
    let reduced = geometry(&sweep);

    let mut out = Polygon::new();
    sweep.polygonize(&mut out).unwrap();

    let mut back = Sweep::new();
    back.add_polygon(&out, 1);
    back.intersect();
    assert_eq!(geometry(&back), reduced);
}

#[test]
fn add_sweep_imports_a_result() {
    let mut first = two_squares(0b01, 0b10);
    first.intersect();

    let mut second = Sweep::new();
    second.add_sweep(&first, 1);
    second.intersect();
    assert_eq!(geometry(&second), geometry(&first));
}

#[test]
fn unclosed_input_is_reported() {
    let mut sweep = Sweep::new();
    sweep.add_edge(point(0, 0), point(10, 0), 1);
    sweep.intersect();
    let mut out = Polygon::new();
    match sweep.polygonize(&mut out) {
        Err(SweepError::UnclosedPolygon { .. }) => {}
        other => panic!("expected an unclosed-polygon error, got {:?}", other),
    }

    let mut sweep = Sweep::new();
    sweep.add_edge(point(0, 0), point(10, 0), 1);
    sweep.add_edge(point(10, 0), point(5, 7), 1);
    sweep.intersect();
    let mut out = Polygon::new();
    assert!(sweep.triangulate(&mut out).is_err());
}

#[test]
fn degenerate_inputs() {
    let mut sweep = Sweep::new();
    sweep.add_edge(point(3, 3), point(3, 3), 1); // dropped
    sweep.intersect();
    assert!(sweep.is_empty());
    let mut out = Polygon::new();
    sweep.polygonize(&mut out).unwrap();
    assert!(out.is_empty());

    let mut sweep = Sweep::new();
    sweep.intersect();
    assert!(sweep.is_empty());
    assert_eq!(sweep.bounds(), None);
}

#[test]
fn bounds_cover_the_arrangement() {
    let mut sweep = Sweep::new();
    sweep.add_edge(point(-7, 2), point(3, -4), 1);
    sweep.add_edge(point(0, 9), point(1, 1), 1);
    assert_eq!(sweep.bounds(), Some((point(-7, -4), point(3, 9))));
}

#[test]
fn random_arrangement_is_non_crossing() {
    // Properties 2 and 3 under a messy deterministic input: many short
    // segments in a small box produce plenty of fractional crossings.
    let mut seed = 0x1d872b41u64;
    let mut rng = move || {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        seed
    };
    let mut sweep = Sweep::new();
    for k in 0..24 {
        let a = point((rng() % 31) as i32, (rng() % 31) as i32);
        let b = point((rng() % 31) as i32, (rng() % 31) as i32);
        sweep.add_edge(a, b, 1 << (k % 3));
    }
    sweep.intersect();
    assert_non_crossing(&sweep);

    // Every vertex of the snapped arrangement lies on the grid inside
    // the coordinate domain (trivially, but the walk also exercises the
    // result iteration).
    for (s, _) in sweep.result_segments() {
        for p in [s.from, s.to].iter() {
            assert!(p.x >= polysnap_geom::MIN_COORD && p.x <= polysnap_geom::MAX_COORD);
            assert!(p.y >= polysnap_geom::MIN_COORD && p.y <= polysnap_geom::MAX_COORD);
        }
    }
}

#[test]
fn union_of_disjoint_squares() {
    let mut sweep = Sweep::new();
    square(&mut sweep, 0, 0, 4, 4, 0b01);
    square(&mut sweep, 10, 10, 14, 14, 0b10);
    sweep.intersect();
    sweep.reduce(&TruthTable::union(2));

    let mut out = Polygon::new();
    sweep.triangulate(&mut out).unwrap();
    assert_eq!(out.triangles.len(), 4);
    assert_eq!(
        out.triangles.iter().map(|t| doubled_triangle_area(&out, t)).sum::<i64>(),
        64
    );
}

#[test]
fn intersection_of_squares() {
    let mut sweep = two_squares(0b01, 0b10);
    sweep.intersect();
    sweep.reduce(&TruthTable::intersection(2));
    assert_eq!(
        geometry(&sweep),
        vec![
            (((5, 5)), ((5, 10))),
            (((5, 5)), ((10, 5))),
            (((5, 10)), ((10, 10))),
            (((10, 5)), ((10, 10))),
        ]
    );
    let mut out = Polygon::new();
    sweep.polygonize(&mut out).unwrap();
    assert_eq!(out.paths.len(), 1);
    assert_eq!(out.paths[0].points.len(), 4);
    assert_eq!(doubled_path_area(&out, &out.paths[0]), 50);
}

#[test]
fn hole_is_oriented_clockwise() {
    // A square with a square hole: the outer path is counter-clockwise,
    // the hole clockwise.
    let mut sweep = Sweep::new();
    square(&mut sweep, 0, 0, 20, 20, 0b01);
    square(&mut sweep, 5, 5, 15, 15, 0b10);
    sweep.intersect();
    sweep.reduce(&TruthTable::difference(2));

    let mut out = Polygon::new();
    sweep.polygonize(&mut out).unwrap();
    assert_eq!(out.paths.len(), 2);
    let mut areas: Vec<i64> = out
        .paths
        .iter()
        .map(|p| doubled_path_area(&out, p))
        .collect();
    areas.sort();
    assert_eq!(areas, vec![-200, 800]);

    // The triangulation of the ring covers the same region.
    let mut sweep = Sweep::new();
    square(&mut sweep, 0, 0, 20, 20, 0b01);
    square(&mut sweep, 5, 5, 15, 15, 0b10);
    sweep.intersect();
    sweep.reduce(&TruthTable::difference(2));
    let mut tris = Polygon::new();
    sweep.triangulate(&mut tris).unwrap();
    assert_eq!(
        tris.triangles.iter().map(|t| doubled_triangle_area(&tris, t)).sum::<i64>(),
        600
    );
    for tri in &tris.triangles {
        assert!(doubled_triangle_area(&tris, tri) > 0);
    }
}
