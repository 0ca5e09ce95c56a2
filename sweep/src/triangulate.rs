//! Triangulation of the arrangement.
//!
//! Runs the same pair-event sweep as the polygonizer, but keeps each face
//! ring convex-trimmed: whenever a ring grows at a swept vertex, ears are
//! clipped off its vertex sequence as long as the corner is convex, each
//! clip emitting one triangle. Improper starts (a face opening inside
//! another face) rewire the enclosing ring through the new vertex pair,
//! using two overlapping inner half-edges so every ring section keeps a
//! well-defined rightmost vertex.
//!
//! Each triangle records which of its edges lie on the arrangement
//! outline. The predicate is a hash set of the arrangement's segments
//! built before the sweep starts, so a diagonal that happens to coincide
//! with an outline segment is flagged as outline as well.

use crate::state::{EdgeId, Phase, Sweep, VertexId, INVALID_POINT, LEFT, RIGHT};
use crate::{Polygon, SweepResult, Triangle};
use polysnap_geom::math::Point;
use polysnap_geom::{cross, point_cmp};
use std::cmp::Ordering;
use std::collections::HashSet;

type SegmentSet = HashSet<((i32, i32), (i32, i32))>;

fn segment_key(a: Point, b: Point) -> ((i32, i32), (i32, i32)) {
    if point_cmp(a, b) == Ordering::Greater {
        ((b.x, b.y), (a.x, a.y))
    } else {
        ((a.x, a.y), (b.x, b.y))
    }
}

impl Sweep {
    /// Triangulate the arrangement into `output`.
    ///
    /// `output` must be empty. Triangles come out counter-clockwise with
    /// strictly positive area; their `flags` mark the sides lying on the
    /// polygon outline. Fails with [`crate::SweepError::UnclosedPolygon`]
    /// on a vertex with an odd number of incident edges, after draining
    /// the engine's active tree.
    pub fn triangulate(&mut self, output: &mut Polygon) -> SweepResult {
        assert!(
            self.intersected && (self.phase == Phase::SnapSouth || self.phase == Phase::Reduce),
            "triangulate() requires intersect()"
        );
        assert!(output.points.is_empty() && output.triangles.is_empty());
        self.phase = Phase::Triangulate;

        let outline = self.collect_outline();

        let mut pending: Option<VertexId> = None;
        let mut v = self.result_min();
        while let Some(t) = v {
            let next = self.result_next(t);

            let pos = self.vertex_pos(t);
            if output.points.last() != Some(&pos) {
                output.points.push(pos);
            }
            self.set_point_idx(t, (output.points.len() - 1) as u32);

            let s = match pending.take() {
                None => {
                    pending = Some(t);
                    v = next;
                    continue;
                }
                Some(s) => s,
            };

            if self.vertex_pos(s) != pos {
                return self.fail_open(self.vertex_pos(s));
            }

            let es = s.edge();
            let et = t.edge();
            debug_assert!(es != et);
            debug_assert_eq!(t.side() == LEFT, !self.state_edge_is_member(et));
            debug_assert_eq!(s.side() == LEFT, !self.state_edge_is_member(es));

            if s.side() != t.side() {
                self.tri_bend(output, &outline, s, t);
            } else if s.side() == LEFT {
                self.tri_start(output, &outline, s, t);
            } else {
                self.tri_end(output, &outline, s, t);
            }

            v = next;
        }

        if let Some(s) = pending {
            let at = self.vertex_pos(s);
            return self.fail_open(at);
        }

        debug_assert!(self.agenda_vertex.is_none());
        Ok(())
    }

    /// Snapshot the arrangement's segments for the outline predicate.
    fn collect_outline(&self) -> SegmentSet {
        let mut set = SegmentSet::new();
        let mut v = self.result_min();
        while let Some(c) = v {
            if c.side() == LEFT {
                let e = c.edge();
                set.insert(segment_key(self.left_pos(e), self.right_pos(e)));
            }
            v = self.result_next(c);
        }
        set
    }

    /// BEND: continue the ring through the new edge and trim ears around
    /// the bend.
    fn tri_bend(&mut self, output: &mut Polygon, outline: &SegmentSet, s: VertexId, t: VertexId) {
        debug_assert_eq!(s.side(), RIGHT);
        debug_assert_eq!(t.side(), LEFT);
        sweep_log!(self, "triangulate: BEND at {:?}", self.vertex_pos(t));
        let es = s.edge();
        let et = t.edge();

        self.set_point_idx(t.other_end(), INVALID_POINT);

        self.state_edge_replace(es, et);
        let back = self.edges[es.0].back;
        self.edges[et.0].back = back;
        self.ring_init(et);

        self.edges[et.0].rightmost = Some(t);
        if back {
            // et continues a top edge.
            self.ring_splice(et, es);
            debug_assert_eq!(self.ring_next(et), es);
            let p = self.ring_prev(et);
            self.edges[p.0].rightmost = Some(s);
            self.flush_triangles(output, outline, t, false);
        } else {
            // es was a bottom edge.
            self.ring_splice(es, et);
            debug_assert_eq!(self.ring_prev(et), es);
            let n = self.ring_next(et);
            self.edges[n.0].rightmost = Some(s);
            self.flush_triangles(output, outline, t, true);
        }
    }

    /// START: open a new ring; an improper start (inside another face)
    /// splits the enclosing ring at its rightmost vertex and threads it
    /// through the new vertex pair.
    fn tri_start(&mut self, output: &mut Polygon, outline: &SegmentSet, s: VertexId, t: VertexId) {
        let es = s.edge();
        let et = t.edge();

        self.set_point_idx(s.other_end(), INVALID_POINT);
        self.set_point_idx(t.other_end(), INVALID_POINT);

        // s is the bottom edge, t the top one.
        self.state_edge_insert_successfully(s);
        self.state_edge_insert_successfully(t);
        debug_assert_eq!(self.tree_edge_next(es), Some(et));

        let er = self.tree_edge_prev(es);
        let back = match er {
            None => true,
            Some(er) => !self.edges[er.0].back,
        };
        self.edges[es.0].back = back;
        self.edges[et.0].back = !back;

        self.ring_init2(es, et);

        if back {
            // Proper start: the right of s--t is inside.
            sweep_log!(self, "triangulate: proper START at {:?}", self.vertex_pos(s));
            self.edges[es.0].rightmost = Some(s);
            self.edges[et.0].rightmost = Some(t);
        } else {
            // Improper start: the face continues on both sides. Split the
            // enclosing ring at its rightmost vertex and route its upper
            // part through t, its lower part through s.
            sweep_log!(self, "triangulate: improper START at {:?}", self.vertex_pos(s));
            debug_assert!(self.edges[et.0].back);
            let er = er.expect("improper start without an enclosing edge");
            let lms = self.edges[er.0].rightmost.expect("enclosing edge without rightmost");
            let elms = lms.edge();
            let elmt = self.ring_next(elms);
            let lmt = self
                .vertex_eq_buddy(lms)
                .expect("rightmost vertex without a ring buddy");
            debug_assert_eq!(elmt, lmt.edge());
            let _ = elmt;

            // Cut the enclosing ring between lms and lmt and splice the
            // new pair in between.
            self.ring_splice(et, lmt.edge());
            debug_assert_eq!(self.vertex_step(t, 0), lmt);
            self.ring_splice(es, er);
            debug_assert_eq!(self.vertex_step(s, 1), lms);

            let mut sr = lms;
            let mut tr = lmt;
            if self.point_idx(lms) != self.point_idx(s) {
                // Bridge the gap with two overlapping half edges so both
                // ring sections keep a rightmost vertex on the seam.
                let ht = self.tri_edge_new(lms, s, true);
                self.ring_splice(et, ht);
                debug_assert_eq!(self.vertex_step(VertexId::new(ht, RIGHT), 1), t);
                debug_assert_eq!(self.vertex_step(VertexId::new(ht, LEFT), 0), lmt);

                let hs = self.tri_edge_new(lms, s, false);
                self.ring_splice(hs, es);
                debug_assert_eq!(self.vertex_step(VertexId::new(hs, RIGHT), 0), s);
                debug_assert_eq!(self.vertex_step(VertexId::new(hs, LEFT), 1), lms);

                sr = VertexId::new(hs, RIGHT);
                tr = VertexId::new(ht, RIGHT);
            }

            debug_assert!(self.edges[er.0].back);
            self.edges[er.0].rightmost = Some(sr);
            self.edges[et.0].rightmost = Some(t);
            self.edges[es.0].rightmost = Some(s);
            let p = self.ring_prev(et);
            self.edges[p.0].rightmost = Some(tr);

            self.flush_triangles(output, outline, s, true);
            self.flush_triangles(output, outline, t, false);
        }
    }

    /// END: close a ring (emitting the last ears) or merge two ring
    /// sections meeting from opposite sides.
    fn tri_end(&mut self, output: &mut Polygon, outline: &SegmentSet, s: VertexId, t: VertexId) {
        debug_assert_eq!(s.side(), RIGHT);
        let es = s.edge();
        let et = t.edge();
        // t is the bottom edge, s the top one.
        debug_assert!(self.edges[es.0].back != self.edges[et.0].back);
        debug_assert_eq!(self.tree_edge_next(et), Some(es));

        self.state_edge_remove(es);
        self.state_edge_remove(et);

        let et_back = self.edges[et.0].back as usize;
        if self.ring_step(et, et_back) == es {
            // The face is complete.
            sweep_log!(self, "triangulate: proper END at {:?}", self.vertex_pos(s));
            debug_assert_eq!(self.ring_step(es, self.edges[es.0].back as usize), et);
            debug_assert_eq!(self.point_idx(s), self.point_idx(t));
            self.flush_triangles(output, outline, s, true);
            self.flush_triangles(output, outline, t, false);
        } else {
            // Two sections of the same face meet: the ends of an arm.
            sweep_log!(self, "triangulate: improper END at {:?}", self.vertex_pos(s));
            let eh = self.ring_prev(es);
            let el = self.ring_next(et);
            self.edges[eh.0].rightmost = Some(s);
            self.edges[el.0].rightmost = Some(t);

            debug_assert!(!self.edges[et.0].back);
            debug_assert!(self.edges[es.0].back);
            self.flush_triangles(output, outline, t, true);
            self.flush_triangles(output, outline, s, false);

            self.ring_merge(et, es);
        }
    }

    /// A synthetic inner edge between two already-swept vertices.
    fn tri_edge_new(&mut self, left: VertexId, right: VertexId, back: bool) -> EdgeId {
        let lp = self.vertex_pos(left);
        let rp = self.vertex_pos(right);
        let li = self.point_idx(left);
        let ri = self.point_idx(right);
        let e = self.edge_new(lp, rp, 0, false);
        self.edges[e.0].back = back;
        self.edges[e.0].ends[LEFT].point_idx = li;
        self.edges[e.0].ends[RIGHT].point_idx = ri;
        debug_assert!(self.vertex_valid(VertexId::new(e, LEFT)));
        debug_assert!(self.vertex_valid(VertexId::new(e, RIGHT)));
        e
    }

    /// Disable a vertex; an edge with both ends disabled leaves its ring,
    /// and synthetic edges are freed with it.
    fn tri_vertex_remove(&mut self, v: VertexId) {
        let e = v.edge();
        self.edges[e.0].dis[v.side()] = true;
        if self.edges[e.0].dis[1 - v.side()] {
            self.ring_remove(e);
            if !self.result_is_member(VertexId::new(e, LEFT)) {
                self.edge_delete(e);
            }
        }
    }

    /// Remove a vertex together with its same-point ring buddy.
    fn tri_vertex_remove2(&mut self, v: VertexId) {
        let w = self.vertex_eq_buddy(v);
        self.tri_vertex_remove(v);
        if let Some(w) = w {
            self.tri_vertex_remove(w);
        }
    }

    /// Clip convex ears off the ring starting at `p`, walking backwards
    /// when `back` is set, until the corner stops being convex or the walk
    /// reaches an unswept vertex.
    fn flush_triangles(
        &mut self,
        output: &mut Polygon,
        outline: &SegmentSet,
        p: VertexId,
        back: bool,
    ) {
        let dir = back as usize;
        'restart: loop {
            let mut q = match self.vertex_step_neq(p, dir) {
                Some(q) if self.vertex_valid(q) => q,
                _ => return,
            };
            loop {
                let w = match self.vertex_step_neq(q, dir) {
                    Some(w) if self.vertex_valid(w) => w,
                    _ => return,
                };

                let pp = self.vertex_pos(p);
                let pq = self.vertex_pos(q);
                let pw = self.vertex_pos(w);
                // The rings run clockwise, so the forward walk sees a
                // convex corner as a negative orientation.
                let area = cross(pp, pq, pw);
                let turn = if back { area } else { -area };

                if turn < 0 {
                    return;
                }

                if turn == 0 {
                    debug_assert!(self.point_idx(p) != self.point_idx(q));
                    debug_assert!(self.point_idx(w) != self.point_idx(q));
                    if self.point_idx(p) == self.point_idx(w) {
                        // A collapsed two-point spike: drop both inner
                        // vertices and try again.
                        self.tri_vertex_remove2(q);
                        let q2 = self.vertex_step(w, dir);
                        if q2 == p {
                            return;
                        }
                        self.tri_vertex_remove2(w);
                        continue 'restart;
                    }
                    return;
                }

                // Emit counter-clockwise.
                let verts = if back { [p, q, w] } else { [q, p, w] };
                let pos = [
                    self.vertex_pos(verts[0]),
                    self.vertex_pos(verts[1]),
                    self.vertex_pos(verts[2]),
                ];
                debug_assert!(cross(pos[0], pos[1], pos[2]) > 0);
                let mut flags = 0;
                if outline.contains(&segment_key(pos[0], pos[1])) {
                    flags |= Triangle::OUTLINE_01;
                }
                if outline.contains(&segment_key(pos[1], pos[2])) {
                    flags |= Triangle::OUTLINE_12;
                }
                if outline.contains(&segment_key(pos[2], pos[0])) {
                    flags |= Triangle::OUTLINE_20;
                }
                output.triangles.push(Triangle {
                    p: [
                        self.point_idx(verts[0]),
                        self.point_idx(verts[1]),
                        self.point_idx(verts[2]),
                    ],
                    flags,
                });

                self.tri_vertex_remove2(q);
                q = w;
            }
        }
    }
}
