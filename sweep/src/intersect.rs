//! Input interface and phase 1 of the pipeline: a Bentley-Ottmann sweep
//! with exact arithmetic.
//!
//! Phase 1 finds all intersections. Overlapping collinear edges are
//! collapsed the moment they meet in the active tree (merging their
//! membership masks by xor), and intersections that happen to fall on the
//! integer grid are resolved immediately by splitting the edges. Only
//! genuinely fractional crossings are scheduled on the crossing agenda;
//! snap rounding (phase 2) routes the arrangement through their hot
//! pixels afterwards.

use crate::state::{
    edge_south, EdgeId, Phase, Sweep, VertexId, XingId, LEFT, RIGHT,
};
use crate::{Mask, Polygon};
use polysnap_collections::Arena;
use polysnap_geom::math::Point;
use polysnap_geom::{
    point_cmp, segment_intersection, sqr_distance, FracPoint, LineSegment, SegmentIntersection,
    MAX_COORD, MIN_COORD,
};
use std::cmp::Ordering;

impl Sweep {
    /// A sweep with no edges.
    pub fn new() -> Self {
        Sweep::with_capacity(0)
    }

    /// A sweep expecting around `edge_count` input edges.
    pub fn with_capacity(edge_count: usize) -> Self {
        Sweep {
            edges: Arena::with_capacity(edge_count),
            xings: Arena::new(),
            bundles: Arena::new(),
            edge_list: Vec::with_capacity(edge_count),
            xing_list: Vec::new(),
            agenda_vertex: None,
            agenda_vertex_min: None,
            agenda_xing: None,
            agenda_xing_min: None,
            state: None,
            bundle_state: None,
            result: None,
            phase: Phase::Intersect,
            intersected: false,
            log: false,
        }
    }

    /// Print the engine's decisions to stdout (debug builds only).
    pub fn enable_logging(&mut self) {
        self.log = true;
    }

    /// Add one segment belonging to the polygons in `member`.
    ///
    /// The endpoint order does not matter; zero-length segments are
    /// silently dropped. Coordinates must lie in
    /// `MIN_COORD..=MAX_COORD`.
    pub fn add_edge(&mut self, a: Point, b: Point, member: Mask) {
        assert!(!self.intersected, "add_edge after intersect()");
        debug_assert!(
            a.x >= MIN_COORD && a.x <= MAX_COORD && a.y >= MIN_COORD && a.y <= MAX_COORD,
            "coordinate overflow"
        );
        debug_assert!(
            b.x >= MIN_COORD && b.x <= MAX_COORD && b.y >= MIN_COORD && b.y <= MAX_COORD,
            "coordinate overflow"
        );
        let (a, b) = match point_cmp(a, b) {
            Ordering::Equal => return,
            Ordering::Greater => (b, a),
            Ordering::Less => (a, b),
        };
        let e = self.edge_new(a, b, member, true);
        self.agenda_vertex_insert(VertexId::new(e, LEFT));
        self.agenda_vertex_insert(VertexId::new(e, RIGHT));
    }

    /// Add a batch of segments with a common membership mask.
    pub fn add_segments(&mut self, segments: &[LineSegment], member: Mask) {
        for s in segments {
            self.add_edge(s.from, s.to, member);
        }
    }

    /// Add a polygon's boundary. Paths are preferred over the triangle
    /// list (fewer edges); shared triangle edges cancel by xor either way.
    pub fn add_polygon(&mut self, polygon: &Polygon, member: Mask) {
        if !polygon.paths.is_empty() {
            for path in &polygon.paths {
                for k in 0..path.points.len() {
                    let i = path.points[k] as usize;
                    let j = path.points[(k + 1) % path.points.len()] as usize;
                    self.add_edge(polygon.points[i], polygon.points[j], member);
                }
            }
        } else {
            for tri in &polygon.triangles {
                let a = polygon.points[tri.p[0] as usize];
                let b = polygon.points[tri.p[1] as usize];
                let c = polygon.points[tri.p[2] as usize];
                self.add_edge(a, b, member);
                self.add_edge(b, c, member);
                self.add_edge(c, a, member);
            }
        }
    }

    /// Import another sweep's arrangement under a single mask.
    pub fn add_sweep(&mut self, other: &Sweep, member: Mask) {
        for (segment, _) in other.result_segments() {
            self.add_edge(segment.from, segment.to, member);
        }
    }

    /// The snap-rounded arrangement, as segments with their membership
    /// masks. Only meaningful after [`Sweep::intersect`].
    pub fn result_segments(&self) -> Vec<(LineSegment, Mask)> {
        let mut out = Vec::new();
        let mut v = self.result_min();
        while let Some(c) = v {
            if c.side() == LEFT {
                let e = c.edge();
                out.push((
                    LineSegment::new(self.left_pos(e), self.right_pos(e)),
                    self.edges[e.0].member,
                ));
            }
            v = self.result_next(c);
        }
        out
    }

    /// Whether the arrangement is empty.
    pub fn is_empty(&self) -> bool {
        self.result.is_none()
    }

    /// The bounding box of the current primary edges.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let mut bb: Option<(Point, Point)> = None;
        for &e in &self.edge_list {
            if !self.edges.contains(e.0) {
                continue;
            }
            for p in [self.left_pos(e), self.right_pos(e)].iter() {
                bb = Some(match bb {
                    None => (*p, *p),
                    Some((lo, hi)) => (
                        Point::new(lo.x.min(p.x), lo.y.min(p.y)),
                        Point::new(hi.x.max(p.x), hi.y.max(p.y)),
                    ),
                });
            }
        }
        bb
    }

    /// Run the intersection phase and snap-round the arrangement.
    ///
    /// After this, the result set holds non-crossing edges with integer
    /// endpoints, ready for [`Sweep::reduce`], [`Sweep::polygonize`] or
    /// [`Sweep::triangulate`].
    pub fn intersect(&mut self) {
        assert!(
            self.phase == Phase::Intersect && !self.intersected,
            "intersect() must run exactly once"
        );
        self.find_intersections();
        // Snap rounding always runs, so that segment endpoints land on
        // pixel centers even when there is no fractional crossing.
        self.snap_round();
        self.intersected = true;
    }

    fn find_intersections(&mut self) {
        while self.agenda_vertex_min.is_some() || self.agenda_xing_min.is_some() {
            if self.next_event_is_crossing() {
                let x = self.agenda_xing_extract_min().expect("checked non-empty");
                // A crossing whose representative was invalidated and
                // never rescheduled is stale: its edges are no longer
                // adjacent, or no longer reach the crossing point.
                if self.xings[x.0].some_edge.is_none() {
                    continue;
                }
                self.ev_cross(x);
            } else {
                let v = self.agenda_vertex_extract_min().expect("checked non-empty");
                if v.side() == LEFT {
                    self.ev_left(v);
                } else {
                    self.ev_right(v);
                }
            }
        }
    }

    /// At the very same point, RIGHT events run first, then crossings,
    /// then LEFT events.
    fn next_event_is_crossing(&self) -> bool {
        let x = match self.agenda_xing_min {
            None => return false,
            Some(x) => x,
        };
        let v = match self.agenda_vertex_min {
            None => return true,
            Some(v) => v,
        };
        match self.xings[x.0].position.cmp_point(self.vertex_pos(v)) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => {
                // Integer crossings were split eagerly, so a crossing
                // event cannot coincide with an endpoint event.
                debug_assert!(false, "crossing coincides with an endpoint");
                v.side() == LEFT
            }
        }
    }

    fn ev_left(&mut self, left: VertexId) {
        let edge = left.edge();
        match self.state_edge_insert(left) {
            Some(other) => {
                sweep_log!(self, "overlap of {:?} and {:?}", edge, other);
                debug_assert!(self.left_pos(edge) != self.right_pos(other));
                self.ev_overlap(edge, other);
            }
            None => {
                let prev = self.tree_edge_prev(edge);
                let next = self.tree_edge_next(edge);

                // The new edge separates prev and next; their pending
                // crossing, if any, is obsolete.
                self.xing_split(prev, next);
                debug_assert!(self.edges[edge.0].next_xing.is_none());
                debug_assert!(self.edges[edge.0].prev_xing.is_none());

                let cur = FracPoint::from_point(self.vertex_pos(left));
                self.ev_pair(&cur, prev, Some(edge));
                self.ev_pair(&cur, Some(edge), next);
            }
        }
    }

    fn ev_right(&mut self, right: VertexId) {
        let edge = right.edge();
        let prev = self.tree_edge_prev(edge);
        let next = self.tree_edge_next(edge);

        debug_assert!(self.edges[edge.0].prev_xing.is_none());
        debug_assert!(self.edges[edge.0].next_xing.is_none());
        self.state_edge_remove(edge);

        if prev.is_some() && next.is_some() {
            let cur = FracPoint::from_point(self.vertex_pos(right));
            self.ev_pair(&cur, prev, next);
        }
    }

    /// Check a newly adjacent pair and schedule or resolve their
    /// intersection.
    fn ev_pair(&mut self, cur: &FracPoint, prev: Option<EdgeId>, next: Option<EdgeId>) {
        let (prev, next) = match (prev, next) {
            (Some(p), Some(n)) => (p, n),
            _ => return,
        };
        let a = LineSegment::new(self.left_pos(prev), self.right_pos(prev));
        let b = LineSegment::new(self.left_pos(next), self.right_pos(next));
        match segment_intersection(&a, &b) {
            SegmentIntersection::None
            | SegmentIntersection::Parallel
            | SegmentIntersection::Shared => {}

            SegmentIntersection::AFromOnB => self.ev_split(a.from, next),
            SegmentIntersection::AToOnB => self.ev_split(a.to, next),
            SegmentIntersection::BFromOnA => self.ev_split(b.from, prev),
            SegmentIntersection::BToOnA => self.ev_split(b.to, prev),

            SegmentIntersection::Crossing(at) => {
                if at.cmp(cur) != Ordering::Greater {
                    // Already handled when the scan line passed it.
                    return;
                }
                debug_assert!(self.state_edge_is_member(prev));
                debug_assert!(self.state_edge_is_member(next));
                if at.is_integer() {
                    // Grid crossings are resolved right away; this keeps
                    // crossing events and endpoint events disjoint.
                    let p = at.round();
                    sweep_log!(self, "integer crossing at {:?}", p);
                    self.ev_split(p, prev);
                    self.ev_split(p, next);
                } else {
                    sweep_log!(self, "crossing at {:?}/{:?}", at.x, at.y);
                    self.xing_new(at, prev, next);
                }
            }
        }
    }

    /// Split edge `o` at the integer point `at`: `o` keeps the left part,
    /// a new edge takes over the right part.
    fn ev_split(&mut self, at: Point, o: EdgeId) {
        sweep_log!(self, "split {:?} at {:?}", o, at);
        let member = self.edges[o.0].member;
        let right = self.right_pos(o);
        let q = self.edge_new(at, right, member, true);
        self.edges[o.0].ends[RIGHT].position = at;
        debug_assert_eq!(point_cmp(self.left_pos(o), at), Ordering::Less);
        self.xing_clear_beyond(o);
        self.agenda_vertex_update(VertexId::new(o, RIGHT));
        self.agenda_vertex_insert(VertexId::new(q, LEFT));
        self.agenda_vertex_insert(VertexId::new(q, RIGHT));
    }

    /// Collapse two edges that occupy the same active-tree position: they
    /// overlap on a positive-length collinear stretch starting at the scan
    /// position. `e` is the incoming edge, `o` the resident one.
    fn ev_overlap(&mut self, e: EdgeId, o: EdgeId) {
        debug_assert!(self.state_edge_is_member(o));
        debug_assert!(!self.state_edge_is_member(e));
        debug_assert!(self.agenda_vertex_is_member(VertexId::new(e, RIGHT)));
        debug_assert!(self.agenda_vertex_is_member(VertexId::new(o, RIGHT)));
        debug_assert!(!self.agenda_vertex_is_member(VertexId::new(e, LEFT)));
        debug_assert!(!self.agenda_vertex_is_member(VertexId::new(o, LEFT)));

        // Both edges end at o's right end, at e's right end, or beyond;
        // and o either started at the same point as e or earlier.
        let e_left = self.left_pos(e);
        let e_right = self.right_pos(e);
        let o_right = self.right_pos(o);
        let shared_right = sqr_distance(e_left, e_right).cmp(&sqr_distance(e_left, o_right));
        let left_eq = self.left_pos(o) == e_left;

        match shared_right {
            Ordering::Equal if left_eq => {
                sweep_log!(self, "overlap: edges coincide");
                // o absorbs e entirely.
                self.edges[o.0].member ^= self.edges[e.0].member;
                self.agenda_vertex_remove(VertexId::new(e, RIGHT));
                self.edge_delete(e);
            }
            Ordering::Equal => {
                sweep_log!(self, "overlap: same right end");
                // o is cut at the scan position; e carries the merged
                // overlap to the common right end.
                self.edges[e.0].member ^= self.edges[o.0].member;
                self.edges[o.0].ends[RIGHT].position = e_left;
                self.state_edge_replace(o, e);
                self.xing_move(e, o);
                self.agenda_vertex_remove(VertexId::new(o, RIGHT));
            }
            Ordering::Greater if left_eq => {
                sweep_log!(self, "overlap: e continues past o");
                // The shared stretch is all of o; e restarts after it.
                self.edges[o.0].member ^= self.edges[e.0].member;
                self.edges[e.0].ends[LEFT].position = o_right;
                self.agenda_vertex_insert(VertexId::new(e, LEFT));
            }
            Ordering::Greater => {
                sweep_log!(self, "overlap: o cut, e continues");
                // Three parts: o's prefix, the merged middle, e's tail.
                let tail_member = self.edges[e.0].member;
                let q = self.edge_new(o_right, e_right, tail_member, true);
                self.edges[e.0].member ^= self.edges[o.0].member;
                self.edges[e.0].ends[RIGHT].position = o_right;
                self.edges[o.0].ends[RIGHT].position = e_left;
                self.state_edge_replace(o, e);
                self.xing_move(e, o);
                self.agenda_vertex_update(VertexId::new(e, RIGHT));
                self.agenda_vertex_remove(VertexId::new(o, RIGHT));
                self.agenda_vertex_insert(VertexId::new(q, LEFT));
                self.agenda_vertex_insert(VertexId::new(q, RIGHT));
            }
            Ordering::Less if left_eq => {
                sweep_log!(self, "overlap: e inside o, shared start");
                // o keeps the merged prefix; e becomes o's old tail.
                let o_member = self.edges[o.0].member;
                self.edges[o.0].member ^= self.edges[e.0].member;
                self.edges[e.0].member = o_member;
                self.edges[e.0].ends[LEFT].position = e_right;
                self.edges[e.0].ends[RIGHT].position = o_right;
                self.edges[o.0].ends[RIGHT].position = e_right;
                self.xing_clear_beyond(o);
                self.agenda_vertex_update(VertexId::new(o, RIGHT));
                self.agenda_vertex_insert(VertexId::new(e, LEFT));
                self.agenda_vertex_update(VertexId::new(e, RIGHT));
            }
            Ordering::Less => {
                sweep_log!(self, "overlap: e inside o");
                // o's prefix stays o, the merged middle is e, o's tail
                // becomes a fresh edge.
                self.edges[e.0].member ^= self.edges[o.0].member;
                let tail_member = self.edges[o.0].member;
                let q = self.edge_new(e_right, o_right, tail_member, true);
                self.edges[o.0].ends[RIGHT].position = e_right;
                self.xing_clear_beyond(o);
                self.edges[o.0].ends[RIGHT].position = e_left;
                self.state_edge_replace(o, e);
                self.xing_move(e, o);
                self.agenda_vertex_remove(VertexId::new(o, RIGHT));
                self.agenda_vertex_insert(VertexId::new(q, LEFT));
                self.agenda_vertex_insert(VertexId::new(q, RIGHT));
            }
        }
    }

    /// Process a crossing event: reverse the contiguous block of edges
    /// meeting at the crossing, then test the new outer pairs.
    fn ev_cross(&mut self, ev: XingId) {
        // All edges crossing here are adjacent in the active tree and
        // point at this event; recover the block by walking outward from
        // the representative.
        let some = self.xings[ev.0].some_edge.expect("crossing without representative");

        let mut top = some;
        loop {
            match self.tree_edge_next(top) {
                Some(u) if self.edges[u.0].prev_xing == Some(ev) => top = u,
                _ => break,
            }
        }

        let mut bot = some;
        loop {
            match self.tree_edge_prev(bot) {
                Some(r) if self.edges[r.0].next_xing == Some(ev) => bot = r,
                _ => break,
            }
        }

        debug_assert!(bot != top);

        // Remember one representative per slope class for the two snap
        // passes.
        self.xings[ev.0].some_edge = None;
        let bot_south = edge_south(&self.edges, bot) as usize;
        let top_south = edge_south(&self.edges, top) as usize;
        self.xings[ev.0].pass_edge[bot_south] = Some(bot);
        self.xings[ev.0].pass_edge[top_south] = Some(top);

        let below = self.tree_edge_prev(bot);
        let above = self.tree_edge_next(top);
        self.xing_split(below, Some(bot));
        self.xing_split(Some(top), above);

        self.reverse_block(ev, bot, top);

        // The block is reversed: the former bottom edge is now on top and
        // vice versa. Test both against their outside neighbours.
        let cur = self.xings[ev.0].position;
        let above = self.tree_edge_next(bot);
        self.ev_pair(&cur, Some(bot), above);
        let below = self.tree_edge_prev(top);
        self.ev_pair(&cur, below, Some(top));
    }

    /// Reverse the order of the contiguous run `bot..=top` in the active
    /// tree by swapping pairs inward, clearing their crossing links.
    fn reverse_block(&mut self, ev: XingId, bot: EdgeId, top: EdgeId) {
        let mut s = bot;
        let mut t = top;
        loop {
            debug_assert!(s != t);
            debug_assert!(
                self.edges[s.0].next_xing.map_or(true, |x| x == ev)
                    && self.edges[s.0].prev_xing.map_or(true, |x| x == ev)
            );
            self.edges[s.0].next_xing = None;
            self.edges[s.0].prev_xing = None;
            self.edges[t.0].next_xing = None;
            self.edges[t.0].prev_xing = None;

            self.state_edge_swap(s, t);

            let t2 = self.tree_edge_prev(s).expect("lost the reversed block");
            if t2 == t {
                break;
            }
            let s2 = self.tree_edge_next(t).expect("lost the reversed block");
            if s2 == t2 {
                // Odd-length block: the middle edge keeps its place.
                self.edges[s2.0].next_xing = None;
                self.edges[s2.0].prev_xing = None;
                break;
            }
            s = s2;
            t = t2;
        }
    }
}

impl Default for Sweep {
    fn default() -> Self {
        Sweep::new()
    }
}
