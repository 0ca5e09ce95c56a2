//! Shared state of the sweep engine: arenas, ids, the active tree, the
//! agendas and the result set, plus the comparators that order them.
//!
//! The engine threads every edge through several intrusive structures at
//! once. A [`VertexId`] addresses one end of an edge (the low bit is the
//! side), so each edge contributes two agenda/result nodes and one tree
//! node without separate allocations.

use crate::Mask;
use polysnap_collections::dict::{self, Augment, AugmentEvent, DuplicatePolicy, Forest, Node};
use polysnap_collections::Arena;
use polysnap_geom::math::Point;
use polysnap_geom::{cross, point_cmp, point_edge_cmp, point_edge_cmp_rounded, FracPoint};
use std::cmp::Ordering;

/// Vertex output index meaning "not assigned yet".
pub(crate) const INVALID_POINT: u32 = u32::max_value();

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct EdgeId(pub u32);

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct XingId(pub u32);

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct BundleId(pub u32);

/// One end of an edge: the edge id and a side bit.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct VertexId(pub u32);

pub(crate) const LEFT: usize = 0;
pub(crate) const RIGHT: usize = 1;

impl VertexId {
    #[inline]
    pub fn new(e: EdgeId, side: usize) -> Self {
        VertexId(e.0 * 2 + side as u32)
    }

    #[inline]
    pub fn edge(self) -> EdgeId {
        EdgeId(self.0 >> 1)
    }

    #[inline]
    pub fn side(self) -> usize {
        (self.0 & 1) as usize
    }

    /// The opposite end of the same edge.
    #[inline]
    pub fn other_end(self) -> VertexId {
        VertexId(self.0 ^ 1)
    }
}

pub(crate) struct Vertex {
    pub position: Point,
    /// Output point index; only meaningful during polygonize/triangulate.
    pub point_idx: u32,
    /// Agenda link during the sweep phases, result link afterwards.
    pub agenda: Node<VertexId>,
}

impl Vertex {
    fn new(position: Point) -> Self {
        Vertex {
            position,
            point_idx: INVALID_POINT,
            agenda: Node::new(),
        }
    }
}

/// An edge of the arrangement.
///
/// The fields after `member` are phase-gated: the crossing links are live
/// during intersection, `sum_member` during snap rounding, `below`/`keep`
/// during reduction, and the ring fields during polygonize/triangulate.
pub(crate) struct Edge {
    pub ends: [Vertex; 2],
    /// Active-tree link (phase 1, reduce, polygonize, triangulate) or
    /// bundle-tree link (snap rounding).
    pub tree: Node<EdgeId>,
    pub member: Mask,

    /// Imminent crossing with the tree predecessor, if scheduled.
    pub prev_xing: Option<XingId>,
    /// Imminent crossing with the tree successor, if scheduled.
    pub next_xing: Option<XingId>,

    /// Xor of `member` over this edge's subtree of its bundle tree.
    pub sum_member: Mask,

    /// Which polygons' interior lies directly below this edge.
    pub below: Mask,
    pub keep: bool,

    /// Whether the path traverses this edge right-to-left.
    pub back: bool,
    /// Per-side disabled flags for the vertex view of the face ring.
    pub dis: [bool; 2],
    /// Face ring: next and previous edge of the same face.
    pub ring: [EdgeId; 2],
    /// The rightmost swept vertex of this edge's ring section.
    pub rightmost: Option<VertexId>,
}

impl Edge {
    fn new(left: Point, right: Point, member: Mask) -> Self {
        Edge {
            ends: [Vertex::new(left), Vertex::new(right)],
            tree: Node::new(),
            member,
            prev_xing: None,
            next_xing: None,
            sum_member: 0,
            below: 0,
            keep: false,
            back: false,
            dis: [false, false],
            ring: [EdgeId(0), EdgeId(0)],
            rightmost: None,
        }
    }
}

/// A pending intersection event.
pub(crate) struct Xing {
    pub position: FracPoint,
    pub agenda: Node<XingId>,
    /// Some edge for which this crossing is imminent; cleared when the
    /// edge pair separates in the active tree.
    pub some_edge: Option<EdgeId>,
    /// Bottom (`[0]` north-sloped) and top representatives recorded for
    /// the two snap-rounding passes.
    pub pass_edge: [Option<EdgeId>; 2],
}

impl Xing {
    fn new(position: FracPoint) -> Self {
        Xing {
            position,
            agenda: Node::new(),
            some_edge: None,
            pass_edge: [None, None],
        }
    }
}

/// A group of edges sharing an origin pixel during snap rounding.
pub(crate) struct Bundle {
    pub origin: Point,
    pub root: Option<EdgeId>,
    pub bot: Option<EdgeId>,
    pub top: Option<EdgeId>,
    pub link: Node<BundleId>,
}

impl Bundle {
    fn new(origin: Point) -> Self {
        Bundle {
            origin,
            root: None,
            bot: None,
            top: None,
            link: Node::new(),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub(crate) enum Phase {
    Intersect,
    SnapNorth,
    SnapSouth,
    Reduce,
    Polygonize,
    Triangulate,
}

// The same arenas host all the intrusive links, one `Forest` per id type.

impl Forest<VertexId> for Arena<Edge> {
    fn node(&self, v: VertexId) -> &Node<VertexId> {
        &self[v.edge().0].ends[v.side()].agenda
    }
    fn node_mut(&mut self, v: VertexId) -> &mut Node<VertexId> {
        &mut self[v.edge().0].ends[v.side()].agenda
    }
}

impl Forest<EdgeId> for Arena<Edge> {
    fn node(&self, e: EdgeId) -> &Node<EdgeId> {
        &self[e.0].tree
    }
    fn node_mut(&mut self, e: EdgeId) -> &mut Node<EdgeId> {
        &mut self[e.0].tree
    }
}

impl Forest<XingId> for Arena<Xing> {
    fn node(&self, x: XingId) -> &Node<XingId> {
        &self[x.0].agenda
    }
    fn node_mut(&mut self, x: XingId) -> &mut Node<XingId> {
        &mut self[x.0].agenda
    }
}

impl Forest<BundleId> for Arena<Bundle> {
    fn node(&self, b: BundleId) -> &Node<BundleId> {
        &self[b.0].link
    }
    fn node_mut(&mut self, b: BundleId) -> &mut Node<BundleId> {
        &mut self[b.0].link
    }
}

/// The plane-sweep engine.
///
/// Accumulates tagged edges, finds and rounds all intersections, and hands
/// the resulting arrangement to one of the consumer phases. See the crate
/// documentation for the full pipeline.
pub struct Sweep {
    pub(crate) edges: Arena<Edge>,
    pub(crate) xings: Arena<Xing>,
    pub(crate) bundles: Arena<Bundle>,

    /// The primary edges, kept through phases 1 and 2. Result edges
    /// emitted by snap rounding are not listed here.
    pub(crate) edge_list: Vec<EdgeId>,
    /// All unique crossings found by phase 1.
    pub(crate) xing_list: Vec<XingId>,

    pub(crate) agenda_vertex: Option<VertexId>,
    pub(crate) agenda_vertex_min: Option<VertexId>,
    pub(crate) agenda_xing: Option<XingId>,
    pub(crate) agenda_xing_min: Option<XingId>,

    /// Active tree: edges (phase 1 and the consumer phases).
    pub(crate) state: Option<EdgeId>,
    /// Active tree: bundles (snap rounding).
    pub(crate) bundle_state: Option<BundleId>,

    /// The snap-rounded arrangement, ordered by vertex.
    pub(crate) result: Option<VertexId>,

    pub(crate) phase: Phase,
    pub(crate) intersected: bool,
    pub(crate) log: bool,
}

// -- comparators ----------------------------------------------------------

/// Order of the result set: by vertex position, RIGHT ends before LEFT
/// ends, then bottom-to-top by the angle of the opposite end.
pub(crate) fn result_vertex_cmp(pool: &Arena<Edge>, a: VertexId, b: VertexId) -> Ordering {
    let pa = vertex_pos(pool, a);
    let pb = vertex_pos(pool, b);
    point_cmp(pa, pb)
        .then_with(|| b.side().cmp(&a.side()))
        .then_with(|| {
            let oa = vertex_pos(pool, a.other_end());
            let ob = vertex_pos(pool, b.other_end());
            let i = cross(pa, ob, oa).cmp(&0);
            // Only equal edges may fully compare equal.
            debug_assert!(i != Ordering::Equal || oa == ob);
            i
        })
}

/// Active-tree order: the left vertex of a new edge against a resident
/// edge, by exact vertical position, then by slope for edges meeting at
/// the scan position.
///
/// A collinear continuation (the new edge starts exactly where the
/// resident edge ends) sorts below the resident edge, so LEFT events are
/// processed before the matching RIGHT event removes the old edge; the
/// polygonize and triangulate phases rely on this.
pub(crate) fn tree_vertex_edge_cmp(pool: &Arena<Edge>, v: VertexId, e: EdgeId) -> Ordering {
    debug_assert_eq!(v.side(), LEFT);
    let p = vertex_pos(pool, v);
    let el = pool[e.0].ends[LEFT].position;
    let er = pool[e.0].ends[RIGHT].position;

    let i = point_edge_cmp(p, el, er);
    if i != Ordering::Equal {
        return i;
    }

    // The left vertex lies exactly on the edge: order by where the new
    // edge's right end points, seen from the common point.
    let r = vertex_pos(pool, v.other_end());
    let i = cross(p, er, r).cmp(&0);
    if i != Ordering::Equal {
        return i;
    }

    if p == er {
        return Ordering::Less;
    }

    Ordering::Equal
}

/// Hot-pixel comparison of a pixel origin against an edge.
pub(crate) fn pixel_edge_cmp(pool: &Arena<Edge>, p: Point, e: EdgeId) -> Ordering {
    point_edge_cmp_rounded(p, pool[e.0].ends[LEFT].position, pool[e.0].ends[RIGHT].position)
}

/// A pixel origin against a whole bundle: equal when the pixel lies
/// between the bundle's bottom and top edges (inclusive, with hot-pixel
/// tolerance).
pub(crate) fn pixel_bundle_cmp(
    bundles: &Arena<Bundle>,
    pool: &Arena<Edge>,
    p: Point,
    b: BundleId,
) -> Ordering {
    let bundle = &bundles[b.0];
    let i = pixel_edge_cmp(pool, p, bundle.top.expect("bundle without edges"));
    if i != Ordering::Less {
        return i;
    }
    let i = pixel_edge_cmp(pool, p, bundle.bot.expect("bundle without edges"));
    if i != Ordering::Greater {
        return i;
    }
    Ordering::Equal
}

/// Bundle-tree order: by origin pixel against the other bundle's edges,
/// or by angle for bundles sharing an origin.
pub(crate) fn bundle_bundle_cmp(
    bundles: &Arena<Bundle>,
    pool: &Arena<Edge>,
    a: BundleId,
    b: BundleId,
) -> Ordering {
    let oa = bundles[a.0].origin;
    let ob = bundles[b.0].origin;
    let top_b = bundles[b.0].top.expect("bundle without edges");
    if oa != ob {
        // Bundles are disjoint, so one edge comparison decides.
        let i = point_edge_cmp(
            oa,
            pool[top_b.0].ends[LEFT].position,
            pool[top_b.0].ends[RIGHT].position,
        );
        debug_assert!(i != Ordering::Equal);
        return i;
    }
    let top_a = bundles[a.0].top.expect("bundle without edges");
    let ra = pool[top_a.0].ends[RIGHT].position;
    let rb = pool[top_b.0].ends[RIGHT].position;
    let i = cross(oa, rb, ra).cmp(&0);
    debug_assert!(i != Ordering::Equal);
    i
}

/// Vertex agenda order. Phase 1 orders by `(x, y)`; the snap passes keep
/// `x` ascending but run `y` downward in the south pass. At equal
/// positions RIGHT events come before LEFT events, then a slope tiebreak
/// keeps the processing order deterministic.
pub(crate) fn agenda_vertex_cmp(
    pool: &Arena<Edge>,
    south: bool,
    a: VertexId,
    b: VertexId,
) -> Ordering {
    let pa = vertex_pos(pool, a);
    let pb = vertex_pos(pool, b);
    let i = pa.x.cmp(&pb.x);
    if i != Ordering::Equal {
        return i;
    }
    let i = pa.y.cmp(&pb.y);
    if i != Ordering::Equal {
        return if south { i.reverse() } else { i };
    }
    let i = b.side().cmp(&a.side());
    if i != Ordering::Equal {
        return i;
    }
    let oa = vertex_pos(pool, a.other_end());
    let ob = vertex_pos(pool, b.other_end());
    cross(pa, oa, ob).cmp(&0)
}

/// Crossing agenda order for phase 1: exact `(x, y)`.
pub(crate) fn agenda_xing_phase1_cmp(xings: &Arena<Xing>, a: XingId, b: XingId) -> Ordering {
    let pa = &xings[a.0].position;
    let pb = &xings[b.0].position;
    pa.x.cmp(&pb.x).then_with(|| pa.y.cmp(&pb.y))
}

/// Crossing agenda order for the snap passes: primarily by rounded pixel
/// (south pass downward in `y`), then by the exact position for the sweep
/// across one pixel.
pub(crate) fn agenda_xing_phase2_cmp(
    xings: &Arena<Xing>,
    south: bool,
    a: XingId,
    b: XingId,
) -> Ordering {
    let pa = &xings[a.0].position;
    let pb = &xings[b.0].position;
    let flip = |i: Ordering| if south { i.reverse() } else { i };

    let i = pa.x.round().cmp(&pb.x.round());
    if i != Ordering::Equal {
        return i;
    }
    let i = pa.y.round().cmp(&pb.y.round());
    if i != Ordering::Equal {
        return flip(i);
    }
    let i = pa.x.cmp(&pb.x);
    if i != Ordering::Equal {
        return i;
    }
    flip(pa.y.cmp(&pb.y))
}

#[inline]
pub(crate) fn vertex_pos(pool: &Arena<Edge>, v: VertexId) -> Point {
    pool[v.edge().0].ends[v.side()].position
}

/// Whether an edge slopes south (or is horizontal): its left end is not
/// below its right end.
#[inline]
pub(crate) fn edge_south(pool: &Arena<Edge>, e: EdgeId) -> bool {
    pool[e.0].ends[LEFT].position.y >= pool[e.0].ends[RIGHT].position.y
}

// -- bundle-tree augmentation ---------------------------------------------

pub(crate) fn sum_member_of(pool: &Arena<Edge>, n: Option<EdgeId>) -> Mask {
    match n {
        None => 0,
        Some(n) => pool[n.0].sum_member,
    }
}

pub(crate) fn update_sum_member(pool: &mut Arena<Edge>, n: Option<EdgeId>) {
    if let Some(n) = n {
        let node = Forest::<EdgeId>::node(pool, n);
        let c0 = node.child(0);
        let c1 = node.child(1);
        let sum = pool[n.0].member ^ sum_member_of(pool, c0) ^ sum_member_of(pool, c1);
        pool[n.0].sum_member = sum;
    }
}

pub(crate) fn update_sum_member_up(pool: &mut Arena<Edge>, mut n: Option<EdgeId>) {
    while let Some(c) = n {
        update_sum_member(pool, Some(c));
        n = Forest::<EdgeId>::node(pool, c).parent();
    }
}

/// Keeps [`Edge::sum_member`] consistent across every bundle-tree
/// restructuring.
pub(crate) struct SumMemberAug;

impl Augment<Arena<Edge>, EdgeId> for SumMemberAug {
    fn event(&mut self, pool: &mut Arena<Edge>, main: EdgeId, aux: Option<EdgeId>, ev: AugmentEvent) {
        match ev {
            AugmentEvent::RotateLeft | AugmentEvent::RotateRight => {
                update_sum_member(pool, aux);
                update_sum_member(pool, Some(main));
            }
            AugmentEvent::Nop
            | AugmentEvent::Add
            | AugmentEvent::Join
            | AugmentEvent::CutLeaf => {
                update_sum_member(pool, Some(main));
            }
            AugmentEvent::Nop2 => {
                update_sum_member(pool, Some(main));
                let p = Forest::<EdgeId>::node(pool, main).parent();
                update_sum_member(pool, p);
            }
            AugmentEvent::Fini => {
                update_sum_member_up(pool, Some(main));
            }
            AugmentEvent::CutSwap => {}
            AugmentEvent::Split => {
                let m = pool[main.0].member;
                pool[main.0].sum_member = m;
            }
        }
    }
}

// -- structural helpers ---------------------------------------------------

impl Sweep {
    pub(crate) fn edge_new(
        &mut self,
        left: Point,
        right: Point,
        member: Mask,
        append: bool,
    ) -> EdgeId {
        debug_assert_eq!(point_cmp(left, right), Ordering::Less);
        let id = EdgeId(self.edges.add(Edge::new(left, right, member)));
        self.edges[id.0].ring = [id, id];
        if append {
            self.edge_list.push(id);
        }
        id
    }

    pub(crate) fn edge_delete(&mut self, e: EdgeId) {
        debug_assert!(!self.state_edge_is_member(e));
        debug_assert!(!self.agenda_vertex_is_member(VertexId::new(e, LEFT)));
        debug_assert!(!self.agenda_vertex_is_member(VertexId::new(e, RIGHT)));
        self.edges.remove(e.0);
    }

    #[inline]
    pub(crate) fn vertex_pos(&self, v: VertexId) -> Point {
        vertex_pos(&self.edges, v)
    }

    #[inline]
    pub(crate) fn left_pos(&self, e: EdgeId) -> Point {
        self.edges[e.0].ends[LEFT].position
    }

    #[inline]
    pub(crate) fn right_pos(&self, e: EdgeId) -> Point {
        self.edges[e.0].ends[RIGHT].position
    }

    pub(crate) fn state_edge_is_member(&self, e: EdgeId) -> bool {
        dict::may_contain(&self.edges, self.state, e)
    }

    pub(crate) fn agenda_vertex_is_member(&self, v: VertexId) -> bool {
        dict::may_contain(&self.edges, self.agenda_vertex, v)
    }

    pub(crate) fn result_is_member(&self, v: VertexId) -> bool {
        dict::may_contain(&self.edges, self.result, v)
    }

    // -- vertex agenda ----------------------------------------------------

    pub(crate) fn agenda_vertex_insert(&mut self, v: VertexId) {
        debug_assert!(!self.agenda_vertex_is_member(v));
        let south = self.phase == Phase::SnapSouth;
        dict::insert_update_by_aug(
            &mut self.edges,
            v,
            &v,
            &mut self.agenda_vertex,
            Some(&mut self.agenda_vertex_min),
            None,
            &|pool: &Arena<Edge>, key: &VertexId, n: VertexId| {
                agenda_vertex_cmp(pool, south, *key, n)
            },
            DuplicatePolicy::FirstOrGap,
            &mut dict::NoAugment,
        );
        debug_assert_eq!(self.agenda_vertex_min, dict::min(&self.edges, self.agenda_vertex));
    }

    pub(crate) fn agenda_vertex_remove(&mut self, v: VertexId) {
        debug_assert!(self.agenda_vertex_is_member(v));
        dict::remove(&mut self.edges, v, &mut self.agenda_vertex);
        self.agenda_vertex_min = dict::min(&self.edges, self.agenda_vertex);
    }

    /// Re-sort a vertex whose position changed while on the agenda.
    pub(crate) fn agenda_vertex_update(&mut self, v: VertexId) {
        debug_assert!(self.agenda_vertex_is_member(v));
        dict::remove(&mut self.edges, v, &mut self.agenda_vertex);
        let south = self.phase == Phase::SnapSouth;
        dict::insert_by(
            &mut self.edges,
            v,
            &v,
            &mut self.agenda_vertex,
            &|pool: &Arena<Edge>, key: &VertexId, n: VertexId| {
                agenda_vertex_cmp(pool, south, *key, n)
            },
            DuplicatePolicy::FirstOrGap,
        );
        self.agenda_vertex_min = dict::min(&self.edges, self.agenda_vertex);
    }

    pub(crate) fn agenda_vertex_extract_min(&mut self) -> Option<VertexId> {
        let r = dict::extract_update_min(
            &mut self.edges,
            &mut self.agenda_vertex,
            &mut self.agenda_vertex_min,
        );
        debug_assert_eq!(self.agenda_vertex_min, dict::min(&self.edges, self.agenda_vertex));
        r
    }

    // -- crossing agenda --------------------------------------------------

    pub(crate) fn agenda_xing_insert(&mut self, x: XingId) -> Option<XingId> {
        let south = self.phase == Phase::SnapSouth;
        let phase1 = self.phase == Phase::Intersect;
        dict::insert_update_by_aug(
            &mut self.xings,
            x,
            &x,
            &mut self.agenda_xing,
            Some(&mut self.agenda_xing_min),
            None,
            &|xings: &Arena<Xing>, key: &XingId, n: XingId| {
                if phase1 {
                    agenda_xing_phase1_cmp(xings, *key, n)
                } else {
                    agenda_xing_phase2_cmp(xings, south, *key, n)
                }
            },
            DuplicatePolicy::Any,
            &mut dict::NoAugment,
        )
    }

    pub(crate) fn agenda_xing_extract_min(&mut self) -> Option<XingId> {
        dict::extract_update_min(&mut self.xings, &mut self.agenda_xing, &mut self.agenda_xing_min)
    }

    /// Register a crossing between two adjacent edges, reusing an agenda
    /// entry if the same exact point is already scheduled.
    pub(crate) fn xing_new(&mut self, at: FracPoint, prev: EdgeId, next: EdgeId) {
        debug_assert!(self.edges[prev.0].next_xing.is_none());
        debug_assert!(self.edges[next.0].prev_xing.is_none());

        let candidate = XingId(self.xings.add(Xing::new(at)));
        let id = match self.agenda_xing_insert(candidate) {
            None => {
                self.xing_list.push(candidate);
                candidate
            }
            Some(existing) => {
                self.xings.remove(candidate.0);
                existing
            }
        };

        self.edges[prev.0].next_xing = Some(id);
        self.edges[next.0].prev_xing = Some(id);
        self.xings[id.0].some_edge = Some(next);
    }

    /// Invalidate the crossings of a pair of edges that stopped being
    /// adjacent. The agenda entries stay; a crossing without a
    /// representative is discarded when extracted.
    pub(crate) fn xing_split(&mut self, prev: Option<EdgeId>, next: Option<EdgeId>) {
        if let Some(prev) = prev {
            if let Some(x) = self.edges[prev.0].next_xing.take() {
                self.xings[x.0].some_edge = None;
            }
        }
        if let Some(next) = next {
            if let Some(x) = self.edges[next.0].prev_xing.take() {
                self.xings[x.0].some_edge = None;
            }
        }
    }

    /// Move pending crossings from `o` onto `e`, which takes over `o`'s
    /// position in the active tree.
    pub(crate) fn xing_move(&mut self, e: EdgeId, o: EdgeId) {
        debug_assert!(self.edges[e.0].next_xing.is_none());
        debug_assert!(self.edges[e.0].prev_xing.is_none());
        if let Some(x) = self.edges[o.0].next_xing.take() {
            self.edges[e.0].next_xing = Some(x);
            self.xings[x.0].some_edge = Some(e);
            debug_assert!(self.xings[x.0].position.cmp_point(self.left_pos(e)) == Ordering::Greater);
            debug_assert!(self.xings[x.0].position.cmp_point(self.right_pos(e)) == Ordering::Less);
        }
        if let Some(x) = self.edges[o.0].prev_xing.take() {
            self.edges[e.0].prev_xing = Some(x);
            self.xings[x.0].some_edge = Some(e);
        }
    }

    /// Drop crossings that fell outside `e` after its right end moved
    /// left.
    pub(crate) fn xing_clear_beyond(&mut self, e: EdgeId) {
        let right = self.right_pos(e);
        if let Some(x) = self.edges[e.0].next_xing {
            if self.xings[x.0].position.cmp_point(right) != Ordering::Less {
                let f = self.tree_edge_next(e).expect("crossing without a neighbour");
                debug_assert_eq!(self.edges[f.0].prev_xing, Some(x));
                self.xings[x.0].some_edge = None;
                self.edges[e.0].next_xing = None;
                self.edges[f.0].prev_xing = None;
            }
        }
        if let Some(x) = self.edges[e.0].prev_xing {
            if self.xings[x.0].position.cmp_point(right) != Ordering::Less {
                let f = self.tree_edge_prev(e).expect("crossing without a neighbour");
                debug_assert_eq!(self.edges[f.0].next_xing, Some(x));
                self.xings[x.0].some_edge = None;
                self.edges[e.0].prev_xing = None;
                self.edges[f.0].next_xing = None;
            }
        }
    }

    // -- active tree of edges ---------------------------------------------

    /// Insert an edge by its left vertex. Returns the resident edge when
    /// the comparator found an exact overlap instead of inserting.
    pub(crate) fn state_edge_insert(&mut self, left: VertexId) -> Option<EdgeId> {
        debug_assert_eq!(left.side(), LEFT);
        let e = left.edge();
        debug_assert!(!self.state_edge_is_member(e));
        dict::insert_by(
            &mut self.edges,
            e,
            &left,
            &mut self.state,
            &|pool: &Arena<Edge>, key: &VertexId, n: EdgeId| tree_vertex_edge_cmp(pool, *key, n),
            DuplicatePolicy::Any,
        )
    }

    pub(crate) fn state_edge_insert_successfully(&mut self, left: VertexId) {
        let other = self.state_edge_insert(left);
        debug_assert!(other.is_none());
        let _ = other;
    }

    pub(crate) fn state_edge_remove(&mut self, e: EdgeId) {
        debug_assert!(self.state_edge_is_member(e));
        dict::remove(&mut self.edges, e, &mut self.state);
    }

    pub(crate) fn state_edge_swap(&mut self, a: EdgeId, b: EdgeId) {
        debug_assert!(a != b);
        debug_assert!(self.state_edge_is_member(a));
        debug_assert!(self.state_edge_is_member(b));
        dict::swap_update_root(&mut self.edges, &mut self.state, a, b);
    }

    /// Let `b` take over `a`'s tree position; `a` leaves the tree.
    pub(crate) fn state_edge_replace(&mut self, a: EdgeId, b: EdgeId) {
        debug_assert!(a != b);
        debug_assert!(self.state_edge_is_member(a));
        debug_assert!(!self.state_edge_is_member(b));
        dict::swap_update_root(&mut self.edges, &mut self.state, a, b);
    }

    pub(crate) fn tree_edge_next(&self, e: EdgeId) -> Option<EdgeId> {
        dict::next(&self.edges, e)
    }

    pub(crate) fn tree_edge_prev(&self, e: EdgeId) -> Option<EdgeId> {
        dict::prev(&self.edges, e)
    }

    // -- result set -------------------------------------------------------

    /// Insert an edge into the result by both vertices. If an equal edge
    /// already exists, nothing is inserted and the resident edge is
    /// returned.
    pub(crate) fn result_insert(&mut self, e: EdgeId) -> Option<EdgeId> {
        debug_assert!(!self.state_edge_is_member(e));
        let vl = VertexId::new(e, LEFT);
        let existing = dict::insert_by(
            &mut self.edges,
            vl,
            &vl,
            &mut self.result,
            &|pool: &Arena<Edge>, key: &VertexId, n: VertexId| result_vertex_cmp(pool, *key, n),
            DuplicatePolicy::Any,
        );
        if let Some(o) = existing {
            return Some(o.edge());
        }
        let vr = VertexId::new(e, RIGHT);
        let existing = dict::insert_by(
            &mut self.edges,
            vr,
            &vr,
            &mut self.result,
            &|pool: &Arena<Edge>, key: &VertexId, n: VertexId| result_vertex_cmp(pool, *key, n),
            DuplicatePolicy::Any,
        );
        debug_assert!(existing.is_none());
        let _ = existing;
        None
    }

    pub(crate) fn result_remove(&mut self, v: VertexId) {
        debug_assert!(self.result_is_member(v));
        dict::remove(&mut self.edges, v, &mut self.result);
    }

    pub(crate) fn result_next(&self, v: VertexId) -> Option<VertexId> {
        dict::next(&self.edges, v)
    }

    pub(crate) fn result_min(&self) -> Option<VertexId> {
        dict::min(&self.edges, self.result)
    }

    // -- bundles ----------------------------------------------------------

    pub(crate) fn bundle_new(&mut self, origin: Point) -> BundleId {
        BundleId(self.bundles.add(Bundle::new(origin)))
    }

    pub(crate) fn bundle_delete(&mut self, b: BundleId) {
        debug_assert!(self.bundles[b.0].root.is_none());
        debug_assert!(!dict::may_contain(&self.bundles, self.bundle_state, b));
        self.bundles.remove(b.0);
    }

    /// Split off the lower part of a bundle at a pixel. With
    /// `strictly_below` the split keeps edges comparing equal to the pixel
    /// in the bundle; otherwise they go to the returned tree.
    pub(crate) fn bundle_split(
        &mut self,
        b: BundleId,
        pixel: Point,
        strictly_below: bool,
    ) -> Option<EdgeId> {
        let bundle = &mut self.bundles[b.0];
        let root = bundle.root.take();
        let (lo, hi) = dict::split_aug(
            &mut self.edges,
            root,
            &pixel,
            &|pool: &Arena<Edge>, key: &Point, n: EdgeId| pixel_edge_cmp(pool, *key, n),
            strictly_below,
            &mut SumMemberAug,
        );
        let bundle = &mut self.bundles[b.0];
        bundle.root = hi;
        bundle.bot = dict::min(&self.edges, hi);
        bundle.top = dict::max(&self.edges, hi);
        lo
    }

    pub(crate) fn bundle_join(&mut self, a: Option<EdgeId>, b: Option<EdgeId>) -> Option<EdgeId> {
        dict::join2_aug(&mut self.edges, a, b, &mut SumMemberAug)
    }

    pub(crate) fn bundle_edge_is_member(&self, b: BundleId, e: EdgeId) -> bool {
        dict::may_contain(&self.edges, self.bundles[b.0].root, e)
    }

    pub(crate) fn bundle_edge_insert(&mut self, b: BundleId, e: EdgeId) {
        debug_assert!(!self.bundle_edge_is_member(b, e));
        let left = VertexId::new(e, LEFT);
        let bundle = &mut self.bundles[b.0];
        let existing = dict::insert_by_aug(
            &mut self.edges,
            e,
            &left,
            &mut bundle.root,
            &|pool: &Arena<Edge>, key: &VertexId, n: EdgeId| tree_vertex_edge_cmp(pool, *key, n),
            DuplicatePolicy::Any,
            &mut SumMemberAug,
        );
        debug_assert!(existing.is_none());
        let _ = existing;
    }

    pub(crate) fn bundle_edge_remove(&mut self, b: BundleId, e: EdgeId) {
        debug_assert!(self.bundle_edge_is_member(b, e));
        let bundle = &mut self.bundles[b.0];
        dict::remove_aug(&mut self.edges, e, &mut bundle.root, &mut SumMemberAug);
    }

    pub(crate) fn bundle_edge_swap(&mut self, b: BundleId, x: EdgeId, y: EdgeId) {
        debug_assert!(x != y);
        let bundle = &mut self.bundles[b.0];
        dict::swap_update_root(&mut self.edges, &mut bundle.root, x, y);
        update_sum_member_up(&mut self.edges, Some(x));
        update_sum_member_up(&mut self.edges, Some(y));
    }

    /// Emit a snap-rounded segment between two pixel origins, carrying the
    /// xor of the memberships of the edges that pass through (the subtree
    /// sum of `group`). Equal result edges merge by xor; a merge to zero
    /// removes the edge entirely.
    pub(crate) fn bundle_edge_new(&mut self, from: Point, to: Point, group: EdgeId) {
        let i = point_cmp(from, to);
        debug_assert!(i != Ordering::Equal);
        let (l, r) = if i == Ordering::Greater { (to, from) } else { (from, to) };
        let member = self.edges[group.0].sum_member;
        let e = self.edge_new(l, r, member, false);
        if let Some(o) = self.result_insert(e) {
            self.edges[o.0].member ^= member;
            self.edge_delete(e);
            if self.edges[o.0].member == 0 {
                self.result_remove(VertexId::new(o, LEFT));
                self.result_remove(VertexId::new(o, RIGHT));
                self.edge_delete(o);
            }
        }
    }

    // -- active tree of bundles -------------------------------------------

    pub(crate) fn state_bundle_insert(&mut self, b: BundleId) {
        debug_assert!(!dict::may_contain(&self.bundles, self.bundle_state, b));
        let edges = &self.edges;
        let existing = dict::insert_by(
            &mut self.bundles,
            b,
            &b,
            &mut self.bundle_state,
            &move |bundles: &Arena<Bundle>, key: &BundleId, n: BundleId| {
                bundle_bundle_cmp(bundles, edges, *key, n)
            },
            DuplicatePolicy::Any,
        );
        debug_assert!(existing.is_none());
        let _ = existing;
    }

    pub(crate) fn state_bundle_insert_at(&mut self, b: BundleId, pos: BundleId, dir: usize) {
        dict::insert_at(&mut self.bundles, b, Some(pos), dir, &mut self.bundle_state);
    }

    pub(crate) fn state_bundle_remove(&mut self, b: BundleId) {
        dict::remove(&mut self.bundles, b, &mut self.bundle_state);
    }

    /// The bottom-most bundle whose vertical span contains the pixel.
    pub(crate) fn state_bundle_find_bot(&self, pixel: Point) -> Option<BundleId> {
        let edges = &self.edges;
        dict::find(
            &self.bundles,
            self.bundle_state,
            &pixel,
            &move |bundles: &Arena<Bundle>, key: &Point, n: BundleId| {
                pixel_bundle_cmp(bundles, edges, *key, n)
            },
            DuplicatePolicy::First,
        )
    }

    pub(crate) fn state_bundle_next(&self, b: BundleId) -> Option<BundleId> {
        dict::next(&self.bundles, b)
    }

    // -- face rings (polygonize / triangulate) ----------------------------

    pub(crate) fn ring_init(&mut self, e: EdgeId) {
        self.edges[e.0].ring = [e, e];
    }

    #[inline]
    pub(crate) fn ring_step(&self, e: EdgeId, dir: usize) -> EdgeId {
        self.edges[e.0].ring[dir]
    }

    #[inline]
    pub(crate) fn ring_next(&self, e: EdgeId) -> EdgeId {
        self.ring_step(e, 0)
    }

    #[inline]
    pub(crate) fn ring_prev(&self, e: EdgeId) -> EdgeId {
        self.ring_step(e, 1)
    }

    /// Splice so that `b` follows `a`. Joins two rings into one, or cuts
    /// one ring into two when `a` and `b` already share a ring.
    pub(crate) fn ring_splice(&mut self, a: EdgeId, b: EdgeId) {
        let an = self.edges[a.0].ring[0];
        let bp = self.edges[b.0].ring[1];
        self.edges[a.0].ring[0] = b;
        self.edges[b.0].ring[1] = a;
        self.edges[bp.0].ring[0] = an;
        self.edges[an.0].ring[1] = bp;
    }

    pub(crate) fn ring_remove(&mut self, e: EdgeId) {
        let n = self.edges[e.0].ring[0];
        let p = self.edges[e.0].ring[1];
        self.edges[p.0].ring[0] = n;
        self.edges[n.0].ring[1] = p;
        self.edges[e.0].ring = [e, e];
    }

    /// Start a two-edge ring for a START event pair.
    pub(crate) fn ring_init2(&mut self, a: EdgeId, b: EdgeId) {
        debug_assert!(self.edges[a.0].back != self.edges[b.0].back);
        debug_assert_eq!(self.left_pos(a), self.left_pos(b));
        self.ring_init(a);
        self.ring_init(b);
        self.ring_splice(a, b);
    }

    /// Splice a BEND continuation `b` after the ending edge `a`, on the
    /// side selected by the traversal direction.
    pub(crate) fn ring_insert(&mut self, a: EdgeId, b: EdgeId) {
        debug_assert!(self.edges[a.0].ring != [a, a]);
        debug_assert!(self.edges[b.0].ring == [b, b]);
        debug_assert_eq!(self.edges[a.0].back, self.edges[b.0].back);
        debug_assert_eq!(self.right_pos(a), self.left_pos(b));
        if self.edges[a.0].back {
            self.ring_splice(b, a);
        } else {
            self.ring_splice(a, b);
        }
    }

    /// Connect two rings at an END event that closes an arm.
    pub(crate) fn ring_merge(&mut self, a: EdgeId, b: EdgeId) {
        debug_assert!(self.edges[a.0].back != self.edges[b.0].back);
        debug_assert_eq!(self.right_pos(a), self.right_pos(b));
        if self.edges[a.0].back {
            self.ring_splice(b, a);
        } else {
            self.ring_splice(a, b);
        }
    }

    // -- vertex view of the rings -----------------------------------------

    #[inline]
    pub(crate) fn point_idx(&self, v: VertexId) -> u32 {
        self.edges[v.edge().0].ends[v.side()].point_idx
    }

    #[inline]
    pub(crate) fn set_point_idx(&mut self, v: VertexId, idx: u32) {
        self.edges[v.edge().0].ends[v.side()].point_idx = idx;
    }

    /// Whether a vertex has been swept (is left of the scan line).
    #[inline]
    pub(crate) fn vertex_valid(&self, v: VertexId) -> bool {
        self.point_idx(v) != INVALID_POINT
    }

    /// The source (`target == 0`) or target end of an edge, respecting its
    /// traversal direction.
    #[inline]
    pub(crate) fn ring_edge_end(&self, e: EdgeId, target: usize) -> VertexId {
        VertexId::new(e, self.edges[e.0].back as usize ^ target)
    }

    /// The vertex on the neighbouring ring edge that shares this vertex's
    /// corner.
    pub(crate) fn vertex_buddy(&self, v: VertexId) -> VertexId {
        let e = v.edge();
        let dir = 1 - (v.side() ^ self.edges[e.0].back as usize);
        let e2 = self.ring_step(e, dir);
        VertexId::new(e2, dir ^ self.edges[e2.0].back as usize)
    }

    /// The buddy, if it sits on the same point.
    pub(crate) fn vertex_eq_buddy(&self, v: VertexId) -> Option<VertexId> {
        let w = self.vertex_buddy(v);
        if self.vertex_pos(v) == self.vertex_pos(w) {
            Some(w)
        } else {
            None
        }
    }

    /// One step along the ring's vertex sequence, not skipping anything.
    pub(crate) fn vertex_step_raw(&self, v: VertexId, dir: usize) -> VertexId {
        let e = v.edge();
        let back = self.edges[e.0].back as usize;
        if v.side() ^ back ^ dir != 0 {
            // v is the step-out end of its edge; continue on the
            // neighbouring edge.
            let e2 = self.ring_step(e, dir);
            VertexId::new(e2, self.edges[e2.0].back as usize ^ dir)
        } else {
            v.other_end()
        }
    }

    /// One step along the ring, skipping disabled vertices. May land on a
    /// not-yet-swept vertex; callers check [`Sweep::vertex_valid`].
    pub(crate) fn vertex_step(&self, v: VertexId, dir: usize) -> VertexId {
        debug_assert!(self.vertex_valid(v));
        let mut v = v;
        let mut guard = 0;
        loop {
            v = self.vertex_step_raw(v, dir);
            if !self.vertex_valid(v) {
                return v;
            }
            let e = v.edge();
            if !self.edges[e.0].dis[v.side()] {
                return v;
            }
            debug_assert!(!self.edges[e.0].dis[1 - v.side()]);
            guard += 1;
            debug_assert!(guard < 4);
        }
    }

    /// Like [`Sweep::vertex_step`], but also skips vertices on the same
    /// point. Returns `None` when the walk comes back around to `v`.
    pub(crate) fn vertex_step_neq(&self, v: VertexId, dir: usize) -> Option<VertexId> {
        let origin = v;
        let mut v = v;
        let mut guard = 0;
        loop {
            let w = self.vertex_step(v, dir);
            if w == origin {
                return None;
            }
            if self.point_idx(w) != self.point_idx(v) {
                return Some(w);
            }
            v = w;
            guard += 1;
            debug_assert!(guard < 3);
        }
    }
}
