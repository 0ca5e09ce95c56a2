//! Phase 2 of the pipeline: snap rounding.
//!
//! The arrangement produced by phase 1 still has fractional crossings.
//! Two more sweeps (one for north-sloped edges, one for south-sloped ones)
//! group the edges crossing each hot pixel into bundles that rotate
//! around the pixel together, and write out the segments between
//! consecutive hot pixels of every edge. The bundle trees carry a
//! subtree-xor of the membership masks, so a whole group's merged mask is
//! read off the tree root when its segment is emitted.

use crate::state::{edge_south, BundleId, EdgeId, Phase, Sweep, VertexId, XingId, LEFT, RIGHT};
use polysnap_collections::dict;
use polysnap_geom::math::Point;
use polysnap_geom::{segment_intersection, LineSegment, SegmentIntersection};
use std::cmp::Ordering;

enum PixelEvent {
    Done,
    Vertex,
    Crossing,
}

impl Sweep {
    pub(crate) fn snap_round(&mut self) {
        // Edges consumed by the overlap collapse leave holes in the
        // primary list; drop them before re-running the agenda.
        let edges = &self.edges;
        self.edge_list.retain(|e| edges.contains(e.0));

        self.snap_pass(Phase::SnapNorth);
        self.snap_pass(Phase::SnapSouth);
    }

    fn snap_pass(&mut self, phase: Phase) {
        self.phase = phase;
        debug_assert!(self.agenda_xing.is_none());
        debug_assert!(self.agenda_vertex.is_none());
        debug_assert!(self.bundle_state.is_none());

        // Every unique crossing becomes an agenda entry again; its pixel
        // must exist in both passes even if no edge of this pass's slope
        // goes through it.
        for i in 0..self.xing_list.len() {
            let x = self.xing_list[i];
            let duplicate = self.agenda_xing_insert(x);
            debug_assert!(duplicate.is_none());
            let _ = duplicate;
        }

        for i in 0..self.edge_list.len() {
            let e = self.edge_list[i];
            debug_assert!(!self.edges[e.0].tree.is_linked());
            let member = self.edges[e.0].member;
            self.edges[e.0].sum_member = member;
            self.agenda_vertex_insert(VertexId::new(e, LEFT));
            self.agenda_vertex_insert(VertexId::new(e, RIGHT));
        }

        while self.agenda_vertex_min.is_some() || self.agenda_xing_min.is_some() {
            let pixel = self.next_pixel();
            self.snap_pixel(pixel);
        }
        // Every edge ended at some pixel, so no bundle survives the pass.
        debug_assert!(self.bundle_state.is_none());
    }

    /// The hot pixel of the next agenda event (which is not dequeued
    /// yet).
    fn next_pixel(&mut self) -> BundleId {
        let origin = match (self.agenda_vertex_min, self.agenda_xing_min) {
            (Some(v), None) => self.vertex_pos(v),
            (None, Some(c)) => self.xings[c.0].position.round(),
            (Some(v), Some(c)) => {
                let vp = self.vertex_pos(v);
                let cp = self.xings[c.0].position.round();
                let mut i = vp.x.cmp(&cp.x);
                if i == Ordering::Equal {
                    i = vp.y.cmp(&cp.y);
                    if self.phase == Phase::SnapSouth {
                        i = i.reverse();
                    }
                }
                if i == Ordering::Greater {
                    cp
                } else {
                    vp
                }
            }
            (None, None) => unreachable!("no agenda event left"),
        };
        self.bundle_new(origin)
    }

    /// Process one hot pixel: cut the bundles that cross it, emit the
    /// segments arriving here, drain the pixel's own events, and re-home
    /// the edges that continue to the right.
    fn snap_pixel(&mut self, p: BundleId) {
        let pixel = self.bundles[p.0].origin;

        if let Some(first) = self.state_bundle_find_bot(pixel) {
            // Walk the bundles that touch the pixel, bottom to top. Only
            // one can have strictly lower edges and only one strictly
            // upper edges; several may pass through the middle.
            let cur = first;
            debug_assert!(self.bundles[cur.0].root.is_some());

            // Split off the strictly-below part of the bottom bundle.
            let lo_tree = self.bundle_split(cur, pixel, true);
            let mut keep_low = if lo_tree.is_some() { Some(cur) } else { None };
            debug_assert!(self.bundles[cur.0].root.is_some());

            let mut group: Option<EdgeId> = None;
            let mut cur_opt = Some(cur);
            while let Some(c) = cur_opt {
                debug_assert!(self.bundles[c.0].root.is_some());
                // Split off the passing-through part (everything up to
                // and including the pixel).
                let passing = match self.bundle_split(c, pixel, false) {
                    None => break,
                    Some(t) => t,
                };

                // The passing edges produce one merged segment from
                // their previous pixel to this one.
                let from = self.bundles[c.0].origin;
                self.bundle_edge_new(from, pixel, passing);

                // Collect them; the pixel's own events below rotate them.
                group = self.bundle_join(group, Some(passing));

                if self.bundles[c.0].root.is_some() {
                    // Some edges pass above the pixel: this was the top
                    // bundle.
                    break;
                }

                let next = self.state_bundle_next(c);
                if keep_low != Some(c) {
                    self.state_bundle_remove(c);
                    self.bundle_delete(c);
                }
                cur_opt = next;
            }

            debug_assert!(cur_opt.map_or(true, |c| self.bundles[c.0].root.is_some()));
            if let Some(low) = keep_low.take() {
                if cur_opt == Some(low) {
                    // The bottom bundle also kept upper edges; the lower
                    // part needs a bundle object of its own, ordered just
                    // below it.
                    let origin = self.bundles[low.0].origin;
                    let copy = self.bundle_new(origin);
                    self.bundles[copy.0].root = lo_tree;
                    self.bundle_set_extents(copy);
                    self.state_bundle_insert_at(copy, low, 0);
                } else {
                    debug_assert!(self.bundles[low.0].root.is_none());
                    self.bundles[low.0].root = lo_tree;
                    self.bundle_set_extents(low);
                }
            }

            self.bundles[p.0].root = group;
        }

        // Sweep across the pixel itself: insert, remove and rotate edges
        // in exact event order.
        loop {
            match self.next_pixel_event(pixel) {
                PixelEvent::Done => break,
                PixelEvent::Vertex => {
                    let v = self.agenda_vertex_extract_min().expect("vertex event");
                    let e = v.edge();
                    let south = self.phase == Phase::SnapSouth;
                    // Each pass only routes edges of its own slope class;
                    // the other pass sees the same pixels again.
                    if edge_south(&self.edges, e) == south {
                        if v.side() == LEFT {
                            self.bundle_edge_insert(p, e);
                        } else {
                            self.bundle_edge_remove(p, e);
                        }
                    }
                }
                PixelEvent::Crossing => {
                    let c = self.agenda_xing_extract_min().expect("crossing event");
                    self.reverse_in_bundle(p, c);
                }
            }
        }

        if self.bundles[p.0].root.is_some() {
            self.bundle_set_extents(p);
            self.state_bundle_insert(p);
        } else {
            self.bundle_delete(p);
        }
    }

    /// Which agenda holds the next event inside this pixel, if any.
    ///
    /// Crossings whose exact position precedes the pixel center run
    /// first, then all endpoint events (which snap to the center), then
    /// the remaining crossings.
    fn next_pixel_event(&self, pixel: Point) -> PixelEvent {
        let south = self.phase == Phase::SnapSouth;

        let mut crossing_here = None;
        if let Some(x) = self.agenda_xing_min {
            let pos = &self.xings[x.0].position;
            if pixel.x == pos.x.round() && pixel.y == pos.y.round() {
                crossing_here = Some(x);
                // Pixel center versus exact crossing position.
                let mut i = pos.x.cmp_coord(pixel.x).reverse();
                if i == Ordering::Equal {
                    i = pos.y.cmp_coord(pixel.y).reverse();
                    if south {
                        i = i.reverse();
                    }
                }
                if i == Ordering::Greater {
                    return PixelEvent::Crossing;
                }
            }
        }

        if let Some(v) = self.agenda_vertex_min {
            if self.vertex_pos(v) == pixel {
                return PixelEvent::Vertex;
            }
        }

        if crossing_here.is_some() {
            return PixelEvent::Crossing;
        }

        PixelEvent::Done
    }

    /// Rotate the contiguous run of bundle edges that cross in `ev`.
    ///
    /// The run is recovered geometrically: neighbours whose exact
    /// intersection equals the event position belong to it.
    fn reverse_in_bundle(&mut self, p: BundleId, ev: XingId) {
        let south = self.phase == Phase::SnapSouth;
        let mut s = match self.xings[ev.0].pass_edge[south as usize] {
            // No edge of this pass's slope crosses here.
            None => return,
            Some(s) => s,
        };
        debug_assert!(self.bundle_edge_is_member(p, s));

        let mut t = s;
        loop {
            match self.tree_edge_next(t) {
                Some(u) if self.crossing_matches(ev, t, u) => t = u,
                _ => break,
            }
        }
        loop {
            match self.tree_edge_prev(s) {
                Some(r) if self.crossing_matches(ev, s, r) => s = r,
                _ => break,
            }
        }
        if s == t {
            return;
        }

        loop {
            debug_assert!(s != t);
            self.bundle_edge_swap(p, s, t);
            let t2 = self.tree_edge_prev(s).expect("lost the reversed run");
            if t2 == t {
                break;
            }
            let s2 = self.tree_edge_next(t).expect("lost the reversed run");
            if s2 == t2 {
                break;
            }
            s = s2;
            t = t2;
        }
    }

    fn crossing_matches(&self, ev: XingId, a: EdgeId, b: EdgeId) -> bool {
        let sa = LineSegment::new(self.left_pos(a), self.right_pos(a));
        let sb = LineSegment::new(self.left_pos(b), self.right_pos(b));
        match segment_intersection(&sa, &sb) {
            SegmentIntersection::Crossing(at) => at == self.xings[ev.0].position,
            _ => false,
        }
    }

    pub(crate) fn bundle_set_extents(&mut self, b: BundleId) {
        let root = self.bundles[b.0].root;
        let bot = dict::min(&self.edges, root);
        let top = dict::max(&self.edges, root);
        let bundle = &mut self.bundles[b.0];
        bundle.bot = bot;
        bundle.top = top;
    }
}
