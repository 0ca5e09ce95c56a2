//! Boolean reduction of the snap-rounded arrangement.
//!
//! The arrangement coming out of phase 2 has no crossings, overlaps or
//! degeneracies, so this sweep only sees start and end events. The active
//! tree stacks the edges over each scan position; an edge's `below` mask
//! (which polygons' interior lies under it) is the predecessor's `below`
//! xor the predecessor's membership. An edge stays in the result exactly
//! when the boolean function differs between its two sides.

use crate::state::{Phase, Sweep, LEFT};
use crate::TruthTable;

impl Sweep {
    /// Reduce the arrangement to the boolean combination described by
    /// `table`. Must directly follow [`Sweep::intersect`].
    pub fn reduce(&mut self, table: &TruthTable) {
        assert!(
            self.intersected && self.phase == Phase::SnapSouth,
            "reduce() must directly follow intersect()"
        );
        self.phase = Phase::Reduce;

        let mut v = self.result_min();
        while let Some(c) = v {
            let next = self.result_next(c);
            let e = c.edge();

            if c.side() == LEFT {
                let other = self.state_edge_insert(c);
                debug_assert!(other.is_none());
                let _ = other;

                let below = match self.tree_edge_prev(e) {
                    None => 0,
                    Some(p) => self.edges[p.0].below ^ self.edges[p.0].member,
                };
                self.edges[e.0].below = below;
                let above = below ^ self.edges[e.0].member;
                let keep = table.get(below) != table.get(above);
                self.edges[e.0].keep = keep;
                sweep_log!(
                    self,
                    "reduce: member {:#x} below {:#x} above {:#x} keep {}",
                    self.edges[e.0].member,
                    below,
                    above,
                    keep
                );
                if !keep {
                    self.result_remove(c);
                }
            } else {
                self.state_edge_remove(e);
                if !self.edges[e.0].keep {
                    self.result_remove(c);
                }
                // Reset the fields the ring phases will reinterpret.
                self.edges[e.0].back = false;
                self.edges[e.0].dis = [false, false];
                self.edges[e.0].ring = [e, e];
                self.edges[e.0].rightmost = None;
            }

            v = next;
        }

        debug_assert!(self.state.is_none());
    }
}
