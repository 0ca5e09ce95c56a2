//! Path recovery: turn the arrangement into a well-formed polygon.
//!
//! A pair-event sweep in the style of Hertel and Mehlhorn's triangulation,
//! but instead of clipping ears it only maintains the face rings and
//! writes each ring out as a closed path when it closes. Result vertices
//! arrive sorted, two per point: LEFT/LEFT opens a face (START),
//! RIGHT/RIGHT closes or merges faces (END), RIGHT/LEFT continues one
//! (BEND).

use crate::state::{Phase, Sweep, VertexId, LEFT, RIGHT};
use crate::{Path, Polygon, SweepError, SweepResult};
use polysnap_geom::math::Point;

impl Sweep {
    /// Recover the arrangement's faces as closed paths in `output`.
    ///
    /// `output` must be empty. Outer paths come out counter-clockwise,
    /// holes clockwise. Fails with [`SweepError::UnclosedPolygon`] when a
    /// vertex has an odd number of incident edges; the sweep's own state
    /// is drained before returning, but `output` must then be discarded.
    pub fn polygonize(&mut self, output: &mut Polygon) -> SweepResult {
        assert!(
            self.intersected && (self.phase == Phase::SnapSouth || self.phase == Phase::Reduce),
            "polygonize() requires intersect()"
        );
        assert!(output.points.is_empty() && output.paths.is_empty());
        self.phase = Phase::Polygonize;

        // Per-point path-position markers for the self-touching loop
        // cut-off, offset per path so they never need clearing.
        let mut marks: Vec<u32> = Vec::new();
        let mut path_offs: u32 = 0;

        let mut pending: Option<VertexId> = None;
        let mut v = self.result_min();
        while let Some(t) = v {
            let next = self.result_next(t);

            let pos = self.vertex_pos(t);
            if output.points.last() != Some(&pos) {
                output.points.push(pos);
                marks.push(0);
            }
            self.set_point_idx(t, (output.points.len() - 1) as u32);

            // The sweep works on pairs of vertices on the same point.
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

            if s.side() != t.side() {
                // BEND: the ending edge hands its ring slot and
                // orientation to the starting one.
                debug_assert_eq!(s.side(), RIGHT);
                debug_assert_eq!(t.side(), LEFT);
                sweep_log!(self, "polygonize: BEND at {:?}", pos);
                self.state_edge_replace(es, et);
                let back = self.edges[es.0].back;
                self.edges[et.0].back = back;
                self.ring_init(et);
                self.ring_insert(es, et);
            } else if s.side() == LEFT {
                // START: s is the bottom edge, t the top one.
                sweep_log!(self, "polygonize: START at {:?}", pos);
                self.state_edge_insert_successfully(s);
                self.state_edge_insert_successfully(t);
                debug_assert_eq!(self.tree_edge_next(es), Some(et));

                // The bottom edge of a fresh face runs backwards; inside
                // an existing face the parity flips.
                let back = match self.tree_edge_prev(es) {
                    None => true,
                    Some(er) => !self.edges[er.0].back,
                };
                self.edges[es.0].back = back;
                self.edges[et.0].back = !back;
                self.ring_init2(es, et);
            } else {
                // END: t is the bottom edge, s the top one.
                debug_assert_eq!(s.side(), RIGHT);
                debug_assert!(self.edges[es.0].back != self.edges[et.0].back);
                debug_assert_eq!(self.tree_edge_next(et), Some(es));
                self.state_edge_remove(es);
                self.state_edge_remove(et);

                let et_back = self.edges[et.0].back as usize;
                if self.ring_step(et, et_back) == es {
                    // The ring closes here: write it out.
                    sweep_log!(self, "polygonize: END closes a path at {:?}", pos);
                    debug_assert_eq!(
                        self.ring_step(es, self.edges[es.0].back as usize),
                        et
                    );
                    path_offs += 3;
                    let count = self.emit_path(output, &mut marks, path_offs, es, et);
                    path_offs += count;
                } else {
                    // The end of an arm: connect the two ring pieces.
                    sweep_log!(self, "polygonize: END connects at {:?}", pos);
                    self.ring_merge(et, es);
                }
            }

            v = next;
        }

        if let Some(s) = pending {
            let at = self.vertex_pos(s);
            return self.fail_open(at);
        }

        debug_assert!(self.agenda_vertex.is_none());

        // The rings run clockwise; emit the conventional orientation.
        for path in &mut output.paths {
            path.points.reverse();
        }

        Ok(())
    }

    /// Walk a closed ring and append it as a path, splitting off
    /// self-touching sub-loops.
    fn emit_path(
        &mut self,
        output: &mut Polygon,
        marks: &mut Vec<u32>,
        offs: u32,
        es: crate::state::EdgeId,
        et: crate::state::EdgeId,
    ) -> u32 {
        let e = if self.edges[es.0].back { es } else { et };
        debug_assert!(self.edges[e.0].back);

        let path_index = output.paths.len();
        output.paths.push(Path::default());

        let first = self.point_idx(VertexId::new(e, RIGHT));
        poly_append(output, marks, path_index, offs, first);
        poly_append(output, marks, path_index, offs, self.point_idx(VertexId::new(e, LEFT)));

        let mut count = 0u32;
        let mut n = self.ring_next(e);
        debug_assert!(n != e);
        loop {
            let nn = self.ring_next(n);
            let pi = self.point_idx(self.ring_edge_end(n, 1));
            if nn == e {
                debug_assert_eq!(pi, first);
                break;
            }
            poly_append(output, marks, path_index, offs, pi);
            count += 1;
            n = nn;
        }
        count
    }

    /// Report an open polygon: drain the active tree so the engine is
    /// clean, then fail.
    pub(crate) fn fail_open(&mut self, position: Point) -> SweepResult {
        while let Some(root) = self.state {
            self.state_edge_remove(root);
        }
        Err(SweepError::UnclosedPolygon { position })
    }
}

/// Append one point index to a path under construction. When the point is
/// already on the path, the stretch since its first occurrence is a
/// self-touching sub-loop and is cut off into a path of its own.
fn poly_append(
    output: &mut Polygon,
    marks: &mut Vec<u32>,
    path_index: usize,
    offs: u32,
    point: u32,
) {
    let path = &mut output.paths[path_index];
    let at = marks[point as usize].wrapping_sub(offs);
    if (at as usize) >= path.points.len() {
        marks[point as usize] = (path.points.len() as u32).wrapping_add(offs);
        path.points.push(point);
        return;
    }

    debug_assert_eq!(path.points[at as usize], point);
    let cut: Vec<u32> = path.points[at as usize..].to_vec();
    // The shared vertex stays on the outer path, too.
    path.points.truncate(at as usize + 1);
    for &idx in &cut[1..] {
        marks[idx as usize] = offs.wrapping_sub(1);
    }
    output.paths.push(Path { points: cut });
}
