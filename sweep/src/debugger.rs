//! Diagnostic snapshots of the engine state, with a postscript page
//! writer.
//!
//! Strictly for debugging: the snapshot borrows nothing and the writer
//! emits one page per call, so stepping through a sweep produces a
//! flip-book of the active tree and the remaining agenda.

use crate::state::{Sweep, LEFT};
use crate::Mask;
use polysnap_collections::dict;
use polysnap_geom::math::Point;
use std::io::{self, Write};

/// A copy of the engine's visible geometry at one instant.
#[derive(Clone, Debug, Default)]
pub struct SweepSnapshot {
    /// Edges of the active tree, bottom to top.
    pub active: Vec<(Point, Point)>,
    /// Endpoints still on the vertex agenda, in event order.
    pub pending: Vec<Point>,
    /// The result set so far.
    pub result: Vec<(Point, Point, Mask)>,
}

impl Sweep {
    /// Capture the current state for diagnostics.
    pub fn snapshot(&self) -> SweepSnapshot {
        let mut snap = SweepSnapshot::default();

        let mut e = dict::min(&self.edges, self.state);
        while let Some(c) = e {
            snap.active.push((self.left_pos(c), self.right_pos(c)));
            e = dict::next(&self.edges, c);
        }

        let mut v = dict::min(&self.edges, self.agenda_vertex);
        while let Some(c) = v {
            snap.pending.push(self.vertex_pos(c));
            v = dict::next(&self.edges, c);
        }

        let mut v = self.result_min();
        while let Some(c) = v {
            if c.side() == LEFT {
                let e = c.edge();
                snap.result
                    .push((self.left_pos(e), self.right_pos(e), self.edges[e.0].member));
            }
            v = self.result_next(c);
        }

        snap
    }
}

/// Writes snapshots as single-page postscript drawings.
pub struct PostScriptWriter<W: Write> {
    out: W,
    page: usize,
    scale: f64,
}

impl<W: Write> PostScriptWriter<W> {
    pub fn new(out: W, scale: f64) -> Self {
        PostScriptWriter {
            out,
            page: 0,
            scale,
        }
    }

    fn line(&mut self, a: Point, b: Point) -> io::Result<()> {
        writeln!(
            self.out,
            "{} {} moveto {} {} lineto stroke",
            a.x as f64 * self.scale,
            a.y as f64 * self.scale,
            b.x as f64 * self.scale,
            b.y as f64 * self.scale
        )
    }

    /// Emit one page: result in black, active tree in red, pending
    /// endpoints as dots.
    pub fn page(&mut self, snap: &SweepSnapshot) -> io::Result<()> {
        self.page += 1;
        writeln!(self.out, "%%Page: {} {}", self.page, self.page)?;
        writeln!(self.out, "gsave 300 400 translate 0 setlinewidth")?;

        writeln!(self.out, "0 0 0 setrgbcolor")?;
        for &(a, b, _) in &snap.result {
            self.line(a, b)?;
        }

        writeln!(self.out, "0.8 0 0 setrgbcolor")?;
        for &(a, b) in &snap.active {
            self.line(a, b)?;
        }

        writeln!(self.out, "0 0 0.8 setrgbcolor")?;
        for &p in &snap.pending {
            writeln!(
                self.out,
                "{} {} 1 0 360 arc fill",
                p.x as f64 * self.scale,
                p.y as f64 * self.scale
            )?;
        }

        writeln!(self.out, "grestore showpage")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polysnap_geom::math::point;

    #[test]
    fn snapshot_and_page() {
        let mut sweep = Sweep::new();
        sweep.add_edge(point(0, 0), point(10, 0), 1);
        sweep.add_edge(point(10, 0), point(5, 8), 1);
        sweep.add_edge(point(5, 8), point(0, 0), 1);
        sweep.intersect();

        let snap = sweep.snapshot();
        assert_eq!(snap.result.len(), 3);
        assert!(snap.active.is_empty());

        let mut buf = Vec::new();
        let mut ps = PostScriptWriter::new(&mut buf, 2.0);
        ps.page(&snap).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("%%Page: 1 1"));
        assert!(text.contains("lineto"));
    }
}
