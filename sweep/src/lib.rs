#![deny(bare_trait_objects)]

//! Exact-arithmetic boolean operations on 2d polygons.
//!
//! This crate is reexported in [polysnap](https://docs.rs/polysnap/).
//!
//! The entry point is [`Sweep`]: feed it an arbitrary multiset of integer
//! line segments, each tagged with a bitmask saying which input polygons it
//! belongs to, and run the pipeline:
//!
//! 1. [`Sweep::intersect`] finds every intersection with exact fractional
//!    arithmetic, collapses overlapping segments, and snap-rounds the
//!    arrangement onto the integer grid while preserving its topology. The
//!    output is a set of non-crossing segments.
//! 2. [`Sweep::reduce`] evaluates an arbitrary boolean function over the
//!    input polygons, given as a [`TruthTable`], and keeps exactly the
//!    segments that separate inside from outside.
//! 3. [`Sweep::polygonize`] recovers ordered closed paths, or
//!    [`Sweep::triangulate`] emits a triangulation whose triangles know
//!    which of their edges lie on the polygon outline.
//!
//! Inputs may self-intersect, overlap, or touch; no floating point number
//! participates in any topological decision.
//!
//! ```
//! use polysnap_sweep::{Polygon, Sweep, TruthTable};
//! use polysnap_sweep::geom::math::point;
//!
//! let mut sweep = Sweep::new();
//! // A square belonging to polygon 0 ...
//! sweep.add_edge(point(0, 0), point(10, 0), 1);
//! sweep.add_edge(point(10, 0), point(10, 10), 1);
//! sweep.add_edge(point(10, 10), point(0, 10), 1);
//! sweep.add_edge(point(0, 10), point(0, 0), 1);
//! // ... and one belonging to polygon 1.
//! sweep.add_edge(point(5, 5), point(15, 5), 2);
//! sweep.add_edge(point(15, 5), point(15, 15), 2);
//! sweep.add_edge(point(15, 15), point(5, 15), 2);
//! sweep.add_edge(point(5, 15), point(5, 5), 2);
//!
//! sweep.intersect();
//! sweep.reduce(&TruthTable::union(2));
//!
//! let mut output = Polygon::new();
//! sweep.triangulate(&mut output).unwrap();
//! assert!(!output.triangles.is_empty());
//! ```

// Reexport dependencies.
pub use polysnap_collections as collections;
pub use polysnap_geom as geom;

#[cfg(feature = "serialization")]
#[macro_use]
pub extern crate serde;

use polysnap_geom::math::Point;

#[cfg(debug_assertions)]
macro_rules! sweep_log {
    ($obj:ident, $fmt:expr) => (
        if $obj.log {
            println!($fmt);
        }
    );
    ($obj:ident, $fmt:expr, $($arg:tt)*) => (
        if $obj.log {
            println!($fmt, $($arg)*);
        }
    );
}

#[cfg(not(debug_assertions))]
macro_rules! sweep_log {
    ($obj:ident, $fmt:expr) => {};
    ($obj:ident, $fmt:expr, $($arg:tt)*) => {};
}

mod intersect;
mod polygonize;
mod reduce;
mod snap_round;
mod state;
mod triangulate;

#[cfg(feature = "debugger")]
pub mod debugger;

#[cfg(test)]
mod sweep_tests;

#[doc(inline)]
pub use crate::state::Sweep;

/// Polygon membership bitmask: bit `k` marks membership in input polygon
/// `k`.
pub type Mask = u64;

/// The result of the fallible consumer phases.
pub type SweepResult = Result<(), SweepError>;

/// Errors surfaced by the sweep.
///
/// Structural problems are reported after the engine has drained its
/// active tree, so the sweep itself is left in a clean state; any partial
/// output written to the caller's [`Polygon`] must be discarded.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SweepError {
    /// A consumer phase found a vertex with an odd number of incident
    /// edges: some input polygon is not closed.
    #[error("polygon is not closed around {position:?}")]
    UnclosedPolygon { position: Point },
}

/// A polygon (or triangle soup) produced by the consumer phases.
///
/// `paths` and `triangles` index into `points`. Paths are emitted with
/// counter-clockwise outer boundaries and clockwise holes; triangles are
/// counter-clockwise.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Polygon {
    pub points: Vec<Point>,
    pub paths: Vec<Path>,
    pub triangles: Vec<Triangle>,
}

impl Polygon {
    pub fn new() -> Self {
        Polygon {
            points: Vec::new(),
            paths: Vec::new(),
            triangles: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.paths.clear();
        self.triangles.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.triangles.is_empty()
    }
}

/// A closed path: a cycle of indices into [`Polygon::points`].
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Path {
    pub points: Vec<u32>,
}

/// A triangle of point indices, with outline flags.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Triangle {
    pub p: [u32; 3],
    /// Which triangle edges coincide with a polygon outline edge (rather
    /// than a diagonal introduced by the triangulation).
    pub flags: u8,
}

impl Triangle {
    /// Edge `p[0]`-`p[1]` lies on the outline.
    pub const OUTLINE_01: u8 = 1;
    /// Edge `p[1]`-`p[2]` lies on the outline.
    pub const OUTLINE_12: u8 = 2;
    /// Edge `p[2]`-`p[0]` lies on the outline.
    pub const OUTLINE_20: u8 = 4;
}

/// A boolean function over polygon membership masks.
///
/// Bit `mask` of the table is the desired output for "the point belongs to
/// exactly the polygons in `mask`". [`Sweep::reduce`] keeps an edge of the
/// arrangement exactly when the function value differs between the two
/// sides of the edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TruthTable {
    bits: Vec<u64>,
    combinations: u64,
}

impl TruthTable {
    /// An all-false table over `num_polygons` inputs.
    pub fn new(num_polygons: u32) -> Self {
        assert!(num_polygons <= 24, "too many polygons for a truth table");
        let combinations = 1u64 << num_polygons;
        TruthTable {
            bits: vec![0; ((combinations + 63) / 64) as usize],
            combinations,
        }
    }

    /// Build a table by evaluating `f` for every membership mask.
    pub fn from_fn(num_polygons: u32, f: impl Fn(Mask) -> bool) -> Self {
        let mut table = TruthTable::new(num_polygons);
        for mask in 0..table.combinations {
            if f(mask) {
                table.set(mask, true);
            }
        }
        table
    }

    /// The union of all inputs.
    pub fn union(num_polygons: u32) -> Self {
        TruthTable::from_fn(num_polygons, |mask| mask != 0)
    }

    /// The intersection of all inputs.
    pub fn intersection(num_polygons: u32) -> Self {
        let all = (1u64 << num_polygons) - 1;
        TruthTable::from_fn(num_polygons, move |mask| mask == all)
    }

    /// Polygon 0 minus all the others.
    pub fn difference(num_polygons: u32) -> Self {
        TruthTable::from_fn(num_polygons, |mask| mask == 1)
    }

    /// The symmetric difference (points covered an odd number of times).
    pub fn symmetric_difference(num_polygons: u32) -> Self {
        TruthTable::from_fn(num_polygons, |mask| mask.count_ones() % 2 == 1)
    }

    /// The number of mask combinations the table covers.
    pub fn combinations(&self) -> u64 {
        self.combinations
    }

    pub fn set(&mut self, mask: Mask, value: bool) {
        assert!(mask < self.combinations);
        let bit = 1u64 << (mask % 64);
        if value {
            self.bits[(mask / 64) as usize] |= bit;
        } else {
            self.bits[(mask / 64) as usize] &= !bit;
        }
    }

    pub fn get(&self, mask: Mask) -> bool {
        assert!(
            mask < self.combinations,
            "membership mask outside the truth table"
        );
        self.bits[(mask / 64) as usize] & (1u64 << (mask % 64)) != 0
    }
}
