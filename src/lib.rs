//! Exact boolean operations on 2d polygons, with snap rounding.
//!
//! # Crates
//!
//! * **polysnap_geom** - Integer coordinates, exact fractions and
//!   predicates.
//! * **polysnap_collections** - The intrusive collections behind the
//!   sweep: freelist arena, augmented red-black dictionary, indexed heap.
//! * **polysnap_sweep** - The plane-sweep engine: intersection with exact
//!   arithmetic, snap rounding, boolean reduction, path recovery and
//!   triangulation.
//!
//! This meta-crate (`polysnap`) mostly reexports the other polysnap crates
//! for convenience.
//!
//! # Example
//!
//! ```
//! use polysnap::{Polygon, Sweep, TruthTable};
//! use polysnap::math::point;
//!
//! let mut sweep = Sweep::new();
//! sweep.add_edge(point(0, 0), point(8, 0), 1);
//! sweep.add_edge(point(8, 0), point(4, 6), 1);
//! sweep.add_edge(point(4, 6), point(0, 0), 1);
//!
//! sweep.intersect();
//! sweep.reduce(&TruthTable::union(1));
//!
//! let mut output = Polygon::new();
//! sweep.polygonize(&mut output).unwrap();
//! assert_eq!(output.paths.len(), 1);
//! ```

pub use polysnap_collections as collections;
pub use polysnap_geom as geom;
pub use polysnap_sweep as sweep;

pub use polysnap_geom::math;

#[doc(inline)]
pub use polysnap_sweep::{Mask, Path, Polygon, Sweep, SweepError, SweepResult, Triangle, TruthTable};
