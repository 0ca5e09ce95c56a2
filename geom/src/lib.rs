#![deny(bare_trait_objects)]

//! Exact 2d geometric primitives on integer coordinates, on top of euclid.
//!
//! This crate is reexported in [polysnap](https://docs.rs/polysnap/).
//!
//! # Overview
//!
//! This crate implements the arithmetic layer of a snap-rounding boolean
//! engine:
//!
//! - 32 bit integer coordinates with a restricted range so that every
//!   cross product of coordinate differences fits in 64 bits,
//! - exact fractions of the form `i + n/d` for intersection coordinates,
//! - orientation and point-versus-edge predicates, both exact and with a
//!   half-pixel tolerance ("hot pixel" comparison),
//! - exact line segment intersection classification.
//!
//! No floating point number participates in any predicate.

// Reexport dependencies.
pub use euclid;

#[cfg(feature = "serialization")]
#[macro_use]
pub extern crate serde;

mod frac;
mod line;
mod predicates;

#[doc(inline)]
pub use crate::frac::{Frac, FracPoint};
#[doc(inline)]
pub use crate::line::{segment_intersection, LineSegment, SegmentIntersection};
#[doc(inline)]
pub use crate::predicates::{
    cross, point_cmp, point_edge_cmp, point_edge_cmp_rounded, sqr_distance,
};

/// An integer coordinate.
pub type Coord = i32;

/// The smallest valid coordinate.
///
/// The range is restricted to 31 bits so that the cross product of two
/// coordinate differences fits in an `i64`, and the degree-3 numerators of
/// exact intersections fit in an `i128`.
pub const MIN_COORD: Coord = -MAX_COORD;

/// The largest valid coordinate.
pub const MAX_COORD: Coord = (1 << 30) - 1;

pub mod math {
    //! Basic types that are used everywhere. Most other polysnap crates
    //! reexport them.

    use crate::Coord;

    /// Alias for `euclid::default::Point2D<i32>`.
    pub type Point = euclid::default::Point2D<Coord>;

    /// Alias for `euclid::default::Vector2D<i32>`.
    pub type Vector = euclid::default::Vector2D<Coord>;

    /// Shorthand for `Point::new(x, y)`.
    pub use euclid::point2 as point;

    /// Shorthand for `Vector::new(x, y)`.
    pub use euclid::vec2 as vector;
}
