//! Intrusive collections used by the polysnap sweep engine.
//!
//! This crate is reexported in [polysnap](https://docs.rs/polysnap/).
//!
//! The sweep stores its edges, crossings and bundles in freelist arenas and
//! threads them through several ordered structures at once. The structures
//! here are intrusive: link cells are embedded in the caller's own types and
//! addressed by small copyable ids, so one allocation can be a member of an
//! agenda, an active tree and a result set over its lifetime without ever
//! moving.
//!
//! - [`Arena`]: a vector arena with a typed free list.
//! - [`dict`]: an augmented red-black dictionary with split/join and
//!   positional insertion.
//! - [`heap`]: a binary min-heap whose elements know their own position,
//!   making in-place update and removal O(log n).

pub mod arena;
pub mod dict;
pub mod heap;

#[cfg(test)]
mod dict_tests;

#[doc(inline)]
pub use crate::arena::Arena;
#[doc(inline)]
pub use crate::dict::{Augment, AugmentEvent, DuplicatePolicy, Forest, Node, NoAugment};
#[doc(inline)]
pub use crate::heap::{HeapIndex, IndexedHeap, NO_INDEX};
