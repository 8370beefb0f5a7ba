//! Identifier types for the part arena.
//!
//! This module provides [`PartId`], a strongly-typed index into a
//! [`PartArena`](crate::part::PartArena), and [`LoopId`], the identity given to
//! every [`Part::Loop`](crate::part::Part::Loop) node. Both are plain `Copy`
//! newtypes so that trees can be rewritten by swapping indices rather than
//! moving owned nodes around.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A strongly-typed identifier for a slot inside a [`PartArena`](crate::part::PartArena).
///
/// `PartId` wraps a `usize` index. Ids are handed out sequentially by the arena
/// when parts are allocated and stay valid for the lifetime of that arena. A
/// rewrite that replaces the content of a slot keeps the id stable, which is
/// what lets [`Part::Loop`](crate::part::Part::Loop) refer to its start node
/// without owning it.
///
/// # Examples
///
/// ```rust,ignore
/// use pathscope::part::{PartArena, PartId};
///
/// let mut arena = PartArena::new();
/// let a: PartId = arena.string("/data");
/// let b: PartId = arena.string("/system");
/// assert_ne!(a, b);
/// ```
///
/// # Thread Safety
///
/// `PartId` is [`Copy`], [`Send`], and [`Sync`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartId(pub(crate) usize);

impl PartId {
    /// Creates a new `PartId` from a raw index value.
    ///
    /// This constructor is primarily intended for internal use and testing.
    /// Normal usage should obtain `PartId` values from the arena allocation
    /// methods.
    ///
    /// # Arguments
    ///
    /// * `index` - The raw slot index (0-based)
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        PartId(index)
    }

    /// Returns the raw index value of this part identifier.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartId({})", self.0)
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

impl From<usize> for PartId {
    fn from(index: usize) -> Self {
        PartId(index)
    }
}

impl From<PartId> for usize {
    fn from(id: PartId) -> Self {
        id.0
    }
}

/// The identity of a loop node.
///
/// Loops are compared by identity rather than structure: the body of a loop
/// refers back into the value it is part of, so a structural comparison would
/// never terminate. Each arena hands out loop ids from its own counter.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoopId(pub(crate) u64);

impl LoopId {
    /// Returns the raw loop number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoopId({})", self.0)
    }
}

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
