//! A single rooted tree with its own storage.

use std::collections::BTreeSet;

use crate::{
    part::{Part, PartArena, PartId},
    Result,
};

/// A part tree owning its arena.
///
/// Resolution hands one `PartTree` per seed to the rewrite pipeline, which
/// rewrites it in place and may move its root.
#[derive(Debug, Clone)]
pub struct PartTree {
    /// Storage of every node of the tree.
    pub arena: PartArena,
    /// The current root.
    pub root: PartId,
}

impl PartTree {
    /// Wraps an arena and a root.
    #[must_use]
    pub fn new(arena: PartArena, root: PartId) -> Self {
        PartTree { arena, root }
    }

    /// Builds a tree whose root is allocated by `build`.
    pub fn build<F>(build: F) -> Self
    where
        F: FnOnce(&mut PartArena) -> PartId,
    {
        let mut arena = PartArena::new();
        let root = build(&mut arena);
        PartTree { arena, root }
    }

    /// Returns the root part.
    #[must_use]
    pub fn root_part(&self) -> &Part {
        self.arena.get(self.root)
    }

    /// Returns the top-level alternatives: the children of a root union, or
    /// the root itself.
    #[must_use]
    pub fn alternatives(&self) -> Vec<PartId> {
        match self.root_part() {
            Part::Or(children) => children.clone(),
            _ => vec![self.root],
        }
    }

    /// Returns the full rendering.
    #[must_use]
    pub fn display(&self) -> String {
        self.arena.display(self.root)
    }

    /// Returns the simple rendering.
    #[must_use]
    pub fn simple(&self) -> String {
        self.arena.simple(self.root)
    }

    /// Returns the regex fragment of the whole tree.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unsupported`] if the root is a loop.
    pub fn regex(&self) -> Result<String> {
        self.arena.regex(self.root)
    }

    /// Returns the full renderings of the opaque leaves of the tree.
    #[must_use]
    pub fn opaque_leaves(&self) -> BTreeSet<String> {
        self.arena
            .post_order(self.root)
            .into_iter()
            .filter(|id| self.arena.get(*id).is_opaque())
            .map(|id| self.arena.display(id))
            .collect()
    }

    /// Returns `true` if both trees are structurally equal.
    #[must_use]
    pub fn same_as(&self, other: &PartTree) -> bool {
        let mut merged = self.arena.clone();
        let copy = other.arena.copy_into(other.root, &mut merged);
        merged.same(self.root, copy)
    }
}
