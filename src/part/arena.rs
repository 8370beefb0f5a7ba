//! Arena storage for [`Part`] trees.
//!
//! A [`PartArena`] owns every node of the trees built for one seed. Nodes are
//! addressed by [`PartId`] and rewritten in place by replacing the content of
//! their slot with [`PartArena::set`]. Because children are ids, a subtree can
//! be shared by several parents; all traversals therefore visit each id at most
//! once, and no traversal ever follows the start reference of a
//! [`Part::Loop`].

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::part::{
    id::{LoopId, PartId},
    placeholder::PlaceholderKey,
    wildcard::Wildcard,
    Constant, Part, Unknown, WrapKind,
};

/// Owner of all parts built while resolving one seed.
#[derive(Debug, Clone, Default)]
pub struct PartArena {
    slots: Vec<Part>,
    next_loop: u64,
}

impl PartArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of allocated slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if nothing was allocated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Stores `part` in a fresh slot and returns its id.
    pub fn alloc(&mut self, part: Part) -> PartId {
        let id = PartId(self.slots.len());
        self.slots.push(part);
        id
    }

    /// Returns the content of the slot `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not allocated by this arena.
    #[must_use]
    pub fn get(&self, id: PartId) -> &Part {
        &self.slots[id.0]
    }

    /// Replaces the content of the slot `id`.
    ///
    /// Every parent and every loop referring to `id` observes the new content.
    pub fn set(&mut self, id: PartId, part: Part) {
        self.slots[id.0] = part;
    }

    /// Allocates a string constant.
    pub fn string(&mut self, value: impl Into<String>) -> PartId {
        self.alloc(Part::Constant(Constant::string(value)))
    }

    /// Allocates the null constant.
    pub fn null(&mut self) -> PartId {
        self.alloc(Part::Constant(Constant::null()))
    }

    /// Allocates a constant.
    pub fn constant(&mut self, constant: Constant) -> PartId {
        self.alloc(Part::Constant(constant))
    }

    /// Allocates a wildcard.
    pub fn any(&mut self, wildcard: Wildcard) -> PartId {
        self.alloc(Part::Any(wildcard))
    }

    /// Allocates an unknown.
    pub fn unknown(&mut self, unknown: Unknown) -> PartId {
        self.alloc(Part::Unknown(unknown))
    }

    /// Allocates a placeholder.
    pub fn placeholder(&mut self, key: PlaceholderKey) -> PartId {
        self.alloc(Part::Placeholder(key))
    }

    /// Allocates an ordered concatenation.
    pub fn append(&mut self, children: Vec<PartId>) -> PartId {
        self.alloc(Part::Append(children))
    }

    /// Allocates a union.
    pub fn or(&mut self, children: Vec<PartId>) -> PartId {
        self.alloc(Part::Or(children))
    }

    /// Allocates a unary wrapper.
    pub fn wrap(&mut self, kind: WrapKind, child: PartId) -> PartId {
        self.alloc(Part::Wrap(kind, child))
    }

    /// Allocates a loop over `start` with a fresh loop id.
    pub fn new_loop(&mut self, start: PartId) -> PartId {
        let id = LoopId(self.next_loop);
        self.next_loop += 1;
        self.alloc(Part::Loop {
            id,
            start: Some(start),
        })
    }

    /// Returns the traversable children of `id`.
    ///
    /// Leaves, loops and collapsed wildcard runs have none.
    #[must_use]
    pub fn children(&self, id: PartId) -> Vec<PartId> {
        match self.get(id) {
            Part::Append(children) | Part::Or(children) => children.clone(),
            Part::Wrap(_, child) => vec![*child],
            Part::Constant(_)
            | Part::Any(_)
            | Part::AnyCombo(_)
            | Part::Unknown(_)
            | Part::Placeholder(_)
            | Part::Loop { .. } => Vec::new(),
        }
    }

    /// Returns every id reachable from `root` in post-order (children before
    /// parents), each exactly once.
    #[must_use]
    pub fn post_order(&self, root: PartId) -> Vec<PartId> {
        let mut order = Vec::new();
        let mut visited = FxHashSet::default();
        let mut stack = vec![(root, false)];

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if !visited.insert(id) {
                continue;
            }
            stack.push((id, true));
            for child in self.children(id).into_iter().rev() {
                if !visited.contains(&child) {
                    stack.push((child, false));
                }
            }
        }

        order
    }

    /// Returns every `(id, parent)` pair reachable from `root` in pre-order.
    ///
    /// A shared subtree is reported once, with the first parent it was reached
    /// through. The root has no parent.
    #[must_use]
    pub fn pre_order_with_parents(&self, root: PartId) -> Vec<(PartId, Option<PartId>)> {
        let mut order = Vec::new();
        let mut visited = FxHashSet::default();
        let mut stack = vec![(root, None)];

        while let Some((id, parent)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            order.push((id, parent));
            for child in self.children(id).into_iter().rev() {
                stack.push((child, Some(id)));
            }
        }

        order
    }

    /// Returns the set of placeholder keys occurring under `root`, not looking
    /// into loops.
    #[must_use]
    pub fn placeholders_in(&self, root: PartId) -> BTreeSet<PlaceholderKey> {
        self.post_order(root)
            .into_iter()
            .filter_map(|id| self.get(id).as_placeholder().cloned())
            .collect()
    }

    /// Returns the ids of the placeholder slots under `root` whose key is `key`.
    #[must_use]
    pub fn occurrences_of(&self, root: PartId, key: &PlaceholderKey) -> Vec<PartId> {
        self.post_order(root)
            .into_iter()
            .filter(|id| self.get(*id).as_placeholder() == Some(key))
            .collect()
    }

    /// Returns `true` if `id` is a loop whose start value no longer
    /// contributes anything: it was dropped, or it simplified to null or to an
    /// empty union or concatenation.
    #[must_use]
    pub fn loop_is_empty(&self, id: PartId) -> bool {
        match self.get(id) {
            Part::Loop { start: None, .. } => true,
            Part::Loop {
                start: Some(start), ..
            } => match self.get(*start) {
                Part::Constant(c) => c.is_null(),
                Part::Append(children) | Part::Or(children) => children.is_empty(),
                _ => false,
            },
            _ => false,
        }
    }

    /// Structural equality of the trees rooted at `a` and `b`.
    ///
    /// Loops compare by identity. Union alternatives compare irrespective of
    /// their order.
    #[must_use]
    pub fn same(&self, a: PartId, b: PartId) -> bool {
        let mut stack = vec![(a, b)];
        let mut checked = FxHashSet::default();

        while let Some((x, y)) = stack.pop() {
            if x == y || !checked.insert((x, y)) {
                continue;
            }
            match (self.get(x), self.get(y)) {
                (Part::Constant(l), Part::Constant(r)) if l == r => {}
                (Part::Any(l), Part::Any(r)) if l == r => {}
                (Part::Unknown(l), Part::Unknown(r)) if l == r => {}
                (Part::Placeholder(l), Part::Placeholder(r)) if l == r => {}
                (Part::Loop { id: l, .. }, Part::Loop { id: r, .. }) if l == r => {}
                (Part::Wrap(lk, lc), Part::Wrap(rk, rc)) if lk == rk => {
                    stack.push((*lc, *rc));
                }
                (Part::Append(l), Part::Append(r)) | (Part::AnyCombo(l), Part::AnyCombo(r))
                    if l.len() == r.len() =>
                {
                    stack.extend(l.iter().copied().zip(r.iter().copied()));
                }
                (Part::Or(l), Part::Or(r)) if l.len() == r.len() => {
                    let matched = l
                        .iter()
                        .all(|lc| r.iter().any(|rc| self.same(*lc, *rc)))
                        && r.iter().all(|rc| l.iter().any(|lc| self.same(*lc, *rc)));
                    if !matched {
                        return false;
                    }
                }
                _ => return false,
            }
        }

        true
    }

    /// Removes structural duplicates from `ids`, keeping the first occurrence.
    ///
    /// Candidates are bucketed by their full rendering first, so only ids that
    /// render identically are compared structurally.
    #[must_use]
    pub fn dedupe(&self, ids: &[PartId]) -> Vec<PartId> {
        let mut buckets: FxHashMap<String, Vec<PartId>> = FxHashMap::default();
        let mut kept = Vec::with_capacity(ids.len());

        for &id in ids {
            let bucket = buckets.entry(self.display(id)).or_default();
            if bucket.iter().any(|other| self.same(*other, id)) {
                continue;
            }
            bucket.push(id);
            kept.push(id);
        }

        kept
    }

    /// Copies the subgraph reachable from `root` into `target`, returning the
    /// id of the copy.
    ///
    /// Sharing is preserved, and loop starts are copied along with the loop so
    /// the copy is self-contained. Loop ids are kept: the target arena continues
    /// its own counter past the highest id it received.
    pub fn copy_into(&self, root: PartId, target: &mut PartArena) -> PartId {
        let mut mapping: FxHashMap<PartId, PartId> = FxHashMap::default();
        let mut pending = vec![root];
        let mut order = Vec::new();

        // Reserve a slot in the target for every reachable id, loop starts included.
        while let Some(id) = pending.pop() {
            if mapping.contains_key(&id) {
                continue;
            }
            mapping.insert(id, target.alloc(Part::Constant(Constant::null())));
            order.push(id);
            match self.get(id) {
                Part::Loop {
                    start: Some(start), ..
                } => pending.push(*start),
                Part::AnyCombo(contents) => pending.extend(contents.iter().copied()),
                _ => pending.extend(self.children(id)),
            }
        }

        let remap = |ids: &[PartId]| -> Vec<PartId> { ids.iter().map(|id| mapping[id]).collect() };
        for id in order {
            let copy = match self.get(id) {
                Part::Append(children) => Part::Append(remap(children)),
                Part::Or(children) => Part::Or(remap(children)),
                Part::AnyCombo(contents) => Part::AnyCombo(remap(contents)),
                Part::Wrap(kind, child) => Part::Wrap(*kind, mapping[child]),
                Part::Loop { id: loop_id, start } => {
                    target.next_loop = target.next_loop.max(loop_id.0 + 1);
                    Part::Loop {
                        id: *loop_id,
                        start: start.map(|s| mapping[&s]),
                    }
                }
                leaf => leaf.clone(),
            };
            target.set(mapping[&id], copy);
        }

        mapping[&root]
    }

    /// Copies the subgraph reachable from `root` into a fresh arena.
    #[must_use]
    pub fn extract(&self, root: PartId) -> (PartArena, PartId) {
        let mut target = PartArena::new();
        let copy = self.copy_into(root, &mut target);
        (target, copy)
    }
}
