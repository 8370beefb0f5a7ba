//! Fixpoint simplification of part trees.
//!
//! The simplifier visits every node in post-order and applies local rules
//! until a full sweep changes nothing:
//!
//! | Node | Rule |
//! |------|------|
//! | `Or` / `Append` | drop null children and emptied loops |
//! | `Or` / `Append` | inline children of the same kind |
//! | `Or` | drop structurally duplicate alternatives |
//! | `Or` / `Append` with no child | becomes null |
//! | `Or` / `Append` with one child | becomes that child |
//! | wrapper over null or an emptied loop | becomes null |
//! | root loop | becomes null |
//!
//! All rules only look at a node and its children, so applying them to a
//! shared subtree is valid for every parent.

use crate::{
    part::{Constant, Part, PartArena, PartId, PartTree},
    Error, Result,
};

/// Rewrites part trees to their simplified normal form.
///
/// Simplification is idempotent: simplifying an already simplified tree
/// changes nothing.
#[derive(Debug, Clone, Copy)]
pub struct Simplifier {
    max_iterations: usize,
}

impl Default for Simplifier {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Simplifier {
    /// Creates a simplifier running at most `max_iterations` sweeps.
    #[must_use]
    pub const fn new(max_iterations: usize) -> Self {
        Simplifier { max_iterations }
    }

    /// Simplifies `tree` in place.
    ///
    /// # Returns
    ///
    /// `true` if anything changed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecursionLimit`] if the tree is still changing after
    /// `max_iterations` sweeps.
    pub fn simplify(&self, tree: &mut PartTree) -> Result<bool> {
        let mut any_changed = false;

        for _ in 0..self.max_iterations {
            let mut changed = false;
            for id in tree.arena.post_order(tree.root) {
                changed |= simplify_node(&mut tree.arena, id);
            }
            if matches!(tree.arena.get(tree.root), Part::Loop { .. }) {
                tree.arena.set(tree.root, Part::Constant(Constant::null()));
                changed = true;
            }

            if !changed {
                return Ok(any_changed);
            }
            any_changed = true;
        }

        log::warn!(
            "simplification did not settle after {} sweeps: {}",
            self.max_iterations,
            tree.simple()
        );
        Err(Error::RecursionLimit(self.max_iterations))
    }
}

/// Applies the local rules to `id`. Returns `true` if its slot changed.
fn simplify_node(arena: &mut PartArena, id: PartId) -> bool {
    match arena.get(id) {
        Part::Or(children) => {
            let children = children.clone();
            let flat = flatten(arena, &children, true);
            let kept = arena.dedupe(&flat);
            collapse_list(arena, id, &children, kept, Part::Or)
        }
        Part::Append(children) => {
            let children = children.clone();
            let kept = flatten(arena, &children, false);
            collapse_list(arena, id, &children, kept, Part::Append)
        }
        Part::Wrap(_, child) => {
            let child = *child;
            if arena.get(child).is_null() || arena.loop_is_empty(child) {
                arena.set(id, Part::Constant(Constant::null()));
                true
            } else {
                false
            }
        }
        Part::Constant(_)
        | Part::Any(_)
        | Part::AnyCombo(_)
        | Part::Unknown(_)
        | Part::Placeholder(_)
        | Part::Loop { .. } => false,
    }
}

/// Drops null children and emptied loops, and inlines children of the same
/// kind as the parent.
fn flatten(arena: &PartArena, children: &[PartId], union: bool) -> Vec<PartId> {
    let mut out = Vec::with_capacity(children.len());
    for &child in children {
        match arena.get(child) {
            Part::Constant(c) if c.is_null() => {}
            Part::Loop { .. } if arena.loop_is_empty(child) => {}
            Part::Or(grand) if union => out.extend(grand.iter().copied()),
            Part::Append(grand) if !union => out.extend(grand.iter().copied()),
            _ => out.push(child),
        }
    }
    out
}

/// Stores the rewritten child list of `id`, collapsing it when it has fewer
/// than two entries.
fn collapse_list(
    arena: &mut PartArena,
    id: PartId,
    before: &[PartId],
    kept: Vec<PartId>,
    make: fn(Vec<PartId>) -> Part,
) -> bool {
    match kept.len() {
        0 => arena.set(id, Part::Constant(Constant::null())),
        1 => {
            let only = arena.get(kept[0]).clone();
            arena.set(id, only);
        }
        _ if kept.as_slice() == before => return false,
        _ => arena.set(id, make(kept)),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::{AnyKind, Wildcard, WrapKind};

    fn simplified(tree: &mut PartTree) -> String {
        Simplifier::default().simplify(tree).unwrap();
        tree.simple()
    }

    #[test]
    fn test_empty_or_is_null() {
        let mut tree = PartTree::build(|arena| arena.or(Vec::new()));
        assert_eq!(simplified(&mut tree), "null");
    }

    #[test]
    fn test_singletons_collapse() {
        let mut tree = PartTree::build(|arena| {
            let a = arena.string("/a");
            let or = arena.or(vec![a]);
            arena.append(vec![or])
        });
        assert_eq!(simplified(&mut tree), "/a");
    }

    #[test]
    fn test_nulls_propagate_upward() {
        let mut tree = PartTree::build(|arena| {
            let n1 = arena.null();
            let n2 = arena.null();
            let inner = arena.append(vec![n1, n2]);
            let wrap = arena.wrap(WrapKind::Parent, inner);
            let x = arena.string("/x");
            arena.or(vec![wrap, x])
        });
        assert_eq!(simplified(&mut tree), "/x");
    }

    #[test]
    fn test_flatten_and_dedupe() {
        let mut tree = PartTree::build(|arena| {
            let a = arena.string("/a");
            let b = arena.string("/b");
            let a2 = arena.string("/a");
            let inner = arena.or(vec![b, a2]);
            let outer = arena.or(vec![a, inner]);
            let pre = arena.string("/p");
            let tail = arena.any(Wildcard::new(AnyKind::Array));
            let app_inner = arena.append(vec![outer, tail]);
            arena.append(vec![pre, app_inner])
        });
        assert_eq!(simplified(&mut tree), "{/p + (/a | /b) + `ANY[ARRAY]`}");
        let Part::Append(children) = tree.root_part() else {
            panic!("expected append");
        };
        assert_eq!(children.len(), 3);
    }

    #[test]
    fn test_root_loop_is_null() {
        let mut tree = PartTree::build(|arena| {
            let x = arena.string("/x");
            arena.new_loop(x)
        });
        assert_eq!(simplified(&mut tree), "null");
    }

    #[test]
    fn test_loop_over_null_start_is_removed() {
        let mut tree = PartTree::build(|arena| {
            let start = arena.null();
            let lp = arena.new_loop(start);
            let x = arena.string("/x");
            let y = arena.string("/y");
            arena.append(vec![lp, x, y])
        });
        assert_eq!(simplified(&mut tree), "{/x + /y}");
    }

    #[test]
    fn test_idempotent() {
        let mut tree = PartTree::build(|arena| {
            let a = arena.string("/a");
            let n = arena.null();
            let b = arena.any(Wildcard::new(AnyKind::UserId));
            let or = arena.or(vec![a, n, b]);
            let s = arena.string("/s");
            arena.append(vec![s, or])
        });
        let mut once = tree.clone();
        Simplifier::default().simplify(&mut once).unwrap();
        let mut twice = once.clone();
        assert!(!Simplifier::default().simplify(&mut twice).unwrap());
        assert_eq!(once.display(), twice.display());
        assert!(Simplifier::default().simplify(&mut tree).unwrap());
    }
}
