//! Conversion to disjunctive normal form.
//!
//! After conversion a tree is one of:
//!
//! - a single leaf or wrapper,
//! - a single `Append` of leaves and wrappers,
//! - an `Or` whose alternatives are such leaves, wrappers or `Append`s.
//!
//! Every alternative then describes one concrete path shape, which is what
//! the matcher turns into a pattern.
//!
//! # Algorithm
//!
//! Every node is mapped to a list of *rows*, each row being the ordered list
//! of leaves and wrappers of one alternative:
//!
//! - a leaf is one row holding itself,
//! - an `Or` is the union of its children's rows,
//! - an `Append` is the cross-concatenation of its children's rows,
//! - a wrapper is distributed over its child's rows, producing one wrapper
//!   per row.
//!
//! Nodes are visited in post-order and their rows are recorded immediately,
//! so every child is resolved before its parent and one round covers a tree
//! of any depth. Further rounds only happen for nodes whose children were not
//! yet resolved when they were visited.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    part::{Constant, Part, PartArena, PartId, PartTree},
    Error, Result,
};

type Row = Vec<PartId>;

/// Converts `tree` to disjunctive normal form in place.
///
/// The input must be free of placeholders that still need resolution and
/// should be simplified first; loops are kept as leaves.
///
/// # Arguments
///
/// * `tree` - The tree to convert.
/// * `max_iterations` - Cap on resolution rounds. Depth does not count
///   against it.
/// * `max_alternatives` - Cap on the number of rows of any node.
///
/// # Errors
///
/// Returns [`Error::RecursionLimit`] if either cap is exceeded and
/// [`Error::GraphError`] if a round makes no progress. The caller drops the
/// seed in both cases.
pub fn to_dnf(tree: &mut PartTree, max_iterations: usize, max_alternatives: usize) -> Result<()> {
    let mut rows: FxHashMap<PartId, Vec<Row>> = FxHashMap::default();
    let mut pending = tree.arena.post_order(tree.root);
    let mut rounds = 0;

    while !pending.is_empty() {
        if rounds >= max_iterations {
            log::warn!("DNF conversion did not finish within {max_iterations} rounds");
            return Err(Error::RecursionLimit(max_iterations));
        }
        rounds += 1;

        let before = pending.len();
        let mut unresolved = Vec::new();
        for id in pending {
            if rows.contains_key(&id) {
                continue;
            }
            let children = tree.arena.children(id);
            if children.iter().all(|c| rows.contains_key(c)) {
                let node_rows = node_rows(&mut tree.arena, id, &rows, max_alternatives)?;
                rows.insert(id, node_rows);
            } else {
                unresolved.push(id);
            }
        }
        if unresolved.len() == before {
            return Err(Error::GraphError(format!(
                "DNF conversion is stuck with {before} unresolved parts"
            )));
        }
        pending = unresolved;
    }

    let root_rows = rows.remove(&tree.root).unwrap_or_default();
    let alternatives: Vec<PartId> = root_rows
        .into_iter()
        .map(|row| row_part(&mut tree.arena, row))
        .collect();
    let alternatives = tree.arena.dedupe(&alternatives);

    tree.root = match alternatives.len() {
        0 => tree.arena.constant(Constant::null()),
        1 => alternatives[0],
        _ => tree.arena.or(alternatives),
    };
    Ok(())
}

/// Computes the rows of `id` from the rows of its children.
fn node_rows(
    arena: &mut PartArena,
    id: PartId,
    rows: &FxHashMap<PartId, Vec<Row>>,
    max_alternatives: usize,
) -> Result<Vec<Row>> {
    let result = match arena.get(id).clone() {
        Part::Or(children) => {
            let mut out = Vec::new();
            for child in children {
                out.extend(rows[&child].iter().cloned());
                check_width(out.len(), max_alternatives)?;
            }
            out
        }
        Part::Append(children) => {
            let mut out: Vec<Row> = vec![Vec::new()];
            for child in children {
                let child_rows = &rows[&child];
                check_width(out.len() * child_rows.len(), max_alternatives)?;
                out = out
                    .iter()
                    .flat_map(|prefix| {
                        child_rows.iter().map(move |suffix| {
                            let mut row = prefix.clone();
                            row.extend(suffix.iter().copied());
                            row
                        })
                    })
                    .collect();
            }
            out
        }
        Part::Wrap(kind, child) => {
            let child_rows = &rows[&child];
            if child_rows.len() == 1 && child_rows[0] == [child] {
                vec![vec![id]]
            } else {
                let child_rows = child_rows.clone();
                child_rows
                    .into_iter()
                    .map(|row| {
                        let inner = row_part(arena, row);
                        vec![arena.wrap(kind, inner)]
                    })
                    .collect()
            }
        }
        Part::Constant(_)
        | Part::Any(_)
        | Part::AnyCombo(_)
        | Part::Unknown(_)
        | Part::Placeholder(_)
        | Part::Loop { .. } => vec![vec![id]],
    };
    Ok(result)
}

fn check_width(width: usize, max_alternatives: usize) -> Result<()> {
    if width > max_alternatives {
        log::warn!("DNF conversion exceeded {max_alternatives} alternatives");
        return Err(Error::RecursionLimit(max_alternatives));
    }
    Ok(())
}

/// Turns a row into a single part: the element itself or a new `Append`.
fn row_part(arena: &mut PartArena, mut row: Row) -> PartId {
    match row.len() {
        0 => arena.constant(Constant::string("")),
        1 => row.remove(0),
        _ => arena.append(row),
    }
}

/// Checks the DNF shape of the tree rooted at `root`, logging every
/// violation.
///
/// A tree violates the shape if a union is nested below the root, or if a
/// concatenation has a parent other than a root union or a wrapper.
///
/// # Returns
///
/// `true` if the tree is in DNF.
#[must_use]
pub fn is_dnf(arena: &PartArena, root: PartId) -> bool {
    let mut ok = true;
    let mut reported = FxHashSet::default();

    for (id, parent) in arena.pre_order_with_parents(root) {
        let Some(parent) = parent else {
            continue;
        };
        let violation = match arena.get(id) {
            Part::Or(_) => true,
            Part::Append(_) => match arena.get(parent) {
                Part::Or(_) => parent != root,
                Part::Wrap(..) => false,
                _ => true,
            },
            _ => false,
        };
        if violation && reported.insert(id) {
            log::warn!(
                "expression is not in DNF at {} (parent {})",
                arena.simple(id),
                arena.simple(parent)
            );
            ok = false;
        }
    }

    ok
}
