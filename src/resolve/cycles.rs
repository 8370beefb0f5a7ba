//! Cycle detection over the placeholder adjacency map.
//!
//! The cycle collapser needs, for every cycle, the node where it re-enters
//! (the *start*) and the node closing it (the *end*). Both are read off the
//! back edges of a depth-first search: an edge `end -> start` whose target is
//! still on the DFS stack closes a cycle through `start`.
//!
//! Removing every back edge leaves a DAG, which is what guarantees that cycle
//! collapsing makes progress.

use std::collections::{BTreeMap, BTreeSet};

/// Returns every DFS back edge of `adjacency` as a `(start, end)` pair, where
/// the edge runs from `end` to `start`.
///
/// Roots are visited in key order and successors in set order, so the result
/// is deterministic. Self-references are reported as `(k, k)`.
///
/// # Arguments
///
/// * `adjacency` - Edges from each node to the nodes it references
///
/// # Complexity
///
/// - Time: O(V + E)
/// - Space: O(V)
///
/// # Examples
///
/// ```rust,ignore
/// use std::collections::{BTreeMap, BTreeSet};
/// use pathscope::resolve::cycles::back_edges;
///
/// // a -> b -> c -> a
/// let mut adj = BTreeMap::new();
/// adj.insert("a", BTreeSet::from(["b"]));
/// adj.insert("b", BTreeSet::from(["c"]));
/// adj.insert("c", BTreeSet::from(["a"]));
///
/// assert_eq!(back_edges(&adj), vec![("a", "c")]);
/// ```
pub fn back_edges<K: Ord + Clone>(adjacency: &BTreeMap<K, BTreeSet<K>>) -> Vec<(K, K)> {
    let mut visited: BTreeSet<&K> = BTreeSet::new();
    let mut in_stack: BTreeSet<&K> = BTreeSet::new();
    let mut result = Vec::new();

    for root in adjacency.keys() {
        if visited.contains(root) {
            continue;
        }

        // Explicit stack of (node, successors yet to visit) to avoid deep recursion
        // on long placeholder chains.
        let mut stack: Vec<(&K, Vec<&K>)> = Vec::new();
        visited.insert(root);
        in_stack.insert(root);
        stack.push((root, successors(adjacency, root)));

        while let Some((node, pending)) = stack.last_mut() {
            let node: &K = node;
            match pending.pop() {
                Some(next) => {
                    if in_stack.contains(next) {
                        result.push((next.clone(), node.clone()));
                    } else if visited.insert(next) {
                        in_stack.insert(next);
                        let next_successors = successors(adjacency, next);
                        stack.push((next, next_successors));
                    }
                }
                None => {
                    in_stack.remove(node);
                    stack.pop();
                }
            }
        }
    }

    result
}

/// Returns `true` if `adjacency` contains a cycle.
pub fn has_cycle<K: Ord + Clone>(adjacency: &BTreeMap<K, BTreeSet<K>>) -> bool {
    !back_edges(adjacency).is_empty()
}

/// Successors of `node` reversed, so popping yields them in ascending order.
fn successors<'a, K: Ord>(adjacency: &'a BTreeMap<K, BTreeSet<K>>, node: &K) -> Vec<&'a K> {
    adjacency
        .get(node)
        .map(|targets| targets.iter().rev().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;

    fn graph(edges: &[(&'static str, &'static str)]) -> BTreeMap<&'static str, BTreeSet<&'static str>> {
        let mut adj: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (from, to) in edges {
            adj.entry(*from).or_default().insert(*to);
            adj.entry(*to).or_default();
        }
        adj
    }

    #[test]
    fn test_acyclic() {
        let adj = graph(&[("a", "b"), ("b", "c"), ("a", "c")]);
        assert!(back_edges(&adj).is_empty());
        assert!(!has_cycle(&adj));
    }

    #[test]
    fn test_simple_cycle() {
        let adj = graph(&[("a", "b"), ("b", "c"), ("c", "a")]);
        assert_eq!(back_edges(&adj), vec![("a", "c")]);
    }

    #[test]
    fn test_self_loop() {
        let adj = graph(&[("a", "a"), ("a", "b")]);
        assert_eq!(back_edges(&adj), vec![("a", "a")]);
    }

    #[test]
    fn test_two_cycles_sharing_node() {
        let adj = graph(&[("a", "b"), ("b", "a"), ("b", "c"), ("c", "b")]);
        let edges = back_edges(&adj);
        assert_eq!(edges, vec![("a", "b"), ("b", "c")]);
    }

    #[test]
    fn test_removing_back_edges_leaves_dag() {
        let mut adj = graph(&[
            ("a", "b"),
            ("b", "c"),
            ("c", "a"),
            ("c", "d"),
            ("d", "b"),
            ("d", "d"),
        ]);
        for (start, end) in back_edges(&adj) {
            adj.get_mut(end).unwrap().remove(start);
        }
        assert!(!has_cycle(&adj));
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let names: Vec<String> = (0..50_000).map(|i| format!("n{i:05}")).collect();
        let mut adj: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for pair in names.windows(2) {
            adj.entry(pair[0].clone()).or_default().insert(pair[1].clone());
        }
        adj.entry(names[names.len() - 1].clone())
            .or_default()
            .insert(names[0].clone());
        assert_eq!(back_edges(&adj).len(), 1);
    }
}
