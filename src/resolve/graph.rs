//! The placeholder resolution graph.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    part::{PartArena, PartId, PlaceholderKey},
    Error, Result,
};

/// Candidate trees for every placeholder reachable from one seed, and the
/// references between them.
///
/// An edge `a -> b` means the tree of `a` still contains a placeholder for
/// `b`. A placeholder without outgoing edges is a *leaf*: its tree is fully
/// resolved and can be substituted into the trees referencing it.
#[derive(Debug, Clone)]
pub struct ResolutionGraph {
    /// Storage for every tree of the graph.
    pub arena: PartArena,
    /// The placeholder the graph was built for.
    pub seed: PlaceholderKey,
    trees: BTreeMap<PlaceholderKey, PartId>,
    adjacency: BTreeMap<PlaceholderKey, BTreeSet<PlaceholderKey>>,
}

impl ResolutionGraph {
    /// Creates an empty graph for `seed`.
    #[must_use]
    pub fn new(seed: PlaceholderKey) -> Self {
        ResolutionGraph {
            arena: PartArena::new(),
            seed,
            trees: BTreeMap::new(),
            adjacency: BTreeMap::new(),
        }
    }

    /// Records the tree of `key`. Edges are computed by
    /// [`ResolutionGraph::recompute_adjacency`].
    pub fn insert_tree(&mut self, key: PlaceholderKey, root: PartId) {
        self.trees.insert(key, root);
    }

    /// Returns the root of the tree of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if `key` has no tree.
    pub fn tree(&self, key: &PlaceholderKey) -> Result<PartId> {
        self.trees
            .get(key)
            .copied()
            .ok_or_else(|| Error::GraphError(format!("no tree for placeholder {key}")))
    }

    /// Returns the root of the seed's tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if the seed was never materialized.
    pub fn seed_tree(&self) -> Result<PartId> {
        self.tree(&self.seed)
    }

    /// Returns every placeholder with a tree, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &PlaceholderKey> {
        self.trees.keys()
    }

    /// Returns the number of placeholders with a tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Returns `true` if no placeholder has a tree.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Returns the adjacency map.
    #[must_use]
    pub fn adjacency(&self) -> &BTreeMap<PlaceholderKey, BTreeSet<PlaceholderKey>> {
        &self.adjacency
    }

    /// Returns the placeholders referenced by the tree of `key`.
    #[must_use]
    pub fn successors(&self, key: &PlaceholderKey) -> Option<&BTreeSet<PlaceholderKey>> {
        self.adjacency.get(key)
    }

    /// Recomputes the edges of `key` from its current tree, not looking into
    /// loops. Returns `true` if `key` is now a leaf.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if `key` has no tree.
    pub fn recompute_adjacency(&mut self, key: &PlaceholderKey) -> Result<bool> {
        let root = self.tree(key)?;
        let refs = self.arena.placeholders_in(root);
        let leaf = refs.is_empty();
        self.adjacency.insert(key.clone(), refs);
        Ok(leaf)
    }

    /// Recomputes the edges of every placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if an edge targets a placeholder without
    /// a tree.
    pub fn recompute_all(&mut self) -> Result<()> {
        let keys: Vec<PlaceholderKey> = self.trees.keys().cloned().collect();
        for key in &keys {
            self.recompute_adjacency(key)?;
        }
        for (from, targets) in &self.adjacency {
            if let Some(missing) = targets.iter().find(|t| !self.trees.contains_key(*t)) {
                return Err(Error::GraphError(format!(
                    "placeholder {from} references {missing}, which has no tree"
                )));
            }
        }
        Ok(())
    }

    /// Removes the edge `from -> to`.
    pub fn remove_edge(&mut self, from: &PlaceholderKey, to: &PlaceholderKey) {
        if let Some(targets) = self.adjacency.get_mut(from) {
            targets.remove(to);
        }
    }

    /// Returns the placeholders whose tree is fully resolved.
    #[must_use]
    pub fn leaves(&self) -> BTreeSet<PlaceholderKey> {
        self.adjacency
            .iter()
            .filter(|(_, targets)| targets.is_empty())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Returns the total number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum()
    }

    /// Returns `true` while any tree still references a placeholder.
    #[must_use]
    pub fn has_edges(&self) -> bool {
        self.adjacency.values().any(|targets| !targets.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::MethodId;

    fn ret(name: &str) -> PlaceholderKey {
        PlaceholderKey::Return {
            method: MethodId::new(name),
        }
    }

    #[test]
    fn test_adjacency_and_leaves() {
        let mut graph = ResolutionGraph::new(ret("a"));
        let b_ph = graph.arena.placeholder(ret("b"));
        let slash = graph.arena.string("/");
        let a_root = graph.arena.append(vec![b_ph, slash]);
        let b_root = graph.arena.string("/data");
        graph.insert_tree(ret("a"), a_root);
        graph.insert_tree(ret("b"), b_root);
        graph.recompute_all().unwrap();

        assert_eq!(graph.edge_count(), 1);
        assert!(graph.has_edges());
        assert_eq!(graph.leaves().into_iter().collect::<Vec<_>>(), vec![ret("b")]);

        graph.remove_edge(&ret("a"), &ret("b"));
        assert!(!graph.has_edges());
    }

    #[test]
    fn test_missing_tree_is_graph_error() {
        let mut graph = ResolutionGraph::new(ret("a"));
        let c_ph = graph.arena.placeholder(ret("c"));
        graph.insert_tree(ret("a"), c_ph);
        assert!(matches!(graph.recompute_all(), Err(Error::GraphError(_))));
        assert!(matches!(graph.tree(&ret("zz")), Err(Error::GraphError(_))));
    }
}
