//! Leaf substitution and cycle collapsing.
//!
//! [`substitute_leaves`] repeatedly splices every fully resolved tree into
//! the trees referencing it. When only cycles remain, [`collapse_cycles`]
//! breaks each one at a DFS back edge `end -> start` by replacing the
//! occurrences of `start` inside the tree of `end` with a [`Part::Loop`]
//! referring to the tree of `start`. Substitution then continues until the
//! seed's tree no longer references any placeholder.

use crate::{
    part::PlaceholderKey,
    resolve::{cycles::back_edges, graph::ResolutionGraph},
    Error, Result,
};

/// Substitutes resolved trees into their referrers until no leaf is
/// referenced anymore.
///
/// Occurrence slots receive the content of the leaf's root, so subtrees below
/// the root end up shared between trees. Later rewrites only depend on a
/// node's own subtree, which makes this sharing harmless.
///
/// # Returns
///
/// The number of substituted occurrences.
///
/// # Errors
///
/// Returns [`Error::GraphError`] if an edge targets a placeholder without a
/// tree.
pub fn substitute_leaves(graph: &mut ResolutionGraph) -> Result<usize> {
    let mut substituted = 0;

    loop {
        let leaves = graph.leaves();
        let work: Vec<(PlaceholderKey, PlaceholderKey)> = graph
            .adjacency()
            .iter()
            .flat_map(|(from, targets)| {
                targets
                    .iter()
                    .filter(|target| leaves.contains(*target))
                    .map(move |target| (from.clone(), target.clone()))
            })
            .collect();

        if work.is_empty() {
            return Ok(substituted);
        }

        for (from, leaf) in work {
            let from_root = graph.tree(&from)?;
            let leaf_root = graph.tree(&leaf)?;
            let content = graph.arena.get(leaf_root).clone();
            for slot in graph.arena.occurrences_of(from_root, &leaf) {
                graph.arena.set(slot, content.clone());
                substituted += 1;
            }
            graph.remove_edge(&from, &leaf);
        }
    }
}

/// Resolves every placeholder of `graph`, breaking cycles with loops.
///
/// Each outer pass substitutes leaves and then collapses every cycle found
/// through the DFS back edges of the remaining adjacency. Removing all back
/// edges leaves an acyclic graph, so every pass strictly shrinks the
/// adjacency.
///
/// # Arguments
///
/// * `graph` - The graph to resolve in place.
/// * `max_iterations` - Cap on the number of outer passes.
///
/// # Returns
///
/// `true` if the seed's tree is fully resolved, `false` if the pass cap was
/// reached first. A warning is logged in the latter case.
///
/// # Errors
///
/// Returns [`Error::GraphError`] if adjacency remains while the graph has
/// neither leaves nor cycles, which a well-formed graph never does.
pub fn collapse_cycles(graph: &mut ResolutionGraph, max_iterations: usize) -> Result<bool> {
    substitute_leaves(graph)?;

    let mut iterations = 0;
    while graph.has_edges() {
        if iterations >= max_iterations {
            log::warn!(
                "cycle collapsing for {} stopped after {iterations} passes with {} edges left",
                graph.seed,
                graph.edge_count()
            );
            return Ok(false);
        }
        iterations += 1;

        let before = graph.edge_count();
        let cycles = back_edges(graph.adjacency());
        if cycles.is_empty() {
            return Err(Error::GraphError(format!(
                "{before} edges remain for {} without leaves or cycles",
                graph.seed
            )));
        }

        for (start, end) in cycles {
            collapse_edge(graph, &start, &end)?;
        }
        substitute_leaves(graph)?;

        log::debug!(
            "cycle pass {iterations} for {}: {before} -> {} edges",
            graph.seed,
            graph.edge_count()
        );
    }

    Ok(true)
}

/// Replaces every occurrence of `start` inside the tree of `end` with a loop
/// over the tree of `start`, and drops the edge.
fn collapse_edge(
    graph: &mut ResolutionGraph,
    start: &PlaceholderKey,
    end: &PlaceholderKey,
) -> Result<()> {
    let start_root = graph.tree(start)?;
    let end_root = graph.tree(end)?;
    let occurrences = graph.arena.occurrences_of(end_root, start);

    if !occurrences.is_empty() {
        let lp = graph.arena.new_loop(start_root);
        let content = graph.arena.get(lp).clone();
        for slot in occurrences {
            graph.arena.set(slot, content.clone());
        }
    }

    graph.remove_edge(end, start);
    Ok(())
}
