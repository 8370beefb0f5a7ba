//! Resolution of seed placeholders into placeholder-free part trees.
//!
//! Resolution runs in three steps:
//!
//! 1. [`GraphBuilder`] materializes a candidate tree for the seed and for every
//!    placeholder those trees reference, producing a [`ResolutionGraph`].
//! 2. [`collapse_cycles`] substitutes resolved trees into their referrers and
//!    breaks the remaining cycles with loops.
//! 3. The seed's tree is copied into a fresh arena, dropping everything the
//!    other placeholders needed but the seed does not.
//!
//! The result is ready for the [`crate::rewrite`] pipeline.

pub mod builder;
pub mod collapse;
pub mod cycles;
pub mod graph;

pub use builder::GraphBuilder;
pub use collapse::{collapse_cycles, substitute_leaves};
pub use graph::ResolutionGraph;

use crate::{
    config::AnalysisConfig,
    entrypoint::Seed,
    facts::{FactsProvider, Scope},
    part::{AnyKind, PartTree, Wildcard},
    Result,
};

/// Resolves the value consumed at `seed` within `scope`.
///
/// # Arguments
///
/// * `facts` - The program facts.
/// * `scope` - The methods of the entry point being analyzed.
/// * `seed` - The consumer location.
/// * `config` - Supplies the cycle-collapsing pass cap.
///
/// # Returns
///
/// `None` if cycle collapsing hit its cap; the seed is then dropped.
///
/// # Errors
///
/// Propagates [`crate::Error::GraphError`] from graph construction and
/// collapsing.
pub fn resolve_seed(
    facts: &dyn FactsProvider,
    scope: &Scope,
    seed: &Seed,
    config: &AnalysisConfig,
) -> Result<Option<PartTree>> {
    let mut graph = GraphBuilder::new(facts, scope).build(&seed.key)?;
    if !collapse_cycles(&mut graph, config.max_iterations)? {
        return Ok(None);
    }

    let (mut arena, mut root) = graph.arena.extract(graph.seed_tree()?);
    if seed.lists_children {
        let slash = arena.string("/");
        let child = arena.any(Wildcard::new(AnyKind::ChildPath));
        root = arena.append(vec![root, slash, child]);
    }

    Ok(Some(PartTree::new(arena, root)))
}
