//! The ordered rewrite pipeline.

use crate::{
    config::AnalysisConfig,
    part::PartTree,
    rewrite::{
        dnf::is_dnf,
        passes::{
            AssumeSingleUser, CollapseWildcards, CombineConstants, ConvertToDnf,
            PruneOrWildcards, RemoveLoops, ResolveParentAndName, RewritePass,
            SubstituteEnvDefaults, SubstituteKnownValues, Simplify,
        },
    },
    Error, Result,
};

/// Runs rewrite passes in a fixed order over resolved seeds.
///
/// The default pipeline is:
///
/// 1. [`RemoveLoops`]
/// 2. [`SubstituteKnownValues`]
/// 3. [`AssumeSingleUser`]
/// 4. [`Simplify`]
/// 5. [`ConvertToDnf`]
/// 6. [`SubstituteEnvDefaults`]
/// 7. [`ResolveParentAndName`]
/// 8. [`Simplify`]
/// 9. [`CombineConstants`]
/// 10. [`CollapseWildcards`]
/// 11. [`PruneOrWildcards`]
///
/// After the last pass the result is checked to be in DNF; a violation is
/// logged and the tree is kept.
pub struct RewritePipeline {
    passes: Vec<Box<dyn RewritePass>>,
}

impl Default for RewritePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RewritePipeline {
    /// Creates the default pipeline.
    #[must_use]
    pub fn new() -> Self {
        RewritePipeline {
            passes: vec![
                Box::new(RemoveLoops),
                Box::new(SubstituteKnownValues),
                Box::new(AssumeSingleUser),
                Box::new(Simplify),
                Box::new(ConvertToDnf),
                Box::new(SubstituteEnvDefaults),
                Box::new(ResolveParentAndName),
                Box::new(Simplify),
                Box::new(CombineConstants),
                Box::new(CollapseWildcards),
                Box::new(PruneOrWildcards),
            ],
        }
    }

    /// Creates a pipeline running only `passes`, in order.
    #[must_use]
    pub fn with_passes(passes: Vec<Box<dyn RewritePass>>) -> Self {
        RewritePipeline { passes }
    }

    /// Returns the names of the passes, in order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Rewrites `tree` with every pass.
    ///
    /// # Returns
    ///
    /// The rewritten tree, or `None` if a pass hit an iteration cap and the
    /// seed has to be dropped.
    ///
    /// # Errors
    ///
    /// Propagates every error other than [`Error::RecursionLimit`].
    pub fn run(&self, mut tree: PartTree, config: &AnalysisConfig) -> Result<Option<PartTree>> {
        for pass in &self.passes {
            match pass.run(&mut tree, config) {
                Ok(true) => log::debug!("{}: {}", pass.name(), tree.simple()),
                Ok(false) => {}
                Err(Error::RecursionLimit(limit)) => {
                    log::warn!(
                        "{} stopped at limit {limit}; dropping {}",
                        pass.name(),
                        tree.simple()
                    );
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }

        if !is_dnf(&tree.arena, tree.root) {
            log::warn!("rewritten expression is not in DNF: {}", tree.simple());
        }
        Ok(Some(tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::{AnyKind, Wildcard, WrapKind};

    #[test]
    fn test_pass_order() {
        let names = RewritePipeline::new().pass_names();
        assert_eq!(names.len(), 11);
        assert_eq!(names[0], "remove-loops");
        assert_eq!(names[4], "convert-to-dnf");
        assert_eq!(names[10], "prune-or-wildcards");
    }

    #[test]
    fn test_full_pipeline() {
        // NORM[ENVVAR[ANDROID_DATA] + "/" + ("system" | "misc")] + "/" + USERID + "/" + (LOOP | "x.db")
        let tree = PartTree::build(|arena| {
            let name = arena.string("ANDROID_DATA");
            let env = arena.wrap(WrapKind::EnvVar, name);
            let slash = arena.string("/");
            let sys = arena.string("system");
            let misc = arena.string("misc");
            let dirs = arena.or(vec![sys, misc]);
            let joined = arena.append(vec![env, slash, dirs]);
            let norm = arena.wrap(WrapKind::Normalize, joined);
            let slash2 = arena.string("/");
            let user = arena.any(Wildcard::new(AnyKind::UserId));
            let slash3 = arena.string("/");
            let lp = arena.new_loop(norm);
            let db = arena.string("x.db");
            let files = arena.or(vec![lp, db]);
            arena.append(vec![norm, slash2, user, slash3, files])
        });

        let result = RewritePipeline::new()
            .run(tree, &AnalysisConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(
            result.simple(),
            "(/data/misc/0/x.db | /data/system/0/x.db)"
        );
        assert_eq!(
            result.regex().unwrap(),
            r"(?:/data/misc/0/x\.db|/data/system/0/x\.db)"
        );
    }

    #[test]
    fn test_alternative_cap_drops_tree() {
        let tree = PartTree::build(|arena| {
            let mut factors = Vec::new();
            for i in 0..6 {
                let a = arena.string(format!("a{i}"));
                let b = arena.string(format!("b{i}"));
                factors.push(arena.or(vec![a, b]));
            }
            arena.append(factors)
        });
        let config = AnalysisConfig::default().with_max_alternatives(16);
        assert!(RewritePipeline::new().run(tree, &config).unwrap().is_none());
    }
}
