//! The rewrite passes applied to every resolved seed before matching.
//!
//! Each pass encodes one piece of knowledge about how paths are built on the
//! analyzed platform: which environment variables hold which directories,
//! that user ids are `0` on a single-user device, how `File.getParent()` and
//! `File.getName()` evaluate on concrete prefixes, and so on. Passes that
//! need the tree in DNF run after [`ConvertToDnf`].

use crate::{
    config::AnalysisConfig,
    part::{AnyKind, Constant, ConstantKind, Part, PartArena, PartId, PartTree, Wildcard, WrapKind},
    rewrite::{dnf::to_dnf, simplify::Simplifier},
    Result,
};

/// A rewrite over one part tree.
///
/// Passes must be thread-safe: the engine shares one pipeline between all
/// workers.
pub trait RewritePass: Send + Sync {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Rewrites `tree` in place.
    ///
    /// # Arguments
    ///
    /// * `tree` - The tree to rewrite. Passes may move its root.
    /// * `config` - The analysis configuration.
    ///
    /// # Returns
    ///
    /// `true` if anything changed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::RecursionLimit`] when an iteration cap is hit,
    /// in which case the seed is dropped.
    fn run(&self, tree: &mut PartTree, config: &AnalysisConfig) -> Result<bool>;

    /// Get a description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }
}

/// Drops every loop and unwraps `Normalize` wrappers.
pub struct RemoveLoops;

impl RewritePass for RemoveLoops {
    fn name(&self) -> &'static str {
        "remove-loops"
    }

    fn run(&self, tree: &mut PartTree, _config: &AnalysisConfig) -> Result<bool> {
        let arena = &mut tree.arena;
        let mut changed = false;

        for id in arena.post_order(tree.root) {
            match arena.get(id).clone() {
                Part::Append(children) => {
                    if let Some(kept) = without_loops(arena, &children) {
                        arena.set(id, Part::Append(kept));
                        changed = true;
                    }
                }
                Part::Or(children) => {
                    if let Some(kept) = without_loops(arena, &children) {
                        arena.set(id, Part::Or(kept));
                        changed = true;
                    }
                }
                Part::Wrap(kind, child) => {
                    if is_loop(arena, child) {
                        arena.set(id, Part::Constant(Constant::null()));
                        changed = true;
                    } else if kind == WrapKind::Normalize {
                        let inner = arena.get(child).clone();
                        arena.set(id, inner);
                        changed = true;
                    }
                }
                _ => {}
            }
        }

        if is_loop(arena, tree.root) {
            arena.set(tree.root, Part::Constant(Constant::null()));
            changed = true;
        }
        Ok(changed)
    }

    fn description(&self) -> &'static str {
        "Removes loops and path normalization wrappers"
    }
}

/// Replaces field and method-return wildcards with configured constants.
pub struct SubstituteKnownValues;

impl RewritePass for SubstituteKnownValues {
    fn name(&self) -> &'static str {
        "substitute-known-values"
    }

    fn run(&self, tree: &mut PartTree, config: &AnalysisConfig) -> Result<bool> {
        if config.known_field_values.is_empty() && config.known_method_values.is_empty() {
            return Ok(false);
        }
        Ok(replace_leaves(&mut tree.arena, tree.root, |part| {
            let Part::Any(wildcard) = part else {
                return None;
            };
            let value = match &wildcard.kind {
                AnyKind::FieldRef(field) => config.known_field_values.get(field),
                AnyKind::MethodReturn(method) => config.known_method_values.get(method.as_str()),
                _ => None,
            }?;
            Some(Part::Constant(Constant::string(value.clone())))
        }))
    }

    fn description(&self) -> &'static str {
        "Substitutes known values of fields and method returns"
    }
}

/// Replaces user ids with `0`.
pub struct AssumeSingleUser;

impl RewritePass for AssumeSingleUser {
    fn name(&self) -> &'static str {
        "assume-single-user"
    }

    fn run(&self, tree: &mut PartTree, config: &AnalysisConfig) -> Result<bool> {
        if !config.assume_single_user {
            return Ok(false);
        }
        Ok(replace_leaves(&mut tree.arena, tree.root, |part| {
            let is_user_id = match part {
                Part::Any(Wildcard { kind, .. }) => match kind {
                    AnyKind::UserId => true,
                    AnyKind::MethodReturn(method) => config.user_id_methods.contains(method.as_str()),
                    AnyKind::FieldRef(field) => config.user_id_fields.contains(field),
                    _ => false,
                },
                Part::Constant(c) => {
                    matches!(c.kind, ConstantKind::Int | ConstantKind::Long)
                        && c.as_integer().is_some_and(|v| v < 0)
                }
                _ => false,
            };
            is_user_id.then(|| Part::Constant(Constant::string("0")))
        }))
    }

    fn description(&self) -> &'static str {
        "Assumes a single-user device and replaces user ids with 0"
    }
}

/// Runs the [`Simplifier`].
pub struct Simplify;

impl RewritePass for Simplify {
    fn name(&self) -> &'static str {
        "simplify"
    }

    fn run(&self, tree: &mut PartTree, config: &AnalysisConfig) -> Result<bool> {
        Simplifier::new(config.max_iterations).simplify(tree)
    }

    fn description(&self) -> &'static str {
        "Simplifies the tree to its normal form"
    }
}

/// Converts the tree to disjunctive normal form.
pub struct ConvertToDnf;

impl RewritePass for ConvertToDnf {
    fn name(&self) -> &'static str {
        "convert-to-dnf"
    }

    fn run(&self, tree: &mut PartTree, config: &AnalysisConfig) -> Result<bool> {
        let before = tree.root;
        to_dnf(tree, config.max_iterations, config.max_alternatives)?;
        Ok(before != tree.root)
    }

    fn description(&self) -> &'static str {
        "Converts the tree to a union of concatenations"
    }
}

/// Evaluates environment variable and system property lookups.
pub struct SubstituteEnvDefaults;

impl RewritePass for SubstituteEnvDefaults {
    fn name(&self) -> &'static str {
        "substitute-env-defaults"
    }

    fn run(&self, tree: &mut PartTree, config: &AnalysisConfig) -> Result<bool> {
        let arena = &mut tree.arena;
        let mut changed = false;

        for id in arena.post_order(tree.root) {
            let Part::Wrap(kind @ (WrapKind::EnvVar | WrapKind::SysVar), child) = *arena.get(id)
            else {
                continue;
            };
            let known = arena
                .get(child)
                .as_constant()
                .and_then(|name| config.env_defaults.get(name.text()))
                .cloned();
            let part = match known {
                Some(value) => Part::Constant(Constant::string(value)),
                None => Part::Any(Wildcard::new(AnyKind::Info(kind.to_string()))),
            };
            arena.set(id, part);
            changed = true;
        }
        Ok(changed)
    }

    fn description(&self) -> &'static str {
        "Substitutes default values of environment variables and system properties"
    }
}

/// Evaluates `Parent(..)` and `Name(..)` on concrete path prefixes.
///
/// The wrapped value is scanned for its last constant containing a `/`; the
/// parent is everything before that slash and the name everything after it.
pub struct ResolveParentAndName;

impl RewritePass for ResolveParentAndName {
    fn name(&self) -> &'static str {
        "resolve-parent-and-name"
    }

    fn run(&self, tree: &mut PartTree, _config: &AnalysisConfig) -> Result<bool> {
        let arena = &mut tree.arena;
        let mut changed = false;

        for id in arena.post_order(tree.root) {
            let Part::Wrap(kind @ (WrapKind::Parent | WrapKind::Name), child) = *arena.get(id)
            else {
                continue;
            };
            let part = evaluate_path_component(arena, kind, child);
            arena.set(id, part);
            changed = true;
        }
        Ok(changed)
    }

    fn description(&self) -> &'static str {
        "Evaluates parent directory and file name lookups"
    }
}

fn evaluate_path_component(arena: &mut PartArena, kind: WrapKind, child: PartId) -> Part {
    let unresolved = || {
        let name = if kind == WrapKind::Parent {
            "PARENTPATH"
        } else {
            "NAMEPATH"
        };
        Part::Any(Wildcard::new(AnyKind::Info(name.to_string())))
    };

    let row = match arena.get(child) {
        Part::Any(_) | Part::AnyCombo(_) | Part::Unknown(_) | Part::Placeholder(_) => {
            return arena.get(child).clone();
        }
        Part::Constant(c) if c.is_null() => return Part::Constant(Constant::null()),
        Part::Constant(_) => vec![child],
        Part::Append(children) => children.clone(),
        Part::Or(_) | Part::Loop { .. } | Part::Wrap(..) => return unresolved(),
    };

    let Some((index, text)) = row.iter().enumerate().rev().find_map(|(i, id)| match arena.get(*id) {
        Part::Constant(c) if !c.is_null() && !c.is_unrecognized() && c.text().contains('/') => {
            Some((i, c.text().to_string()))
        }
        _ => None,
    }) else {
        return unresolved();
    };

    let is_last = index + 1 == row.len();
    let trimmed = if is_last && text.len() > 1 {
        text.trim_end_matches('/')
    } else {
        text.as_str()
    };
    // Only trailing slashes: the whole text is the name, the parent is unknown.
    let Some(slash) = trimmed.rfind('/') else {
        if kind == WrapKind::Parent {
            return unresolved();
        }
        let mut parts = vec![arena.string(trimmed)];
        parts.extend_from_slice(&row[index + 1..]);
        return match parts.len() {
            1 => arena.get(parts[0]).clone(),
            _ => Part::Append(parts),
        };
    };

    let mut parts = Vec::new();
    if kind == WrapKind::Parent {
        parts.extend_from_slice(&row[..index]);
        let prefix = &trimmed[..slash];
        if !prefix.is_empty() {
            parts.push(arena.string(prefix));
        } else if index == 0 {
            parts.push(arena.string("/"));
        }
    } else {
        let suffix = &trimmed[slash + 1..];
        if !suffix.is_empty() {
            parts.push(arena.string(suffix));
        }
        parts.extend_from_slice(&row[index + 1..]);
    }

    match parts.len() {
        0 => Part::Constant(Constant::string("")),
        1 => arena.get(parts[0]).clone(),
        _ => Part::Append(parts),
    }
}

/// Concatenates adjacent constants inside concatenations and collapses
/// repeated slashes.
pub struct CombineConstants;

impl RewritePass for CombineConstants {
    fn name(&self) -> &'static str {
        "combine-constants"
    }

    fn run(&self, tree: &mut PartTree, _config: &AnalysisConfig) -> Result<bool> {
        let arena = &mut tree.arena;
        let mut changed = false;

        for id in arena.post_order(tree.root) {
            match arena.get(id).clone() {
                Part::Append(children) => {
                    let mut merged: Vec<PartId> = Vec::with_capacity(children.len());
                    let mut run: Vec<PartId> = Vec::new();

                    for child in children.iter().copied() {
                        if is_foldable(arena, child) {
                            run.push(child);
                        } else {
                            flush_constants(arena, &mut merged, &mut run);
                            merged.push(child);
                        }
                    }
                    flush_constants(arena, &mut merged, &mut run);

                    if merged.len() == 1 {
                        let only = arena.get(merged[0]).clone();
                        arena.set(id, only);
                        changed = true;
                    } else if merged != children {
                        arena.set(id, Part::Append(merged));
                        changed = true;
                    }
                }
                Part::Constant(c) if c.kind == ConstantKind::String => {
                    let collapsed = collapse_slashes(&c.value);
                    if collapsed != c.value {
                        arena.set(id, Part::Constant(Constant::string(collapsed)));
                        changed = true;
                    }
                }
                _ => {}
            }
        }
        Ok(changed)
    }

    fn description(&self) -> &'static str {
        "Concatenates adjacent constants"
    }
}

/// Returns `true` for constants that can be folded with their neighbours.
fn is_foldable(arena: &PartArena, id: PartId) -> bool {
    matches!(arena.get(id), Part::Constant(c) if !c.is_null() && !c.is_unrecognized())
}

/// Moves the constants of `run` into `merged` as one string constant. A lone
/// constant without repeated slashes is kept as is.
fn flush_constants(arena: &mut PartArena, merged: &mut Vec<PartId>, run: &mut Vec<PartId>) {
    if run.is_empty() {
        return;
    }
    let text: String = run
        .iter()
        .filter_map(|id| arena.get(*id).as_constant())
        .map(Constant::text)
        .collect();
    let collapsed = collapse_slashes(&text);
    if run.len() == 1 && collapsed == text {
        merged.push(run[0]);
    } else {
        merged.push(arena.string(collapsed));
    }
    run.clear();
}

fn collapse_slashes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_slash = false;
    for ch in text.chars() {
        if ch == '/' && previous_slash {
            continue;
        }
        previous_slash = ch == '/';
        out.push(ch);
    }
    out
}

/// Collapses runs of adjacent wildcard-like children of a concatenation.
pub struct CollapseWildcards;

impl RewritePass for CollapseWildcards {
    fn name(&self) -> &'static str {
        "collapse-wildcards"
    }

    fn run(&self, tree: &mut PartTree, _config: &AnalysisConfig) -> Result<bool> {
        let arena = &mut tree.arena;
        let mut changed = false;

        for id in arena.post_order(tree.root) {
            let Part::Append(children) = arena.get(id).clone() else {
                continue;
            };

            let mut out: Vec<PartId> = Vec::with_capacity(children.len());
            let mut run: Vec<PartId> = Vec::new();
            let mut collapsed = false;
            for child in children.iter().copied() {
                if is_any_like(arena, child) {
                    run.push(child);
                    continue;
                }
                collapsed |= flush_wildcards(arena, &mut out, &mut run);
                out.push(child);
            }
            collapsed |= flush_wildcards(arena, &mut out, &mut run);

            if collapsed {
                if out.len() == 1 {
                    let only = arena.get(out[0]).clone();
                    arena.set(id, only);
                } else {
                    arena.set(id, Part::Append(out));
                }
                changed = true;
            }
        }
        Ok(changed)
    }

    fn description(&self) -> &'static str {
        "Collapses adjacent wildcards into one"
    }
}

/// Moves `run` into `out`, as one combined wildcard if it holds at least two
/// entries one of which is a real wildcard.
fn flush_wildcards(arena: &mut PartArena, out: &mut Vec<PartId>, run: &mut Vec<PartId>) -> bool {
    let wild = run.iter().any(|id| {
        matches!(
            arena.get(*id),
            Part::Any(_) | Part::AnyCombo(_) | Part::Unknown(_) | Part::Placeholder(_)
        )
    });
    if run.len() >= 2 && wild {
        let mut contents = Vec::new();
        for id in run.drain(..) {
            match arena.get(id) {
                Part::AnyCombo(inner) => contents.extend(inner.iter().copied()),
                _ => contents.push(id),
            }
        }
        out.push(arena.alloc(Part::AnyCombo(contents)));
        true
    } else {
        out.append(run);
        false
    }
}

fn is_any_like(arena: &PartArena, id: PartId) -> bool {
    match arena.get(id) {
        Part::Any(w) => !w.kind.is_numeric(),
        Part::AnyCombo(_) | Part::Unknown(_) | Part::Placeholder(_) => true,
        Part::Constant(c) => c.is_null() || (c.kind == ConstantKind::String && c.value == "/"),
        _ => false,
    }
}

/// Removes wildcard alternatives from a root union.
///
/// If every alternative is a wildcard, the first one is kept so the seed
/// still reaches the match-all bucket.
pub struct PruneOrWildcards;

impl RewritePass for PruneOrWildcards {
    fn name(&self) -> &'static str {
        "prune-or-wildcards"
    }

    fn run(&self, tree: &mut PartTree, _config: &AnalysisConfig) -> Result<bool> {
        let Part::Or(children) = tree.root_part().clone() else {
            return Ok(false);
        };
        let arena = &mut tree.arena;

        let concrete: Vec<PartId> = children
            .iter()
            .copied()
            .filter(|c| {
                !matches!(
                    arena.get(*c),
                    Part::Any(_) | Part::AnyCombo(_) | Part::Unknown(_) | Part::Placeholder(_)
                ) && !arena.get(*c).is_null()
            })
            .collect();
        let kept = if concrete.is_empty() {
            children.iter().copied().take(1).collect()
        } else {
            arena.dedupe(&concrete)
        };

        if kept == children {
            return Ok(false);
        }
        tree.root = match kept.len() {
            0 => arena.constant(Constant::null()),
            1 => kept[0],
            _ => arena.or(kept),
        };
        Ok(true)
    }

    fn description(&self) -> &'static str {
        "Removes wildcard alternatives from the top-level union"
    }
}

/// Returns `children` without loops, or `None` if there were none.
fn without_loops(arena: &PartArena, children: &[PartId]) -> Option<Vec<PartId>> {
    let kept: Vec<PartId> = children
        .iter()
        .copied()
        .filter(|c| !is_loop(arena, *c))
        .collect();
    (kept.len() != children.len()).then_some(kept)
}

fn is_loop(arena: &PartArena, id: PartId) -> bool {
    matches!(arena.get(id), Part::Loop { .. })
}

/// Replaces every node under `root` for which `replace` returns a part.
fn replace_leaves<F>(arena: &mut PartArena, root: PartId, replace: F) -> bool
where
    F: Fn(&Part) -> Option<Part>,
{
    let mut changed = false;
    for id in arena.post_order(root) {
        if let Some(part) = replace(arena.get(id)) {
            arena.set(id, part);
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::MethodId;

    fn run(pass: &dyn RewritePass, tree: &mut PartTree) -> bool {
        pass.run(tree, &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_remove_loops() {
        let mut tree = PartTree::build(|arena| {
            let start = arena.string("/x");
            let lp = arena.new_loop(start);
            let a = arena.string("/a");
            let app = arena.append(vec![lp, a]);
            arena.wrap(WrapKind::Normalize, app)
        });
        assert!(run(&RemoveLoops, &mut tree));
        assert_eq!(tree.simple(), "{/a}");
    }

    #[test]
    fn test_substitute_known_values() {
        let mut config = AnalysisConfig::default();
        config
            .known_field_values
            .insert("<A: java.lang.String DIR>".into(), "/data/a".into());
        let mut tree = PartTree::build(|arena| {
            arena.any(Wildcard::new(AnyKind::FieldRef("<A: java.lang.String DIR>".into())))
        });
        assert!(SubstituteKnownValues.run(&mut tree, &config).unwrap());
        assert_eq!(tree.simple(), "/data/a");
    }

    #[test]
    fn test_assume_single_user() {
        let mut tree = PartTree::build(|arena| {
            let a = arena.string("/data/user/");
            let uid = arena.any(Wildcard::new(AnyKind::MethodReturn(MethodId::new(
                "<android.os.UserHandle: int getCallingUserId()>",
            ))));
            let neg = arena.constant(Constant::int(-2));
            let pos = arena.constant(Constant::int(5));
            arena.append(vec![a, uid, neg, pos])
        });
        assert!(run(&AssumeSingleUser, &mut tree));
        assert_eq!(tree.simple(), "{/data/user/ + 0 + 0 + 5}");

        let config = AnalysisConfig::default().with_single_user(false);
        let mut untouched =
            PartTree::build(|arena| arena.any(Wildcard::new(AnyKind::UserId)));
        assert!(!AssumeSingleUser.run(&mut untouched, &config).unwrap());
    }

    #[test]
    fn test_env_defaults() {
        let mut tree = PartTree::build(|arena| {
            let name = arena.string("ANDROID_DATA");
            let env = arena.wrap(WrapKind::EnvVar, name);
            let other = arena.string("ro.unknown");
            let sys = arena.wrap(WrapKind::SysVar, other);
            arena.append(vec![env, sys])
        });
        assert!(run(&SubstituteEnvDefaults, &mut tree));
        assert_eq!(tree.simple(), "{/data + `INFO[SYSVAR]`}");
    }

    #[test]
    fn test_parent_and_name() {
        let mut tree = PartTree::build(|arena| {
            let dir = arena.string("/data/system/");
            let file = arena.any(Wildcard::new(AnyKind::Array));
            let tail = arena.string("/users.xml");
            let app = arena.append(vec![dir, file, tail]);
            let parent = arena.wrap(WrapKind::Parent, app);
            let dir2 = arena.string("/data/misc/wifi/config.txt");
            let name = arena.wrap(WrapKind::Name, dir2);
            arena.or(vec![parent, name])
        });
        assert!(run(&ResolveParentAndName, &mut tree));
        assert_eq!(tree.simple(), "(config.txt | {/data/system/ + `ANY[ARRAY]`})");
    }

    #[test]
    fn test_parent_without_slash() {
        let mut tree = PartTree::build(|arena| {
            let c = arena.string("file.txt");
            arena.wrap(WrapKind::Parent, c)
        });
        assert!(run(&ResolveParentAndName, &mut tree));
        assert_eq!(tree.simple(), "`INFO[PARENTPATH]`");
    }

    #[test]
    fn test_trailing_slash_only() {
        let resolve = |kind: WrapKind, text: &str| {
            let mut tree = PartTree::build(|arena| {
                let c = arena.string(text);
                arena.wrap(kind, c)
            });
            assert!(run(&ResolveParentAndName, &mut tree));
            tree.simple()
        };
        assert_eq!(resolve(WrapKind::Name, "data/"), "data");
        assert_eq!(resolve(WrapKind::Name, "x/"), "x");
        assert_eq!(resolve(WrapKind::Parent, "data/"), "`INFO[PARENTPATH]`");
        assert_eq!(resolve(WrapKind::Parent, "x/"), "`INFO[PARENTPATH]`");
        assert_eq!(resolve(WrapKind::Name, "/data/"), "data");
        assert_eq!(resolve(WrapKind::Parent, "/data/"), "/");
    }

    #[test]
    fn test_combine_constants() {
        let mut tree = PartTree::build(|arena| {
            let a = arena.string("/data/");
            let b = arena.string("/system");
            let w = arena.any(Wildcard::new(AnyKind::Array));
            let c = arena.string("x");
            let d = arena.constant(Constant::int(1));
            arena.append(vec![a, b, w, c, d])
        });
        assert!(run(&CombineConstants, &mut tree));
        assert_eq!(tree.simple(), "{/data/system + `ANY[ARRAY]` + x1}");
        assert!(!run(&CombineConstants, &mut tree));
    }

    #[test]
    fn test_collapse_wildcards() {
        let mut tree = PartTree::build(|arena| {
            let a = arena.string("/data/");
            let w1 = arena.any(Wildcard::new(AnyKind::Array));
            let s = arena.string("/");
            let w2 = arena.any(Wildcard::new(AnyKind::ChildPath));
            let n = arena.any(Wildcard::new(AnyKind::Uid));
            arena.append(vec![a, w1, s, w2, n])
        });
        assert!(run(&CollapseWildcards, &mut tree));
        assert_eq!(tree.simple(), "{/data/ + `ANY[COMBO]` + `ANY[UID]`}");
        assert_eq!(tree.regex().unwrap(), r"/data/.*\d+");
    }

    #[test]
    fn test_prune_or_wildcards() {
        let mut tree = PartTree::build(|arena| {
            let a = arena.string("/a");
            let w = arena.any(Wildcard::new(AnyKind::Array));
            let a2 = arena.string("/a");
            let n = arena.null();
            arena.or(vec![a, w, a2, n])
        });
        assert!(run(&PruneOrWildcards, &mut tree));
        assert_eq!(tree.simple(), "/a");

        let mut all_wild = PartTree::build(|arena| {
            let w = arena.any(Wildcard::new(AnyKind::Array));
            let u = arena.unknown(crate::part::Unknown::Value("v".into()));
            arena.or(vec![w, u])
        });
        assert!(run(&PruneOrWildcards, &mut all_wild));
        assert_eq!(all_wild.simple(), "`ANY[ARRAY]`");
    }
}
