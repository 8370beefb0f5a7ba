//! Matching of rewritten seed values against the filesystem image.
//!
//! The matcher turns every DNF alternative of every resolved seed into an
//! anchored regex, routes match-anything alternatives away, and tests the
//! remaining patterns against every file entry. Matches are classified per
//! entry point by the [`RedelegationAnalyzer`].
//!
//! # Parallelism
//!
//! Pattern compilation and the pattern x file cross product run on the
//! current rayon pool. Hits are gathered in a [`DashMap`] and then merged in
//! sorted order, so the resulting [`MatchesDatabase`] does not depend on
//! scheduling.

use std::collections::{BTreeMap, BTreeSet};

use dashmap::DashMap;
use rayon::prelude::*;
use regex::Regex;

use crate::{
    config::AnalysisConfig,
    engine::SeedResolution,
    entrypoint::EntryPoint,
    matching::{
        missing_permissions, Bucket, FileMatch, MatchFilter, MatchesDatabase,
        RedelegationAnalyzer, SeedExpression, Verdict,
    },
    ownership::{FileEntry, OwnershipDatabase},
    Result,
};

impl From<Verdict> for Bucket {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Redelegation => Bucket::Redelegation,
            Verdict::NoRedelegation => Bucket::NoRedelegation,
        }
    }
}

/// Expressions waiting for a pattern to be matched.
type Candidates = BTreeMap<String, Vec<(EntryPoint, SeedExpression)>>;

/// Matches resolved seeds against an [`OwnershipDatabase`].
///
/// # Examples
///
/// ```rust,ignore
/// use pathscope::prelude::*;
///
/// let matcher = Matcher::new(&ownership, &config);
/// let db = matcher.run(&report.resolutions)?;
/// for (bucket, patterns, files) in db.summary() {
///     println!("{bucket}: {patterns} patterns, {files} files");
/// }
/// ```
pub struct Matcher<'a> {
    ownership: &'a dyn OwnershipDatabase,
    config: &'a AnalysisConfig,
    filter: MatchFilter,
    analyzer: RedelegationAnalyzer,
}

impl<'a> Matcher<'a> {
    /// Creates a matcher over `ownership`.
    #[must_use]
    pub fn new(ownership: &'a dyn OwnershipDatabase, config: &'a AnalysisConfig) -> Self {
        Matcher {
            ownership,
            config,
            filter: MatchFilter::new(config),
            analyzer: RedelegationAnalyzer::new(config.privileged_principals.clone()),
        }
    }

    /// Matches all `resolutions` and returns the populated database.
    ///
    /// # Arguments
    ///
    /// * `resolutions` - Resolved and rewritten seeds, in any order.
    ///
    /// Patterns that do not compile are logged and skipped; the matches of
    /// every other pattern are kept.
    ///
    /// # Complexity
    ///
    /// O(P x F) regex evaluations for P distinct patterns and F file entries.
    pub fn run(&self, resolutions: &[SeedResolution]) -> Result<MatchesDatabase> {
        let mut db = MatchesDatabase::new();
        let candidates = self.collect_candidates(resolutions, &mut db);
        if candidates.is_empty() {
            return Ok(db);
        }

        let patterns: Vec<&String> = candidates.keys().collect();
        let compiled: Vec<Option<Regex>> = patterns.par_iter().map(|p| compile(p)).collect();

        let files = self.ownership.all_file_entries();
        let mut hits = Self::cross_match(&compiled, &files);
        log::debug!(
            "matched {} patterns against {} files, {} patterns hit",
            compiled.len(),
            files.len(),
            hits.len()
        );

        for (index, pattern) in patterns.iter().enumerate() {
            if compiled[index].is_none() {
                continue;
            }
            let expressions = &candidates[*pattern];
            let matched = hits.remove(&index).unwrap_or_default();
            if matched.is_empty() {
                for (entry_point, expression) in expressions {
                    db.add_expression(entry_point, Bucket::NoMatch, pattern, expression.clone());
                }
                continue;
            }

            for &file_index in &matched {
                let entry = &files[file_index];
                let granted = self.granted_permissions(entry);
                for (entry_point, expression) in expressions {
                    let missing = missing_permissions(entry_point, &granted);
                    let bucket = Bucket::from(self.analyzer.classify(entry_point, entry, &missing));
                    db.add_expression(entry_point, bucket, pattern, expression.clone());
                    db.add_file(
                        entry_point,
                        bucket,
                        pattern,
                        FileMatch {
                            entry: entry.clone(),
                            granted: granted.clone(),
                            missing,
                        },
                    );
                }
            }
        }

        Ok(db)
    }

    /// Splits every resolution into patterns. Excluded seeds and match-all
    /// alternatives are recorded in `db` directly.
    fn collect_candidates(&self, resolutions: &[SeedResolution], db: &mut MatchesDatabase) -> Candidates {
        let mut candidates = Candidates::new();

        for resolution in resolutions {
            let original = resolution.resolved.display();
            let leaves = resolution.resolved.opaque_leaves();
            let expression = |simple: String| SeedExpression {
                seed: resolution.seed.clone(),
                simple,
                original: original.clone(),
                leaves: leaves.clone(),
            };

            let method = resolution.seed.source_method();
            if self.config.excluded_seed_methods.contains(method.as_str()) {
                db.add_removed(&resolution.entry_point, expression(resolution.rewritten.simple()));
                continue;
            }

            let tree = &resolution.rewritten;
            for alternative in tree.alternatives() {
                let pattern = match tree.arena.regex(alternative) {
                    Ok(pattern) => pattern,
                    Err(e) => {
                        log::warn!(
                            "skipping alternative {} of {}: {e}",
                            tree.arena.simple(alternative),
                            resolution.seed
                        );
                        continue;
                    }
                };
                let expr = expression(tree.arena.simple(alternative));

                if self.filter.is_match_all(&tree.arena, alternative, &pattern) {
                    db.add_expression(&resolution.entry_point, Bucket::MatchAll, &pattern, expr);
                } else {
                    candidates
                        .entry(pattern)
                        .or_default()
                        .push((resolution.entry_point.clone(), expr));
                }
            }
        }

        candidates
    }

    /// Tests every pattern against every file. Returns the sorted matching
    /// file indices per pattern index, omitting patterns without hits.
    fn cross_match(compiled: &[Option<Regex>], files: &[FileEntry]) -> BTreeMap<usize, Vec<usize>> {
        let hits: DashMap<usize, Vec<usize>> = DashMap::new();

        files.par_iter().enumerate().for_each(|(file_index, file)| {
            for (pattern_index, regex) in compiled.iter().enumerate() {
                let Some(regex) = regex else {
                    continue;
                };
                if regex.is_match(&file.path) {
                    hits.entry(pattern_index).or_default().push(file_index);
                }
            }
        });

        hits.into_iter()
            .map(|(pattern_index, mut matched)| {
                matched.sort_unstable();
                (pattern_index, matched)
            })
            .collect()
    }

    /// Returns the union of the permissions of the owners of `entry`.
    fn granted_permissions(&self, entry: &FileEntry) -> BTreeSet<String> {
        self.ownership
            .owners_of(entry)
            .into_iter()
            .flat_map(|owner| owner.permissions.iter().cloned())
            .collect()
    }
}

/// Compiles `pattern` anchored to the full path. A pattern that does not
/// compile, e.g. because it exceeds the regex size limit, is logged and
/// yields `None`.
fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(&format!("^(?:{pattern})$")) {
        Ok(regex) => Some(regex),
        Err(e) => {
            log::warn!("skipping pattern of {} bytes: {e}", pattern.len());
            None
        }
    }
}
