//! Routing of match-anything alternatives.
//!
//! Some alternatives synthesize patterns that match every file, or a large
//! noisy portion of the image (`/proc/.*`, `/lib/.*`, alternations containing
//! `.*\d+`). Matching them would bury the real findings, so they are moved to
//! the match-all bucket before matching.

use crate::{
    config::AnalysisConfig,
    part::{Part, PartArena, PartId, ANY_REGEX},
};

/// Decides whether an alternative is structurally guaranteed to match
/// anything.
#[derive(Debug, Clone)]
pub struct MatchFilter {
    noisy_patterns: Vec<String>,
}

impl MatchFilter {
    /// Creates a filter using the configured noisy patterns.
    #[must_use]
    pub fn new(config: &AnalysisConfig) -> Self {
        MatchFilter {
            noisy_patterns: config.noisy_patterns.clone(),
        }
    }

    /// Returns `true` if the alternative `id` with the synthesized `pattern`
    /// belongs in the match-all bucket.
    ///
    /// # Arguments
    ///
    /// * `arena` - The arena holding the alternative.
    /// * `id` - The alternative.
    /// * `pattern` - Its regex rendering.
    #[must_use]
    pub fn is_match_all(&self, arena: &PartArena, id: PartId, pattern: &str) -> bool {
        let bare = match arena.get(id) {
            Part::Any(_) | Part::AnyCombo(_) | Part::Unknown(_) | Part::Placeholder(_) => true,
            Part::Constant(c) => c.is_null() || c.is_unrecognized(),
            _ => false,
        };
        bare || Self::is_trivial_pattern(pattern) || self.is_noisy(pattern)
    }

    /// Returns `true` if `pattern` contains one of the noisy fragments.
    #[must_use]
    pub fn is_noisy(&self, pattern: &str) -> bool {
        self.noisy_patterns
            .iter()
            .any(|noisy| pattern.contains(noisy.as_str()))
    }

    /// Returns `true` for patterns made only of wildcards and slashes,
    /// including the empty pattern.
    #[must_use]
    pub fn is_trivial_pattern(pattern: &str) -> bool {
        pattern.replace(ANY_REGEX, "").chars().all(|c| c == '/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::{AnyKind, PartTree, Wildcard};

    fn filter() -> MatchFilter {
        MatchFilter::new(&AnalysisConfig::default())
    }

    #[test]
    fn test_bare_wildcard() {
        let tree = PartTree::build(|arena| arena.any(Wildcard::new(AnyKind::Array)));
        assert!(filter().is_match_all(&tree.arena, tree.root, ".*"));
    }

    #[test]
    fn test_trivial_patterns() {
        assert!(MatchFilter::is_trivial_pattern(""));
        assert!(MatchFilter::is_trivial_pattern(".*"));
        assert!(MatchFilter::is_trivial_pattern(".*/.*"));
        assert!(!MatchFilter::is_trivial_pattern("/data/.*"));
        assert!(!MatchFilter::is_trivial_pattern(r".*\d+"));
    }

    #[test]
    fn test_noisy_patterns() {
        let tree = PartTree::build(|arena| arena.string("/proc/"));
        let f = filter();
        assert!(f.is_match_all(&tree.arena, tree.root, "/proc/.*"));
        assert!(!f.is_match_all(&tree.arena, tree.root, "/data/system/.*"));
    }
}
