//! Matching of synthesized patterns against the filesystem image.
//!
//! - [`MatchFilter`] routes alternatives that would match anything.
//! - [`Matcher`] compiles patterns and matches them against every file entry.
//! - [`RedelegationAnalyzer`] decides whether a matched file is a
//!   confused-deputy candidate for an entry point.
//! - [`MatchesDatabase`] stores the results per entry point and bucket.

mod database;
mod filter;
mod matcher;
mod redelegation;

pub use database::{
    Bucket, EntryPointMatches, FileMatch, MatchesDatabase, PatternMatches, SeedExpression,
};
pub(crate) use database::list;
pub use filter::MatchFilter;
pub use matcher::Matcher;
pub use redelegation::{missing_permissions, RedelegationAnalyzer, Verdict};
