//! # pathscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the pathscope library.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all pathscope operations
pub use crate::Error;

/// The result type used throughout pathscope
pub use crate::Result;

/// Engine configuration
pub use crate::config::AnalysisConfig;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Run scheduling and results
pub use crate::engine::{Engine, RunReport, SeedResolution, TaskFailure};

/// Dump writers
pub use crate::dump::{write_database_dumps, write_resolution_dumps};

// ================================================================================================
// Inputs
// ================================================================================================

/// Entry points and seeds
pub use crate::entrypoint::{EntryPoint, EntryPointSeeds, Seed};

/// Program facts
pub use crate::facts::{
    Definition, FactsProvider, FileOpKind, Operand, Scope, SnapshotFacts, ValueShape,
};

/// Filesystem image
pub use crate::ownership::{FileEntry, FileKind, FileMode, Owner, OwnershipDatabase, SnapshotOwnership};

// ================================================================================================
// Value Model
// ================================================================================================

/// Parts, arenas and trees
pub use crate::part::{
    AnyKind, CallSite, Constant, MethodId, Part, PartArena, PartId, PartTree, PlaceholderKey,
    Unknown, Wildcard, WrapKind,
};

// ================================================================================================
// Resolution, Rewriting and Matching
// ================================================================================================

/// Resolution
pub use crate::resolve::{resolve_seed, GraphBuilder, ResolutionGraph};

/// Rewriting
pub use crate::rewrite::{RewritePass, RewritePipeline, Simplifier};

/// Matching
pub use crate::matching::{
    Bucket, FileMatch, MatchFilter, Matcher, MatchesDatabase, PatternMatches,
    RedelegationAnalyzer, SeedExpression, Verdict,
};
