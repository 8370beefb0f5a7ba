// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![warn(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # pathscope
//!
//! A symbolic path-value and policy-matching engine for privileged services.
//!
//! Given privileged entry points and the program locations ("seeds") where they
//! consume filesystem paths, `pathscope` computes an over-approximation of every
//! concrete path that can reach each seed and checks whether the permissions
//! guarding the matched files are enforced by the entry point. Files an entry
//! point can reach without enforcing their permissions are candidate confused
//! deputies.
//!
//! ## Features
//!
//! - **Tree IR** - Values are trees of constants, wildcards, placeholders,
//!   concatenations, unions, wrappers and explicit loops, stored in an arena
//! - **Cycle elimination** - Recursive definitions collapse into loops instead
//!   of being unrolled
//! - **Rewriting** - Fixpoint simplification, DNF conversion and a pipeline of
//!   model-specific rewrites
//! - **Matching** - Anchored regex matching against an ownership database with
//!   permission deltas per entry point
//! - **Parallel** - One task per (entry point, seed) on a bounded rayon pool,
//!   with panics and errors collected per task
//!
//! ## Architecture
//!
//! - [`part`] - The value expression model and its renderings
//! - [`resolve`] - Placeholder graph construction, substitution and cycle collapsing
//! - [`rewrite`] - Simplifier, DNF converter and the rewrite pipeline
//! - [`matching`] - Match-all filtering, matching, redelegation and the match database
//! - [`engine`] - Scheduling of a whole run
//! - [`dump`] - Human-readable dumps of runs and databases
//! - [`facts`], [`ownership`], [`entrypoint`] - Interfaces to the outside world
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use pathscope::prelude::*;
//!
//! let facts = SnapshotFacts::from_file(Path::new("facts.json"))?;
//! let ownership = SnapshotOwnership::from_file(Path::new("fs.json"))?;
//! let inputs: Vec<EntryPointSeeds> =
//!     serde_json::from_reader(std::fs::File::open("entry_points.json")?)?;
//!
//! let engine = Engine::new(&facts, AnalysisConfig::default());
//! let (report, db) = engine.analyze(&inputs, &ownership)?;
//! for (bucket, patterns, files) in db.summary() {
//!     println!("{bucket}: {patterns} patterns, {files} files");
//! }
//! report.status()?;
//! ```
//!
//! ## Error Handling
//!
//! Unrecognized program values degrade to opaque parts and exceeded iteration
//! caps drop a single seed with a warning. Everything else is reported through
//! [`Error`]; task failures are collected in [`engine::RunReport`] without
//! stopping the run.
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,ignore
/// use pathscope::prelude::*;
///
/// let config = AnalysisConfig::minimal();
/// let engine = Engine::new(&facts, config);
/// ```
pub mod prelude;

/// The value expression model.
///
/// Values are trees of [`part::Part`] nodes stored in a [`part::PartArena`] and
/// addressed by [`part::PartId`]. Each tree renders in a full form, a simple
/// form used in dumps and a regex form used for matching.
pub mod part;

/// Resolution of seeds into placeholder-free part trees.
pub mod resolve;

/// Simplification, DNF conversion and model-specific rewrites.
pub mod rewrite;

/// Matching of synthesized patterns against the filesystem image.
pub mod matching;

/// Human-readable dumps.
pub mod dump;

/// Scheduling of analysis runs.
pub mod engine;

/// Bounded cache of per-entry-point scopes.
pub mod cache;

/// Engine configuration.
pub mod config;

/// Program facts supplied by the bytecode-analysis backend.
pub mod facts;

/// Filesystem ownership database.
pub mod ownership;

/// Entry points and seeds.
pub mod entrypoint;

/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
///
/// # Examples
///
/// ```rust,ignore
/// use pathscope::{Result, ownership::SnapshotOwnership};
///
/// fn load(path: &str) -> Result<SnapshotOwnership> {
///     SnapshotOwnership::from_file(std::path::Path::new(path))
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `pathscope` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust,ignore
/// use pathscope::Error;
///
/// match report.status() {
///     Ok(()) => println!("all tasks succeeded"),
///     Err(Error::RunFailed(count)) => println!("{count} tasks failed"),
///     Err(e) => println!("Error: {e}"),
/// }
/// ```
pub use error::Error;
