//! Rewriting of resolved seed values into matchable form.
//!
//! - [`simplify`]: algebraic normalization to a fixpoint.
//! - [`dnf`]: conversion to a union of concatenations.
//! - [`passes`]: model-specific rewrites (environment defaults, user ids,
//!   parent/name evaluation, constant folding and wildcard collapsing).
//! - [`pipeline`]: the fixed order in which the passes run.

pub mod dnf;
pub mod passes;
pub mod pipeline;
pub mod simplify;

pub use dnf::{is_dnf, to_dnf};
pub use passes::RewritePass;
pub use pipeline::RewritePipeline;
pub use simplify::Simplifier;
