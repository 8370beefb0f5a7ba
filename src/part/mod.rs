//! The value expression model.
//!
//! Every component of the engine manipulates trees of [`Part`]s: the graph
//! builder materializes them, the cycle collapser and substitution engine splice
//! them together, the simplifier and DNF converter rewrite them, and the matcher
//! compiles them into patterns.
//!
//! # Architecture
//!
//! Parts live in a [`PartArena`] and refer to their children by [`PartId`].
//! Rewriting a node means replacing the content of its slot, so every parent
//! (and every [`Part::Loop`] that points at it) observes the new content without
//! any back-references. The model has one enum variant per value shape and all
//! passes dispatch with an exhaustive `match`.
//!
//! | Variant | Children |
//! |---------|----------|
//! | [`Part::Constant`] | none |
//! | [`Part::Any`] | none |
//! | [`Part::AnyCombo`] | collapsed leaves (display only) |
//! | [`Part::Unknown`] | none |
//! | [`Part::Placeholder`] | none |
//! | [`Part::Append`] | ordered list |
//! | [`Part::Or`] | duplicate-free list |
//! | [`Part::Loop`] | one non-owning reference, never traversed |
//! | [`Part::Wrap`] | one |
//!
//! # Rendering
//!
//! Each part has a full rendering ([`PartArena::display`]), a simple rendering
//! ([`PartArena::simple`]) used in dumps, and a regex rendering
//! ([`PartArena::regex`]) used by the matcher. See [`render`] for the contract.

mod arena;
mod id;
mod placeholder;
pub mod render;
mod tree;
mod wildcard;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

pub use arena::PartArena;
pub use id::{LoopId, PartId};
pub use placeholder::{CallSite, MethodId, PlaceholderKey};
pub use tree::PartTree;
pub use wildcard::{AnyKind, Wildcard, ANY_REGEX, NUMBER_REGEX};

/// The separator character framing non-literal parts in renderings.
pub const SEPARATOR: char = '`';

/// The kind of a literal value.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "snake_case")]
pub enum ConstantKind {
    /// A string literal.
    String,
    /// A 32-bit integer literal.
    Int,
    /// A 64-bit integer literal.
    Long,
    /// A 32-bit float literal.
    Float,
    /// A 64-bit float literal.
    Double,
    /// The null reference.
    Null,
    /// A literal of a type the engine does not model (class constants, method handles, ...).
    Unrecognized,
}

/// A literal value.
///
/// The value is kept in its textual form: that is what ends up in a path, and
/// it keeps `Constant` hashable and totally ordered even for floats.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Constant {
    /// The literal kind.
    pub kind: ConstantKind,
    /// The literal text. Empty for [`ConstantKind::Null`].
    pub value: String,
}

impl Constant {
    /// Creates a string constant.
    pub fn string(value: impl Into<String>) -> Self {
        Constant {
            kind: ConstantKind::String,
            value: value.into(),
        }
    }

    /// Creates an int constant.
    #[must_use]
    pub fn int(value: i32) -> Self {
        Constant {
            kind: ConstantKind::Int,
            value: value.to_string(),
        }
    }

    /// Creates a long constant.
    #[must_use]
    pub fn long(value: i64) -> Self {
        Constant {
            kind: ConstantKind::Long,
            value: value.to_string(),
        }
    }

    /// Creates a float constant.
    #[must_use]
    pub fn float(value: f32) -> Self {
        Constant {
            kind: ConstantKind::Float,
            value: value.to_string(),
        }
    }

    /// Creates a double constant.
    #[must_use]
    pub fn double(value: f64) -> Self {
        Constant {
            kind: ConstantKind::Double,
            value: value.to_string(),
        }
    }

    /// Creates the null constant.
    #[must_use]
    pub fn null() -> Self {
        Constant {
            kind: ConstantKind::Null,
            value: String::new(),
        }
    }

    /// Creates a constant of an unmodelled type, keeping its textual form.
    pub fn unrecognized(value: impl Into<String>) -> Self {
        Constant {
            kind: ConstantKind::Unrecognized,
            value: value.into(),
        }
    }

    /// Returns `true` for the null constant.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.kind == ConstantKind::Null
    }

    /// Returns `true` for constants of an unmodelled type.
    #[must_use]
    pub fn is_unrecognized(&self) -> bool {
        self.kind == ConstantKind::Unrecognized
    }

    /// Returns the text this constant contributes to a concatenated path.
    #[must_use]
    pub fn text(&self) -> &str {
        match self.kind {
            ConstantKind::Null => "null",
            _ => &self.value,
        }
    }

    /// Parses the constant as an integer, if it is numeric.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self.kind {
            ConstantKind::Int | ConstantKind::Long | ConstantKind::String => {
                self.value.trim().parse().ok()
            }
            _ => None,
        }
    }
}

/// A value or statement the graph builder could not classify.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "description", rename_all = "snake_case")]
pub enum Unknown {
    /// A value of an unrecognized shape.
    Value(String),
    /// A placeholder with no defining statement.
    Statement(String),
}

impl Unknown {
    /// Returns the tag used in simple renderings.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Unknown::Value(_) => "VALUE",
            Unknown::Statement(_) => "STMT",
        }
    }

    /// Returns the free-form description.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Unknown::Value(d) | Unknown::Statement(d) => d,
        }
    }
}

/// The kind of a unary wrapper.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum WrapKind {
    /// Path normalization.
    #[strum(serialize = "NORM")]
    Normalize,
    /// Parent directory of the wrapped path.
    #[strum(serialize = "PARENT")]
    Parent,
    /// Final path component of the wrapped path.
    #[strum(serialize = "NAME")]
    Name,
    /// Environment variable lookup of the wrapped name.
    #[strum(serialize = "ENVVAR")]
    EnvVar,
    /// System property lookup of the wrapped name.
    #[strum(serialize = "SYSVAR")]
    SysVar,
}

/// A node of the value expression tree.
///
/// Children are referenced by [`PartId`] into the owning [`PartArena`]. The
/// derived equality is *shallow* (it compares ids); use
/// [`PartArena::same`] for structural equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// A literal value.
    Constant(Constant),
    /// A tagged wildcard.
    Any(Wildcard),
    /// A run of adjacent wildcards collapsed into one. The ids are kept for
    /// display only and are never traversed.
    AnyCombo(Vec<PartId>),
    /// An unclassified value.
    Unknown(Unknown),
    /// A reference to a value awaiting resolution.
    Placeholder(PlaceholderKey),
    /// Ordered concatenation.
    Append(Vec<PartId>),
    /// Union of alternatives.
    Or(Vec<PartId>),
    /// Bounded repetition of an already-known value.
    Loop {
        /// The identity of this loop.
        id: LoopId,
        /// The slot holding the value the loop repeats. `None` once that value
        /// has been simplified away.
        start: Option<PartId>,
    },
    /// A unary wrapper around one child.
    Wrap(WrapKind, PartId),
}

impl Part {
    /// Returns `true` for terminal parts.
    ///
    /// Loops are not terminal, but their body is a non-owning reference and
    /// traversals never descend into it.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Part::Constant(_)
                | Part::Any(_)
                | Part::AnyCombo(_)
                | Part::Unknown(_)
                | Part::Placeholder(_)
        )
    }

    /// Returns `true` for the null constant.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Part::Constant(c) if c.is_null())
    }

    /// Returns `true` for parts that may stand for any string: wildcards,
    /// collapsed wildcard runs, unknowns, unrecognized constants and
    /// placeholders.
    #[must_use]
    pub fn is_opaque(&self) -> bool {
        match self {
            Part::Any(_) | Part::AnyCombo(_) | Part::Unknown(_) | Part::Placeholder(_) => true,
            Part::Constant(c) => c.is_unrecognized(),
            _ => false,
        }
    }

    /// Returns the constant if this part is one.
    #[must_use]
    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Part::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the placeholder key if this part is one.
    #[must_use]
    pub fn as_placeholder(&self) -> Option<&PlaceholderKey> {
        match self {
            Part::Placeholder(key) => Some(key),
            _ => None,
        }
    }
}
