//! Program identities and placeholder keys.
//!
//! Placeholders are symbolic references to values that are defined somewhere
//! else in the analyzed program. They are keyed by *value* ([`PlaceholderKey`])
//! rather than by pointer so that cycle detection over the placeholder graph is
//! alias-safe: two occurrences of the same call-site argument always compare
//! equal, no matter which tree they were materialized in.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The identity of a method in the analyzed program, usually its full signature.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodId(pub String);

impl MethodId {
    /// Creates a new method identity from a signature.
    pub fn new(signature: impl Into<String>) -> Self {
        MethodId(signature.into())
    }

    /// Returns the signature string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodId({})", self.0)
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MethodId {
    fn from(value: &str) -> Self {
        MethodId(value.to_string())
    }
}

/// A statement inside a method, identified by its index in the method body.
///
/// Despite the name, a `CallSite` identifies any statement: invocations, field
/// writes and array stores all use it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CallSite {
    /// The method containing the statement.
    pub method: MethodId,
    /// The statement index within the method body.
    pub stmt: u32,
}

impl CallSite {
    /// Creates a new statement identity.
    pub fn new(method: impl Into<MethodId>, stmt: u32) -> Self {
        CallSite {
            method: method.into(),
            stmt,
        }
    }
}

impl From<String> for MethodId {
    fn from(value: String) -> Self {
        MethodId(value)
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.method, self.stmt)
    }
}

/// The stable identity of a placeholder.
///
/// Each variant names the program location whose value the placeholder stands
/// for. Keys are totally ordered so that graph traversal, dumps and results are
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaceholderKey {
    /// Argument `index` passed at an invocation statement.
    Argument {
        /// The invocation statement.
        site: CallSite,
        /// The zero-based argument position.
        index: u32,
    },
    /// The receiver (base object) of an invocation statement.
    Base {
        /// The invocation statement.
        site: CallSite,
    },
    /// The values returned by a method with a body.
    Return {
        /// The returning method.
        method: MethodId,
    },
    /// The value stored by a field write statement.
    Field {
        /// The written field signature.
        field: String,
        /// The write statement.
        write: CallSite,
    },
    /// The value stored into an array slot.
    ArrayElement {
        /// The array store statement.
        site: CallSite,
    },
    /// A method reference value (e.g. a lambda or bound method handle).
    MethodRef {
        /// The statement creating the reference.
        site: CallSite,
    },
}

impl PlaceholderKey {
    /// Returns the method in which the placeholder's location sits, if any.
    ///
    /// For [`PlaceholderKey::Return`] this is the returning method itself.
    #[must_use]
    pub fn source_method(&self) -> &MethodId {
        match self {
            PlaceholderKey::Argument { site, .. }
            | PlaceholderKey::Base { site }
            | PlaceholderKey::ArrayElement { site }
            | PlaceholderKey::MethodRef { site } => &site.method,
            PlaceholderKey::Field { write, .. } => &write.method,
            PlaceholderKey::Return { method } => method,
        }
    }

    /// Returns the short tag used in simple renderings.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            PlaceholderKey::Argument { .. } => "ARG",
            PlaceholderKey::Base { .. } => "BASE",
            PlaceholderKey::Return { .. } => "RETURN",
            PlaceholderKey::Field { .. } => "FIELD",
            PlaceholderKey::ArrayElement { .. } => "ARRAY",
            PlaceholderKey::MethodRef { .. } => "METHODREF",
        }
    }
}

impl fmt::Display for PlaceholderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceholderKey::Argument { site, index } => {
                write!(f, "`PH[ARG={index}, SITE={site}]`")
            }
            PlaceholderKey::Base { site } => write!(f, "`PH[BASE, SITE={site}]`"),
            PlaceholderKey::Return { method } => write!(f, "`PH[RETURN, METHOD={method}]`"),
            PlaceholderKey::Field { field, write } => {
                write!(f, "`PH[FIELD={field}, SITE={write}]`")
            }
            PlaceholderKey::ArrayElement { site } => write!(f, "`PH[ARRAY, SITE={site}]`"),
            PlaceholderKey::MethodRef { site } => write!(f, "`PH[METHODREF, SITE={site}]`"),
        }
    }
}
