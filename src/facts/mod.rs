//! Program facts consumed by the graph builder.
//!
//! The engine does not analyze bytecode itself. It asks a [`FactsProvider`] for
//! the statements that define a placeholder's value, for call-graph edges and
//! for the set of methods reachable from an entry point. The classification of
//! each defining statement is handed over as a [`ValueShape`], which the graph
//! builder turns into parts.
//!
//! [`SnapshotFacts`] is an in-memory provider loaded from JSON.

mod snapshot;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
    config::AnalysisConfig,
    entrypoint::EntryPoint,
    part::{AnyKind, CallSite, Constant, MethodId, PlaceholderKey},
};

pub use snapshot::{CallRecord, DefinitionRecord, FactsSnapshot, ReachableRecord, SnapshotFacts};

/// The operand of a value shape: either another placeholder to resolve or a
/// literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// A value defined elsewhere.
    Placeholder(PlaceholderKey),
    /// A literal.
    Constant(Constant),
}

/// Which component of a file object a `FileOp` extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FileOpKind {
    /// The absolute path.
    Absolute,
    /// The parent directory.
    Parent,
    /// The final component.
    Name,
    /// The path as given.
    Path,
}

/// The classified shape of a value-producing statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ValueShape {
    /// A literal.
    Constant {
        /// The literal value.
        value: Constant,
    },
    /// The null reference.
    Null,
    /// The result of a string builder: every alternative is one possible
    /// sequence of appended operands.
    Concat {
        /// The possible operand sequences.
        alternatives: Vec<Vec<Operand>>,
    },
    /// An element read from an array. `listing` is the directory whose
    /// children the array holds, when the array came from a listing call.
    ArrayRead {
        /// The listed directory, if any.
        #[serde(default)]
        listing: Option<Operand>,
    },
    /// A freshly allocated array.
    NewArray,
    /// A read of a field.
    FieldRead {
        /// The field signature.
        field: String,
    },
    /// The return value of an invocation.
    CallReturn {
        /// The invocation statement.
        site: CallSite,
    },
    /// A parameter of the defining method.
    Parameter {
        /// The zero-based parameter position.
        index: u32,
    },
    /// A path constructed from a parent and a child.
    PathJoin {
        /// The parent path.
        parent: Operand,
        /// The child path.
        child: Operand,
    },
    /// A path or its backup file (`<path>.bak`).
    BackupPath {
        /// The primary path.
        path: Operand,
    },
    /// An environment variable lookup.
    EnvLookup {
        /// The variable name.
        name: Operand,
    },
    /// A system property lookup.
    SysPropLookup {
        /// The property name.
        name: Operand,
    },
    /// A component of a file object.
    FileOp {
        /// The extracted component.
        op: FileOpKind,
        /// The file object.
        base: Operand,
    },
    /// The result of arithmetic on primitives.
    Arithmetic {
        /// The primitive type name, e.g. `INT`.
        ty: String,
    },
    /// A value known only by category.
    Wildcard {
        /// The value category.
        kind: AnyKind,
    },
    /// Named contextual information, e.g. a package name.
    Info {
        /// The information name.
        name: String,
    },
    /// A shape the backend could not classify.
    Unrecognized {
        /// A description of the statement.
        description: String,
    },
}

/// One statement defining a placeholder's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    /// The method containing the statement.
    pub method: MethodId,
    /// The statement index.
    pub stmt: u32,
    /// The classified produced value.
    pub value: ValueShape,
}

impl Definition {
    /// Creates a definition.
    pub fn new(method: impl Into<MethodId>, stmt: u32, value: ValueShape) -> Self {
        Definition {
            method: method.into(),
            stmt,
            value,
        }
    }

    /// Returns the statement as a [`CallSite`].
    #[must_use]
    pub fn site(&self) -> CallSite {
        CallSite::new(self.method.clone(), self.stmt)
    }
}

/// The methods an entry point may execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// The entry point's implementation.
    pub entry: MethodId,
    /// Reachable methods, minus configured exclusions. Always contains `entry`.
    pub methods: BTreeSet<MethodId>,
}

impl Scope {
    /// Computes the scope of `entry_point`.
    ///
    /// # Arguments
    ///
    /// * `facts` - The facts provider supplying reachability.
    /// * `entry_point` - The entry point.
    /// * `config` - Supplies `excluded_methods`.
    pub fn for_entry_point(
        facts: &dyn FactsProvider,
        entry_point: &EntryPoint,
        config: &AnalysisConfig,
    ) -> Self {
        let mut methods: BTreeSet<MethodId> = facts
            .reachable_methods(entry_point)
            .into_iter()
            .filter(|m| !config.excluded_methods.contains(m.as_str()))
            .collect();
        methods.insert(entry_point.implementation.clone());
        Scope {
            entry: entry_point.implementation.clone(),
            methods,
        }
    }

    /// Returns `true` if `method` is in scope.
    #[must_use]
    pub fn contains(&self, method: &MethodId) -> bool {
        self.methods.contains(method)
    }
}

/// The bytecode-analysis backend.
///
/// All methods must be safe to call concurrently from the worker pool.
pub trait FactsProvider: Send + Sync {
    /// Returns the in-scope statements defining the value of `key`.
    ///
    /// # Arguments
    ///
    /// * `key` - The placeholder being resolved.
    /// * `scope` - The methods of the current entry point.
    fn candidate_definitions(&self, key: &PlaceholderKey, scope: &Scope) -> Vec<Definition>;

    /// Returns the possible targets of the invocation at `site`.
    fn callees_of(&self, site: &CallSite) -> Vec<MethodId>;

    /// Returns the invocation statements targeting `method`.
    fn callers_of(&self, method: &MethodId) -> Vec<CallSite>;

    /// Returns the statements writing `field`.
    fn field_writes_of(&self, field: &str) -> Vec<CallSite>;

    /// Returns `false` for methods without an analyzable body (native,
    /// abstract or library methods).
    fn has_body(&self, _method: &MethodId) -> bool {
        true
    }

    /// Returns the methods reachable from `entry_point`.
    fn reachable_methods(&self, entry_point: &EntryPoint) -> BTreeSet<MethodId>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_shape_json() {
        let shape: ValueShape = serde_json::from_str(
            r#"{"shape": "path_join",
                "parent": {"constant": {"kind": "string", "value": "/data"}},
                "child": {"placeholder": {"kind": "return", "method": "<A: java.lang.String n()>"}}}"#,
        )
        .unwrap();
        let ValueShape::PathJoin { parent, child } = shape else {
            panic!("expected path join");
        };
        assert_eq!(parent, Operand::Constant(Constant::string("/data")));
        assert!(matches!(child, Operand::Placeholder(PlaceholderKey::Return { .. })));
    }

    #[test]
    fn test_file_op_kind_strings() {
        assert_eq!(FileOpKind::Absolute.to_string(), "absolute");
        assert_eq!("name".parse::<FileOpKind>().unwrap(), FileOpKind::Name);
    }
}
