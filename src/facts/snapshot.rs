//! An in-memory facts provider.
//!
//! A [`FactsSnapshot`] is the serialized form: plain lists that are easy to
//! write by hand or export from an analysis backend. [`SnapshotFacts`] indexes
//! a snapshot for lookup.
//!
//! ```json
//! {
//!   "definitions": [
//!     {"key": {"kind": "return", "method": "<A: java.lang.String p()>"},
//!      "definitions": [{"method": "<A: java.lang.String p()>", "stmt": 3,
//!                       "value": {"shape": "constant", "value": {"kind": "string", "value": "/data"}}}]}
//!   ],
//!   "calls": [{"site": {"method": "<A: void f()>", "stmt": 1}, "callees": ["<A: java.lang.String p()>"]}],
//!   "reachable": [{"entry": "<A: void f()>", "methods": ["<A: java.lang.String p()>"]}],
//!   "bodiless": []
//! }
//! ```

use std::{
    collections::BTreeSet,
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    entrypoint::EntryPoint,
    facts::{Definition, FactsProvider, Scope},
    part::{CallSite, MethodId, PlaceholderKey},
    Result,
};

/// The definitions recorded for one placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionRecord {
    /// The placeholder.
    pub key: PlaceholderKey,
    /// Its defining statements.
    pub definitions: Vec<Definition>,
}

/// The targets of one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    /// The invocation statement.
    pub site: CallSite,
    /// Its possible targets.
    pub callees: Vec<MethodId>,
}

/// The reachable methods of one entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReachableRecord {
    /// The entry point's implementation.
    pub entry: MethodId,
    /// Methods reachable from it.
    pub methods: BTreeSet<MethodId>,
}

/// Serialized facts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FactsSnapshot {
    /// Definitions by placeholder.
    pub definitions: Vec<DefinitionRecord>,
    /// Call-graph edges.
    pub calls: Vec<CallRecord>,
    /// Reachability by entry point.
    pub reachable: Vec<ReachableRecord>,
    /// Methods without an analyzable body.
    pub bodiless: BTreeSet<MethodId>,
}

/// An indexed [`FactsSnapshot`].
///
/// # Examples
///
/// ```rust,ignore
/// use pathscope::facts::{SnapshotFacts, ValueShape, Definition};
///
/// let mut facts = SnapshotFacts::new();
/// facts.add_definition(key.clone(), Definition::new("<A: void f()>", 2, ValueShape::Null));
/// facts.add_call(CallSite::new("<A: void f()>", 1), "<A: java.lang.String p()>");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SnapshotFacts {
    definitions: FxHashMap<PlaceholderKey, Vec<Definition>>,
    callees: FxHashMap<CallSite, Vec<MethodId>>,
    callers: FxHashMap<MethodId, Vec<CallSite>>,
    field_writes: FxHashMap<String, Vec<CallSite>>,
    reachable: FxHashMap<MethodId, BTreeSet<MethodId>>,
    bodiless: BTreeSet<MethodId>,
}

impl SnapshotFacts {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: FactsSnapshot) -> Self {
        let mut facts = SnapshotFacts::new();
        for record in snapshot.definitions {
            for definition in record.definitions {
                facts.add_definition(record.key.clone(), definition);
            }
        }
        for record in snapshot.calls {
            for callee in record.callees {
                facts.add_call(record.site.clone(), callee);
            }
        }
        for record in snapshot.reachable {
            facts.set_reachable(record.entry, record.methods);
        }
        facts.bodiless = snapshot.bodiless;
        facts
    }

    /// Reads a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] if the document is invalid.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let snapshot: FactsSnapshot = serde_json::from_reader(reader)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Reads a JSON snapshot from a file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be opened and
    /// [`crate::Error::Serialization`] if it is not a valid snapshot.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Records a definition of `key`. Definitions of field placeholders also
    /// register the field write.
    pub fn add_definition(&mut self, key: PlaceholderKey, definition: Definition) {
        if let PlaceholderKey::Field { field, write } = &key {
            let writes = self.field_writes.entry(field.clone()).or_default();
            if !writes.contains(write) {
                writes.push(write.clone());
            }
        }
        self.definitions.entry(key).or_default().push(definition);
    }

    /// Records a call-graph edge.
    pub fn add_call(&mut self, site: CallSite, callee: impl Into<MethodId>) {
        let callee = callee.into();
        let callers = self.callers.entry(callee.clone()).or_default();
        if !callers.contains(&site) {
            callers.push(site.clone());
        }
        let callees = self.callees.entry(site).or_default();
        if !callees.contains(&callee) {
            callees.push(callee);
        }
    }

    /// Sets the methods reachable from the entry point implemented by `entry`.
    pub fn set_reachable(&mut self, entry: impl Into<MethodId>, methods: BTreeSet<MethodId>) {
        self.reachable.insert(entry.into(), methods);
    }

    /// Marks `method` as having no analyzable body.
    pub fn mark_bodiless(&mut self, method: impl Into<MethodId>) {
        self.bodiless.insert(method.into());
    }
}

impl FactsProvider for SnapshotFacts {
    fn candidate_definitions(&self, key: &PlaceholderKey, scope: &Scope) -> Vec<Definition> {
        self.definitions
            .get(key)
            .map(|defs| {
                defs.iter()
                    .filter(|d| scope.contains(&d.method))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn callees_of(&self, site: &CallSite) -> Vec<MethodId> {
        self.callees.get(site).cloned().unwrap_or_default()
    }

    fn callers_of(&self, method: &MethodId) -> Vec<CallSite> {
        self.callers.get(method).cloned().unwrap_or_default()
    }

    fn field_writes_of(&self, field: &str) -> Vec<CallSite> {
        self.field_writes.get(field).cloned().unwrap_or_default()
    }

    fn has_body(&self, method: &MethodId) -> bool {
        !self.bodiless.contains(method)
    }

    fn reachable_methods(&self, entry_point: &EntryPoint) -> BTreeSet<MethodId> {
        self.reachable
            .get(&entry_point.implementation)
            .cloned()
            .unwrap_or_default()
    }
}
