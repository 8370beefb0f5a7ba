//! Construction of the placeholder resolution graph.
//!
//! Starting from a seed placeholder, the [`GraphBuilder`] asks the
//! [`FactsProvider`] for every statement defining the placeholder's value and
//! turns each classified [`ValueShape`] into a part tree. Placeholders nested
//! in those trees are queued and resolved the same way until the worklist is
//! empty. Nothing is substituted yet: the result is a map from placeholder to
//! its own tree, plus the references between them.

use std::collections::{BTreeSet, VecDeque};

use crate::{
    facts::{Definition, FactsProvider, FileOpKind, Operand, Scope, ValueShape},
    part::{AnyKind, CallSite, PartArena, PartId, PlaceholderKey, Unknown, Wildcard, WrapKind},
    resolve::graph::ResolutionGraph,
    Result,
};

/// Builds a [`ResolutionGraph`] for one seed within one entry point's scope.
pub struct GraphBuilder<'a> {
    facts: &'a dyn FactsProvider,
    scope: &'a Scope,
}

/// Placeholders discovered while materializing one tree.
type Pending = Vec<PlaceholderKey>;

impl<'a> GraphBuilder<'a> {
    /// Creates a builder.
    ///
    /// # Arguments
    ///
    /// * `facts` - Supplies definitions and call-graph edges.
    /// * `scope` - The methods reachable from the current entry point.
    #[must_use]
    pub fn new(facts: &'a dyn FactsProvider, scope: &'a Scope) -> Self {
        GraphBuilder { facts, scope }
    }

    /// Materializes the tree of `seed` and of every placeholder it transitively
    /// references.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::GraphError`] if the finished graph references a
    /// placeholder that was never materialized.
    pub fn build(&self, seed: &PlaceholderKey) -> Result<ResolutionGraph> {
        let mut graph = ResolutionGraph::new(seed.clone());
        let mut queued: BTreeSet<PlaceholderKey> = BTreeSet::new();
        let mut worklist: VecDeque<PlaceholderKey> = VecDeque::new();

        queued.insert(seed.clone());
        worklist.push_back(seed.clone());

        while let Some(key) = worklist.pop_front() {
            let mut pending = Pending::new();
            let root = self.materialize_key(&mut graph.arena, &key, &mut pending);
            graph.insert_tree(key, root);

            for next in pending {
                if queued.insert(next.clone()) {
                    worklist.push_back(next);
                }
            }
        }

        graph.recompute_all()?;
        log::debug!(
            "built resolution graph for {seed}: {} placeholders, {} edges",
            graph.len(),
            graph.edge_count()
        );
        Ok(graph)
    }

    fn materialize_key(
        &self,
        arena: &mut PartArena,
        key: &PlaceholderKey,
        pending: &mut Pending,
    ) -> PartId {
        let definitions = self.facts.candidate_definitions(key, self.scope);
        if definitions.is_empty() {
            return arena.unknown(Unknown::Statement(format!("no definition of {key}")));
        }

        let alternatives: Vec<PartId> = definitions
            .iter()
            .map(|def| self.materialize_definition(arena, def, pending))
            .collect();
        union(arena, alternatives)
    }

    fn materialize_definition(
        &self,
        arena: &mut PartArena,
        def: &Definition,
        pending: &mut Pending,
    ) -> PartId {
        let site = def.site();
        match &def.value {
            ValueShape::Constant { value } => arena.constant(value.clone()),
            ValueShape::Null => arena.null(),
            ValueShape::Concat { alternatives } => {
                if alternatives.is_empty() {
                    return arena.string("");
                }
                let appends: Vec<PartId> = alternatives
                    .iter()
                    .map(|operands| {
                        let children = operands
                            .iter()
                            .map(|op| operand(arena, op, pending))
                            .collect();
                        arena.append(children)
                    })
                    .collect();
                union(arena, appends)
            }
            ValueShape::ArrayRead { listing: Some(base) } => {
                let base = operand(arena, base, pending);
                let slash = arena.string("/");
                let child = arena.any(Wildcard::at(AnyKind::ChildPath, site));
                arena.append(vec![base, slash, child])
            }
            ValueShape::ArrayRead { listing: None } | ValueShape::NewArray => {
                arena.any(Wildcard::at(AnyKind::Array, site))
            }
            ValueShape::FieldRead { field } => self.field_read(arena, field, site, pending),
            ValueShape::CallReturn { site: call } => self.call_return(arena, call, pending),
            ValueShape::Parameter { index } => self.parameter(arena, def, *index, pending),
            ValueShape::PathJoin { parent, child } => {
                let parent = operand(arena, parent, pending);
                let slash = arena.string("/");
                let child = operand(arena, child, pending);
                let joined = arena.append(vec![parent, slash, child]);
                arena.wrap(WrapKind::Normalize, joined)
            }
            ValueShape::BackupPath { path } => {
                let primary = operand(arena, path, pending);
                let backup_base = operand(arena, path, pending);
                let suffix = arena.string(".bak");
                let backup = arena.append(vec![backup_base, suffix]);
                arena.or(vec![primary, backup])
            }
            ValueShape::EnvLookup { name } => {
                let name = operand(arena, name, pending);
                arena.wrap(WrapKind::EnvVar, name)
            }
            ValueShape::SysPropLookup { name } => {
                let name = operand(arena, name, pending);
                arena.wrap(WrapKind::SysVar, name)
            }
            ValueShape::FileOp { op, base } => {
                let base = operand(arena, base, pending);
                match op {
                    FileOpKind::Absolute => {
                        let parent = arena.any(Wildcard::at(AnyKind::ParentPath, site));
                        let slash = arena.string("/");
                        let joined = arena.append(vec![parent, slash, base]);
                        arena.wrap(WrapKind::Normalize, joined)
                    }
                    FileOpKind::Parent => arena.wrap(WrapKind::Parent, base),
                    FileOpKind::Name => arena.wrap(WrapKind::Name, base),
                    FileOpKind::Path => base,
                }
            }
            ValueShape::Arithmetic { ty } => {
                arena.any(Wildcard::at(AnyKind::Number(ty.clone()), site))
            }
            ValueShape::Wildcard { kind } => arena.any(Wildcard::at(kind.clone(), site)),
            ValueShape::Info { name } => {
                arena.any(Wildcard::at(AnyKind::Info(name.clone()), site))
            }
            ValueShape::Unrecognized { description } => {
                log::warn!("unrecognized value at {site}: {description}");
                arena.unknown(Unknown::Value(description.clone()))
            }
        }
    }

    fn field_read(
        &self,
        arena: &mut PartArena,
        field: &str,
        site: CallSite,
        pending: &mut Pending,
    ) -> PartId {
        let writes: Vec<CallSite> = self
            .facts
            .field_writes_of(field)
            .into_iter()
            .filter(|write| self.scope.contains(&write.method))
            .collect();
        if writes.is_empty() {
            return arena.any(Wildcard::at(AnyKind::FieldRef(field.to_string()), site));
        }

        let parts = writes
            .into_iter()
            .map(|write| {
                let key = PlaceholderKey::Field {
                    field: field.to_string(),
                    write,
                };
                pending.push(key.clone());
                arena.placeholder(key)
            })
            .collect();
        union(arena, parts)
    }

    fn call_return(&self, arena: &mut PartArena, call: &CallSite, pending: &mut Pending) -> PartId {
        let callees = self.facts.callees_of(call);
        if callees.is_empty() {
            return arena.any(Wildcard::at(AnyKind::MethodRef, call.clone()));
        }

        let parts = callees
            .into_iter()
            .map(|callee| {
                if self.facts.has_body(&callee) && self.scope.contains(&callee) {
                    let key = PlaceholderKey::Return { method: callee };
                    pending.push(key.clone());
                    arena.placeholder(key)
                } else {
                    arena.any(Wildcard::at(AnyKind::MethodReturn(callee), call.clone()))
                }
            })
            .collect();
        union(arena, parts)
    }

    fn parameter(
        &self,
        arena: &mut PartArena,
        def: &Definition,
        index: u32,
        pending: &mut Pending,
    ) -> PartId {
        if def.method == self.scope.entry {
            return arena.any(Wildcard::at(AnyKind::EntryPointArg(index), def.site()));
        }

        let callers: Vec<CallSite> = self
            .facts
            .callers_of(&def.method)
            .into_iter()
            .filter(|caller| self.scope.contains(&caller.method))
            .collect();
        if callers.is_empty() {
            return arena.unknown(Unknown::Statement(format!(
                "no in-scope caller passes parameter {index} of {}",
                def.method
            )));
        }

        let parts = callers
            .into_iter()
            .map(|site| {
                let key = PlaceholderKey::Argument { site, index };
                pending.push(key.clone());
                arena.placeholder(key)
            })
            .collect();
        union(arena, parts)
    }
}

/// Allocates the part of an operand, queueing placeholders.
fn operand(arena: &mut PartArena, op: &Operand, pending: &mut Pending) -> PartId {
    match op {
        Operand::Placeholder(key) => {
            pending.push(key.clone());
            arena.placeholder(key.clone())
        }
        Operand::Constant(value) => arena.constant(value.clone()),
    }
}

/// A single part stays as is, several become a union.
fn union(arena: &mut PartArena, mut parts: Vec<PartId>) -> PartId {
    if parts.len() == 1 {
        parts.remove(0)
    } else {
        arena.or(parts)
    }
}
