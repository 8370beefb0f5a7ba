//! Termination of resolution on cyclic placeholder graphs.

mod common;

use std::collections::BTreeSet;

use pathscope::{prelude::*, resolve::collapse_cycles};

const A: &str = "<com.example.Paths: java.lang.String a()>";
const B: &str = "<com.example.Paths: java.lang.String b()>";

fn cyclic_facts() -> SnapshotFacts {
    let mut facts = SnapshotFacts::new();
    facts.set_reachable(
        common::SERVICE,
        BTreeSet::from([
            MethodId::new(common::SERVICE),
            MethodId::new(A),
            MethodId::new(B),
        ]),
    );
    facts.add_definition(
        common::ret(A),
        Definition::new(
            A,
            1,
            ValueShape::Constant {
                value: Constant::string("/root"),
            },
        ),
    );
    facts.add_definition(
        common::ret(A),
        Definition::new(
            A,
            2,
            ValueShape::Concat {
                alternatives: vec![vec![
                    Operand::Placeholder(common::ret(B)),
                    common::text("/a"),
                ]],
            },
        ),
    );
    facts.add_definition(
        common::ret(B),
        Definition::new(
            B,
            1,
            ValueShape::Concat {
                alternatives: vec![vec![
                    Operand::Placeholder(common::ret(A)),
                    common::text("/b"),
                ]],
            },
        ),
    );
    facts
}

fn scope(facts: &SnapshotFacts) -> Scope {
    Scope::for_entry_point(
        facts,
        &EntryPoint::new(common::SERVICE, "IStub"),
        &AnalysisConfig::default(),
    )
}

#[test]
fn test_mutual_recursion_collapses() {
    let facts = cyclic_facts();
    let scope = scope(&facts);
    let mut graph = GraphBuilder::new(&facts, &scope)
        .build(&common::ret(A))
        .unwrap();
    assert!(graph.has_edges());

    assert!(collapse_cycles(&mut graph, 100).unwrap());
    assert!(!graph.has_edges());
    assert!(graph.arena.placeholders_in(graph.seed_tree().unwrap()).is_empty());
}

#[test]
fn test_cyclic_seed_resolves_through_engine() {
    let facts = cyclic_facts();
    let inputs = vec![EntryPointSeeds {
        entry_point: EntryPoint::new(common::SERVICE, "IStub"),
        seeds: vec![Seed::new(common::ret(A))],
    }];
    let report = Engine::new(&facts, AnalysisConfig::default())
        .resolve(&inputs)
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.resolutions.len(), 1);
    let resolution = &report.resolutions[0];
    assert!(resolution.resolved.display().contains("LOOP[ID="));
    assert!(resolution.rewritten.simple().contains("/root"));
}

#[test]
fn test_long_chain_terminates() {
    let mut facts = SnapshotFacts::new();
    let methods: Vec<String> = (0..200)
        .map(|i| format!("<com.example.Chain: java.lang.String m{i}()>"))
        .collect();
    let mut reachable: BTreeSet<MethodId> = methods.iter().map(|m| MethodId::new(m.as_str())).collect();
    reachable.insert(MethodId::new(common::SERVICE));
    facts.set_reachable(common::SERVICE, reachable);

    for (i, method) in methods.iter().enumerate() {
        let next = methods.get(i + 1).map_or_else(
            || common::text("/end"),
            |m| Operand::Placeholder(common::ret(m)),
        );
        facts.add_definition(
            common::ret(method),
            Definition::new(
                method.as_str(),
                1,
                ValueShape::Concat {
                    alternatives: vec![vec![next, common::text("/x")]],
                },
            ),
        );
    }

    let scope = scope(&facts);
    let tree = resolve_seed(&facts, &scope, &Seed::new(common::ret(&methods[0])), &AnalysisConfig::default())
        .unwrap()
        .unwrap();
    let rewritten = RewritePipeline::new()
        .run(tree, &AnalysisConfig::default())
        .unwrap()
        .unwrap();
    assert!(rewritten.simple().starts_with("/end/x/x"));
}
