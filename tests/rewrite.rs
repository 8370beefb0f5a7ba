//! Algebraic properties of the simplifier, the DNF converter and the rewrite
//! pipeline.

use pathscope::{
    prelude::*,
    rewrite::{is_dnf, to_dnf},
};

/// Builds a moderately nested tree mixing every structural part kind.
fn nested() -> PartTree {
    PartTree::build(|arena| {
        let data = arena.string("/data/");
        let system = arena.string("system");
        let misc = arena.string("misc");
        let empty = arena.or(Vec::new());
        let dirs = arena.or(vec![system, misc, empty]);
        let slash = arena.string("/");
        let user = arena.any(Wildcard::new(AnyKind::UserId));
        let inner = arena.append(vec![slash, user]);
        let n = arena.null();
        let name = arena.string("/a.db");
        let alt_name = arena.string("/b.db");
        let names = arena.or(vec![name, n, alt_name]);
        let parent = arena.wrap(WrapKind::Parent, names);
        let tail = arena.append(vec![inner, parent]);
        let single = arena.or(vec![tail]);
        arena.append(vec![data, dirs, single])
    })
}

#[test]
fn test_simplify_is_idempotent() {
    let mut once = nested();
    Simplifier::default().simplify(&mut once).unwrap();
    let mut twice = once.clone();
    let changed = Simplifier::default().simplify(&mut twice).unwrap();
    assert!(!changed);
    assert!(once.same_as(&twice));
}

#[test]
fn test_simplify_laws() {
    let mut single_or = PartTree::build(|arena| {
        let a = arena.string("/a");
        arena.or(vec![a])
    });
    Simplifier::default().simplify(&mut single_or).unwrap();
    assert_eq!(single_or.simple(), "/a");

    let mut empty_or = PartTree::build(|arena| arena.or(Vec::new()));
    Simplifier::default().simplify(&mut empty_or).unwrap();
    assert!(empty_or.root_part().is_null());

    let mut single_append = PartTree::build(|arena| {
        let a = arena.string("/a");
        arena.append(vec![a])
    });
    Simplifier::default().simplify(&mut single_append).unwrap();
    assert_eq!(single_append.simple(), "/a");
}

#[test]
fn test_flattening_is_associative() {
    let build = |left_nested: bool| {
        PartTree::build(|arena| {
            let a = arena.string("a");
            let b = arena.string("b");
            let c = arena.string("c");
            if left_nested {
                let ab = arena.append(vec![a, b]);
                arena.append(vec![ab, c])
            } else {
                let bc = arena.append(vec![b, c]);
                arena.append(vec![a, bc])
            }
        })
    };
    let mut left = build(true);
    let mut right = build(false);
    Simplifier::default().simplify(&mut left).unwrap();
    Simplifier::default().simplify(&mut right).unwrap();
    assert!(left.same_as(&right));
    assert_eq!(left.simple(), "{a + b + c}");
}

#[test]
fn test_dnf_post_condition() {
    let mut tree = nested();
    Simplifier::default().simplify(&mut tree).unwrap();
    to_dnf(&mut tree, 100, 10_000).unwrap();
    assert!(is_dnf(&tree.arena, tree.root));

    for alternative in tree.alternatives() {
        if let Part::Append(children) = tree.arena.get(alternative) {
            assert!(children
                .iter()
                .all(|c| !matches!(tree.arena.get(*c), Part::Append(_) | Part::Or(_))));
        }
    }
    // two directories times two file names below the parent wrapper
    assert_eq!(tree.alternatives().len(), 4);
}

#[test]
fn test_pipeline_output_is_dnf_and_stable() {
    let config = AnalysisConfig::default();
    let pipeline = RewritePipeline::new();
    let once = pipeline.run(nested(), &config).unwrap().unwrap();
    assert!(is_dnf(&once.arena, once.root));
    let simple = once.simple();
    assert!(simple.contains("/data/system"));
    assert!(simple.contains("/data/misc"));

    let twice = pipeline.run(once.clone(), &config).unwrap().unwrap();
    assert_eq!(once.simple(), twice.simple());
}

#[test]
fn test_pipeline_keeps_deep_trees() {
    // 110 levels alternating a concatenation and a union
    let tree = PartTree::build(|arena| {
        let mut node = arena.string("/s");
        for level in 0..110 {
            node = if level % 2 == 0 {
                let x = arena.string("/x");
                arena.append(vec![node, x])
            } else {
                let y = arena.string("/y");
                arena.or(vec![node, y])
            };
        }
        node
    });

    let rewritten = RewritePipeline::new()
        .run(tree, &AnalysisConfig::default())
        .unwrap()
        .unwrap();
    assert!(is_dnf(&rewritten.arena, rewritten.root));
    assert_eq!(rewritten.alternatives().len(), 56);
}
