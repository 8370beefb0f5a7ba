//! Benchmarks for the rewrite pipeline and end-to-end resolution.
//!
//! - Simplification of wide unions
//! - DNF conversion of a cross product of directory alternatives
//! - The full pass pipeline on a realistic path value
//! - Resolution of a long placeholder chain

extern crate pathscope;

use std::{collections::BTreeSet, hint::black_box};

use criterion::{criterion_group, criterion_main, Criterion};
use pathscope::{prelude::*, rewrite::to_dnf};

const ENTRY: &str = "<com.example.Service: void run()>";

/// A union of `width` distinct string constants, each nested in its own
/// singleton append.
fn wide_union(width: usize) -> PartTree {
    PartTree::build(|arena| {
        let alternatives = (0..width)
            .map(|i| {
                let name = arena.string(format!("/data/f{i}"));
                arena.append(vec![name])
            })
            .collect();
        arena.or(alternatives)
    })
}

/// `/data/{a|b|c|d}/{a|b|c|d}/...` with `depth` levels.
fn cross_product(depth: usize) -> PartTree {
    PartTree::build(|arena| {
        let mut children = vec![arena.string("/data")];
        for _ in 0..depth {
            children.push(arena.string("/"));
            let dirs = ["a", "b", "c", "d"].iter().map(|d| arena.string(*d)).collect();
            children.push(arena.or(dirs));
        }
        arena.append(children)
    })
}

/// `new File(System.getenv("ANDROID_DATA") + "/system/" + userId, name)`
/// with two candidate names.
fn realistic() -> PartTree {
    PartTree::build(|arena| {
        let var = arena.string("ANDROID_DATA");
        let env = arena.wrap(WrapKind::EnvVar, var);
        let system = arena.string("/system/");
        let user = arena.any(Wildcard::new(AnyKind::MethodReturn(MethodId::new(
            "<android.os.UserHandle: int getCallingUserId()>",
        ))));
        let parent = arena.append(vec![env, system, user]);
        let slash = arena.string("/");
        let a = arena.string("accounts.db");
        let b = arena.string("accounts.db-journal");
        let name = arena.or(vec![a, b]);
        let joined = arena.append(vec![parent, slash, name]);
        arena.wrap(WrapKind::Normalize, joined)
    })
}

fn chain_facts(length: usize) -> (SnapshotFacts, Seed) {
    let methods: Vec<String> = (0..length)
        .map(|i| format!("<com.example.Chain: java.lang.String m{i}()>"))
        .collect();
    let ret = |m: &str| PlaceholderKey::Return {
        method: MethodId::new(m),
    };

    let mut facts = SnapshotFacts::new();
    let mut reachable: BTreeSet<MethodId> =
        methods.iter().map(|m| MethodId::new(m.as_str())).collect();
    reachable.insert(MethodId::new(ENTRY));
    facts.set_reachable(ENTRY, reachable);

    for (i, method) in methods.iter().enumerate() {
        let next = methods.get(i + 1).map_or_else(
            || Operand::Constant(Constant::string("/data")),
            |m| Operand::Placeholder(ret(m)),
        );
        facts.add_definition(
            ret(method),
            Definition::new(
                method.as_str(),
                1,
                ValueShape::Concat {
                    alternatives: vec![vec![next, Operand::Constant(Constant::string("/d"))]],
                },
            ),
        );
    }

    (facts, Seed::new(ret(&methods[0])))
}

fn bench_simplify_wide_union(c: &mut Criterion) {
    let tree = wide_union(1_000);

    c.bench_function("simplify_wide_union", |b| {
        b.iter(|| {
            let mut tree = tree.clone();
            Simplifier::default().simplify(&mut tree).unwrap();
            black_box(tree)
        });
    });
}

fn bench_dnf_cross_product(c: &mut Criterion) {
    let tree = cross_product(5);

    c.bench_function("dnf_cross_product_4x5", |b| {
        b.iter(|| {
            let mut tree = tree.clone();
            to_dnf(&mut tree, 100, 10_000).unwrap();
            black_box(tree)
        });
    });
}

fn bench_pipeline_realistic(c: &mut Criterion) {
    let tree = realistic();
    let config = AnalysisConfig::default();
    let pipeline = RewritePipeline::new();

    c.bench_function("pipeline_realistic", |b| {
        b.iter(|| black_box(pipeline.run(black_box(tree.clone()), &config).unwrap()));
    });
}

fn bench_resolve_chain(c: &mut Criterion) {
    let (facts, seed) = chain_facts(100);
    let config = AnalysisConfig::default();
    let scope = Scope::for_entry_point(&facts, &EntryPoint::new(ENTRY, "IChain"), &config);

    c.bench_function("resolve_chain_100", |b| {
        b.iter(|| black_box(resolve_seed(&facts, &scope, black_box(&seed), &config).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_simplify_wide_union,
    bench_dnf_cross_product,
    bench_pipeline_realistic,
    bench_resolve_chain
);
criterion_main!(benches);
