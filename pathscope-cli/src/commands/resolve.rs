use serde::Serialize;

use pathscope::engine::Engine;

use crate::{
    app::{GlobalOptions, InputOptions},
    commands::common::load_inputs,
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
pub struct ResolvedSeed {
    pub entry_point: String,
    pub seed: String,
    pub value: String,
    pub alternatives: Vec<String>,
    pub regexes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveOutput {
    pub resolved: Vec<ResolvedSeed>,
    pub dropped: usize,
    pub failures: Vec<String>,
}

pub fn run(inputs: &InputOptions, opts: &GlobalOptions) -> anyhow::Result<()> {
    let inputs = load_inputs(inputs)?;
    let engine = Engine::new(&inputs.facts, inputs.config.clone());
    let report = engine.resolve(&inputs.entry_points)?;

    let resolved = report
        .resolutions
        .iter()
        .map(|r| {
            let tree = &r.rewritten;
            let alternatives = tree.alternatives();
            ResolvedSeed {
                entry_point: r.entry_point.to_string(),
                seed: r.seed.to_string(),
                value: tree.simple(),
                alternatives: alternatives.iter().map(|a| tree.arena.simple(*a)).collect(),
                regexes: alternatives
                    .iter()
                    .filter_map(|a| tree.arena.regex(*a).ok())
                    .collect(),
            }
        })
        .collect();

    let output = ResolveOutput {
        resolved,
        dropped: report.dropped,
        failures: report.failures.iter().map(ToString::to_string).collect(),
    };

    print_output(&output, opts, |o| {
        let mut current = None;
        let mut writer: Option<TabWriter> = None;
        for seed in &o.resolved {
            if current != Some(&seed.entry_point) {
                if let Some(w) = writer.take() {
                    w.print();
                    println!();
                }
                println!("{}", seed.entry_point);
                current = Some(&seed.entry_point);
                writer = Some(
                    TabWriter::new(vec![("Seed", Align::Left), ("Alternative", Align::Left)])
                        .indent("  "),
                );
            }
            if let Some(w) = writer.as_mut() {
                for alternative in &seed.alternatives {
                    w.row(vec![seed.seed.clone(), alternative.clone()]);
                }
            }
        }
        if let Some(w) = writer {
            w.print();
        }
        println!();
        println!("{}", report.summary());
        for failure in &o.failures {
            println!("  failed: {failure}");
        }
    })?;

    report.status()?;
    Ok(())
}
