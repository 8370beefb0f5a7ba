use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use pathscope::{
    dump::{write_database_dumps, write_resolution_dumps},
    engine::Engine,
    ownership::SnapshotOwnership,
};

use crate::{
    app::{GlobalOptions, InputOptions},
    commands::common::load_inputs,
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
pub struct BucketSummary {
    pub bucket: String,
    pub patterns: usize,
    pub files: usize,
}

#[derive(Debug, Serialize)]
pub struct RedelegatedFile {
    pub entry_point: String,
    pub pattern: String,
    pub file: String,
    pub missing: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MatchOutput {
    pub entry_points: usize,
    pub buckets: Vec<BucketSummary>,
    pub redelegations: Vec<RedelegatedFile>,
    pub dropped: usize,
    pub failures: Vec<String>,
}

pub fn run(
    inputs: &InputOptions,
    ownership: &Path,
    out: Option<&Path>,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let inputs = load_inputs(inputs)?;
    let ownership = SnapshotOwnership::from_file(ownership)
        .with_context(|| format!("failed to load ownership snapshot: {}", ownership.display()))?;

    let engine = Engine::new(&inputs.facts, inputs.config.clone());
    let (report, db) = engine.analyze(&inputs.entry_points, &ownership)?;

    if let Some(dir) = out {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory: {}", dir.display()))?;
        db.write_json(&dir.join("matches.json"))?;
        write_database_dumps(&db, dir)?;
        write_resolution_dumps(&report.resolutions, dir)?;
        log::info!("results written to {}", dir.display());
    }

    let mut redelegations = Vec::new();
    for record in db.iter() {
        for matches in record.patterns(pathscope::matching::Bucket::Redelegation) {
            for file in matches.files.values() {
                redelegations.push(RedelegatedFile {
                    entry_point: record.entry_point.to_string(),
                    pattern: matches.pattern.clone(),
                    file: file.entry.path.clone(),
                    missing: file.missing.iter().cloned().collect(),
                });
            }
        }
    }

    let output = MatchOutput {
        entry_points: db.len(),
        buckets: db
            .summary()
            .into_iter()
            .map(|(bucket, patterns, files)| BucketSummary {
                bucket: bucket.to_string(),
                patterns,
                files,
            })
            .collect(),
        redelegations,
        dropped: report.dropped,
        failures: report.failures.iter().map(ToString::to_string).collect(),
    };

    print_output(&output, opts, |o| {
        println!("Entry points: {}", o.entry_points);
        println!();
        let mut w = TabWriter::new(vec![
            ("Bucket", Align::Left),
            ("Patterns", Align::Right),
            ("Files", Align::Right),
        ])
        .indent("  ");
        for b in &o.buckets {
            w.row(vec![b.bucket.clone(), b.patterns.to_string(), b.files.to_string()]);
        }
        w.print();

        if !o.redelegations.is_empty() {
            println!();
            println!("Redelegations:");
            let mut w = TabWriter::new(vec![
                ("Entry Point", Align::Left),
                ("File", Align::Left),
                ("Missing", Align::Left),
            ])
            .indent("  ");
            for r in &o.redelegations {
                w.row(vec![r.entry_point.clone(), r.file.clone(), r.missing.join(", ")]);
            }
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
