use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context;
use pathscope::{config::AnalysisConfig, entrypoint::EntryPointSeeds, facts::SnapshotFacts};

use crate::app::InputOptions;

/// Everything `resolve` and `match` read before running the engine.
pub struct Inputs {
    pub facts: SnapshotFacts,
    pub entry_points: Vec<EntryPointSeeds>,
    pub config: AnalysisConfig,
}

/// Load facts, entry points and configuration, applying command line overrides.
pub fn load_inputs(opts: &InputOptions) -> anyhow::Result<Inputs> {
    let facts = SnapshotFacts::from_file(&opts.facts)
        .with_context(|| format!("failed to load facts: {}", opts.facts.display()))?;
    let entry_points: Vec<EntryPointSeeds> = read_json(&opts.entry_points)
        .with_context(|| format!("failed to load entry points: {}", opts.entry_points.display()))?;

    let mut config = match &opts.config {
        Some(path) => read_json(path)
            .with_context(|| format!("failed to load configuration: {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(threads) = opts.threads {
        config = config.with_worker_threads(threads);
    }
    if let Some(max) = opts.max_iterations {
        config = config.with_max_iterations(max);
    }

    log::info!(
        "loaded {} entry points with {} seeds",
        entry_points.len(),
        entry_points.iter().map(|e| e.seeds.len()).sum::<usize>()
    );
    Ok(Inputs {
        facts,
        entry_points,
        config,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
