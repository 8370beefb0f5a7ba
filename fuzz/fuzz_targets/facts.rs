#![no_main]

use libfuzzer_sys::fuzz_target;
use pathscope::prelude::*;

// Input layout: a facts snapshot, a NUL byte, then a JSON list of entry
// points with their seeds.
fuzz_target!(|data: &[u8]| {
    let Some(split) = data.iter().position(|b| *b == 0) else {
        let _ = SnapshotFacts::from_reader(data);
        return;
    };
    let Ok(facts) = SnapshotFacts::from_reader(&data[..split]) else {
        return;
    };
    let Ok(inputs) = serde_json::from_slice::<Vec<EntryPointSeeds>>(&data[split + 1..]) else {
        return;
    };
    let config = AnalysisConfig::minimal().with_worker_threads(1);
    let _ = Engine::new(&facts, config).resolve(&inputs);
});
