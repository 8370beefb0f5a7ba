//! The analysis engine.
//!
//! The [`Engine`] schedules one task per (entry point, seed) on a bounded
//! rayon pool. Each task computes the entry point's [`Scope`], resolves the
//! seed and runs the [`RewritePipeline`] over the result. Matching then runs
//! on the same pool.
//!
//! # Failure Handling
//!
//! Tasks never stop each other. A task that returns an error or panics is
//! logged and recorded in [`RunReport::failures`]; a task hitting an
//! iteration cap is counted in [`RunReport::dropped`]. Successful results are
//! always kept, and [`RunReport::status`] reports whether anything failed.
//!
//! # Example
//!
//! ```rust,ignore
//! use pathscope::prelude::*;
//!
//! let facts = SnapshotFacts::from_file(Path::new("facts.json"))?;
//! let ownership = SnapshotOwnership::from_file(Path::new("fs.json"))?;
//! let engine = Engine::new(&facts, AnalysisConfig::default());
//!
//! let (report, db) = engine.analyze(&inputs, &ownership)?;
//! println!("{}", report.summary());
//! report.status()?;
//! ```

use std::{
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use rayon::prelude::*;

use crate::{
    cache::ContextCache,
    config::AnalysisConfig,
    entrypoint::{EntryPoint, EntryPointSeeds, Seed},
    facts::{FactsProvider, Scope},
    matching::{Matcher, MatchesDatabase},
    ownership::OwnershipDatabase,
    part::PartTree,
    resolve::resolve_seed,
    rewrite::RewritePipeline,
    Error, Result,
};

/// The outcome of one successful task.
#[derive(Debug, Clone)]
pub struct SeedResolution {
    /// The entry point the seed was resolved for.
    pub entry_point: EntryPoint,
    /// The seed.
    pub seed: Seed,
    /// The resolved value, before rewriting.
    pub resolved: PartTree,
    /// The rewritten value, in DNF.
    pub rewritten: PartTree,
}

/// A task that returned an error or panicked.
#[derive(Debug)]
pub struct TaskFailure {
    /// The entry point of the task.
    pub entry_point: EntryPoint,
    /// The seed of the task.
    pub seed: Seed,
    /// What went wrong, as [`Error::TaskFailed`].
    pub error: Error,
    /// `true` if the task panicked.
    pub panicked: bool,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.panicked {
            write!(f, "panic: {}", self.error)
        } else {
            write!(f, "{}", self.error)
        }
    }
}

/// The results of a resolution run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Resolved seeds, sorted by entry point and seed.
    pub resolutions: Vec<SeedResolution>,
    /// Failed tasks, sorted by entry point and seed.
    pub failures: Vec<TaskFailure>,
    /// Seeds dropped because an iteration cap was reached.
    pub dropped: usize,
    /// Number of tasks run.
    pub tasks: usize,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
}

impl RunReport {
    /// Returns `true` if no task failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns the run status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunFailed`] with the number of failed tasks if any
    /// task failed.
    pub fn status(&self) -> Result<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(Error::RunFailed(self.failures.len()))
        }
    }

    /// Returns a one-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} tasks: {} resolved, {} dropped, {} failed in {:.2?}",
            self.tasks,
            self.resolutions.len(),
            self.dropped,
            self.failures.len(),
            self.elapsed
        )
    }
}

/// Drives resolution, rewriting and matching.
pub struct Engine<'a> {
    facts: &'a dyn FactsProvider,
    config: AnalysisConfig,
    pipeline: RewritePipeline,
}

impl<'a> Engine<'a> {
    /// Creates an engine with the default rewrite pipeline.
    #[must_use]
    pub fn new(facts: &'a dyn FactsProvider, config: AnalysisConfig) -> Self {
        Engine {
            facts,
            config,
            pipeline: RewritePipeline::new(),
        }
    }

    /// Replaces the rewrite pipeline.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: RewritePipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Resolves and rewrites every seed of every entry point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Error`] if the worker pool cannot be created. Task
    /// failures are reported in the [`RunReport`], not as an error.
    pub fn resolve(&self, inputs: &[EntryPointSeeds]) -> Result<RunReport> {
        let pool = self.build_pool()?;
        Ok(pool.install(|| self.resolve_in_pool(inputs)))
    }

    /// Resolves every seed, then matches the results against `ownership`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Error`] if the worker pool cannot be created and
    /// [`Error::Regex`] if a synthesized pattern does not compile.
    pub fn analyze(
        &self,
        inputs: &[EntryPointSeeds],
        ownership: &dyn OwnershipDatabase,
    ) -> Result<(RunReport, MatchesDatabase)> {
        let pool = self.build_pool()?;
        pool.install(|| {
            let report = self.resolve_in_pool(inputs);
            let db = Matcher::new(ownership, &self.config).run(&report.resolutions)?;
            log::info!("matched {} entry points", db.len());
            Ok((report, db))
        })
    }

    fn build_pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.effective_workers())
            .thread_name(|i| format!("pathscope-worker-{i}"))
            .build()
            .map_err(|e| Error::Error(format!("failed to build worker pool: {e}")))
    }

    fn resolve_in_pool(&self, inputs: &[EntryPointSeeds]) -> RunReport {
        let start = Instant::now();
        let cache = ContextCache::new(self.config.effective_workers());
        let results = boxcar::Vec::new();
        let failures = boxcar::Vec::new();
        let dropped = AtomicUsize::new(0);

        let tasks: Vec<(&EntryPoint, &Seed)> = inputs
            .iter()
            .flat_map(|input| input.seeds.iter().map(move |seed| (&input.entry_point, seed)))
            .collect();

        tasks.par_iter().for_each(|&(entry_point, seed)| {
            let outcome = catch_unwind(AssertUnwindSafe(|| self.run_task(&cache, entry_point, seed)));
            match outcome {
                Ok(Ok(Some(resolution))) => {
                    results.push(resolution);
                }
                Ok(Ok(None)) => {
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Err(error)) => {
                    log::warn!("task {entry_point} / {seed} failed: {error}");
                    failures.push(task_failure(entry_point, seed, error.to_string(), false));
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    log::warn!("task {entry_point} / {seed} panicked: {message}");
                    failures.push(task_failure(entry_point, seed, message, true));
                }
            }
        });

        let mut resolutions: Vec<SeedResolution> = results.into_iter().collect();
        resolutions.sort_by(|a, b| (&a.entry_point, &a.seed).cmp(&(&b.entry_point, &b.seed)));
        let mut failures: Vec<TaskFailure> = failures.into_iter().collect();
        failures.sort_by(|a, b| (&a.entry_point, &a.seed).cmp(&(&b.entry_point, &b.seed)));

        let report = RunReport {
            resolutions,
            failures,
            dropped: dropped.into_inner(),
            tasks: tasks.len(),
            elapsed: start.elapsed(),
        };
        log::info!("{}", report.summary());
        report
    }

    /// Resolves and rewrites one seed.
    fn run_task(
        &self,
        cache: &ContextCache,
        entry_point: &EntryPoint,
        seed: &Seed,
    ) -> Result<Option<SeedResolution>> {
        let scope = cache.get_or_insert_with(entry_point, || {
            Scope::for_entry_point(self.facts, entry_point, &self.config)
        })?;

        let Some(resolved) = resolve_seed(self.facts, &scope, seed, &self.config)? else {
            return Ok(None);
        };
        log::debug!("{entry_point} / {seed} resolved to {}", resolved.simple());

        let rewritten = match self.pipeline.run(resolved.clone(), &self.config) {
            Ok(Some(tree)) => tree,
            Ok(None) => return Ok(None),
            Err(e) => {
                log::debug!("rewriting failed for {}", resolved.display());
                return Err(e);
            }
        };

        Ok(Some(SeedResolution {
            entry_point: entry_point.clone(),
            seed: seed.clone(),
            resolved,
            rewritten,
        }))
    }
}

fn task_failure(entry_point: &EntryPoint, seed: &Seed, message: String, panicked: bool) -> TaskFailure {
    TaskFailure {
        entry_point: entry_point.clone(),
        seed: seed.clone(),
        error: Error::TaskFailed {
            entry_point: entry_point.to_string(),
            seed: seed.to_string(),
            message,
        },
        panicked,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::{
        facts::{Definition, Operand, SnapshotFacts, ValueShape},
        part::{CallSite, Constant, MethodId, PlaceholderKey},
    };

    const ENTRY: &str = "<Svc: void entry()>";

    fn facts() -> SnapshotFacts {
        let mut facts = SnapshotFacts::new();
        facts.set_reachable(ENTRY, BTreeSet::from([MethodId::new(ENTRY)]));
        facts.add_definition(
            seed_key(1),
            Definition::new(
                ENTRY,
                1,
                ValueShape::Constant {
                    value: Constant::string("/data/system/x"),
                },
            ),
        );
        facts
    }

    fn seed_key(stmt: u32) -> PlaceholderKey {
        PlaceholderKey::Argument {
            site: CallSite::new(ENTRY, stmt),
            index: 0,
        }
    }

    fn inputs(seeds: Vec<Seed>) -> Vec<EntryPointSeeds> {
        vec![EntryPointSeeds {
            entry_point: EntryPoint::new(ENTRY, "ISvc$Stub"),
            seeds,
        }]
    }

    /// A facts provider that panics on every query.
    struct PanickingFacts;

    impl FactsProvider for PanickingFacts {
        fn candidate_definitions(&self, _: &PlaceholderKey, _: &Scope) -> Vec<Definition> {
            panic!("backend crashed")
        }
        fn callees_of(&self, _: &CallSite) -> Vec<MethodId> {
            Vec::new()
        }
        fn callers_of(&self, _: &MethodId) -> Vec<CallSite> {
            Vec::new()
        }
        fn field_writes_of(&self, _: &str) -> Vec<CallSite> {
            Vec::new()
        }
        fn reachable_methods(&self, _: &EntryPoint) -> BTreeSet<MethodId> {
            BTreeSet::new()
        }
    }

    #[test]
    fn test_resolve_run() {
        let facts = facts();
        let engine = Engine::new(&facts, AnalysisConfig::default().with_worker_threads(2));
        let report = engine
            .resolve(&inputs(vec![Seed::new(seed_key(1)), Seed::new(seed_key(2))]))
            .unwrap();

        assert!(report.status().is_ok());
        assert_eq!(report.tasks, 2);
        assert_eq!(report.resolutions.len(), 2);
        assert_eq!(report.resolutions[0].rewritten.simple(), "/data/system/x");
        assert!(report.resolutions[1].rewritten.simple().contains("UNKNOWN"));
    }

    #[test]
    fn test_panic_is_collected() {
        let engine = Engine::new(&PanickingFacts, AnalysisConfig::default().with_worker_threads(1));
        let report = engine.resolve(&inputs(vec![Seed::new(seed_key(1))])).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].panicked);
        assert!(matches!(report.status(), Err(Error::RunFailed(1))));
        assert!(report.failures[0].to_string().contains("backend crashed"));
    }

    #[test]
    fn test_cap_drops_seed() {
        let mut facts = facts();
        facts.add_definition(
            seed_key(3),
            Definition::new(
                ENTRY,
                3,
                ValueShape::Concat {
                    alternatives: vec![vec![
                        Operand::Placeholder(seed_key(3)),
                        Operand::Constant(Constant::string("/x")),
                    ]],
                },
            ),
        );
        let engine = Engine::new(&facts, AnalysisConfig::default().with_max_iterations(0));
        let report = engine.resolve(&inputs(vec![Seed::new(seed_key(3))])).unwrap();
        assert_eq!(report.dropped, 1);
        assert!(report.is_success());
    }
}
