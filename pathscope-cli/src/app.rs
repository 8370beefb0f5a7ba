use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// pathscope - path resolution and permission matching for privileged services
#[derive(Debug, Parser)]
#[command(name = "pathscope", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// The analysis inputs shared by `resolve` and `match`.
#[derive(Debug, Args)]
pub struct InputOptions {
    /// Program facts snapshot (JSON).
    #[arg(long, value_name = "FILE")]
    pub facts: PathBuf,

    /// Entry points with their seeds (JSON list).
    #[arg(long, value_name = "FILE")]
    pub entry_points: PathBuf,

    /// Analysis configuration (JSON); missing fields use the defaults.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of worker threads (0 uses all cores).
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Cap on fixpoint rounds per seed.
    #[arg(long)]
    pub max_iterations: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve every seed and print the rewritten path expressions.
    Resolve {
        #[command(flatten)]
        inputs: InputOptions,
    },

    /// Resolve every seed, match the patterns against a filesystem image and
    /// print bucket summaries.
    Match {
        #[command(flatten)]
        inputs: InputOptions,

        /// Filesystem ownership snapshot (JSON).
        #[arg(long, value_name = "FILE")]
        ownership: PathBuf,

        /// Directory receiving the match database and the dumps.
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
}
