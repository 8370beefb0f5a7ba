use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Most of the engine degrades instead of failing: unrecognized value shapes turn into
/// opaque parts and exceeded iteration caps drop a single seed with a warning. The variants
/// below cover what is left, i.e. bad input data, I/O around persisted artifacts, and the
/// failure of whole units of work in a run.
///
/// # Error Categories
///
/// ## Input and Persistence Errors
/// - [`Error::Malformed`] - Invalid input data or a value that cannot be written to a dump
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::Serialization`] - JSON (de)serialization failures
/// - [`Error::Regex`] - A synthesized pattern failed to compile
///
/// ## Analysis Errors
/// - [`Error::Unsupported`] - An operation is not defined for the given part
/// - [`Error::RecursionLimit`] - Maximum recursion depth exceeded
/// - [`Error::LockError`] - Thread synchronization failure
/// - [`Error::GraphError`] - Placeholder graph inconsistency
///
/// ## Run Errors
/// - [`Error::TaskFailed`] - One (entry point, seed) unit of work failed
/// - [`Error::RunFailed`] - A run finished with collected task failures
///
/// # Examples
///
/// ```rust,ignore
/// use pathscope::Error;
///
/// match report.status() {
///     Ok(()) => println!("all tasks succeeded"),
///     Err(Error::RunFailed(count)) => eprintln!("{count} tasks failed"),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input is damaged or a value cannot be represented.
    ///
    /// The error includes the source location where the malformation was
    /// detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// File I/O error.
    ///
    /// Wraps standard I/O errors raised while loading snapshots or writing
    /// the match database and dumps.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// A synthesized pattern could not be compiled.
    #[error("{0}")]
    Regex(#[from] regex::Error),

    /// JSON (de)serialization failed.
    #[error("{0}")]
    Serialization(#[from] serde_json::Error),

    /// The requested operation is not defined for this input, e.g. the regex
    /// of a bare loop.
    #[error("Unsupported operation - {0}")]
    Unsupported(String),

    /// Recursion limit reached.
    ///
    /// The associated value shows the recursion limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// Failed to lock target.
    ///
    /// This error occurs when thread synchronization fails, typically
    /// when a mutex was poisoned by a panicking task.
    #[error("Failed to lock target")]
    LockError,

    /// Placeholder graph error.
    ///
    /// Raised when the adjacency of the placeholder graph refers to a
    /// placeholder that has no tree.
    #[error("{0}")]
    GraphError(String),

    /// A single unit of work failed.
    ///
    /// Task failures are collected by the engine and never stop other tasks.
    #[error("Task failed for {entry_point} / {seed}: {message}")]
    TaskFailed {
        /// The entry point the task was running for
        entry_point: String,
        /// The seed the task was resolving
        seed: String,
        /// What went wrong
        message: String,
    },

    /// A run completed but some of its tasks failed.
    ///
    /// The associated value is the number of collected failures.
    #[error("{0} task(s) failed during the run")]
    RunFailed(usize),
}
