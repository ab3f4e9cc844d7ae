//! Error types for process supervision and queries.

use std::path::PathBuf;
use thiserror::Error;

use crate::llama::ProbeError;

/// Failure to start an external process.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The OS refused to spawn the binary (missing, permission denied, ...).
    #[error("Failed to spawn {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stop-all arrived while the process was being started.
    #[error("Process was stopped before it could be registered")]
    StoppedBeforeStart,
}

/// Why a query did not produce a response.
///
/// Per-query errors never escape as panics: aggregate queries return them,
/// streaming queries deliver their message as the terminal `error` event.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Capability detection failed. Only surfaced by an explicit probe;
    /// queries fall back to minimal flags instead.
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// The external binary could not be started.
    #[error(transparent)]
    Spawn(SupervisorError),

    /// The process exited cleanly without printing anything.
    #[error("llama-cli exited successfully but produced no output")]
    EmptyOutput,

    /// The process exited with a failure status.
    #[error("llama-cli exited with {}", describe_code(*code))]
    Process { code: Option<i32> },

    /// The process was stopped by stop-all or stop-query.
    #[error("Query was stopped")]
    Killed,

    /// The binary reported an error on standard error.
    #[error("llama-cli reported an error: {0}")]
    Stderr(String),

    /// No model is active.
    #[error("No model loaded")]
    NoModelLoaded,

    /// No listed model matches the requested name.
    #[error("No model matches '{0}'")]
    NoMatch(String),

    /// The binary's shared library could not be located.
    #[error("llama shared library not found in {}", dir.display())]
    LibraryUnavailable { dir: PathBuf },
}

impl From<SupervisorError> for QueryError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::StoppedBeforeStart => Self::Killed,
            other => Self::Spawn(other),
        }
    }
}

fn describe_code(code: Option<i32>) -> String {
    code.map_or_else(
        || "no exit code (terminated by a signal)".to_string(),
        |c| format!("code {c}"),
    )
}
