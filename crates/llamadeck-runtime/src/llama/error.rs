//! Errors raised while inspecting the external llama-cli binary.

use std::path::PathBuf;
use thiserror::Error;

/// Capability detection failed.
///
/// Always recoverable: callers fall back to [`CapabilitySet::minimal`].
///
/// [`CapabilitySet::minimal`]: llamadeck_core::CapabilitySet::minimal
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Binary does not exist at the configured path.
    #[error("llama-cli binary not found: {path}")]
    NotFound { path: PathBuf },

    /// Binary exists but has no execute permission.
    #[error("llama-cli binary is not executable: {path}")]
    NotExecutable { path: PathBuf },

    /// The help invocation could not be started.
    #[error("Failed to run llama-cli --help: {0}")]
    Spawn(#[source] std::io::Error),

    /// The help invocation exited unsuccessfully.
    #[error(
        "llama-cli --help exited with {}",
        code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}"))
    )]
    NonZeroExit { code: Option<i32> },

    /// The help invocation did not finish in time.
    #[error("llama-cli --help did not finish within {secs}s")]
    Timeout { secs: u64 },
}
