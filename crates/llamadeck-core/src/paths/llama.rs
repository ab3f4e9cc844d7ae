//! Paths of the external llama-cli binary and its shared library directory.

use std::env;
use std::path::PathBuf;

use super::error::PathError;
use super::platform::{data_root, normalize_user_path};

/// Environment variable overriding the llama-cli binary path.
pub const LLAMA_CLI_ENV: &str = "LLAMADECK_LLAMA_CLI";

/// Environment variable overriding the shared library directory.
pub const LIBRARY_DIR_ENV: &str = "LLAMADECK_LIBRARY_DIR";

/// File name of the llama-cli executable on this platform.
pub const fn llama_cli_binary_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "llama-cli.exe"
    } else {
        "llama-cli"
    }
}

/// Default location of the binary: `<data_root>/bin/llama-cli`.
pub fn default_llama_cli_path() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join("bin").join(llama_cli_binary_name()))
}

/// Resolve the binary path: explicit, then `LLAMADECK_LLAMA_CLI`, then default.
pub fn resolve_llama_cli_path(explicit: Option<&str>) -> Result<PathBuf, PathError> {
    if let Some(path_str) = explicit {
        return normalize_user_path(path_str);
    }

    if let Ok(env_path) = env::var(LLAMA_CLI_ENV)
        && !env_path.trim().is_empty()
    {
        tracing::debug!(path = %env_path, "llama-cli path from {LLAMA_CLI_ENV}");
        return normalize_user_path(&env_path);
    }

    default_llama_cli_path()
}

/// Resolve the shared library directory: explicit, then `LLAMADECK_LIBRARY_DIR`.
///
/// `None` means "use the binary's own directory".
pub fn resolve_library_dir(explicit: Option<&str>) -> Result<Option<PathBuf>, PathError> {
    if let Some(path_str) = explicit {
        return normalize_user_path(path_str).map(Some);
    }

    match env::var(LIBRARY_DIR_ENV) {
        Ok(env_path) if !env_path.trim().is_empty() => normalize_user_path(&env_path).map(Some),
        _ => Ok(None),
    }
}
