//! Resolved runtime configuration.
//!
//! [`Settings`] is the partial, user-facing form. [`RuntimeConfig`] is what
//! the session consumes: every path resolved, every threshold a `Duration`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use llamadeck_core::{
    PathError, ResolvedOptions, Settings, SettingsError, resolve_library_dir,
    resolve_llama_cli_path, resolve_models_dir, settings_file_path, validate_settings,
};
use thiserror::Error;
use tracing::debug;

/// Errors while loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load settings: defaults, overlaid with the JSON settings file.
///
/// An explicit file must exist; the default `<data_root>/settings.json` is
/// optional.
pub fn load_settings(explicit_file: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut settings = Settings::with_defaults();

    let (path, required) = match explicit_file {
        Some(path) => (path.to_path_buf(), true),
        None => (settings_file_path()?, false),
    };

    if required || path.is_file() {
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let file: Settings =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "Loaded settings file");
        settings.merge(&file.into());
    }

    validate_settings(&settings)?;
    Ok(settings)
}

/// Fully resolved configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub llama_cli_path: PathBuf,
    /// Shared library directory; `None` means the binary's directory.
    pub library_dir: Option<PathBuf>,
    pub models_dir: PathBuf,
    pub standard_watchdog: Duration,
    pub streaming_watchdog: Duration,
    pub kill_grace: Duration,
    pub probe_timeout: Duration,
    pub require_shared_library: bool,
    /// Record every query's options are merged over.
    pub default_options: ResolvedOptions,
}

impl RuntimeConfig {
    /// Resolve settings against the environment and platform defaults.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        validate_settings(settings)?;

        Ok(Self {
            llama_cli_path: resolve_llama_cli_path(settings.llama_cli_path.as_deref())?,
            library_dir: resolve_library_dir(settings.library_dir.as_deref())?,
            models_dir: resolve_models_dir(settings.models_dir.as_deref())?,
            standard_watchdog: Duration::from_secs(settings.effective_standard_watchdog_secs()),
            streaming_watchdog: Duration::from_secs(settings.effective_streaming_watchdog_secs()),
            kill_grace: Duration::from_millis(settings.effective_kill_grace_millis()),
            probe_timeout: Duration::from_secs(settings.effective_probe_timeout_secs()),
            require_shared_library: settings.effective_require_shared_library(),
            default_options: settings.resolved_default_options(),
        })
    }

    /// Configuration with default thresholds for an explicit binary and models directory.
    pub fn new(llama_cli_path: impl Into<PathBuf>, models_dir: impl Into<PathBuf>) -> Self {
        let settings = Settings::with_defaults();
        Self {
            llama_cli_path: llama_cli_path.into(),
            library_dir: None,
            models_dir: models_dir.into(),
            standard_watchdog: Duration::from_secs(settings.effective_standard_watchdog_secs()),
            streaming_watchdog: Duration::from_secs(settings.effective_streaming_watchdog_secs()),
            kill_grace: Duration::from_millis(settings.effective_kill_grace_millis()),
            probe_timeout: Duration::from_secs(settings.effective_probe_timeout_secs()),
            require_shared_library: settings.effective_require_shared_library(),
            default_options: ResolvedOptions::default(),
        }
    }
}
