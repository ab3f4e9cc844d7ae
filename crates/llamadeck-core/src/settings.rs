//! Settings domain types and validation.
//!
//! These are pure domain types: loading from disk and resolving paths against
//! the environment happens in the runtime's config layer.

use serde::{Deserialize, Serialize};

use crate::domain::options::{ModelOptions, ResolvedOptions};

/// Default watchdog threshold for aggregate queries, in seconds.
pub const DEFAULT_STANDARD_WATCHDOG_SECS: u64 = 20;

/// Default watchdog threshold for streaming queries, in seconds.
pub const DEFAULT_STREAMING_WATCHDOG_SECS: u64 = 10;

/// Default delay between a graceful stop request and a forced kill, in milliseconds.
pub const DEFAULT_KILL_GRACE_MILLIS: u64 = 1500;

/// Default timeout for the `--help` capability probe, in seconds.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Application settings structure.
///
/// All fields are optional to support partial updates and graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Path to the external `llama-cli` binary.
    pub llama_cli_path: Option<String>,

    /// Directory containing the binary's shared library. Defaults to the binary's directory.
    pub library_dir: Option<String>,

    /// Directory scanned for model files.
    pub models_dir: Option<String>,

    /// Seconds without output before an aggregate query is considered stuck.
    pub standard_watchdog_secs: Option<u64>,

    /// Seconds without output before a streaming query is considered stuck.
    pub streaming_watchdog_secs: Option<u64>,

    /// Milliseconds between a stop request and a forced kill.
    pub kill_grace_millis: Option<u64>,

    /// Seconds allowed for the capability probe.
    pub probe_timeout_secs: Option<u64>,

    /// Refuse to run queries when the shared library cannot be found.
    pub require_shared_library: Option<bool>,

    /// Generation options applied beneath every caller's options.
    pub default_options: ModelOptions,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self {
            llama_cli_path: None,
            library_dir: None,
            models_dir: None,
            standard_watchdog_secs: Some(DEFAULT_STANDARD_WATCHDOG_SECS),
            streaming_watchdog_secs: Some(DEFAULT_STREAMING_WATCHDOG_SECS),
            kill_grace_millis: Some(DEFAULT_KILL_GRACE_MILLIS),
            probe_timeout_secs: Some(DEFAULT_PROBE_TIMEOUT_SECS),
            require_shared_library: Some(true),
            default_options: ModelOptions {
                temperature: None,
                top_p: None,
                max_tokens: None,
                seed: None,
                context_size: None,
                streaming: None,
            },
        }
    }

    #[must_use]
    pub fn effective_standard_watchdog_secs(&self) -> u64 {
        self.standard_watchdog_secs
            .unwrap_or(DEFAULT_STANDARD_WATCHDOG_SECS)
    }

    #[must_use]
    pub fn effective_streaming_watchdog_secs(&self) -> u64 {
        self.streaming_watchdog_secs
            .unwrap_or(DEFAULT_STREAMING_WATCHDOG_SECS)
    }

    #[must_use]
    pub fn effective_kill_grace_millis(&self) -> u64 {
        self.kill_grace_millis.unwrap_or(DEFAULT_KILL_GRACE_MILLIS)
    }

    #[must_use]
    pub fn effective_probe_timeout_secs(&self) -> u64 {
        self.probe_timeout_secs.unwrap_or(DEFAULT_PROBE_TIMEOUT_SECS)
    }

    #[must_use]
    pub fn effective_require_shared_library(&self) -> bool {
        self.require_shared_library.unwrap_or(true)
    }

    /// The fully populated default record every query's options are merged over.
    #[must_use]
    pub fn resolved_default_options(&self) -> ResolvedOptions {
        self.default_options.resolve(&ResolvedOptions::default())
    }

    /// Merge an update into this one, only updating fields that are Some.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(ref path) = other.llama_cli_path {
            self.llama_cli_path.clone_from(path);
        }
        if let Some(ref dir) = other.library_dir {
            self.library_dir.clone_from(dir);
        }
        if let Some(ref dir) = other.models_dir {
            self.models_dir.clone_from(dir);
        }
        if let Some(secs) = other.standard_watchdog_secs {
            self.standard_watchdog_secs = secs;
        }
        if let Some(secs) = other.streaming_watchdog_secs {
            self.streaming_watchdog_secs = secs;
        }
        if let Some(millis) = other.kill_grace_millis {
            self.kill_grace_millis = millis;
        }
        if let Some(secs) = other.probe_timeout_secs {
            self.probe_timeout_secs = secs;
        }
        if let Some(required) = other.require_shared_library {
            self.require_shared_library = required;
        }
        if let Some(options) = other.default_options {
            self.default_options = options.or(self.default_options);
        }
    }
}

/// Partial settings update.
///
/// Each field is `Option<Option<T>>`:
/// - `None` = don't change this field
/// - `Some(None)` = set field to None/null
/// - `Some(Some(value))` = set field to value
///
/// `default_options` is layered over the current options field by field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub llama_cli_path: Option<Option<String>>,
    pub library_dir: Option<Option<String>>,
    pub models_dir: Option<Option<String>>,
    pub standard_watchdog_secs: Option<Option<u64>>,
    pub streaming_watchdog_secs: Option<Option<u64>>,
    pub kill_grace_millis: Option<Option<u64>>,
    pub probe_timeout_secs: Option<Option<u64>>,
    pub require_shared_library: Option<Option<bool>>,
    pub default_options: Option<ModelOptions>,
}

impl From<Settings> for SettingsUpdate {
    /// Treat a loaded settings file as an update: only fields it sets are applied.
    fn from(s: Settings) -> Self {
        Self {
            llama_cli_path: s.llama_cli_path.map(Some),
            library_dir: s.library_dir.map(Some),
            models_dir: s.models_dir.map(Some),
            standard_watchdog_secs: s.standard_watchdog_secs.map(Some),
            streaming_watchdog_secs: s.streaming_watchdog_secs.map(Some),
            kill_grace_millis: s.kill_grace_millis.map(Some),
            probe_timeout_secs: s.probe_timeout_secs.map(Some),
            require_shared_library: s.require_shared_library.map(Some),
            default_options: Some(s.default_options),
        }
    }
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Watchdog threshold must be between 1 and 600 seconds, got {0}")]
    InvalidWatchdog(u64),

    #[error("Kill grace period must be between 50 and 60000 ms, got {0}")]
    InvalidKillGrace(u64),

    #[error("Probe timeout must be between 1 and 600 seconds, got {0}")]
    InvalidProbeTimeout(u64),

    #[error("{0} cannot be empty")]
    EmptyPath(&'static str),

    #[error("Temperature must be between 0 and 2, got {0}")]
    InvalidTemperature(f32),

    #[error("Top-p must be between 0 and 1, got {0}")]
    InvalidTopP(f32),

    #[error("Max tokens must be at least 1")]
    InvalidMaxTokens,

    #[error("Context size must be at least 64, got {0}")]
    InvalidContextSize(u32),
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    for secs in [settings.standard_watchdog_secs, settings.streaming_watchdog_secs]
        .into_iter()
        .flatten()
    {
        if !(1..=600).contains(&secs) {
            return Err(SettingsError::InvalidWatchdog(secs));
        }
    }

    if let Some(millis) = settings.kill_grace_millis {
        if !(50..=60_000).contains(&millis) {
            return Err(SettingsError::InvalidKillGrace(millis));
        }
    }

    if let Some(secs) = settings.probe_timeout_secs {
        if !(1..=600).contains(&secs) {
            return Err(SettingsError::InvalidProbeTimeout(secs));
        }
    }

    let paths = [
        ("llama_cli_path", &settings.llama_cli_path),
        ("library_dir", &settings.library_dir),
        ("models_dir", &settings.models_dir),
    ];
    for (name, value) in paths {
        if value.as_ref().is_some_and(|p| p.trim().is_empty()) {
            return Err(SettingsError::EmptyPath(name));
        }
    }

    let opts = &settings.default_options;
    if let Some(t) = opts.temperature {
        if !(0.0..=2.0).contains(&t) {
            return Err(SettingsError::InvalidTemperature(t));
        }
    }
    if let Some(p) = opts.top_p {
        if !(0.0..=1.0).contains(&p) {
            return Err(SettingsError::InvalidTopP(p));
        }
    }
    if opts.max_tokens == Some(0) {
        return Err(SettingsError::InvalidMaxTokens);
    }
    if let Some(ctx) = opts.context_size {
        if ctx < 64 {
            return Err(SettingsError::InvalidContextSize(ctx));
        }
    }

    Ok(())
}
