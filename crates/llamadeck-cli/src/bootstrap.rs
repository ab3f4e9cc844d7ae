//! CLI bootstrap: the composition root.
//!
//! Configuration is resolved once here. Handlers receive the composed
//! [`CliContext`] and never touch settings or paths themselves.

use std::backtrace::Backtrace;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::panic::{self, PanicHookInfo};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use llamadeck_core::crash_log_path;
use llamadeck_runtime::{EventBridge, RuntimeConfig, Session, load_settings};
use tracing::{debug, error};

use crate::parser::Cli;

/// Fully composed context for CLI commands.
pub struct CliContext {
    pub session: Session,
    /// Stream events from `session`; subscribe before starting a stream.
    pub bridge: EventBridge,
}

/// Load settings, apply command-line overrides and build the session.
pub fn bootstrap(cli: &Cli) -> Result<CliContext> {
    let mut settings = load_settings(cli.config.as_deref()).context("Failed to load settings")?;
    settings.merge(&cli.settings_update());

    let config = RuntimeConfig::from_settings(&settings)?;
    debug!(
        llama_cli = %config.llama_cli_path.display(),
        models_dir = %config.models_dir.display(),
        "Resolved configuration"
    );

    let bridge = EventBridge::new();
    let session = Session::new(config, Arc::new(bridge.clone()));
    Ok(CliContext { session, bridge })
}

/// Append a record of every panic to the crash log, then run the default hook.
pub fn install_crash_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        match crash_log_path() {
            Ok(path) => {
                if let Err(e) = append_crash_record(&path, &crash_record(info)) {
                    error!(path = %path.display(), error = %e, "Failed to write crash log");
                }
            }
            Err(e) => error!(error = %e, "Failed to resolve crash log path"),
        }
        default_hook(info);
    }));
}

fn crash_record(info: &PanicHookInfo<'_>) -> String {
    let message = info
        .payload()
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Box<dyn Any>".to_string());
    let location = info
        .location()
        .map_or_else(|| "unknown location".to_string(), ToString::to_string);

    format_crash_record(
        &Utc::now().to_rfc3339(),
        &message,
        &location,
        &Backtrace::force_capture().to_string(),
    )
}

fn format_crash_record(timestamp: &str, message: &str, location: &str, backtrace: &str) -> String {
    format!("[{timestamp}] panic at {location}: {message}\n{backtrace}\n")
}

fn append_crash_record(path: &Path, record: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(record.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    #[test]
    fn test_crash_records_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("crash.log");

        let first = format_crash_record("2026-01-01T00:00:00+00:00", "boom", "src/x.rs:1:1", "bt");
        append_crash_record(&path, &first).unwrap();
        append_crash_record(&path, "second\n").unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[2026-01-01T00:00:00+00:00] panic at src/x.rs:1:1: boom\nbt\n"));
        assert!(text.ends_with("second\n"));
    }

    #[test]
    fn test_bootstrap_applies_overrides() {
        let dir = tempdir().unwrap();
        let settings = dir.path().join("settings.json");
        fs::write(&settings, r#"{"models_dir": "/from/file", "kill_grace_millis": 300}"#).unwrap();
        let models = dir.path().join("models");
        let models_arg = models.to_str().unwrap();

        let cli = Cli::parse_from([
            "llamadeck",
            "--config",
            settings.to_str().unwrap(),
            "--models-dir",
            models_arg,
            "--llama-cli",
            "/opt/llama/llama-cli",
            "models",
        ]);
        let ctx = tokio_test::assert_ok!(bootstrap(&cli));

        assert_eq!(ctx.session.config().models_dir, models);
        assert_eq!(ctx.session.config().kill_grace.as_millis(), 300);
    }
}
