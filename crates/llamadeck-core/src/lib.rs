//! Core domain types and port definitions for llamadeck.
//!
//! This crate holds everything that can be expressed without spawning a
//! process: generation options, capability flags, model descriptions,
//! benchmark results, stream events, settings and path resolution.
//! Process orchestration lives in `llamadeck-runtime`.

pub mod domain;
pub mod events;
pub mod paths;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    BenchmarkMetrics, BenchmarkResult, CapabilityFlags, CapabilitySet, ModelInfo, ModelOptions,
    PromptResult, Quantization, ResolvedOptions, format_file_size,
};
pub use events::{QueryId, StreamEvent};
pub use ports::{NoopEmitter, StreamEventEmitter};
pub use settings::{Settings, SettingsError, SettingsUpdate, validate_settings};

// Re-export path utilities
pub use paths::{
    PathError, crash_log_path, data_root, default_llama_cli_path, default_models_dir,
    resolve_library_dir, resolve_llama_cli_path, resolve_models_dir, settings_file_path,
};
