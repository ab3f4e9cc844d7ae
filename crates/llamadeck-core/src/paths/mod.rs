//! Path utilities for llamadeck data directories and user-configurable locations.
//!
//! Every location follows the same resolution order:
//! explicit value, then a `LLAMADECK_*` environment variable, then a
//! platform default under the user's local data directory.
//!
//! No function here creates directories; callers that need one to exist
//! create it themselves.

mod error;
mod llama;
mod models;
mod platform;

pub use error::PathError;
pub use llama::{
    LIBRARY_DIR_ENV, LLAMA_CLI_ENV, default_llama_cli_path, llama_cli_binary_name,
    resolve_library_dir, resolve_llama_cli_path,
};
pub use models::{MODELS_DIR_ENV, default_models_dir, resolve_models_dir};
pub use platform::{
    DATA_DIR_ENV, crash_log_path, data_root, normalize_user_path, settings_file_path,
};
