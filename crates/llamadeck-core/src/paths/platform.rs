//! Data root and files stored directly beneath it.

use std::env;
use std::path::PathBuf;

use super::error::PathError;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "LLAMADECK_DATA_DIR";

const APP_DIR_NAME: &str = "llamadeck";

/// Get the root directory for application data (settings, logs, models).
///
/// Resolution order:
/// 1. `LLAMADECK_DATA_DIR` environment variable (highest priority)
/// 2. System data directory (e.g., `~/.local/share/llamadeck`)
pub fn data_root() -> Result<PathBuf, PathError> {
    if let Ok(path) = env::var(DATA_DIR_ENV)
        && !path.trim().is_empty()
    {
        return normalize_user_path(&path);
    }

    let data_dir = dirs::data_local_dir().ok_or(PathError::NoDataDir)?;
    Ok(data_dir.join(APP_DIR_NAME))
}

/// Path of the optional JSON settings file.
pub fn settings_file_path() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join("settings.json"))
}

/// Path of the append-only crash log.
pub fn crash_log_path() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join("logs").join("crash.log"))
}

/// Normalize a user-supplied path string.
///
/// Expands a leading `~`, and makes relative paths absolute against the
/// current working directory.
pub fn normalize_user_path(raw: &str) -> Result<PathBuf, PathError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PathError::EmptyPath);
    }

    let expanded = if trimmed == "~" {
        dirs::home_dir().ok_or(PathError::NoHomeDir)?
    } else if let Some(rest) = trimmed.strip_prefix("~/") {
        dirs::home_dir().ok_or(PathError::NoHomeDir)?.join(rest)
    } else {
        PathBuf::from(trimmed)
    };

    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(expanded))
            .map_err(|e| PathError::CurrentDirError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(matches!(normalize_user_path("   "), Err(PathError::EmptyPath)));
    }

    #[test]
    fn test_normalize_keeps_absolute() {
        let abs = if cfg!(windows) { "C:\\models" } else { "/opt/models" };
        assert_eq!(normalize_user_path(abs).unwrap(), PathBuf::from(abs));
    }

    #[test]
    fn test_normalize_relative_is_absolute() {
        let path = normalize_user_path("models").unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("models"));
    }

    #[test]
    fn test_data_files_live_under_root() {
        let root = data_root().unwrap();
        assert!(settings_file_path().unwrap().starts_with(&root));
        assert!(crash_log_path().unwrap().ends_with("logs/crash.log"));
    }
}
