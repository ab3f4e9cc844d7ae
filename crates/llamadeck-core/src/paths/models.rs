//! Models directory resolution.

use std::env;
use std::path::PathBuf;

use super::error::PathError;
use super::platform::{data_root, normalize_user_path};

/// Environment variable overriding the models directory.
pub const MODELS_DIR_ENV: &str = "LLAMADECK_MODELS_DIR";

/// Return the default models directory (`<data_root>/models`).
pub fn default_models_dir() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join("models"))
}

/// Resolve the models directory from an explicit override, env var, or default.
///
/// Resolution order:
/// 1. Explicit path provided by caller (highest priority)
/// 2. `LLAMADECK_MODELS_DIR` environment variable
/// 3. Default models directory
pub fn resolve_models_dir(explicit: Option<&str>) -> Result<PathBuf, PathError> {
    if let Some(path_str) = explicit {
        return normalize_user_path(path_str);
    }

    if let Ok(env_path) = env::var(MODELS_DIR_ENV)
        && !env_path.trim().is_empty()
    {
        tracing::debug!(path = %env_path, "Models directory from {MODELS_DIR_ENV}");
        return normalize_user_path(&env_path);
    }

    default_models_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_wins() {
        let explicit = if cfg!(windows) { "C:\\m" } else { "/srv/models" };
        assert_eq!(
            resolve_models_dir(Some(explicit)).unwrap(),
            PathBuf::from(explicit)
        );
    }

    #[test]
    fn test_explicit_empty_is_error() {
        assert!(matches!(
            resolve_models_dir(Some("")),
            Err(PathError::EmptyPath)
        ));
    }

    #[test]
    fn test_default_under_data_root() {
        let dir = default_models_dir().unwrap();
        assert!(dir.ends_with("models"));
    }
}
