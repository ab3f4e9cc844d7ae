//! Shared library lookup and library search path injection.
//!
//! llama-cli is usually built as a thin executable linked against a shared
//! `libllama`. The loader must be able to find that library, so the directory
//! holding it is prepended to the platform's library search path variable in
//! the child's environment.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::warn;

/// File name of the llama shared library on this platform.
pub const fn shared_library_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "llama.dll"
    } else if cfg!(target_os = "macos") {
        "libllama.dylib"
    } else {
        "libllama.so"
    }
}

/// Environment variable the dynamic loader searches on this platform.
pub const fn library_path_var() -> &'static str {
    if cfg!(target_os = "windows") {
        "PATH"
    } else if cfg!(target_os = "macos") {
        "DYLD_LIBRARY_PATH"
    } else {
        "LD_LIBRARY_PATH"
    }
}

/// Directory to search: the configured one, else the binary's own directory.
pub fn library_search_dir(binary: &Path, library_dir: Option<&Path>) -> Option<PathBuf> {
    library_dir
        .map(Path::to_path_buf)
        .or_else(|| binary.parent().map(Path::to_path_buf))
}

/// Locate the shared library, returning its full path if present.
pub fn find_shared_library(binary: &Path, library_dir: Option<&Path>) -> Option<PathBuf> {
    let candidate = library_search_dir(binary, library_dir)?.join(shared_library_name());
    candidate.is_file().then_some(candidate)
}

/// Environment entries to add to the child: the library search path variable
/// with `dir` prepended to the current value.
///
/// Returns no entries if the combined value cannot be represented (a path
/// containing the platform's list separator).
pub fn library_env(dir: &Path) -> Vec<(OsString, OsString)> {
    let var = library_path_var();
    let existing = env::var_os(var);

    let mut paths = vec![dir.to_path_buf()];
    if let Some(ref current) = existing {
        paths.extend(env::split_paths(current).filter(|p| p != dir));
    }

    match env::join_paths(paths) {
        Ok(joined) => vec![(OsString::from(var), joined)],
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot add library directory to search path");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_library_found_next_to_binary() {
        let dir = tempdir().unwrap();
        let binary = dir.path().join("llama-cli");
        fs::write(&binary, b"").unwrap();
        assert!(find_shared_library(&binary, None).is_none());

        fs::write(dir.path().join(shared_library_name()), b"").unwrap();
        assert_eq!(
            find_shared_library(&binary, None),
            Some(dir.path().join(shared_library_name()))
        );
    }

    #[test]
    fn test_configured_dir_takes_precedence() {
        let bin_dir = tempdir().unwrap();
        let lib_dir = tempdir().unwrap();
        let binary = bin_dir.path().join("llama-cli");
        fs::write(bin_dir.path().join(shared_library_name()), b"").unwrap();

        assert!(find_shared_library(&binary, Some(lib_dir.path())).is_none());
    }

    #[test]
    fn test_library_env_prepends_dir() {
        let dir = tempdir().unwrap();
        let entries = library_env(dir.path());
        assert_eq!(entries.len(), 1);

        let (var, value) = &entries[0];
        assert_eq!(var, library_path_var());
        let first = env::split_paths(value).next().unwrap();
        assert_eq!(first, dir.path());
    }
}
