//! Capability probe: run `llama-cli --help` and scan the output for known flags.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use llamadeck_core::CapabilitySet;
use tokio::process::Command;
use tracing::{debug, warn};

use super::error::ProbeError;

/// Check that `path` exists and is executable.
pub fn validate_binary(path: &Path) -> Result<PathBuf, ProbeError> {
    if !path.is_file() {
        return Err(ProbeError::NotFound {
            path: path.to_path_buf(),
        });
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(path)
            .map_err(ProbeError::Spawn)?
            .permissions()
            .mode();
        // Any execute bit (owner, group, or other)
        if mode & 0o111 == 0 {
            return Err(ProbeError::NotExecutable {
                path: path.to_path_buf(),
            });
        }
    }

    Ok(path.to_path_buf())
}

/// Detect the optional flags `binary` supports.
///
/// Runs the help invocation with the same environment and working directory
/// a real query would use. Both output streams are searched, since some
/// builds print usage to standard error.
pub async fn probe_capabilities(
    binary: &Path,
    env: &[(OsString, OsString)],
    timeout: Duration,
) -> Result<CapabilitySet, ProbeError> {
    let binary = validate_binary(binary)?;

    let mut cmd = Command::new(&binary);
    cmd.arg("--help")
        .envs(env.iter().map(|(k, v)| (k, v)))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = binary.parent() {
        cmd.current_dir(dir);
    }

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| ProbeError::Timeout {
            secs: timeout.as_secs(),
        })?
        .map_err(ProbeError::Spawn)?;

    if !output.status.success() {
        return Err(ProbeError::NonZeroExit {
            code: output.status.code(),
        });
    }

    let mut help = String::from_utf8_lossy(&output.stdout).into_owned();
    help.push('\n');
    help.push_str(&String::from_utf8_lossy(&output.stderr));

    let caps = CapabilitySet::from_help_text(&help);
    debug!(
        binary = %binary.display(),
        capabilities = ?caps.names(),
        "Probed llama-cli capabilities"
    );
    Ok(caps)
}

/// Probe, falling back to the minimal capability set on any failure.
pub async fn probe_or_minimal(
    binary: &Path,
    env: &[(OsString, OsString)],
    timeout: Duration,
) -> CapabilitySet {
    match probe_capabilities(binary, env, timeout).await {
        Ok(caps) => caps,
        Err(e) => {
            warn!(
                binary = %binary.display(),
                error = %e,
                "Capability probe failed, using minimal flags"
            );
            CapabilitySet::minimal()
        }
    }
}
