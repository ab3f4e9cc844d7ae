//! Lifecycle of one external process: spawn, supervise, reap.
//!
//! ```text
//! Spawned -> Running -> { Completed | Failed | Killed }
//! ```
//!
//! `spawn` is synchronous: the process is registered before it returns, so a
//! stop-all issued right after cannot miss it. `run` then multiplexes four
//! sources until the process exits:
//!
//! - captured output, forwarded to an observer
//! - the stuck-process watchdog, disarmed by the first output of any kind
//! - the registry's cancellation token (stop-all / stop-query)
//! - the forced-kill deadline armed by any stop request
//!
//! A stuck process is not sent a quit keystroke, because its standard input
//! is already closed. It gets a termination request (`SIGTERM`) and, after
//! the grace period, a forced kill rather than an interrupt.
//!
//! The registry entry belongs to a `Registration` guard. Dropping a
//! process, or a `run` future, before it finishes still removes the entry,
//! and `kill_on_drop` reaps the child.

use std::ffi::OsString;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use llamadeck_core::QueryId;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, sleep_until, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::registry::{ProcessRegistry, Purpose};
use super::shutdown::{StopSignal, send_stop_signal};
use super::stream::{Output, spawn_stderr_reader, spawn_stdout_reader};
use crate::error::SupervisorError;
use crate::normalizer::TimingRecord;

/// How long to keep reading output after the process has exited.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything needed to start one process.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub binary: PathBuf,
    pub args: Vec<OsString>,
    /// Extra environment entries, applied over the inherited environment.
    pub env: Vec<(OsString, OsString)>,
    pub purpose: Purpose,
    /// Time without any output before the process is considered stuck.
    pub watchdog: Duration,
    /// Time between a stop signal and a forced kill.
    pub kill_grace: Duration,
}

/// Terminal state of a supervised process.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub id: QueryId,
    /// `None` if the process was ended by a signal or could not be waited on.
    pub exit_code: Option<i32>,
    /// Ended by stop-all or stop-query.
    pub killed: bool,
    /// The watchdog fired before any output arrived.
    pub stuck: bool,
    /// All standard output, in arrival order.
    pub stdout: String,
    pub timing: TimingRecord,
}

/// Spawns processes and tracks them in a shared registry.
#[derive(Debug, Clone)]
pub struct Supervisor {
    registry: Arc<ProcessRegistry>,
}

impl Supervisor {
    pub const fn new(registry: Arc<ProcessRegistry>) -> Self {
        Self { registry }
    }

    pub const fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }

    /// Spawn and register a process.
    ///
    /// The working directory is the binary's own directory and standard
    /// input is closed immediately, so the binary can never block waiting
    /// for interactive input. `epoch` must be captured from the registry
    /// before any async preparation; if a stop-all happened since, the
    /// process is killed and `StoppedBeforeStart` returned.
    pub fn spawn(
        &self,
        id: QueryId,
        epoch: u64,
        spec: SpawnSpec,
    ) -> Result<SupervisedProcess, SupervisorError> {
        let mut cmd = Command::new(&spec.binary);
        cmd.args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = spec.binary.parent()
            && !dir.as_os_str().is_empty()
        {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
            binary: spec.binary.clone(),
            source,
        })?;
        let started = std::time::Instant::now();

        // EOF on stdin answers any interactive prompt.
        drop(child.stdin.take());

        let pid = child.id();
        let cancel = CancellationToken::new();
        let Some(registration) =
            Registration::insert(&self.registry, &id, pid, spec.purpose, epoch, &cancel)
        else {
            let _ = child.start_kill();
            return Err(SupervisorError::StoppedBeforeStart);
        };

        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            spawn_stdout_reader(stdout, tx.clone(), id.to_string());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_stderr_reader(stderr, tx, id.to_string());
        }

        info!(
            process_id = %id,
            ?pid,
            binary = %spec.binary.display(),
            "Spawned llama-cli"
        );

        Ok(SupervisedProcess {
            id,
            child,
            pid,
            rx,
            cancel,
            registration,
            watchdog: spec.watchdog,
            kill_grace: spec.kill_grace,
            timing: TimingRecord::starting_at(started),
        })
    }
}

/// Owns one registry entry and removes it exactly once.
#[derive(Debug)]
struct Registration {
    registry: Arc<ProcessRegistry>,
    id: QueryId,
    released: bool,
}

impl Registration {
    fn insert(
        registry: &Arc<ProcessRegistry>,
        id: &QueryId,
        pid: Option<u32>,
        purpose: Purpose,
        epoch: u64,
        cancel: &CancellationToken,
    ) -> Option<Self> {
        registry
            .insert(id.clone(), pid, purpose, epoch, cancel.clone())
            .then(|| Self {
                registry: Arc::clone(registry),
                id: id.clone(),
                released: false,
            })
    }

    /// Remove the entry. `false` if a stop already removed it.
    fn release(mut self) -> bool {
        self.released = true;
        self.registry.remove(&self.id)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if !self.released && self.registry.remove(&self.id) {
            debug!(process_id = %self.id, "Process dropped before exit, unregistered");
        }
    }
}

/// A registered, running process.
pub struct SupervisedProcess {
    id: QueryId,
    child: Child,
    pid: Option<u32>,
    rx: mpsc::UnboundedReceiver<Output>,
    cancel: CancellationToken,
    registration: Registration,
    watchdog: Duration,
    kill_grace: Duration,
    timing: TimingRecord,
}

impl SupervisedProcess {
    pub const fn id(&self) -> &QueryId {
        &self.id
    }

    /// Supervise until exit, passing every output to `observer`.
    ///
    /// When the observer breaks, the process is asked to terminate; output
    /// keeps flowing to the observer until the streams close. The registry
    /// entry is removed before this returns, or when the future is dropped.
    pub async fn run<F>(self, mut observer: F) -> ProcessOutcome
    where
        F: FnMut(&Output) -> ControlFlow<()>,
    {
        let Self {
            id,
            mut child,
            pid,
            mut rx,
            cancel,
            registration,
            watchdog,
            kill_grace,
            mut timing,
        } = self;

        let watchdog_timer = sleep(watchdog);
        tokio::pin!(watchdog_timer);

        let mut watchdog_armed = true;
        let mut streams_open = true;
        let mut stuck = false;
        let mut cancelled = false;
        let mut stop_requested = false;
        let mut kill_deadline: Option<Instant> = None;
        let mut stdout = String::new();

        let status = loop {
            tokio::select! {
                biased;

                maybe = rx.recv(), if streams_open => match maybe {
                    Some(output) => {
                        watchdog_armed = false;
                        let flow = forward(&output, &mut timing, &mut stdout, &mut observer);
                        if flow.is_break() && !stop_requested {
                            debug!(process_id = %id, "Observer requested stop");
                            stop_requested = true;
                            request_stop(
                                &mut child,
                                pid,
                                StopSignal::Terminate,
                                kill_grace,
                                &mut kill_deadline,
                            );
                        }
                    }
                    None => streams_open = false,
                },

                () = &mut watchdog_timer, if watchdog_armed => {
                    watchdog_armed = false;
                    stuck = true;
                    warn!(
                        process_id = %id,
                        secs = watchdog.as_secs(),
                        "No output from llama-cli, stopping stuck process"
                    );
                    if !stop_requested {
                        stop_requested = true;
                        request_stop(
                            &mut child,
                            pid,
                            StopSignal::Terminate,
                            kill_grace,
                            &mut kill_deadline,
                        );
                    }
                },

                () = cancel.cancelled(), if !cancelled => {
                    // The registry already sent the interrupt signal.
                    cancelled = true;
                    stop_requested = true;
                    if cfg!(unix) {
                        kill_deadline.get_or_insert_with(|| Instant::now() + kill_grace);
                    } else {
                        let _ = child.start_kill();
                    }
                },

                () = sleep_until_deadline(kill_deadline), if kill_deadline.is_some() => {
                    kill_deadline = None;
                    warn!(process_id = %id, "Process ignored stop signal, killing");
                    let _ = child.start_kill();
                },

                status = child.wait() => break status,
            }
        };

        // Pipes may still hold output written just before exit.
        if streams_open {
            let deadline = Instant::now() + OUTPUT_DRAIN_TIMEOUT;
            while let Ok(Some(output)) = timeout_at(deadline, rx.recv()).await {
                let _ = forward(&output, &mut timing, &mut stdout, &mut observer);
            }
        }
        timing.finish_at(std::time::Instant::now());

        let exit_code = match status {
            Ok(status) => status.code(),
            Err(e) => {
                warn!(process_id = %id, error = %e, "Failed to wait for process");
                None
            }
        };

        // A stop that raced with exit has already removed the entry.
        let removed = registration.release();
        let killed = cancelled || !removed;

        info!(
            process_id = %id,
            ?exit_code,
            killed,
            stuck,
            bytes = stdout.len(),
            "llama-cli exited"
        );

        ProcessOutcome {
            id,
            exit_code,
            killed,
            stuck,
            stdout,
            timing,
        }
    }
}

fn forward<F>(
    output: &Output,
    timing: &mut TimingRecord,
    stdout: &mut String,
    observer: &mut F,
) -> ControlFlow<()>
where
    F: FnMut(&Output) -> ControlFlow<()>,
{
    match output {
        Output::Stdout(chunk) => {
            timing.record_output(chunk);
            stdout.push_str(chunk);
        }
        Output::Stderr(_) => {}
        Output::Progress => return ControlFlow::Continue(()),
    }
    observer(output)
}

/// First stop phase. Arms the forced-kill deadline, or kills right away when
/// no catchable signal could be delivered.
fn request_stop(
    child: &mut Child,
    pid: Option<u32>,
    signal: StopSignal,
    grace: Duration,
    deadline: &mut Option<Instant>,
) {
    if pid.is_some_and(|pid| send_stop_signal(pid, signal)) {
        deadline.get_or_insert_with(|| Instant::now() + grace);
    } else {
        let _ = child.start_kill();
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
