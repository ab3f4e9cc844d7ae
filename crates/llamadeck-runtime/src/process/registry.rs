//! Active-process registry.
//!
//! Maps process identifiers to the handles needed to stop them. Every
//! inserted entry is removed exactly once: by the supervisor when the process
//! reaches a terminal state, or by an explicit stop, whichever comes first.
//! Insert and remove each hold the lock for the whole operation.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use llamadeck_core::QueryId;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::shutdown::{StopSignal, send_stop_signal};

/// Why a process was spawned. Part of its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    /// Aggregate query.
    Standard,
    /// Streaming query.
    Streaming,
}

impl Purpose {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Streaming => "streaming",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the registry keeps per live process.
#[derive(Debug)]
struct RegisteredProcess {
    pid: Option<u32>,
    purpose: Purpose,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
struct Inner {
    processes: HashMap<QueryId, RegisteredProcess>,
    /// Bumped by every stop-all; spawns started under an older epoch are refused.
    epoch: u64,
}

/// Registry of live external processes.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    inner: Mutex<Inner>,
    next_seq: AtomicU64,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Allocate a fresh identifier: `<purpose>-<seq>`.
    pub fn next_id(&self, purpose: Purpose) -> QueryId {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        QueryId::new(format!("{purpose}-{seq}"))
    }

    /// Current stop-all epoch. Capture it before doing async work that ends in a spawn.
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// Register a freshly spawned process.
    ///
    /// Returns `false` (and registers nothing) if a stop-all happened since
    /// `epoch` was captured; the caller must then kill the process itself.
    pub fn insert(
        &self,
        id: QueryId,
        pid: Option<u32>,
        purpose: Purpose,
        epoch: u64,
        cancel: CancellationToken,
    ) -> bool {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            debug!(process_id = %id, "Refusing registration after stop-all");
            return false;
        }
        debug!(process_id = %id, ?pid, %purpose, "Registered process");
        inner.processes.insert(
            id,
            RegisteredProcess {
                pid,
                purpose,
                cancel,
            },
        );
        true
    }

    /// Remove a process on its terminal transition.
    ///
    /// Returns `false` if it was already removed by a stop.
    pub fn remove(&self, id: &QueryId) -> bool {
        let removed = self.lock().processes.remove(id).is_some();
        if removed {
            debug!(process_id = %id, "Unregistered process");
        }
        removed
    }

    /// Number of live processes.
    pub fn len(&self) -> usize {
        self.lock().processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &QueryId) -> bool {
        self.lock().processes.contains_key(id)
    }

    /// Identifiers of live processes with the given purpose.
    pub fn ids(&self, purpose: Purpose) -> Vec<QueryId> {
        self.lock()
            .processes
            .iter()
            .filter(|(_, p)| p.purpose == purpose)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Stop one process. Returns `false` if it is not registered.
    ///
    /// The entry is removed immediately; the process ends as killed.
    pub fn stop(&self, id: &QueryId) -> bool {
        let Some(process) = self.lock().processes.remove(id) else {
            return false;
        };
        info!(process_id = %id, "Stopping process");
        signal_and_cancel(&process);
        true
    }

    /// Stop every registered process and empty the registry.
    ///
    /// Does not wait for any process to exit. Returns how many were signaled.
    pub fn stop_all(&self) -> usize {
        let drained: Vec<(QueryId, RegisteredProcess)> = {
            let mut inner = self.lock();
            inner.epoch += 1;
            inner.processes.drain().collect()
        };

        for (id, process) in &drained {
            debug!(process_id = %id, pid = ?process.pid, "Stopping process");
            signal_and_cancel(process);
        }
        if !drained.is_empty() {
            info!(count = drained.len(), "Stopped all processes");
        }
        drained.len()
    }
}

fn signal_and_cancel(process: &RegisteredProcess) {
    if let Some(pid) = process.pid {
        send_stop_signal(pid, StopSignal::Interrupt);
    }
    // The supervisor loop escalates to a forced kill after the grace period.
    process.cancel.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_tagged() {
        let registry = ProcessRegistry::new();
        let a = registry.next_id(Purpose::Standard);
        let b = registry.next_id(Purpose::Streaming);
        assert_eq!(a.as_str(), "standard-1");
        assert_eq!(b.as_str(), "streaming-2");
        assert_ne!(a, b);
    }

    #[test]
    fn remove_happens_once() {
        let registry = ProcessRegistry::new();
        let id = registry.next_id(Purpose::Standard);
        let epoch = registry.epoch();
        let cancel = CancellationToken::new();
        assert!(registry.insert(id.clone(), None, Purpose::Standard, epoch, cancel));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(&id));
        assert!(!registry.remove(&id));
        assert!(registry.is_empty());
    }

    #[test]
    fn stop_all_cancels_and_empties() {
        let registry = ProcessRegistry::new();
        let epoch = registry.epoch();
        let tokens: Vec<CancellationToken> = (0..2)
            .map(|_| {
                let token = CancellationToken::new();
                let id = registry.next_id(Purpose::Streaming);
                registry.insert(id, None, Purpose::Streaming, epoch, token.clone());
                token
            })
            .collect();

        assert_eq!(registry.stop_all(), 2);
        assert!(registry.is_empty());
        assert!(tokens.iter().all(CancellationToken::is_cancelled));
    }

    #[test]
    fn insert_after_stop_all_is_refused() {
        let registry = ProcessRegistry::new();
        let epoch = registry.epoch();
        registry.stop_all();

        let id = registry.next_id(Purpose::Streaming);
        assert!(!registry.insert(id, None, Purpose::Streaming, epoch, CancellationToken::new()));
        assert!(registry.is_empty());
    }

    #[test]
    fn stop_single_process() {
        let registry = ProcessRegistry::new();
        let epoch = registry.epoch();
        let token = CancellationToken::new();
        let keep = registry.next_id(Purpose::Standard);
        let stop = registry.next_id(Purpose::Streaming);
        registry.insert(keep.clone(), None, Purpose::Standard, epoch, CancellationToken::new());
        registry.insert(stop.clone(), None, Purpose::Streaming, epoch, token.clone());

        assert!(registry.stop(&stop));
        assert!(!registry.stop(&stop));
        assert!(token.is_cancelled());
        assert!(registry.contains(&keep));
        assert_eq!(registry.ids(Purpose::Standard), vec![keep]);
    }
}
