//! External process supervision.
//!
//! - `registry`: live processes, keyed by identifier, for stop-one / stop-all
//! - `supervisor`: spawn, watchdog, exit interpretation
//! - `stream`: UTF-8-safe output readers
//! - `shutdown`: platform stop signals

mod registry;
mod shutdown;
mod stream;
mod supervisor;

pub use registry::{ProcessRegistry, Purpose};
pub use shutdown::{StopSignal, send_stop_signal};
pub use stream::{Output, Utf8Carry};
pub use supervisor::{ProcessOutcome, SpawnSpec, SupervisedProcess, Supervisor};
