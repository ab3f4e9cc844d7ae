//! Process orchestration and streaming runtime for llamadeck.
//!
//! Drives the external `llama-cli` binary: probes its capabilities, builds
//! its argument vector, supervises each spawned process (environment,
//! watchdog, stop-one and stop-all) and normalizes its output into either a
//! completed response or an ordered stream of events.
//!
//! ```text
//! Session -> ModelRegistry -> probe -> LlamaInvocation -> Supervisor -> normalizer
//! ```
#![deny(unsafe_code)]

mod benchmark;
mod bridge;
pub mod config;
mod error;
pub mod llama;
pub mod models;
pub mod normalizer;
pub mod process;
mod session;

pub use benchmark::run_benchmark;
pub use bridge::{EventBridge, EventReceiver};
pub use config::{ConfigError, RuntimeConfig, load_settings};
pub use error::{QueryError, SupervisorError};
pub use llama::ProbeError;
pub use normalizer::{Completion, TimingRecord, estimate_tokens};
pub use session::Session;
