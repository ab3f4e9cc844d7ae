//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the core expects from adapters. They contain
//! no transport details and use only domain types.

pub mod event_emitter;

pub use event_emitter::{NoopEmitter, StreamEventEmitter};
