//! Event emitter trait for relaying stream events to a UI layer.
//!
//! Implementations handle transport details (broadcast channels, a desktop
//! IPC bridge, SSE, ...). The runtime only ever emits named events and
//! forwards payloads.

use crate::events::StreamEvent;

/// Trait for emitting stream events.
///
/// # Implementations
///
/// - `NoopEmitter` - For tests and contexts without a listener
/// - Adapter-specific implementations (`EventBridge` in the runtime, ...)
pub trait StreamEventEmitter: Send + Sync {
    /// Emit one event.
    ///
    /// Must not block: the runtime calls this from its process supervision loop.
    fn emit(&self, event: StreamEvent);
}

/// A no-op event emitter that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    /// Create a new no-op emitter.
    pub const fn new() -> Self {
        Self
    }
}

impl StreamEventEmitter for NoopEmitter {
    fn emit(&self, _event: StreamEvent) {}
}
