//! Command handlers.
//!
//! Each handler exposes `execute(ctx: &CliContext, ...) -> Result<()>`: it
//! turns arguments into a session call and formats the result for the
//! terminal.

pub mod benchmark;
pub mod models;
pub mod probe;
pub mod query;
pub mod stream;

use std::future::Future;

use llamadeck_runtime::Session;
use tracing::warn;

/// Drive `fut` to completion, stopping every llama-cli process on Ctrl-C.
///
/// After the interrupt the future is still awaited, so it resolves with
/// its own "stopped" outcome rather than being dropped mid-flight.
pub(crate) async fn stop_on_interrupt<F: Future>(session: &Session, fut: F) -> F::Output {
    tokio::pin!(fut);
    tokio::select! {
        output = &mut fut => return output,
        result = tokio::signal::ctrl_c() => {
            if result.is_ok() {
                warn!("Interrupted, stopping llama-cli");
                session.stop_all_processes();
            }
        }
    }
    fut.await
}
