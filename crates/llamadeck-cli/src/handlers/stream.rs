//! Stream command handler: prints chunks as they arrive.

use std::io::{self, Write};

use anyhow::{Result, anyhow, bail};
use llamadeck_core::{ModelOptions, QueryId, StreamEvent};
use llamadeck_runtime::EventReceiver;

use super::stop_on_interrupt;
use crate::bootstrap::CliContext;

pub async fn execute(
    ctx: &CliContext,
    prompt: &str,
    model: &str,
    options: &ModelOptions,
) -> Result<()> {
    let session = &ctx.session;
    if !session.load_model(model) {
        bail!("No model matches '{model}'");
    }

    let mut events = ctx.bridge.subscribe();
    let id = session.stream_query(prompt, options);
    stop_on_interrupt(session, print_stream(&mut events, &id)).await
}

/// Print `id`'s chunks to stdout until its terminal event.
async fn print_stream(events: &mut EventReceiver, id: &QueryId) -> Result<()> {
    let mut stdout = io::stdout();
    loop {
        let Some(event) = events.recv().await else {
            bail!("Event channel closed before the stream ended");
        };
        if event.query_id() != id {
            continue;
        }

        match event {
            StreamEvent::Start { .. } => {}
            StreamEvent::Data { chunk, .. } => {
                stdout.write_all(chunk.as_bytes())?;
                stdout.flush()?;
            }
            StreamEvent::End { .. } => {
                writeln!(stdout)?;
                return Ok(());
            }
            StreamEvent::Error { message, .. } => {
                writeln!(stdout)?;
                return Err(anyhow!(message));
            }
        }
    }
}
