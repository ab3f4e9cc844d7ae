//! Query command handler: one prompt, full response.

use anyhow::{Result, bail};
use llamadeck_core::ModelOptions;

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

    let response = stop_on_interrupt(session, session.query_model(prompt, options)).await?;
    println!("{response}");
    Ok(())
}
