//! Probe command handler.

use anyhow::Result;

use crate::bootstrap::CliContext;

/// Print the capability set detected for the configured binary.
pub async fn execute(ctx: &CliContext, json: bool) -> Result<()> {
    let capabilities = ctx.session.probe().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&capabilities.names())?);
        return Ok(());
    }

    println!("{}", ctx.session.config().llama_cli_path.display());
    if capabilities.is_minimal() {
        println!("  no optional flags detected");
    }
    for name in capabilities.names() {
        println!("  {name}");
    }
    Ok(())
}
