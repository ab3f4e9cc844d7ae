//! CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use llamadeck_cli::{Cli, Commands, bootstrap, handlers, install_crash_hook};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before anything reads them
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only responses
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    install_crash_hook();

    let ctx = bootstrap(&cli)?;

    match cli.command {
        Commands::Models { describe, json } => {
            handlers::models::execute(&ctx, describe, json)?;
        }
        Commands::Query {
            prompt,
            model,
            generation,
        } => {
            handlers::query::execute(&ctx, &prompt, &model, &generation.to_options(false)).await?;
        }
        Commands::Stream {
            prompt,
            model,
            generation,
        } => {
            handlers::stream::execute(&ctx, &prompt, &model, &generation.to_options(true)).await?;
        }
        Commands::Benchmark {
            models,
            prompts,
            prompts_file,
            json,
            generation,
        } => {
            handlers::benchmark::execute(
                &ctx,
                models,
                prompts,
                prompts_file.as_deref(),
                json,
                &generation.to_options(false),
            )
            .await?;
        }
        Commands::Probe { json } => {
            handlers::probe::execute(&ctx, json).await?;
        }
    }

    Ok(())
}
