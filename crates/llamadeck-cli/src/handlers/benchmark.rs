//! Benchmark command handler.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use llamadeck_core::{BenchmarkResult, ModelOptions};
use llamadeck_runtime::run_benchmark;

use super::stop_on_interrupt;
use crate::bootstrap::CliContext;
use crate::presentation::{print_separator, truncate_string};

pub async fn execute(
    ctx: &CliContext,
    models: Vec<String>,
    mut prompts: Vec<String>,
    prompts_file: Option<&Path>,
    json: bool,
    options: &ModelOptions,
) -> Result<()> {
    let session = &ctx.session;

    if let Some(path) = prompts_file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompts from {}", path.display()))?;
        prompts.extend(read_prompts(&text));
    }
    if prompts.is_empty() {
        bail!("No prompts given; use --prompt or --prompts-file");
    }

    let models = if models.is_empty() {
        session
            .list_models()
            .iter()
            .map(|p| p.display().to_string())
            .collect()
    } else {
        models
    };
    if models.is_empty() {
        bail!(
            "No models found in {}",
            session.config().models_dir.display()
        );
    }

    let results =
        stop_on_interrupt(session, run_benchmark(session, &models, &prompts, options)).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_results(&results);
    }
    Ok(())
}

/// Non-blank lines, trimmed.
fn read_prompts(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
}

fn print_results(results: &[BenchmarkResult]) {
    println!(
        "{:<40} {:>8} {:>10} {:>10} {:>10}",
        "Model", "Tokens", "Time (s)", "Tok/s", "Gen tok/s"
    );
    print_separator(82);
    for result in results {
        match result {
            BenchmarkResult::Success { model, metrics, .. } => println!(
                "{:<40} {:>8} {:>10.2} {:>10.2} {:>10.2}",
                truncate_string(model, 39),
                metrics.total_tokens,
                metrics.total_time,
                metrics.avg_tokens_per_second,
                metrics.avg_generation_tokens_per_second
            ),
            BenchmarkResult::Error { model, message, .. } => {
                println!("{:<40} error: {message}", truncate_string(model, 39));
            }
        }
    }
}
