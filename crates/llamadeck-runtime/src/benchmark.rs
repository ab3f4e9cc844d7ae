//! Benchmark driver: every prompt against every model, in aggregate mode.

use std::fs;

use llamadeck_core::{BenchmarkMetrics, BenchmarkResult, ModelOptions};
use tracing::{info, warn};

use crate::error::QueryError;
use crate::session::Session;

/// Benchmark `model_names` (name substrings or paths) over `prompts`.
///
/// Yields one result per model, in input order. A model that cannot be
/// loaded or whose query fails is recorded as an error and the batch moves
/// on. The previously active model is restored afterwards.
pub async fn run_benchmark(
    session: &Session,
    model_names: &[String],
    prompts: &[String],
    options: &ModelOptions,
) -> Vec<BenchmarkResult> {
    let previous = session.active_model();
    let mut results = Vec::with_capacity(model_names.len());

    for name in model_names {
        let result = benchmark_model(session, name, prompts, options).await;
        match &result {
            BenchmarkResult::Success { metrics, .. } => info!(
                model = %name,
                tokens = metrics.total_tokens,
                tokens_per_second = metrics.avg_tokens_per_second,
                "Benchmarked model"
            ),
            BenchmarkResult::Error { message, .. } => {
                warn!(model = %name, %message, "Benchmark failed for model");
            }
        }
        results.push(result);
    }

    session.restore_active_model(previous);
    results
}

async fn benchmark_model(
    session: &Session,
    name: &str,
    prompts: &[String],
    options: &ModelOptions,
) -> BenchmarkResult {
    if !session.load_model(name) {
        return BenchmarkResult::Error {
            model: name.to_string(),
            path: None,
            message: QueryError::NoMatch(name.to_string()).to_string(),
        };
    }
    let Some(path) = session.active_model() else {
        return BenchmarkResult::Error {
            model: name.to_string(),
            path: None,
            message: QueryError::NoModelLoaded.to_string(),
        };
    };

    let mut prompt_results = Vec::with_capacity(prompts.len());
    for prompt in prompts {
        match session.complete(prompt, options).await {
            Ok(completion) => prompt_results.push(completion.to_prompt_result(prompt)),
            Err(e) => {
                return BenchmarkResult::Error {
                    model: name.to_string(),
                    path: Some(path),
                    message: e.to_string(),
                };
            }
        }
    }

    BenchmarkResult::Success {
        model: name.to_string(),
        file_size: fs::metadata(&path).map_or(0, |m| m.len()),
        path,
        metrics: BenchmarkMetrics::from_results(&prompt_results),
        results: prompt_results,
    }
}
