//! Benchmark result types.
//!
//! A benchmark runs a list of prompts against one or more models. Each model
//! yields exactly one [`BenchmarkResult`]: a success carrying per-prompt
//! measurements, or an error describing why the model could not be measured.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tokens per second, or zero when the elapsed time is zero.
#[allow(clippy::cast_precision_loss)]
pub fn tokens_per_second(tokens: usize, seconds: f64) -> f64 {
    if seconds > 0.0 {
        tokens as f64 / seconds
    } else {
        0.0
    }
}

/// Measurements for one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptResult {
    pub prompt: String,
    pub response: String,
    /// Estimated token count of the response.
    pub tokens: usize,
    /// Seconds from spawn to last output.
    pub total_time: f64,
    /// Seconds from spawn to first output.
    pub setup_time: f64,
    /// Seconds from first to last output.
    pub generation_time: f64,
    /// `tokens / total_time`.
    pub tokens_per_second: f64,
    /// `tokens / generation_time`.
    pub generation_tokens_per_second: f64,
}

/// Sums and derived ratios over a model's prompt results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkMetrics {
    pub total_tokens: usize,
    pub total_time: f64,
    pub total_setup_time: f64,
    pub total_generation_time: f64,
    /// Total tokens over total time.
    pub avg_tokens_per_second: f64,
    /// Total tokens over total generation time.
    pub avg_generation_tokens_per_second: f64,
}

impl BenchmarkMetrics {
    /// Aggregate prompt results.
    pub fn from_results(results: &[PromptResult]) -> Self {
        let total_tokens = results.iter().map(|r| r.tokens).sum();
        let total_time = results.iter().map(|r| r.total_time).sum();
        let total_setup_time = results.iter().map(|r| r.setup_time).sum();
        let total_generation_time = results.iter().map(|r| r.generation_time).sum();

        Self {
            total_tokens,
            total_time,
            total_setup_time,
            total_generation_time,
            avg_tokens_per_second: tokens_per_second(total_tokens, total_time),
            avg_generation_tokens_per_second: tokens_per_second(
                total_tokens,
                total_generation_time,
            ),
        }
    }
}

/// Outcome of benchmarking one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BenchmarkResult {
    Success {
        model: String,
        path: PathBuf,
        #[serde(rename = "fileSize")]
        file_size: u64,
        results: Vec<PromptResult>,
        metrics: BenchmarkMetrics,
    },
    Error {
        model: String,
        path: Option<PathBuf>,
        message: String,
    },
}

impl BenchmarkResult {
    /// Name of the model this result belongs to.
    pub fn model(&self) -> &str {
        match self {
            Self::Success { model, .. } | Self::Error { model, .. } => model,
        }
    }

    /// Whether the model was measured successfully.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt_result(tokens: usize, setup: f64, generation: f64) -> PromptResult {
        let total = setup + generation;
        PromptResult {
            prompt: "p".into(),
            response: "r".into(),
            tokens,
            total_time: total,
            setup_time: setup,
            generation_time: generation,
            tokens_per_second: tokens_per_second(tokens, total),
            generation_tokens_per_second: tokens_per_second(tokens, generation),
        }
    }

    #[test]
    fn zero_time_yields_zero_rate() {
        let rate = tokens_per_second(100, 0.0);
        assert!(rate.abs() < f64::EPSILON);
        assert!(rate.is_finite());
    }

    #[test]
    fn metrics_sum_and_ratio() {
        let results = vec![prompt_result(10, 1.0, 1.0), prompt_result(30, 1.0, 1.0)];
        let m = BenchmarkMetrics::from_results(&results);
        assert_eq!(m.total_tokens, 40);
        assert!((m.total_time - 4.0).abs() < 1e-9);
        assert!((m.total_generation_time - 2.0).abs() < 1e-9);
        assert!((m.avg_tokens_per_second - 10.0).abs() < 1e-9);
        assert!((m.avg_generation_tokens_per_second - 20.0).abs() < 1e-9);
    }

    #[test]
    fn empty_results_have_zero_metrics() {
        assert_eq!(BenchmarkMetrics::from_results(&[]), BenchmarkMetrics::default());
    }

    #[test]
    fn result_serializes_with_status_tag() {
        let err = BenchmarkResult::Error {
            model: "tiny".into(),
            path: None,
            message: "boom".into(),
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"status\":\"error\""));
        assert_eq!(err.model(), "tiny");
        assert!(!err.is_success());
    }
}
