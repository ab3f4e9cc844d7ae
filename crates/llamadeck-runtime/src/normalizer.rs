//! Output normalization: turning a supervised process into a query result.
//!
//! Aggregate queries resolve to one [`Completion`]. Streaming queries are
//! relayed through a [`StreamSink`], which guarantees the event sequence
//! `start`, `data`*, then exactly one of `end` or `error`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use llamadeck_core::domain::benchmark::tokens_per_second;
use llamadeck_core::{PromptResult, QueryId, StreamEvent, StreamEventEmitter};
use tracing::debug;

use crate::error::QueryError;
use crate::process::ProcessOutcome;

/// Standard-error substrings (matched case-insensitively) that mark a real failure.
const ERROR_MARKERS: [&str; 3] = ["error", "exception", "fatal"];

/// Whether a standard-error line reports a failure rather than progress noise.
pub fn is_error_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    ERROR_MARKERS.iter().any(|m| lower.contains(m))
}

/// Estimate the token count of `text`.
///
/// This is an approximation, not a tokenizer: every run of word characters
/// and every individual punctuation character counts as one token
/// (equivalent to matching `\w+|[^\w\s]`). Real model tokenizers split
/// differently; the estimate is only meant for comparing throughput.
pub fn estimate_tokens(text: &str) -> usize {
    let mut count = 0;
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphanumeric() || c == '_' {
            if !in_word {
                count += 1;
                in_word = true;
            }
        } else {
            in_word = false;
            if !c.is_whitespace() {
                count += 1;
            }
        }
    }
    count
}

/// Timestamps of one process run.
///
/// First output is the first standard-output chunk containing a
/// non-whitespace character; it marks the boundary between setup (model
/// loading) and generation.
#[derive(Debug, Clone, Copy)]
pub struct TimingRecord {
    started: Instant,
    first_output: Option<Instant>,
    last_output: Option<Instant>,
    finished: Option<Instant>,
}

impl TimingRecord {
    pub const fn starting_at(started: Instant) -> Self {
        Self {
            started,
            first_output: None,
            last_output: None,
            finished: None,
        }
    }

    /// Record a standard-output chunk arriving now.
    pub fn record_output(&mut self, chunk: &str) {
        self.record_output_at(chunk, Instant::now());
    }

    pub fn record_output_at(&mut self, chunk: &str, at: Instant) {
        if self.first_output.is_none() {
            if chunk.trim().is_empty() {
                return;
            }
            self.first_output = Some(at);
        }
        self.last_output = Some(at);
    }

    /// Record process exit.
    pub fn finish_at(&mut self, at: Instant) {
        self.finished = Some(at);
    }

    /// Start to last output, or start to exit if nothing was printed.
    pub fn total(&self) -> Duration {
        let end = self.last_output.or(self.finished).unwrap_or(self.started);
        end.saturating_duration_since(self.started)
    }

    /// Start to first output, or the total time if nothing was printed.
    pub fn setup(&self) -> Duration {
        self.first_output
            .map_or_else(|| self.total(), |first| first.saturating_duration_since(self.started))
    }

    /// First to last output, or zero if nothing was printed.
    pub fn generation(&self) -> Duration {
        match (self.first_output, self.last_output) {
            (Some(first), Some(last)) => last.saturating_duration_since(first),
            _ => Duration::ZERO,
        }
    }

    pub const fn has_output(&self) -> bool {
        self.first_output.is_some()
    }
}

/// A successful aggregate query.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub timing: TimingRecord,
}

impl Completion {
    /// Estimated token count of the response.
    pub fn tokens(&self) -> usize {
        estimate_tokens(&self.text)
    }

    /// Benchmark measurements for this completion.
    pub fn to_prompt_result(&self, prompt: &str) -> PromptResult {
        let tokens = self.tokens();
        let total_time = self.timing.total().as_secs_f64();
        let generation_time = self.timing.generation().as_secs_f64();
        PromptResult {
            prompt: prompt.to_string(),
            response: self.text.clone(),
            tokens,
            total_time,
            setup_time: self.timing.setup().as_secs_f64(),
            generation_time,
            tokens_per_second: tokens_per_second(tokens, total_time),
            generation_tokens_per_second: tokens_per_second(tokens, generation_time),
        }
    }
}

/// Classify an aggregate run. Only exit code 0 with output is success.
pub fn interpret_aggregate(outcome: ProcessOutcome) -> Result<Completion, QueryError> {
    if outcome.killed {
        return Err(QueryError::Killed);
    }
    match outcome.exit_code {
        Some(0) if !outcome.stdout.is_empty() => Ok(Completion {
            text: outcome.stdout,
            timing: outcome.timing,
        }),
        Some(0) => Err(QueryError::EmptyOutput),
        code => Err(QueryError::Process { code }),
    }
}

/// Classify a streaming run. A missing exit code also counts as success.
pub fn interpret_streaming(outcome: &ProcessOutcome) -> Result<(), QueryError> {
    if outcome.killed {
        return Err(QueryError::Killed);
    }
    match outcome.exit_code {
        Some(0) | None if !outcome.stdout.is_empty() => Ok(()),
        Some(0) | None => Err(QueryError::EmptyOutput),
        code => Err(QueryError::Process { code }),
    }
}

/// Emits one streaming query's events.
///
/// `end` and `fail` consume the sink, so a query has at most one terminal
/// event. A sink dropped without one emits an `error`, so it also has at
/// least one.
pub struct StreamSink {
    query_id: QueryId,
    emitter: Arc<dyn StreamEventEmitter>,
    accumulated: String,
    finished: bool,
}

impl StreamSink {
    /// Emit `start` and return the sink.
    pub fn start(query_id: QueryId, emitter: Arc<dyn StreamEventEmitter>) -> Self {
        emitter.emit(StreamEvent::Start {
            query_id: query_id.clone(),
        });
        Self {
            query_id,
            emitter,
            accumulated: String::new(),
            finished: false,
        }
    }

    /// Emit one chunk and append it to the full response.
    pub fn data(&mut self, chunk: &str) {
        self.accumulated.push_str(chunk);
        self.emitter.emit(StreamEvent::Data {
            query_id: self.query_id.clone(),
            chunk: chunk.to_string(),
        });
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// Emit `end` with the full response.
    pub fn end(mut self) {
        self.finished = true;
        let full_response = std::mem::take(&mut self.accumulated);
        debug!(query_id = %self.query_id, bytes = full_response.len(), "Stream ended");
        self.emitter.emit(StreamEvent::End {
            query_id: self.query_id.clone(),
            full_response,
        });
    }

    /// Emit `error`.
    pub fn fail(mut self, message: impl Into<String>) {
        self.finished = true;
        let message = message.into();
        debug!(query_id = %self.query_id, %message, "Stream failed");
        self.emitter.emit(StreamEvent::Error {
            query_id: self.query_id.clone(),
            message,
        });
    }
}

impl Drop for StreamSink {
    fn drop(&mut self) {
        if !self.finished {
            self.emitter.emit(StreamEvent::Error {
                query_id: self.query_id.clone(),
                message: "Stream aborted".to_string(),
            });
        }
    }
}
