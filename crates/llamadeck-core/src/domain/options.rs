//! Generation options for a single query.
//!
//! `ModelOptions` is the partial, caller-facing record (every field optional).
//! `ResolvedOptions` is the fully populated form the command builder consumes;
//! the only way to obtain one from caller input is [`ModelOptions::resolve`].

use serde::{Deserialize, Serialize};

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default nucleus sampling threshold.
pub const DEFAULT_TOP_P: f32 = 0.9;
/// Default generation length cap.
pub const DEFAULT_MAX_TOKENS: u32 = 512;
/// Default determinism key.
pub const DEFAULT_SEED: i64 = 42;
/// Default context window length.
pub const DEFAULT_CONTEXT_SIZE: u32 = 2048;

/// Caller-supplied generation options. Unset fields fall back to defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelOptions {
    /// Generation randomness.
    pub temperature: Option<f32>,
    /// Nucleus sampling threshold.
    pub top_p: Option<f32>,
    /// Generation length cap.
    pub max_tokens: Option<u32>,
    /// Determinism key.
    pub seed: Option<i64>,
    /// Context window length.
    pub context_size: Option<u32>,
    /// Selects incremental vs. aggregate delivery.
    pub streaming: Option<bool>,
}

impl ModelOptions {
    /// Layer `self` over `base`: fields set here win, unset fields come from `base`.
    #[must_use]
    pub fn or(self, base: Self) -> Self {
        Self {
            temperature: self.temperature.or(base.temperature),
            top_p: self.top_p.or(base.top_p),
            max_tokens: self.max_tokens.or(base.max_tokens),
            seed: self.seed.or(base.seed),
            context_size: self.context_size.or(base.context_size),
            streaming: self.streaming.or(base.streaming),
        }
    }

    /// Merge over a fully populated default record.
    #[must_use]
    pub fn resolve(&self, defaults: &ResolvedOptions) -> ResolvedOptions {
        ResolvedOptions {
            temperature: self.temperature.unwrap_or(defaults.temperature),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            seed: self.seed.unwrap_or(defaults.seed),
            context_size: self.context_size.unwrap_or(defaults.context_size),
            streaming: self.streaming.unwrap_or(defaults.streaming),
        }
    }

    /// Builder-style setter for temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Builder-style setter for the generation length cap.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Builder-style setter for the seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder-style setter for the context window.
    #[must_use]
    pub const fn with_context_size(mut self, context_size: u32) -> Self {
        self.context_size = Some(context_size);
        self
    }
}

/// Fully populated options. No field can be unset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub seed: i64,
    pub context_size: u32,
    pub streaming: bool,
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            max_tokens: DEFAULT_MAX_TOKENS,
            seed: DEFAULT_SEED,
            context_size: DEFAULT_CONTEXT_SIZE,
            streaming: false,
        }
    }
}
