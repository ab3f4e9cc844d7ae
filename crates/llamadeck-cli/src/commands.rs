//! Subcommands and their arguments.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use llamadeck_core::ModelOptions;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// List model files in the models directory
    Models {
        /// Show size, quantization, format and modification time
        #[arg(short, long)]
        describe: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run one prompt and print the full response
    Query {
        /// Prompt text
        prompt: String,
        /// Model file name (or substring) or path
        #[arg(short, long)]
        model: String,
        #[command(flatten)]
        generation: GenerationArgs,
    },

    /// Run one prompt and print the response as it is generated
    Stream {
        /// Prompt text
        prompt: String,
        /// Model file name (or substring) or path
        #[arg(short, long)]
        model: String,
        #[command(flatten)]
        generation: GenerationArgs,
    },

    /// Run every prompt against every model and report throughput
    Benchmark {
        /// Models to benchmark (repeatable). Defaults to every listed model
        #[arg(short, long = "model")]
        models: Vec<String>,
        /// Prompt to run (repeatable)
        #[arg(short, long = "prompt")]
        prompts: Vec<String>,
        /// File with one prompt per line
        #[arg(long)]
        prompts_file: Option<PathBuf>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        generation: GenerationArgs,
    },

    /// Show the optional flags the configured llama-cli supports
    Probe {
        /// Print JSON instead of a list
        #[arg(long)]
        json: bool,
    },
}

/// Generation options shared by every command that runs a prompt.
#[derive(Args, Debug, Clone, Default)]
pub struct GenerationArgs {
    /// Sampling temperature (0-2)
    #[arg(long)]
    pub temperature: Option<f32>,
    /// Nucleus sampling threshold (0-1)
    #[arg(long)]
    pub top_p: Option<f32>,
    /// Maximum tokens to generate
    #[arg(short = 'n', long)]
    pub max_tokens: Option<u32>,
    /// Random seed
    #[arg(long)]
    pub seed: Option<i64>,
    /// Context window size
    #[arg(short = 'c', long = "ctx-size")]
    pub context_size: Option<u32>,
}

impl GenerationArgs {
    pub const fn to_options(&self, streaming: bool) -> ModelOptions {
        ModelOptions {
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            seed: self.seed,
            context_size: self.context_size,
            streaming: Some(streaming),
        }
    }
}
