//! Root CLI structure and global options.

use std::path::PathBuf;

use clap::Parser;
use llamadeck_core::SettingsUpdate;

use crate::commands::Commands;

/// Run prompts against local GGUF models through `llama-cli`.
#[derive(Parser)]
#[command(name = "llamadeck")]
#[command(about = "Run prompts against local GGUF models through llama-cli")]
#[command(version)]
pub struct Cli {
    /// Settings file to load instead of <data dir>/settings.json
    #[arg(long, global = true, env = "LLAMADECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the models directory for this invocation
    #[arg(long = "models-dir", global = true)]
    pub models_dir: Option<String>,

    /// Override the llama-cli binary for this invocation
    #[arg(long = "llama-cli", global = true)]
    pub llama_cli: Option<String>,

    /// Override the shared library directory for this invocation
    #[arg(long = "library-dir", global = true)]
    pub library_dir: Option<String>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Command-line overrides, applied over the settings file.
    pub fn settings_update(&self) -> SettingsUpdate {
        SettingsUpdate {
            llama_cli_path: self.llama_cli.clone().map(Some),
            library_dir: self.library_dir.clone().map(Some),
            models_dir: self.models_dir.clone().map(Some),
            ..SettingsUpdate::default()
        }
    }
}
