//! Argument vector construction for llama-cli.
//!
//! The vector is a pure function of the model path, prompt, resolved options,
//! capability set and thread count. Required flags always come first in a
//! fixed order; capability-gated flags follow in [`CapabilityFlags`]
//! declaration order, so the same inputs always yield the same invocation.

use llamadeck_core::{CapabilityFlags, CapabilitySet, ResolvedOptions};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Worker threads to request from the binary for `cores` available cores.
///
/// One core is reserved for the host process.
pub const fn thread_count(cores: usize) -> usize {
    if cores > 1 { cores - 1 } else { 1 }
}

/// Builder for one llama-cli invocation.
///
/// # Example
///
/// ```rust,ignore
/// let args = LlamaInvocation::new(model_path, "Hello", options)
///     .capabilities(caps)
///     .threads(4)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct LlamaInvocation {
    model_path: PathBuf,
    prompt: String,
    options: ResolvedOptions,
    capabilities: CapabilitySet,
    threads: usize,
}

impl LlamaInvocation {
    /// Create a builder with minimal capabilities and a thread count derived
    /// from the host's cores.
    pub fn new(
        model_path: impl Into<PathBuf>,
        prompt: impl Into<String>,
        options: ResolvedOptions,
    ) -> Self {
        Self {
            model_path: model_path.into(),
            prompt: prompt.into(),
            options,
            capabilities: CapabilitySet::minimal(),
            threads: thread_count(num_cpus::get()),
        }
    }

    /// Use the capabilities detected for the binary.
    #[must_use]
    pub const fn capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Override the thread count.
    #[must_use]
    pub const fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Model the invocation runs.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Build the argument vector (without the binary itself).
    ///
    /// Order:
    /// 1. `-m <model> -p <prompt> --temp <t> --seed <s> -c <ctx> -n <max> -t <threads>`
    /// 2. `--top-p <p>` if supported
    /// 3. `--no-display-prompt`, `--no-mmap`, `--single-turn`, `-no-cnv`, each if supported
    pub fn build(&self) -> Vec<OsString> {
        let opts = &self.options;
        let mut args: Vec<OsString> = vec![
            "-m".into(),
            self.model_path.clone().into_os_string(),
            "-p".into(),
            self.prompt.clone().into(),
            "--temp".into(),
            opts.temperature.to_string().into(),
            "--seed".into(),
            opts.seed.to_string().into(),
            "-c".into(),
            opts.context_size.to_string().into(),
            "-n".into(),
            opts.max_tokens.to_string().into(),
            "-t".into(),
            self.threads.to_string().into(),
        ];

        let caps = &self.capabilities;
        if caps.supports(CapabilityFlags::TOP_P) {
            args.push("--top-p".into());
            args.push(opts.top_p.to_string().into());
        }
        if caps.supports(CapabilityFlags::NO_DISPLAY_PROMPT) {
            args.push("--no-display-prompt".into());
        }
        if caps.supports(CapabilityFlags::NO_MMAP) {
            args.push("--no-mmap".into());
        }
        if caps.supports(CapabilityFlags::SINGLE_TURN) {
            args.push("--single-turn".into());
        }
        if caps.supports(CapabilityFlags::NO_CONVERSATION) {
            args.push("-no-cnv".into());
        }

        args
    }
}
