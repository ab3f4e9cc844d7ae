//! Session facade: the public contract composing registry, probe, builder,
//! supervisor and normalizer per query.
//!
//! One `Session` is constructed at startup and shared by reference (it is
//! cheap to clone) with every consumer.

use std::ffi::OsString;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;

use llamadeck_core::{
    CapabilitySet, ModelInfo, ModelOptions, QueryId, ResolvedOptions, StreamEventEmitter,
};
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::error::QueryError;
use crate::llama::{
    LlamaInvocation, find_shared_library, library_env, library_search_dir, probe_capabilities,
    probe_or_minimal,
};
use crate::models::ModelRegistry;
use crate::normalizer::{
    Completion, StreamSink, interpret_aggregate, interpret_streaming, is_error_line,
};
use crate::process::{Output, ProcessRegistry, Purpose, SpawnSpec, Supervisor};

/// Entry point for model management and queries.
#[derive(Clone)]
pub struct Session {
    config: Arc<RuntimeConfig>,
    models: Arc<ModelRegistry>,
    supervisor: Supervisor,
    emitter: Arc<dyn StreamEventEmitter>,
}

impl Session {
    /// Create a session. Streaming events go to `emitter`.
    pub fn new(config: RuntimeConfig, emitter: Arc<dyn StreamEventEmitter>) -> Self {
        let models = Arc::new(ModelRegistry::new(config.models_dir.clone()));
        Self {
            config: Arc::new(config),
            models,
            supervisor: Supervisor::new(Arc::new(ProcessRegistry::new())),
            emitter,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // === Models ===

    pub fn has_models(&self) -> bool {
        self.models.has_models()
    }

    pub fn list_models(&self) -> Vec<PathBuf> {
        self.models.list_models()
    }

    pub fn describe_models(&self) -> Vec<ModelInfo> {
        self.models.describe_models()
    }

    /// Activate a model by full path or file-name substring.
    pub fn load_model(&self, name_or_path: &str) -> bool {
        self.models.load_model(name_or_path)
    }

    pub fn active_model(&self) -> Option<PathBuf> {
        self.models.active_model()
    }

    pub(crate) fn restore_active_model(&self, path: Option<PathBuf>) {
        self.models.set_active(path);
    }

    // === Queries ===

    /// Merge caller options over the configured defaults.
    pub fn resolve_options(&self, options: &ModelOptions) -> ResolvedOptions {
        options.resolve(&self.config.default_options)
    }

    /// Probe the configured binary, surfacing failures instead of falling back.
    pub async fn probe(&self) -> Result<CapabilitySet, QueryError> {
        let env = self.library_env()?;
        Ok(probe_capabilities(&self.config.llama_cli_path, &env, self.config.probe_timeout).await?)
    }

    /// Run one prompt against the active model and return the full response.
    pub async fn query_model(
        &self,
        prompt: &str,
        options: &ModelOptions,
    ) -> Result<String, QueryError> {
        self.complete(prompt, options).await.map(|c| c.text)
    }

    /// Like [`query_model`](Self::query_model), keeping the timing record.
    pub async fn complete(
        &self,
        prompt: &str,
        options: &ModelOptions,
    ) -> Result<Completion, QueryError> {
        let registry = self.supervisor.registry();
        let id = registry.next_id(Purpose::Standard);
        let epoch = registry.epoch();

        let spec = self.prepare(prompt, options, Purpose::Standard).await?;
        let process = self.supervisor.spawn(id, epoch, spec)?;
        let outcome = process
            .run(|output| {
                if let Output::Stderr(line) = output {
                    debug!(target: "llama_cli", "{line}");
                }
                ControlFlow::Continue(())
            })
            .await;

        interpret_aggregate(outcome)
    }

    /// Start a streaming query and return its identifier immediately.
    ///
    /// Events are delivered through the session's emitter; subscribe before
    /// calling. Every failure, including a missing model, arrives as an
    /// `error` event after `start`. Must be called within a Tokio runtime.
    pub fn stream_query(&self, prompt: impl Into<String>, options: &ModelOptions) -> QueryId {
        let registry = self.supervisor.registry();
        let id = registry.next_id(Purpose::Streaming);
        let epoch = registry.epoch();

        let session = self.clone();
        let query_id = id.clone();
        let prompt = prompt.into();
        let options = *options;
        tokio::spawn(async move {
            session.run_stream(query_id, epoch, prompt, options).await;
        });

        id
    }

    async fn run_stream(&self, id: QueryId, epoch: u64, prompt: String, options: ModelOptions) {
        let emitter = Arc::clone(&self.emitter);

        let process = match self.prepare(&prompt, &options, Purpose::Streaming).await {
            Ok(spec) => self.supervisor.spawn(id.clone(), epoch, spec).map_err(QueryError::from),
            Err(e) => Err(e),
        };
        let process = match process {
            Ok(process) => process,
            Err(e) => {
                warn!(query_id = %id, error = %e, "Streaming query failed to start");
                StreamSink::start(id, emitter).fail(e.to_string());
                return;
            }
        };

        let mut sink = StreamSink::start(id.clone(), emitter);
        let mut stderr_error: Option<String> = None;
        let outcome = process
            .run(|output| match output {
                Output::Stdout(chunk) => {
                    if stderr_error.is_none() {
                        sink.data(chunk);
                    }
                    ControlFlow::Continue(())
                }
                Output::Stderr(line) => {
                    if stderr_error.is_none() && is_error_line(line) {
                        stderr_error = Some(line.clone());
                        ControlFlow::Break(())
                    } else {
                        debug!(target: "llama_cli", "{line}");
                        ControlFlow::Continue(())
                    }
                }
                Output::Progress => ControlFlow::Continue(()),
            })
            .await;

        if let Some(line) = stderr_error {
            warn!(query_id = %id, %line, "llama-cli reported an error");
            sink.fail(QueryError::Stderr(line).to_string());
            return;
        }
        match interpret_streaming(&outcome) {
            Ok(()) => sink.end(),
            Err(e) => {
                warn!(query_id = %id, error = %e, "Streaming query failed");
                sink.fail(e.to_string());
            }
        }
    }

    /// Everything up to the spawn: preconditions, environment, probe, arguments.
    async fn prepare(
        &self,
        prompt: &str,
        options: &ModelOptions,
        purpose: Purpose,
    ) -> Result<SpawnSpec, QueryError> {
        let model = self.models.active_model().ok_or(QueryError::NoModelLoaded)?;
        let env = self.library_env()?;

        let binary = &self.config.llama_cli_path;
        let capabilities = probe_or_minimal(binary, &env, self.config.probe_timeout).await;
        let args = LlamaInvocation::new(model, prompt, self.resolve_options(options))
            .capabilities(capabilities)
            .build();

        let watchdog = match purpose {
            Purpose::Standard => self.config.standard_watchdog,
            Purpose::Streaming => self.config.streaming_watchdog,
        };

        Ok(SpawnSpec {
            binary: binary.clone(),
            args,
            env,
            purpose,
            watchdog,
            kill_grace: self.config.kill_grace,
        })
    }

    /// Library search path entries for the child, after checking the
    /// shared library is present when required.
    fn library_env(&self) -> Result<Vec<(OsString, OsString)>, QueryError> {
        let binary = &self.config.llama_cli_path;
        let configured = self.config.library_dir.as_deref();
        let dir = library_search_dir(binary, configured);

        if self.config.require_shared_library && find_shared_library(binary, configured).is_none()
        {
            return Err(QueryError::LibraryUnavailable {
                dir: dir.unwrap_or_default(),
            });
        }

        Ok(dir.map(|d| library_env(&d)).unwrap_or_default())
    }

    // === Process control ===

    /// Signal every live process and empty the registry. Does not wait.
    pub fn stop_all_processes(&self) -> usize {
        let count = self.supervisor.registry().stop_all();
        info!(count, "stop_all_processes");
        count
    }

    /// Stop one query. Returns `false` if it is not running.
    pub fn stop_query(&self, id: &QueryId) -> bool {
        self.supervisor.registry().stop(id)
    }

    /// Number of live external processes.
    pub fn active_process_count(&self) -> usize {
        self.supervisor.registry().len()
    }
}
