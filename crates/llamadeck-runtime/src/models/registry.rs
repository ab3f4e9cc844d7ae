//! Model directory scanning and the active-model slot.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use llamadeck_core::domain::model::{GGUF_MAGIC, has_gguf_magic, has_model_extension};
use llamadeck_core::ModelInfo;
use tracing::{debug, info, warn};

use crate::error::QueryError;

/// Lists and classifies model files; holds the single active model.
#[derive(Debug)]
pub struct ModelRegistry {
    models_dir: PathBuf,
    active: RwLock<Option<PathBuf>>,
}

impl ModelRegistry {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            active: RwLock::new(None),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Whether at least one model file is present.
    pub fn has_models(&self) -> bool {
        !self.list_models().is_empty()
    }

    /// Absolute paths of model files, sorted by file name.
    ///
    /// A missing or unreadable directory yields an empty list.
    pub fn list_models(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.models_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(
                    dir = %self.models_dir.display(),
                    error = %e,
                    "Models directory not readable"
                );
                return Vec::new();
            }
        };

        let mut models: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_model_extension(path))
            .map(|path| std::path::absolute(&path).unwrap_or(path))
            .collect();
        models.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        models
    }

    /// Describe every listed model.
    ///
    /// Files failing the header check are included with `is_valid = false`.
    pub fn describe_models(&self) -> Vec<ModelInfo> {
        self.list_models()
            .iter()
            .map(|path| describe_model(path))
            .collect()
    }

    /// Resolve a full path, or the first listed model whose file name
    /// contains `name_or_path`.
    pub fn resolve(&self, name_or_path: &str) -> Result<PathBuf, QueryError> {
        let direct = Path::new(name_or_path);
        if direct.is_file() {
            return Ok(std::path::absolute(direct).unwrap_or_else(|_| direct.to_path_buf()));
        }

        self.list_models()
            .into_iter()
            .find(|path| {
                path.file_name()
                    .is_some_and(|n| n.to_string_lossy().contains(name_or_path))
            })
            .filter(|path| path.exists())
            .ok_or_else(|| QueryError::NoMatch(name_or_path.to_string()))
    }

    /// Make a model active. Returns `false` if nothing matches.
    pub fn load_model(&self, name_or_path: &str) -> bool {
        match self.resolve(name_or_path) {
            Ok(path) => {
                info!(model = %path.display(), "Loaded model");
                self.set_active(Some(path));
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to load model");
                false
            }
        }
    }

    /// Path of the active model, if any.
    pub fn active_model(&self) -> Option<PathBuf> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_active(&self, path: Option<PathBuf>) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = path;
    }
}

/// Build a `ModelInfo` from the file's metadata and leading bytes.
pub fn describe_model(path: &Path) -> ModelInfo {
    let (size, modified) = match fs::metadata(path) {
        Ok(meta) => (
            meta.len(),
            meta.modified().map_or_else(|_| DateTime::<Utc>::UNIX_EPOCH, DateTime::<Utc>::from),
        ),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read model metadata");
            (0, DateTime::<Utc>::UNIX_EPOCH)
        }
    };

    ModelInfo::new(path, size, modified, read_magic(path))
}

fn read_magic(path: &Path) -> bool {
    let mut header = [0u8; GGUF_MAGIC.len()];
    File::open(path)
        .and_then(|mut f| f.read_exact(&mut header))
        .is_ok_and(|()| has_gguf_magic(&header))
}
