use crate::core::forcefield::builtin::builtin_model;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const CHECKPOINT_EXTENSION: &str = "toml";

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Unknown model '{name}': not in the cache at {cache_dir} and not a built-in model")]
    UnknownModel { name: String, cache_dir: PathBuf },
    #[error("Invalid model name '{0}'")]
    InvalidName(String),
    #[error("Checkpoint file not found: {0}")]
    Missing(PathBuf),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A directory of `<model>.toml` checkpoint files.
///
/// Built-in models are materialized into the cache on first use, so the cache is the
/// single place a calculator factory ever loads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointStore {
    cache_dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Cache location of a model's checkpoint, whether or not it exists yet.
    pub fn path_for(&self, model_name: &str) -> Result<PathBuf, CheckpointError> {
        validate_name(model_name)?;
        Ok(self
            .cache_dir
            .join(format!("{}.{}", model_name, CHECKPOINT_EXTENSION)))
    }

    /// Returns the checkpoint for `model_name`, writing the built-in parameters into
    /// the cache when the model is built in and not cached yet.
    pub fn resolve(&self, model_name: &str) -> Result<PathBuf, CheckpointError> {
        let path = self.path_for(model_name)?;
        if path.is_file() {
            debug!(model = model_name, path = %path.display(), "Using cached checkpoint");
            return Ok(path);
        }

        let content = builtin_model(model_name).ok_or_else(|| CheckpointError::UnknownModel {
            name: model_name.to_string(),
            cache_dir: self.cache_dir.clone(),
        })?;
        self.install(model_name, content.as_bytes())
    }

    /// Resolves an explicit checkpoint path if one is given, otherwise the named model.
    pub fn resolve_with_override(
        &self,
        model_name: &str,
        checkpoint_path: Option<&Path>,
    ) -> Result<PathBuf, CheckpointError> {
        match checkpoint_path {
            Some(path) if path.is_file() => Ok(path.to_path_buf()),
            Some(path) => Err(CheckpointError::Missing(path.to_path_buf())),
            None => self.resolve(model_name),
        }
    }

    /// Writes `bytes` as the checkpoint of `model_name`, replacing any existing file.
    ///
    /// The data goes to a temporary sibling first and is renamed into place, so a
    /// concurrent reader never sees a partial file.
    pub fn install(&self, model_name: &str, bytes: &[u8]) -> Result<PathBuf, CheckpointError> {
        let path = self.path_for(model_name)?;
        fs::create_dir_all(&self.cache_dir).map_err(|source| CheckpointError::Io {
            path: self.cache_dir.clone(),
            source,
        })?;

        let staging = path.with_extension(format!("{}.part", CHECKPOINT_EXTENSION));
        fs::write(&staging, bytes).map_err(|source| CheckpointError::Io {
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &path).map_err(|source| CheckpointError::Io {
            path: path.clone(),
            source,
        })?;

        info!(model = model_name, path = %path.display(), "Installed checkpoint");
        Ok(path)
    }

    /// Names of the models present in the cache, sorted.
    pub fn list(&self) -> Result<Vec<String>, CheckpointError> {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CheckpointError::Io {
                    path: self.cache_dir.clone(),
                    source,
                });
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CheckpointError::Io {
                path: self.cache_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CHECKPOINT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn validate_name(name: &str) -> Result<(), CheckpointError> {
    let bad = name.trim().is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.');
    if bad {
        Err(CheckpointError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::builtin::DEFAULT_MODEL;
    use tempfile::tempdir;

    #[test]
    fn resolve_materializes_builtin_model() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("cache"));
        let path = store.resolve(DEFAULT_MODEL).unwrap();
        assert!(path.is_file());
        assert_eq!(store.list().unwrap(), vec![DEFAULT_MODEL.to_string()]);

        let again = store.resolve(DEFAULT_MODEL).unwrap();
        assert_eq!(path, again);
    }

    #[test]
    fn resolve_prefers_cached_file() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let installed = store.install(DEFAULT_MODEL, b"custom").unwrap();
        let resolved = store.resolve(DEFAULT_MODEL).unwrap();
        assert_eq!(installed, resolved);
        assert_eq!(fs::read_to_string(resolved).unwrap(), "custom");
    }

    #[test]
    fn resolve_unknown_model_fails() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        assert!(matches!(
            store.resolve("no-such-model"),
            Err(CheckpointError::UnknownModel { .. })
        ));
    }

    #[test]
    fn path_traversal_names_are_rejected() {
        let store = CheckpointStore::new("/tmp/cache");
        for name in ["../etc/passwd", "a/b", "", ".hidden", "a\\b"] {
            assert!(
                matches!(store.path_for(name), Err(CheckpointError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn explicit_checkpoint_must_exist() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            store.resolve_with_override(DEFAULT_MODEL, Some(&missing)),
            Err(CheckpointError::Missing(_))
        ));

        fs::write(&missing, "x").unwrap();
        assert_eq!(
            store
                .resolve_with_override(DEFAULT_MODEL, Some(&missing))
                .unwrap(),
            missing
        );
    }

    #[test]
    fn list_of_missing_cache_is_empty() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("absent"));
        assert!(store.list().unwrap().is_empty());
    }
}
