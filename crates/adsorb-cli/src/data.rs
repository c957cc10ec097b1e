use crate::error::{CliError, Result};
use adsorbent_search::core::forcefield::builtin::builtin_model_names;
use adsorbent_search::core::forcefield::params::ModelParams;
use adsorbent_search::engine::checkpoint::CheckpointStore;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tracing::info;

pub enum DownloadProgress {
    Started { total_size: Option<u64> },
    Downloading { downloaded: u64 },
    Installing,
}

/// Where a listed model comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEntry {
    pub name: String,
    pub cached: bool,
    pub builtin: bool,
}

pub struct ModelManager {
    store: CheckpointStore,
}

impl ModelManager {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            store: CheckpointStore::new(cache_dir),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        self.store.cache_dir()
    }

    pub fn checkpoint_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.store.path_for(name)?)
    }

    /// Cached models merged with the built-in ones, sorted by name.
    pub fn list(&self) -> Result<Vec<ModelEntry>> {
        let cached = self.store.list()?;
        let mut entries: Vec<ModelEntry> = cached
            .iter()
            .map(|name| ModelEntry {
                name: name.clone(),
                cached: true,
                builtin: false,
            })
            .collect();
        for name in builtin_model_names() {
            match entries.iter_mut().find(|e| e.name == name) {
                Some(entry) => entry.builtin = true,
                None => entries.push(ModelEntry {
                    name: name.to_string(),
                    cached: false,
                    builtin: true,
                }),
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Downloads a checkpoint, checks that it parses as model parameters, and
    /// installs it into the cache.
    pub async fn download_checkpoint(
        &self,
        name: &str,
        url: &str,
        force: bool,
        mut progress_callback: impl FnMut(DownloadProgress),
    ) -> Result<PathBuf> {
        let target = self.store.path_for(name)?;
        if target.exists() && !force {
            return Err(CliError::Argument(format!(
                "Model '{}' is already cached at {}. Use --force to overwrite.",
                name,
                target.display()
            )));
        }

        info!("Sending request to {}", url);
        let client = reqwest::Client::new();
        let response = client.get(url).send().await?.error_for_status()?;

        let total_size = response.content_length();
        progress_callback(DownloadProgress::Started { total_size });

        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::with_capacity(total_size.unwrap_or(0) as usize);

        while let Some(item) = stream.next().await {
            let chunk = item?;
            buffer.extend_from_slice(&chunk);
            downloaded += chunk.len() as u64;
            progress_callback(DownloadProgress::Downloading { downloaded });
        }

        progress_callback(DownloadProgress::Installing);
        self.install(name, url, &buffer)
    }

    fn install(&self, name: &str, origin: &str, bytes: &[u8]) -> Result<PathBuf> {
        let content = std::str::from_utf8(bytes).map_err(|e| CliError::FileParsing {
            path: PathBuf::from(origin),
            source: e.into(),
        })?;
        ModelParams::from_toml_str(content, origin).map_err(|e| CliError::FileParsing {
            path: PathBuf::from(origin),
            source: e.into(),
        })?;
        Ok(self.store.install(name, bytes)?)
    }
}
