use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileModelConfig {
    pub name: Option<String>,
    pub local_cache: Option<PathBuf>,
    pub checkpoint_path: Option<PathBuf>,
    pub cpu: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileOptimizerConfig {
    pub fmax: Option<f64>,
    pub steps: Option<usize>,
    pub max_step: Option<f64>,
    pub initial_curvature: Option<f64>,
    pub max_atoms: Option<usize>,
}

/// Either `"top-atom"`, `"origin"` or an `[x, y]` position.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum FileSite {
    Named(String),
    Position([f64; 2]),
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FilePlacementConfig {
    pub vacuum: Option<f64>,
    pub height: Option<f64>,
    pub site: Option<FileSite>,
    pub surface_tolerance: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSearchConfig {
    pub max_turns: Option<usize>,
    pub history: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub model: Option<FileModelConfig>,
    pub optimizer: Option<FileOptimizerConfig>,
    pub placement: Option<FilePlacementConfig>,
    pub search: Option<FileSearchConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading configuration file {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_sections() {
        let config: FileConfig = toml::from_str(
            r#"
            [model]
            name = "lj-generic"
            local-cache = "/tmp/models"
            cpu = false

            [optimizer]
            fmax = 0.05
            steps = 250
            max-step = 0.1

            [placement]
            vacuum = 12.0
            height = 1.5
            site = [1.0, 2.0]

            [search]
            max-turns = 20
            history = "history.csv"
            "#,
        )
        .unwrap();
        let model = config.model.unwrap();
        assert_eq!(model.name.as_deref(), Some("lj-generic"));
        assert_eq!(model.cpu, Some(false));
        assert_eq!(config.optimizer.unwrap().steps, Some(250));
        assert_eq!(config.placement.unwrap().site, Some(FileSite::Position([1.0, 2.0])));
        assert_eq!(config.search.unwrap().max_turns, Some(20));
    }

    #[test]
    fn named_site_is_accepted() {
        let config: FileConfig = toml::from_str("[placement]\nsite = \"origin\"").unwrap();
        assert_eq!(
            config.placement.unwrap().site,
            Some(FileSite::Named("origin".to_string()))
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<FileConfig>("[optimizer]\nfmx = 0.1").is_err());
        assert!(toml::from_str::<FileConfig>("[anneal]\nsteps = 1").is_err());
    }
}
