use adsorbent_search::core::materials::registry::RegistryError;
use adsorbent_search::engine::checkpoint::CheckpointError;
use adsorbent_search::engine::error::EngineError;
use adsorbent_search::workflows::evaluate::EvaluateError;
use adsorbent_search::workflows::search::AgentError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Material(#[from] RegistryError),

    #[error(transparent)]
    Evaluation(#[from] EvaluateError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
