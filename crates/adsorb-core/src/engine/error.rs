use thiserror::Error;

use super::checkpoint::CheckpointError;
use super::config::ConfigError;
use crate::core::forcefield::calculator::CalculatorError;
use crate::core::models::formula::FormulaError;
use crate::core::models::structure::StructureError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Checkpoint resolution failed: {source}")]
    Checkpoint {
        #[from]
        source: CheckpointError,
    },

    #[error("Energy evaluation failed: {source}")]
    Calculator {
        #[from]
        source: CalculatorError,
    },

    #[error("Invalid structure: {source}")]
    Structure {
        #[from]
        source: StructureError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Invalid adsorbate: {source}")]
    Formula {
        #[from]
        source: FormulaError,
    },

    #[error("System of {atoms} atoms exceeds the optimizer limit of {limit}")]
    TooManyAtoms { atoms: usize, limit: usize },

    #[error("Relaxation stage '{stage}' failed: {reason}")]
    StageFailed { stage: &'static str, reason: String },
}
