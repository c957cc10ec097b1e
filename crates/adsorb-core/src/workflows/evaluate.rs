use crate::core::materials::definition::MaterialDefinition;
use crate::core::materials::registry::{RegistryError, build_structure};
use crate::core::models::formula::{FormulaError, molecule_from_formula};
use crate::engine::config::RelaxationConfig;
use crate::engine::error::EngineError;
use crate::engine::evaluator::{EvaluationReport, RelaxationEvaluator};
use crate::engine::progress::ProgressReporter;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum EvaluateError {
    #[error(transparent)]
    Material(#[from] RegistryError),
    #[error(transparent)]
    Formula(#[from] FormulaError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Builds the material from its definition and evaluates the molecule `formula` on it,
/// without going through a registry.
#[instrument(skip_all, name = "evaluate_workflow", fields(adsorbate = formula, adsorbent = %definition.name))]
pub fn run(
    formula: &str,
    definition: &MaterialDefinition,
    config: &RelaxationConfig,
    evaluator: &RelaxationEvaluator,
    reporter: &ProgressReporter,
) -> Result<EvaluationReport, EvaluateError> {
    let adsorbent = build_structure(definition)?;
    let adsorbate = molecule_from_formula(formula)?;
    info!(
        adsorbent_atoms = adsorbent.len(),
        adsorbate_atoms = adsorbate.len(),
        "Starting evaluation"
    );
    Ok(evaluator.evaluate_detailed(config, &adsorbate, &adsorbent, reporter)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn evaluates_definition_directly() {
        let dir = tempdir().unwrap();
        let config = RelaxationConfig::builder()
            .cache_dir(dir.path().to_path_buf())
            .max_steps(10)
            .build()
            .unwrap();
        let definition = MaterialDefinition::new(
            "Cu1",
            "fn create_adsorbent() { atom Cu [0, 0, 0] }",
            "",
        );
        let report = run(
            "CO",
            &definition,
            &config,
            &RelaxationEvaluator::default(),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert!(report.result.relaxed_energy.is_finite());
        assert_eq!(report.trajectory[0].structure.len(), 3);
    }

    #[test]
    fn bad_definition_is_a_material_error() {
        let dir = tempdir().unwrap();
        let config = RelaxationConfig::builder()
            .cache_dir(dir.path().to_path_buf())
            .build()
            .unwrap();
        let definition = MaterialDefinition::new("bad", "fn nope() { atom Cu }", "");
        let result = run(
            "CO",
            &definition,
            &config,
            &RelaxationEvaluator::default(),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EvaluateError::Material(_))));
    }
}
