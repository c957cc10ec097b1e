use super::anomaly::AnomalyDetector;
use super::checkpoint::CheckpointStore;
use super::config::RelaxationConfig;
use super::error::EngineError;
use super::optimizer::{Bfgs, RelaxationSummary, TrajectoryFrame};
use super::placement::{add_adsorbate, assign_surface_tags};
use super::progress::{Progress, ProgressReporter};
use crate::core::forcefield::calculator::{
    Calculator, CalculatorFactory, Device, PairPotentialFactory,
};
use crate::core::models::structure::AtomicStructure;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

const Z_AXIS: usize = 2;

/// Metrics returned to the agent for one adsorbate/adsorbent pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub adsorbate_dissociated: bool,
    pub adsorbate_desorbed: bool,
    pub surface_changed: bool,
    pub adsorbate_intercalated: bool,
    /// Potential energy of the relaxed combined system (eV).
    pub relaxed_energy: f64,
}

/// An [`EvaluationResult`] together with the optimizer outcomes and the recorded
/// adsorbate trajectory.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub result: EvaluationResult,
    pub adsorbent_relaxation: RelaxationSummary,
    pub adsorbate_relaxation: RelaxationSummary,
    pub trajectory: Vec<TrajectoryFrame>,
}

impl EvaluationReport {
    pub fn converged(&self) -> bool {
        self.adsorbent_relaxation.converged && self.adsorbate_relaxation.converged
    }
}

/// Runs the two-stage relaxation of an adsorbate on an adsorbent.
///
/// The evaluator itself is stateless. Calculators are created per evaluation from
/// the checkpoint the configuration resolves to.
pub struct RelaxationEvaluator {
    factory: Box<dyn CalculatorFactory>,
}

impl Default for RelaxationEvaluator {
    fn default() -> Self {
        Self::new(Box::new(PairPotentialFactory))
    }
}

impl RelaxationEvaluator {
    pub fn new(factory: Box<dyn CalculatorFactory>) -> Self {
        Self { factory }
    }

    pub fn load_calculator(
        &self,
        config: &RelaxationConfig,
    ) -> Result<Box<dyn Calculator>, EngineError> {
        let store = CheckpointStore::new(&config.cache_dir);
        let checkpoint =
            store.resolve_with_override(&config.model_name, config.checkpoint_path.as_deref())?;
        Ok(self
            .factory
            .create(&checkpoint, Device::from_run_on_cpu(config.run_on_cpu))?)
    }

    pub fn evaluate(
        &self,
        config: &RelaxationConfig,
        adsorbate: &AtomicStructure,
        adsorbent: &AtomicStructure,
    ) -> Result<EvaluationResult, EngineError> {
        self.evaluate_detailed(config, adsorbate, adsorbent, &ProgressReporter::new())
            .map(|report| report.result)
    }

    /// Relaxes the adsorbent, places the adsorbate on it, relaxes the combined system
    /// and classifies the adsorbate trajectory. Neither input is modified.
    #[instrument(skip_all, name = "evaluate", fields(
        model = %config.model_name,
        adsorbate = %adsorbate.chemical_formula(),
        adsorbent = %adsorbent.chemical_formula(),
    ))]
    pub fn evaluate_detailed(
        &self,
        config: &RelaxationConfig,
        adsorbate: &AtomicStructure,
        adsorbent: &AtomicStructure,
        reporter: &ProgressReporter,
    ) -> Result<EvaluationReport, EngineError> {
        adsorbate.validate()?;
        adsorbent.validate()?;
        let settings = &config.settings;
        let atoms = adsorbate.len() + adsorbent.len();
        if atoms > settings.max_atoms {
            return Err(EngineError::TooManyAtoms {
                atoms,
                limit: settings.max_atoms,
            });
        }

        let calculator = self.load_calculator(config)?;
        let optimizer = Bfgs::new(
            calculator.as_ref(),
            settings.max_step,
            settings.initial_curvature,
        );

        let mut slab = adsorbent.clone();
        let molecule = adsorbate.clone();

        reporter.report(Progress::PhaseStart {
            name: "Adsorbent Relaxation",
        });
        slab.center(Some(settings.vacuum), Z_AXIS)?;
        let adsorbent_relaxation = optimizer.run(
            &mut slab,
            config.force_convergence_threshold,
            config.max_steps,
            None,
            reporter,
        )?;
        slab.center(Some(settings.vacuum), Z_AXIS)?;
        reporter.report(Progress::PhaseFinish);
        if !adsorbent_relaxation.converged {
            warn!(
                steps = adsorbent_relaxation.steps,
                max_force = adsorbent_relaxation.max_force,
                "Adsorbent relaxation did not converge"
            );
        }

        reporter.report(Progress::PhaseStart {
            name: "Adsorbate Relaxation",
        });
        assign_surface_tags(&mut slab, settings.surface_layer_tolerance);
        add_adsorbate(
            &mut slab,
            &molecule,
            settings.adsorbate_height,
            settings.site,
        );
        let mut trajectory = Vec::with_capacity(config.max_steps + 1);
        let adsorbate_relaxation = optimizer.run(
            &mut slab,
            config.force_convergence_threshold,
            config.max_steps,
            Some(&mut trajectory),
            reporter,
        )?;
        reporter.report(Progress::PhaseFinish);
        if !adsorbate_relaxation.converged {
            warn!(
                steps = adsorbate_relaxation.steps,
                max_force = adsorbate_relaxation.max_force,
                "Adsorbate relaxation did not converge"
            );
        }

        let (first, last) = match (trajectory.first(), trajectory.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(EngineError::StageFailed {
                    stage: "anomaly detection",
                    reason: "no trajectory frames were recorded".to_string(),
                });
            }
        };
        let flags = AnomalyDetector::new(
            &first.structure,
            &last.structure,
            settings.surface_change_multiplier,
            settings.desorption_multiplier,
            settings.neighbor_skin,
        )
        .detect()?;

        let result = EvaluationResult {
            adsorbate_dissociated: flags.adsorbate_dissociated,
            adsorbate_desorbed: flags.adsorbate_desorbed,
            surface_changed: flags.surface_changed,
            adsorbate_intercalated: flags.adsorbate_intercalated,
            relaxed_energy: adsorbate_relaxation.energy,
        };
        info!(
            energy = result.relaxed_energy,
            dissociated = result.adsorbate_dissociated,
            desorbed = result.adsorbate_desorbed,
            surface_changed = result.surface_changed,
            intercalated = result.adsorbate_intercalated,
            "Evaluation complete"
        );

        Ok(EvaluationReport {
            result,
            adsorbent_relaxation,
            adsorbate_relaxation,
            trajectory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::elements::Element;
    use crate::core::models::atom::{Atom, AtomTag};
    use crate::core::models::formula::molecule_from_formula;
    use crate::engine::checkpoint::CheckpointError;
    use crate::engine::config::{DEFAULT_MAX_ATOMS, EvaluatorSettings};
    use nalgebra::Point3;
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};

    fn config(dir: &TempDir) -> RelaxationConfig {
        RelaxationConfig::builder()
            .cache_dir(dir.path().to_path_buf())
            .max_steps(50)
            .build()
            .unwrap()
    }

    fn single_copper() -> AtomicStructure {
        AtomicStructure::from_atoms(vec![Atom::new(
            Element::from_symbol("Cu").unwrap(),
            Point3::origin(),
        )])
    }

    #[test]
    fn result_serializes_to_exactly_five_keys() {
        let result = EvaluationResult {
            adsorbate_dissociated: false,
            adsorbate_desorbed: true,
            surface_changed: false,
            adsorbate_intercalated: false,
            relaxed_energy: -1.5,
        };
        let value = serde_json::to_value(result).unwrap();
        let object = value.as_object().unwrap();
        let mut keys: Vec<_> = object.keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "adsorbate_desorbed",
                "adsorbate_dissociated",
                "adsorbate_intercalated",
                "relaxed_energy",
                "surface_changed",
            ]
        );
    }

    #[test]
    fn co2_on_single_copper_atom_produces_finite_energy() {
        let dir = tempdir().unwrap();
        let co2 = molecule_from_formula("CO2").unwrap();
        let report = RelaxationEvaluator::default()
            .evaluate_detailed(&config(&dir), &co2, &single_copper(), &ProgressReporter::new())
            .unwrap();

        assert!(report.result.relaxed_energy.is_finite());
        assert_eq!(report.trajectory.len(), report.adsorbate_relaxation.steps + 1);
        let first = &report.trajectory[0].structure;
        assert_eq!(first.len(), 4);
        assert_eq!(first.atoms()[0].tag, AtomTag::Surface);
        assert!(first.atoms()[1..].iter().all(|a| a.tag == AtomTag::Adsorbate));
        assert!((first.atoms()[1].position.z - first.atoms()[0].position.z - 1.2).abs() < 1e-9);
    }

    #[test]
    fn inputs_are_not_modified() {
        let dir = tempdir().unwrap();
        let co = molecule_from_formula("CO").unwrap();
        let adsorbent = single_copper();
        RelaxationEvaluator::default()
            .evaluate(&config(&dir), &co, &adsorbent)
            .unwrap();
        assert_eq!(adsorbent, single_copper());
        assert_eq!(co, molecule_from_formula("CO").unwrap());
    }

    #[test]
    fn evaluation_is_deterministic() {
        let dir = tempdir().unwrap();
        let co2 = molecule_from_formula("CO2").unwrap();
        let evaluator = RelaxationEvaluator::default();
        let first = evaluator.evaluate(&config(&dir), &co2, &single_copper()).unwrap();
        let second = evaluator.evaluate(&config(&dir), &co2, &single_copper()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn zero_steps_still_reports_metrics() {
        let dir = tempdir().unwrap();
        let config = RelaxationConfig::builder()
            .cache_dir(dir.path().to_path_buf())
            .max_steps(0)
            .build()
            .unwrap();
        let co2 = molecule_from_formula("CO2").unwrap();
        let report = RelaxationEvaluator::default()
            .evaluate_detailed(&config, &co2, &single_copper(), &ProgressReporter::new())
            .unwrap();
        assert!(!report.converged());
        assert_eq!(report.trajectory.len(), 1);
        assert!(!report.result.adsorbate_dissociated);
    }

    #[test]
    fn missing_explicit_checkpoint_is_an_error() {
        let dir = tempdir().unwrap();
        let config = RelaxationConfig::builder()
            .cache_dir(dir.path().to_path_buf())
            .checkpoint_path(Some(PathBuf::from("/nonexistent/model.toml")))
            .build()
            .unwrap();
        let co = molecule_from_formula("CO").unwrap();
        let result = RelaxationEvaluator::default().evaluate(&config, &co, &single_copper());
        assert!(matches!(
            result,
            Err(EngineError::Checkpoint {
                source: CheckpointError::Missing(_)
            })
        ));
    }

    #[test]
    fn unknown_model_is_an_error() {
        let dir = tempdir().unwrap();
        let config = RelaxationConfig::builder()
            .cache_dir(dir.path().to_path_buf())
            .model_name("not-a-model")
            .build()
            .unwrap();
        let co = molecule_from_formula("CO").unwrap();
        let result = RelaxationEvaluator::default().evaluate(&config, &co, &single_copper());
        assert!(matches!(
            result,
            Err(EngineError::Checkpoint {
                source: CheckpointError::UnknownModel { .. }
            })
        ));
    }

    #[test]
    fn oversized_system_is_refused_before_relaxing() {
        let dir = tempdir().unwrap();
        let co = molecule_from_formula("CO").unwrap();
        let copper = Element::from_symbol("Cu").unwrap();
        let slab = AtomicStructure::from_atoms(
            (0..DEFAULT_MAX_ATOMS)
                .map(|i| Atom::new(copper, Point3::new(2.5 * i as f64, 0.0, 0.0)))
                .collect(),
        );
        let result = RelaxationEvaluator::default().evaluate(&config(&dir), &co, &slab);
        assert!(matches!(
            result,
            Err(EngineError::TooManyAtoms { atoms, limit: DEFAULT_MAX_ATOMS })
                if atoms == DEFAULT_MAX_ATOMS + 2
        ));

        let tight = RelaxationConfig::builder()
            .cache_dir(dir.path().to_path_buf())
            .settings(EvaluatorSettings {
                max_atoms: 3,
                ..EvaluatorSettings::default()
            })
            .build()
            .unwrap();
        let evaluator = RelaxationEvaluator::default();
        assert!(evaluator.evaluate(&tight, &co, &single_copper()).is_ok());
        let co2 = molecule_from_formula("CO2").unwrap();
        assert!(matches!(
            evaluator.evaluate(&tight, &co2, &single_copper()),
            Err(EngineError::TooManyAtoms { atoms: 4, limit: 3 })
        ));
    }

    #[test]
    fn empty_adsorbent_is_an_error() {
        let dir = tempdir().unwrap();
        let co = molecule_from_formula("CO").unwrap();
        let result =
            RelaxationEvaluator::default().evaluate(&config(&dir), &co, &AtomicStructure::default());
        assert!(result.is_err());
    }
}
