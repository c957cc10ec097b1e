use super::history::EvaluationRecord;
use super::tools::{
    ADD_ADSORBENT, TEST_MOLECULE_ON_ADSORBENT, TestMoleculeArgs, ToolCall, ToolDefinition,
    ToolOutput, tool_definitions,
};
use crate::core::materials::definition::MaterialDefinition;
use crate::core::materials::registry::MaterialRegistry;
use crate::core::models::formula::molecule_from_formula;
use crate::engine::config::RelaxationConfig;
use crate::engine::evaluator::{EvaluationReport, RelaxationEvaluator};
use crate::engine::progress::ProgressReporter;
use tracing::{info, instrument, warn};

/// State of one search conversation: the materials proposed so far, the evaluator
/// and its configuration, and every evaluation that was requested.
///
/// Tool calls are answered synchronously and in order; none of them ever fails
/// across this boundary, errors are reported back to the agent as tool output.
pub struct SearchSession {
    registry: MaterialRegistry,
    evaluator: RelaxationEvaluator,
    config: RelaxationConfig,
    history: Vec<EvaluationRecord>,
}

impl SearchSession {
    pub fn new(config: RelaxationConfig) -> Self {
        Self::with_evaluator(config, RelaxationEvaluator::default())
    }

    pub fn with_evaluator(config: RelaxationConfig, evaluator: RelaxationEvaluator) -> Self {
        Self {
            registry: MaterialRegistry::new(),
            evaluator,
            config,
            history: Vec::new(),
        }
    }

    pub fn registry(&self) -> &MaterialRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RelaxationConfig {
        &self.config
    }

    pub fn history(&self) -> &[EvaluationRecord] {
        &self.history
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        tool_definitions()
    }

    /// Registers a material and reports `"Success"` or `"Error: <reason>"`.
    #[instrument(skip_all, fields(name = %definition.name))]
    pub fn add_adsorbent(&mut self, definition: MaterialDefinition) -> String {
        match self.registry.register(definition) {
            Ok(receipt) => {
                info!(
                    atoms = receipt.atom_count,
                    formula = %receipt.formula,
                    replaced = receipt.replaced,
                    "Adsorbent registered"
                );
                "Success".to_string()
            }
            Err(e) => {
                warn!(error = %e, "Adsorbent rejected");
                format!("Error: {}", e)
            }
        }
    }

    /// Evaluates the molecule with formula `adsorbate` on a registered material.
    #[instrument(skip(self))]
    pub fn test_molecule_on_adsorbent(&mut self, adsorbate: &str, adsorbent_name: &str) -> ToolOutput {
        match self.run_evaluation(adsorbate, adsorbent_name) {
            Ok(report) => {
                self.history.push(EvaluationRecord {
                    adsorbent: adsorbent_name.to_string(),
                    adsorbate: adsorbate.to_string(),
                    adsorbate_dissociated: Some(report.result.adsorbate_dissociated),
                    adsorbate_desorbed: Some(report.result.adsorbate_desorbed),
                    surface_changed: Some(report.result.surface_changed),
                    adsorbate_intercalated: Some(report.result.adsorbate_intercalated),
                    relaxed_energy: Some(report.result.relaxed_energy),
                    adsorbent_converged: Some(report.adsorbent_relaxation.converged),
                    adsorbate_converged: Some(report.adsorbate_relaxation.converged),
                    error: None,
                });
                ToolOutput::Metrics(report.result)
            }
            Err(message) => {
                warn!(error = %message, "Evaluation failed");
                self.history
                    .push(EvaluationRecord::failed(adsorbent_name, adsorbate, &message));
                ToolOutput::error(message)
            }
        }
    }

    fn run_evaluation(&self, adsorbate: &str, adsorbent_name: &str) -> Result<EvaluationReport, String> {
        let adsorbent = self
            .registry
            .lookup(adsorbent_name)
            .map_err(|e| e.to_string())?;
        let molecule = molecule_from_formula(adsorbate).map_err(|e| e.to_string())?;
        self.evaluator
            .evaluate_detailed(&self.config, &molecule, &adsorbent, &ProgressReporter::new())
            .map_err(|e| e.to_string())
    }

    /// Routes a tool call by name. Unknown tools and malformed arguments become error
    /// output rather than failures.
    pub fn dispatch(&mut self, call: &ToolCall) -> ToolOutput {
        match call.name.as_str() {
            ADD_ADSORBENT => match call.parse_arguments::<MaterialDefinition>() {
                Ok(definition) => ToolOutput::Message(self.add_adsorbent(definition)),
                Err(e) => ToolOutput::Message(format!("Error: invalid arguments: {}", e)),
            },
            TEST_MOLECULE_ON_ADSORBENT => match call.parse_arguments::<TestMoleculeArgs>() {
                Ok(args) => self.test_molecule_on_adsorbent(&args.adsorbate, &args.adsorbent_name),
                Err(e) => ToolOutput::error(format!("Invalid arguments: {}", e)),
            },
            other => {
                warn!(tool = other, "Agent called an unknown tool");
                ToolOutput::error(format!("Unknown tool: {}", other))
            }
        }
    }
}
