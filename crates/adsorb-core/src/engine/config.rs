use crate::core::forcefield::builtin::DEFAULT_MODEL;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
}

/// Where the first adsorbate atom is placed in the surface plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AdsorbateSite {
    /// Directly above the highest atom of the adsorbent.
    #[default]
    TopAtom,
    /// Above the Cartesian origin of the surface plane.
    Origin,
    /// Above an explicit `(x, y)` position in Angstroms.
    Position { x: f64, y: f64 },
}

/// Constants of the two-stage relaxation procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorSettings {
    /// Vacuum padding (Angstroms) applied along z before and after relaxing the adsorbent.
    pub vacuum: f64,
    /// Height (Angstroms) of the first adsorbate atom above the highest adsorbent atom.
    pub adsorbate_height: f64,
    pub site: AdsorbateSite,
    /// Largest displacement of any atom in a single optimizer step.
    pub max_step: f64,
    /// Diagonal of the initial BFGS Hessian (eV/Angstrom^2).
    pub initial_curvature: f64,
    /// Natural-cutoff multiplier for slab connectivity.
    pub surface_change_multiplier: f64,
    /// Natural-cutoff multiplier for adsorbate-slab contact.
    pub desorption_multiplier: f64,
    pub neighbor_skin: f64,
    /// Atoms within this distance of the highest atom count as surface atoms when
    /// the adsorbent carries no surface tags of its own.
    pub surface_layer_tolerance: f64,
    /// Largest combined adsorbate and adsorbent size the optimizer accepts. BFGS
    /// keeps a dense 3N x 3N Hessian.
    pub max_atoms: usize,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            vacuum: 10.0,
            adsorbate_height: 1.2,
            site: AdsorbateSite::TopAtom,
            max_step: 0.2,
            initial_curvature: 70.0,
            surface_change_multiplier: 1.5,
            desorption_multiplier: 1.5,
            neighbor_skin: 0.3,
            surface_layer_tolerance: 1.0,
            max_atoms: DEFAULT_MAX_ATOMS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelaxationConfig {
    pub model_name: String,
    /// Explicit checkpoint file. Takes precedence over `model_name`.
    pub checkpoint_path: Option<PathBuf>,
    pub cache_dir: PathBuf,
    pub run_on_cpu: bool,
    /// Optimizer stops once every per-atom force is below this (eV/Angstrom).
    pub force_convergence_threshold: f64,
    pub max_steps: usize,
    pub settings: EvaluatorSettings,
}

impl RelaxationConfig {
    pub fn builder() -> RelaxationConfigBuilder {
        RelaxationConfigBuilder::new()
    }
}

pub const DEFAULT_FMAX: f64 = 0.01;
pub const DEFAULT_MAX_STEPS: usize = 100;
pub const DEFAULT_MAX_ATOMS: usize = 500;

#[derive(Default)]
pub struct RelaxationConfigBuilder {
    model_name: Option<String>,
    checkpoint_path: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    run_on_cpu: Option<bool>,
    force_convergence_threshold: Option<f64>,
    max_steps: Option<usize>,
    settings: Option<EvaluatorSettings>,
}

fn positive(parameter: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidParameter {
            parameter,
            reason: format!("must be a positive number (got {})", value),
        })
    }
}

fn non_negative(parameter: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidParameter {
            parameter,
            reason: format!("must be zero or positive (got {})", value),
        })
    }
}

impl RelaxationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }
    pub fn checkpoint_path(mut self, path: Option<PathBuf>) -> Self {
        self.checkpoint_path = path;
        self
    }
    pub fn cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }
    pub fn run_on_cpu(mut self, cpu: bool) -> Self {
        self.run_on_cpu = Some(cpu);
        self
    }
    pub fn force_convergence_threshold(mut self, fmax: f64) -> Self {
        self.force_convergence_threshold = Some(fmax);
        self
    }
    pub fn max_steps(mut self, steps: usize) -> Self {
        self.max_steps = Some(steps);
        self
    }
    pub fn settings(mut self, settings: EvaluatorSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// `cache_dir` is required. Every other parameter falls back to its default:
    /// the built-in model, CPU execution, `fmax = 0.01` and 100 steps.
    pub fn build(self) -> Result<RelaxationConfig, ConfigError> {
        let model_name = self.model_name.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if model_name.trim().is_empty() {
            return Err(ConfigError::InvalidParameter {
                parameter: "model_name",
                reason: "must not be empty".to_string(),
            });
        }

        let settings = self.settings.unwrap_or_default();
        non_negative("vacuum", settings.vacuum)?;
        non_negative("adsorbate_height", settings.adsorbate_height)?;
        positive("max_step", settings.max_step)?;
        positive("initial_curvature", settings.initial_curvature)?;
        positive("surface_change_multiplier", settings.surface_change_multiplier)?;
        positive("desorption_multiplier", settings.desorption_multiplier)?;
        non_negative("neighbor_skin", settings.neighbor_skin)?;
        non_negative("surface_layer_tolerance", settings.surface_layer_tolerance)?;
        if settings.max_atoms == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "max_atoms",
                reason: "must be at least 1".to_string(),
            });
        }
        match settings.site {
            AdsorbateSite::Position { x, y } if !(x.is_finite() && y.is_finite()) => {
                return Err(ConfigError::InvalidParameter {
                    parameter: "site",
                    reason: "coordinates must be finite".to_string(),
                });
            }
            _ => {}
        }

        Ok(RelaxationConfig {
            model_name,
            checkpoint_path: self.checkpoint_path,
            cache_dir: self
                .cache_dir
                .ok_or(ConfigError::MissingParameter("cache_dir"))?,
            run_on_cpu: self.run_on_cpu.unwrap_or(true),
            force_convergence_threshold: positive(
                "force_convergence_threshold",
                self.force_convergence_threshold.unwrap_or(DEFAULT_FMAX),
            )?,
            max_steps: self.max_steps.unwrap_or(DEFAULT_MAX_STEPS),
            settings,
        })
    }
}
