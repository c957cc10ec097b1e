use super::params::{ModelParams, PairCoefficients, ParamLoadError, PotentialKind};
use super::potentials;
use crate::core::elements::Element;
use crate::core::models::structure::{AtomicStructure, StructureError};
use nalgebra::Vector3;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Where a calculator should run its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    Accelerator,
}

impl Device {
    pub fn from_run_on_cpu(run_on_cpu: bool) -> Self {
        if run_on_cpu {
            Device::Cpu
        } else {
            Device::Accelerator
        }
    }
}

/// Potential energy (eV) and per-atom forces (eV/Angstrom) of one structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub energy: f64,
    pub forces: Vec<Vector3<f64>>,
}

impl Evaluation {
    /// Largest per-atom force magnitude.
    pub fn max_force(&self) -> f64 {
        self.forces.iter().map(|f| f.norm()).fold(0.0, f64::max)
    }
}

#[derive(Debug, Error)]
pub enum CalculatorError {
    #[error("Failed to load model parameters: {0}")]
    Params(#[from] ParamLoadError),
    #[error("Cannot evaluate an empty structure")]
    EmptyStructure,
    #[error(transparent)]
    Structure(#[from] StructureError),
    #[error("Model '{model}' produced a non-finite {quantity}")]
    NonFinite {
        model: String,
        quantity: &'static str,
    },
}

/// Energy and force provider consumed by the relaxation engine.
pub trait Calculator: Send + Sync {
    fn name(&self) -> &str;
    fn calculate(&self, structure: &AtomicStructure) -> Result<Evaluation, CalculatorError>;
}

/// Builds calculators from checkpoint files.
pub trait CalculatorFactory: Send + Sync {
    fn create(
        &self,
        checkpoint: &Path,
        device: Device,
    ) -> Result<Box<dyn Calculator>, CalculatorError>;
}

/// Loads pair-potential parameter files as checkpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairPotentialFactory;

impl CalculatorFactory for PairPotentialFactory {
    fn create(
        &self,
        checkpoint: &Path,
        device: Device,
    ) -> Result<Box<dyn Calculator>, CalculatorError> {
        let params = ModelParams::load(checkpoint)?;
        if device == Device::Accelerator {
            info!(
                model = %params.model.name,
                "Pair potentials have no accelerator backend; running on the CPU"
            );
        }
        debug!(model = %params.model.name, path = %checkpoint.display(), "Loaded checkpoint");
        Ok(Box::new(PairPotentialCalculator::new(params)))
    }
}

#[derive(Debug, Clone)]
pub struct PairPotentialCalculator {
    params: ModelParams,
}

/// Pair coefficients for the distinct elements of one structure.
struct SpeciesTable {
    species_of_atom: Vec<usize>,
    species_count: usize,
    coefficients: Vec<PairCoefficients>,
}

impl SpeciesTable {
    fn new(params: &ModelParams, structure: &AtomicStructure) -> Self {
        let mut species: Vec<Element> = Vec::new();
        let species_of_atom = structure
            .atoms()
            .iter()
            .map(|atom| match species.iter().position(|e| *e == atom.element) {
                Some(index) => index,
                None => {
                    species.push(atom.element);
                    species.len() - 1
                }
            })
            .collect();
        let species_count = species.len();
        let mut coefficients = Vec::with_capacity(species_count * species_count);
        for a in &species {
            for b in &species {
                coefficients.push(params.coefficients(*a, *b));
            }
        }
        Self {
            species_of_atom,
            species_count,
            coefficients,
        }
    }

    fn pair(&self, i: usize, j: usize) -> &PairCoefficients {
        &self.coefficients[self.species_of_atom[i] * self.species_count + self.species_of_atom[j]]
    }
}

impl PairPotentialCalculator {
    pub fn new(params: ModelParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Pair energy shifted to zero at the cutoff, and its radial derivative.
    fn pair_terms(&self, c: &PairCoefficients, dist: f64) -> (f64, f64) {
        let cutoff = self.params.model.cutoff;
        match self.params.model.potential {
            PotentialKind::Morse => {
                let shift =
                    potentials::morse(cutoff, c.equilibrium_distance, c.well_depth, c.stiffness);
                (
                    potentials::morse(dist, c.equilibrium_distance, c.well_depth, c.stiffness)
                        - shift,
                    potentials::morse_derivative(
                        dist,
                        c.equilibrium_distance,
                        c.well_depth,
                        c.stiffness,
                    ),
                )
            }
            PotentialKind::LennardJones => {
                let shift =
                    potentials::lennard_jones_12_6(cutoff, c.equilibrium_distance, c.well_depth);
                (
                    potentials::lennard_jones_12_6(dist, c.equilibrium_distance, c.well_depth)
                        - shift,
                    potentials::lennard_jones_12_6_derivative(
                        dist,
                        c.equilibrium_distance,
                        c.well_depth,
                    ),
                )
            }
        }
    }
}

impl Calculator for PairPotentialCalculator {
    fn name(&self) -> &str {
        &self.params.model.name
    }

    fn calculate(&self, structure: &AtomicStructure) -> Result<Evaluation, CalculatorError> {
        if structure.is_empty() {
            return Err(CalculatorError::EmptyStructure);
        }
        let cutoff = self.params.model.cutoff;
        let table = SpeciesTable::new(&self.params, structure);
        let images = structure.cell().image_translations(structure.pbc(), cutoff)?;
        let positions = structure.positions();
        let count = positions.len();

        // Each atom collects half of every pair energy it takes part in and the full
        // force acting on it, so per-atom work is independent and order-stable.
        let per_atom = |i: usize| -> (f64, Vector3<f64>) {
            let mut energy = 0.0;
            let mut force = Vector3::zeros();
            for j in 0..count {
                let coefficients = table.pair(i, j);
                for translation in &images {
                    let self_image = i == j;
                    if self_image && translation.norm() == 0.0 {
                        continue;
                    }
                    let delta = positions[j] + translation - positions[i];
                    let dist = delta.norm();
                    if dist >= cutoff {
                        continue;
                    }
                    let (pair_energy, slope) = self.pair_terms(coefficients, dist);
                    energy += 0.5 * pair_energy;
                    if !self_image && dist > 0.0 {
                        force += delta * (slope / dist);
                    }
                }
            }
            (energy, force)
        };

        #[cfg(feature = "parallel")]
        let contributions: Vec<(f64, Vector3<f64>)> = (0..count).into_par_iter().map(per_atom).collect();
        #[cfg(not(feature = "parallel"))]
        let contributions: Vec<(f64, Vector3<f64>)> = (0..count).map(per_atom).collect();

        let energy: f64 = contributions.iter().map(|(e, _)| *e).sum();
        let forces: Vec<Vector3<f64>> = contributions.into_iter().map(|(_, f)| f).collect();

        if !energy.is_finite() {
            return Err(CalculatorError::NonFinite {
                model: self.name().to_string(),
                quantity: "energy",
            });
        }
        if forces.iter().any(|f| !f.iter().all(|c| c.is_finite())) {
            return Err(CalculatorError::NonFinite {
                model: self.name().to_string(),
                quantity: "force",
            });
        }
        Ok(Evaluation { energy, forces })
    }
}
