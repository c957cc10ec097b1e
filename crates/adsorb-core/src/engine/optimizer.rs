use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use crate::core::forcefield::calculator::{Calculator, CalculatorError, Evaluation};
use crate::core::models::structure::AtomicStructure;
use nalgebra::{DMatrix, DVector, Point3, SymmetricEigen};
use tracing::{debug, trace};

const MIN_DISPLACEMENT: f64 = 1e-7;
const MIN_DENOMINATOR: f64 = 1e-12;
const MIN_CURVATURE: f64 = 1e-10;

/// Outcome of one optimizer run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaxationSummary {
    pub converged: bool,
    pub steps: usize,
    /// Potential energy of the final geometry (eV).
    pub energy: f64,
    /// Largest per-atom force of the final geometry (eV/Angstrom).
    pub max_force: f64,
}

/// One recorded geometry of a relaxation.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryFrame {
    pub structure: AtomicStructure,
    pub energy: f64,
}

/// Quasi-Newton BFGS minimizer working directly on Cartesian coordinates.
///
/// Every step follows the eigen-decomposed inverse Hessian, uphill curvature is
/// flipped by taking absolute eigenvalues, and the whole step is scaled down when any
/// atom would move further than `max_step`.
pub struct Bfgs<'c> {
    calculator: &'c dyn Calculator,
    max_step: f64,
    initial_curvature: f64,
}

impl<'c> Bfgs<'c> {
    pub fn new(calculator: &'c dyn Calculator, max_step: f64, initial_curvature: f64) -> Self {
        Self {
            calculator,
            max_step,
            initial_curvature,
        }
    }

    /// Relaxes `structure` in place until every force is below `fmax` or `max_steps`
    /// steps have been taken.
    ///
    /// When `trajectory` is given, the initial geometry and the geometry after every
    /// step are appended to it. Running out of steps is reported through
    /// [`RelaxationSummary::converged`], not as an error.
    pub fn run(
        &self,
        structure: &mut AtomicStructure,
        fmax: f64,
        max_steps: usize,
        mut trajectory: Option<&mut Vec<TrajectoryFrame>>,
        reporter: &ProgressReporter,
    ) -> Result<RelaxationSummary, EngineError> {
        let n = structure.len();
        let dim = 3 * n;

        let mut evaluation = self.evaluate(structure)?;
        if let Some(frames) = trajectory.as_deref_mut() {
            frames.push(TrajectoryFrame {
                structure: structure.clone(),
                energy: evaluation.energy,
            });
        }

        let mut hessian = DMatrix::<f64>::identity(dim, dim) * self.initial_curvature;
        let mut previous: Option<(DVector<f64>, DVector<f64>)> = None;
        let mut steps = 0;
        let mut converged;

        reporter.report(Progress::RelaxationStart {
            max_steps: max_steps as u64,
            fmax,
        });
        loop {
            let max_force = evaluation.max_force();
            trace!(step = steps, energy = evaluation.energy, fmax = max_force, "BFGS");
            converged = max_force < fmax;
            if converged || steps >= max_steps {
                break;
            }

            let positions = flatten_points(&structure.positions());
            let forces = flatten_vectors(&evaluation.forces);
            if let Some((r0, f0)) = &previous {
                update_hessian(&mut hessian, &positions, &forces, r0, f0);
            }

            let displacement = self.step(&hessian, &forces);
            let next = &positions + displacement;
            structure.set_positions(&unflatten(&next))?;
            previous = Some((positions, forces));

            evaluation = self.evaluate(structure)?;
            steps += 1;
            if let Some(frames) = trajectory.as_deref_mut() {
                frames.push(TrajectoryFrame {
                    structure: structure.clone(),
                    energy: evaluation.energy,
                });
            }
            reporter.report(Progress::OptimizerStep {
                step: steps as u64,
                energy: evaluation.energy,
                max_force: evaluation.max_force(),
            });
        }
        reporter.report(Progress::RelaxationFinish {
            converged,
            steps: steps as u64,
        });

        let summary = RelaxationSummary {
            converged,
            steps,
            energy: evaluation.energy,
            max_force: evaluation.max_force(),
        };
        debug!(
            converged = summary.converged,
            steps = summary.steps,
            energy = summary.energy,
            "Relaxation finished"
        );
        Ok(summary)
    }

    fn evaluate(&self, structure: &AtomicStructure) -> Result<Evaluation, CalculatorError> {
        let evaluation = self.calculator.calculate(structure)?;
        if !evaluation.energy.is_finite() {
            return Err(CalculatorError::NonFinite {
                model: self.calculator.name().to_string(),
                quantity: "energy",
            });
        }
        if evaluation
            .forces
            .iter()
            .any(|f| !f.iter().all(|c| c.is_finite()))
        {
            return Err(CalculatorError::NonFinite {
                model: self.calculator.name().to_string(),
                quantity: "force",
            });
        }
        Ok(evaluation)
    }

    fn step(&self, hessian: &DMatrix<f64>, forces: &DVector<f64>) -> DVector<f64> {
        let eigen = SymmetricEigen::new(hessian.clone());
        let projected = eigen.eigenvectors.transpose() * forces;
        let scaled = projected.zip_map(&eigen.eigenvalues, |f, w| f / w.abs().max(MIN_CURVATURE));
        let mut displacement = &eigen.eigenvectors * scaled;

        let longest = displacement
            .as_slice()
            .chunks_exact(3)
            .map(|d| (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt())
            .fold(0.0, f64::max);
        if longest >= self.max_step {
            displacement *= self.max_step / longest;
        }
        displacement
    }
}

fn update_hessian(
    hessian: &mut DMatrix<f64>,
    positions: &DVector<f64>,
    forces: &DVector<f64>,
    previous_positions: &DVector<f64>,
    previous_forces: &DVector<f64>,
) {
    let dr = positions - previous_positions;
    if dr.amax() < MIN_DISPLACEMENT {
        return;
    }
    let df = forces - previous_forces;
    let a = dr.dot(&df);
    let dg = &*hessian * &dr;
    let b = dr.dot(&dg);
    if a.abs() < MIN_DENOMINATOR || b.abs() < MIN_DENOMINATOR {
        return;
    }
    *hessian -= &df * df.transpose() / a + &dg * dg.transpose() / b;
}

fn flatten_points(points: &[Point3<f64>]) -> DVector<f64> {
    DVector::from_iterator(points.len() * 3, points.iter().flat_map(|p| [p.x, p.y, p.z]))
}

fn flatten_vectors(vectors: &[nalgebra::Vector3<f64>]) -> DVector<f64> {
    DVector::from_iterator(vectors.len() * 3, vectors.iter().flat_map(|v| [v.x, v.y, v.z]))
}

fn unflatten(values: &DVector<f64>) -> Vec<Point3<f64>> {
    values
        .as_slice()
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect()
}
