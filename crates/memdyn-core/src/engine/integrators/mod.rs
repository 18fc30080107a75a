//! # Integrators
//!
//! Every scheme advances a [`MembraneSystem`] by one step at a time. The
//! driver owns the loop, the termination checks and the trajectory output;
//! an integrator only decides how positions, velocities and protein density
//! move between two status evaluations.
//!
//! - [`Euler`]: overdamped explicit Euler, `ẋ = F`, optionally backtracked.
//! - [`VelocityVerlet`]: inertial dynamics with vertex mass, DPD and damping.
//! - [`ConjugateGradient`]: Fletcher–Reeves relaxation with periodic restarts.
//! - [`Bfgs`]: quasi-Newton relaxation with a dense inverse Hessian.
//!
//! The protein density always follows a first-order update along
//! `mobility · μ`. When the scheme backtracks, that update is line searched
//! on its own after the mechanical one.

mod bfgs;
mod conjugate_gradient;
mod euler;
mod velocity_verlet;

pub use bfgs::Bfgs;
pub use conjugate_gradient::ConjugateGradient;
pub use euler::Euler;
pub use velocity_verlet::VelocityVerlet;

use super::backtrack::chemical_backtrack;
use super::config::{IntegratorConfig, IntegratorKind};
use super::error::EngineError;
use super::state::RunState;
use super::system::MembraneSystem;
use crate::core::energy::{EnergyBreakdown, Evaluation};
use crate::core::geometry::GeometryError;
use crate::core::params::{Parameters, Violations};
use nalgebra::Vector3;
use tracing::warn;

/// What one accepted step did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Simulated time the step advanced by.
    pub time_step: f64,
    /// Whether the chemical update was applied; `false` when its line search
    /// failed and the update was skipped.
    pub chemical_accepted: bool,
}

pub trait Integrator: Send {
    fn name(&self) -> &'static str;

    /// Scheme-specific option checks, reported alongside the general ones.
    fn check_parameters(&self, system: &MembraneSystem, config: &IntegratorConfig) -> Violations;

    /// Quantity tracked for divergence and reported as the run's energy.
    fn objective(&self, energy: &EnergyBreakdown) -> f64 {
        energy.potential_free_energy()
    }

    /// Convergence test on the norms of the latest status evaluation.
    fn has_converged(&self, run: &RunState, tolerance: f64) -> bool {
        run.mechanical_norm < tolerance && run.chemical_norm < tolerance
    }

    /// Forgets any history carried between steps.
    fn reset(&mut self) {}

    /// Advances the system by one step, including its simulated time.
    ///
    /// Runs inside a transaction: on error the driver restores the state from
    /// before the call.
    fn step(
        &mut self,
        system: &mut MembraneSystem,
        config: &IntegratorConfig,
        run: &RunState,
    ) -> Result<StepReport, EngineError>;
}

pub fn build(kind: IntegratorKind) -> Box<dyn Integrator> {
    match kind {
        IntegratorKind::Euler => Box::new(Euler),
        IntegratorKind::VelocityVerlet => Box::new(VelocityVerlet),
        IntegratorKind::ConjugateGradient => Box::<ConjugateGradient>::default(),
        IntegratorKind::Bfgs => Box::<Bfgs>::default(),
    }
}

pub(crate) fn max_abs_component(forces: &[Vector3<f64>]) -> f64 {
    forces.iter().map(|f| f.amax()).fold(0.0, f64::max)
}

/// Largest component of what drives the system: the conservative force, or
/// the chemical potential when the shape is frozen.
pub(crate) fn driving_magnitude(parameters: &Parameters, evaluation: &Evaluation) -> f64 {
    if parameters.variation.shape {
        max_abs_component(&evaluation.forces.conservative())
    } else {
        evaluation
            .chemical_potential
            .iter()
            .map(|m| m.abs())
            .fold(0.0, f64::max)
    }
}

/// Step size for the next update: the configured step, or with adaptive
/// stepping `ratio · min_edge² · (D0_max / D_max)` where `D` is the
/// [`driving_magnitude`] of `evaluation`.
pub(crate) fn characteristic_step(
    system: &mut MembraneSystem,
    config: &IntegratorConfig,
    run: &RunState,
    evaluation: &Evaluation,
) -> Result<f64, GeometryError> {
    let (Some(ratio), Some(initial)) = (config.adaptive_step_ratio, run.initial_max_force) else {
        return Ok(config.time_step);
    };
    let current = driving_magnitude(system.parameters(), evaluation);
    if current <= 0.0 || initial <= 0.0 {
        return Ok(config.time_step);
    }
    let min_edge = system.geometry()?.min_edge_length;
    Ok(ratio * min_edge * min_edge * initial / current)
}

/// Backtracked protein density update along `mobility · μ` from the current
/// state. Returns `false` if the search failed and the update was skipped.
pub(crate) fn relax_chemistry(
    system: &mut MembraneSystem,
    config: &IntegratorConfig,
    initial_step: f64,
) -> Result<bool, EngineError> {
    let Some(mobility) = system.parameters().mobility() else {
        return Ok(true);
    };
    let evaluation = system.evaluate()?;
    let mu = evaluation.chemical_potential;
    let rate: Vec<f64> = mu.iter().map(|m| mobility * m).collect();

    match chemical_backtrack(
        system,
        evaluation.energy.potential_free_energy(),
        &mu,
        &rate,
        initial_step,
        &config.line_search,
    ) {
        Ok(_) => Ok(true),
        Err(e) if config.abort_on_chemical_failure => Err(e.into()),
        Err(e) => {
            warn!("{}. Skipping the chemical update for this step.", e);
            Ok(false)
        }
    }
}

/// DPD noise is only integrated by the inertial scheme.
fn check_no_dissipation(v: &mut Violations, parameters: &Parameters, scheme: &str) {
    v.check(
        parameters.dpd.is_none(),
        "dpd",
        format!("DPD must be turned off for {scheme}"),
    );
}
