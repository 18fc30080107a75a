use super::{Integrator, StepReport, characteristic_step, relax_chemistry};
use crate::core::energy::EnergyBreakdown;
use crate::core::params::Violations;
use crate::engine::config::IntegratorConfig;
use crate::engine::error::EngineError;
use crate::engine::state::RunState;
use crate::engine::system::MembraneSystem;
use nalgebra::Vector3;

/// Kick-drift-kick velocity Verlet on the full mechanical force, DPD and
/// damping included, with a first-order backtracked protein update.
#[derive(Debug, Default, Clone, Copy)]
pub struct VelocityVerlet;

impl Integrator for VelocityVerlet {
    fn name(&self) -> &'static str {
        "velocity_verlet"
    }

    fn check_parameters(&self, system: &MembraneSystem, config: &IntegratorConfig) -> Violations {
        let mut v = Violations::new();
        v.check(
            !config.backtrack,
            "integrator.backtrack",
            "velocity Verlet does not backtrack the mechanical update",
        );
        if system.parameters().protein_dynamics_enabled() {
            v.extend(config.line_search_violations());
        }
        v
    }

    fn objective(&self, energy: &EnergyBreakdown) -> f64 {
        energy.free_energy()
    }

    fn step(
        &mut self,
        system: &mut MembraneSystem,
        config: &IntegratorConfig,
        run: &RunState,
    ) -> Result<StepReport, EngineError> {
        let evaluation = system.evaluate()?;
        let dt = characteristic_step(system, config, run, &evaluation)?;
        let kick = 0.5 * dt / system.parameters().vertex_mass;
        let start = system.time();

        let initial = system.evaluate_with_dissipation(dt)?.forces.mechanical();
        let half: Vec<Vector3<f64>> = system
            .state()
            .velocities()
            .iter()
            .zip(&initial)
            .map(|(v, f)| v + f * kick)
            .collect();
        system.state_mut().velocities_mut().copy_from_slice(&half);
        system.state_mut().displace(&half, dt);
        system.set_time(start + dt);

        let last = system.evaluate_with_dissipation(dt)?.forces.mechanical();
        for (v, f) in system.state_mut().velocities_mut().iter_mut().zip(&last) {
            *v += f * kick;
        }

        let chemical_accepted = relax_chemistry(system, config, dt)?;
        Ok(StepReport {
            time_step: dt,
            chemical_accepted,
        })
    }
}
