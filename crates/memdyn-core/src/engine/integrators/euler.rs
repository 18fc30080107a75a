use super::{
    Integrator, StepReport, characteristic_step, check_no_dissipation, relax_chemistry,
};
use crate::core::params::Violations;
use crate::engine::backtrack::mechanical_backtrack;
use crate::engine::config::IntegratorConfig;
use crate::engine::error::EngineError;
use crate::engine::state::RunState;
use crate::engine::system::MembraneSystem;
use tracing::trace;

/// Overdamped explicit Euler: the velocity of every vertex is its force and
/// the protein density moves along `mobility · μ`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Euler;

impl Integrator for Euler {
    fn name(&self) -> &'static str {
        "euler"
    }

    fn check_parameters(&self, system: &MembraneSystem, config: &IntegratorConfig) -> Violations {
        let mut v = Violations::new();
        check_no_dissipation(&mut v, system.parameters(), "Euler integration");
        if config.backtrack {
            v.extend(config.line_search_violations());
        }
        v
    }

    fn step(
        &mut self,
        system: &mut MembraneSystem,
        config: &IntegratorConfig,
        run: &RunState,
    ) -> Result<StepReport, EngineError> {
        let evaluation = system.evaluate()?;
        let force = evaluation.forces.conservative();
        let dt = characteristic_step(system, config, run, &evaluation)?;
        let start = system.time();

        system.state_mut().velocities_mut().copy_from_slice(&force);

        let (time_step, chemical_accepted) = if config.backtrack {
            let accepted = mechanical_backtrack(
                system,
                evaluation.energy.potential_free_energy(),
                &force,
                &force,
                dt,
                &config.line_search,
            )?;
            trace!(step = accepted.step, evaluations = accepted.evaluations, "Euler step backtracked");
            let chemical = relax_chemistry(system, config, accepted.step)?;
            (accepted.step, chemical)
        } else {
            system.state_mut().displace(&force, dt);
            if let Some(mobility) = system.parameters().mobility() {
                let rate: Vec<f64> = evaluation
                    .chemical_potential
                    .iter()
                    .map(|m| mobility * m)
                    .collect();
                system.state_mut().advance_protein_density(&rate, dt);
            }
            (dt, true)
        };

        system.set_time(start + time_step);
        Ok(StepReport {
            time_step,
            chemical_accepted,
        })
    }
}
