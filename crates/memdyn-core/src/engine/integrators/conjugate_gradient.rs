use super::{
    Integrator, StepReport, characteristic_step, check_no_dissipation, relax_chemistry,
};
use crate::core::params::Violations;
use crate::engine::backtrack::mechanical_backtrack;
use crate::engine::config::IntegratorConfig;
use crate::engine::error::EngineError;
use crate::engine::state::RunState;
use crate::engine::system::MembraneSystem;
use nalgebra::Vector3;
use tracing::{debug, trace};

/// Nonlinear conjugate gradient with the Fletcher–Reeves coefficient
/// `β = |F|² / |F_prev|²`.
///
/// The search direction restarts from the bare force every `restart_period`
/// steps and whenever it stops being a descent direction.
#[derive(Debug, Default, Clone)]
pub struct ConjugateGradient {
    direction: Vec<Vector3<f64>>,
    previous_force_squared: Option<f64>,
    steps_since_restart: u64,
}

impl ConjugateGradient {
    fn next_direction(&mut self, force: &[Vector3<f64>], restart_period: u64) -> Vec<Vector3<f64>> {
        let force_squared: f64 = force.iter().map(|f| f.norm_squared()).sum();
        let previous = self.previous_force_squared.replace(force_squared);

        let restart = match previous {
            None => true,
            Some(_) if self.direction.len() != force.len() => true,
            Some(_) if self.steps_since_restart >= restart_period => true,
            Some(p) if p <= 0.0 => true,
            Some(_) => false,
        };
        if restart {
            trace!("Conjugate gradient restarted from the force");
            self.steps_since_restart = 0;
            return force.to_vec();
        }

        let beta = force_squared / previous.unwrap_or(force_squared);
        let direction: Vec<Vector3<f64>> = force
            .iter()
            .zip(&self.direction)
            .map(|(f, d)| f + d * beta)
            .collect();
        let slope: f64 = direction.iter().zip(force).map(|(d, f)| d.dot(f)).sum();
        if slope <= 0.0 {
            debug!(beta, "Conjugate direction is not a descent direction, restarting.");
            self.steps_since_restart = 0;
            return force.to_vec();
        }
        self.steps_since_restart += 1;
        direction
    }
}

impl Integrator for ConjugateGradient {
    fn name(&self) -> &'static str {
        "conjugate_gradient"
    }

    fn check_parameters(&self, system: &MembraneSystem, config: &IntegratorConfig) -> Violations {
        let mut v = config.line_search_violations();
        check_no_dissipation(&mut v, system.parameters(), "conjugate gradient relaxation");
        v.check(
            config.restart_period > 0,
            "integrator.restart_period",
            "must be positive",
        );
        v
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn step(
        &mut self,
        system: &mut MembraneSystem,
        config: &IntegratorConfig,
        run: &RunState,
    ) -> Result<StepReport, EngineError> {
        let evaluation = system.evaluate()?;
        let force = evaluation.forces.conservative();
        let initial_step = characteristic_step(system, config, run, &evaluation)?;
        let start = system.time();

        let direction = self.next_direction(&force, config.restart_period);
        let accepted = mechanical_backtrack(
            system,
            evaluation.energy.potential_free_energy(),
            &force,
            &direction,
            initial_step,
            &config.line_search,
        )?;
        self.direction = if accepted.used_gradient {
            self.steps_since_restart = 0;
            force
        } else {
            direction
        };

        let chemical_accepted = relax_chemistry(system, config, initial_step)?;
        system.set_time(start + accepted.step);
        Ok(StepReport {
            time_step: accepted.step,
            chemical_accepted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mesh::factory::icosphere;
    use crate::core::params::{
        AdsorptionParams, DpdParams, Parameters, ProteinParams, VariationParams,
    };
    use crate::engine::config::{IntegratorConfigBuilder, IntegratorKind};
    use crate::engine::integrators::driving_magnitude;

    fn config() -> IntegratorConfig {
        IntegratorConfigBuilder::new()
            .kind(IntegratorKind::ConjugateGradient)
            .time_step(0.1)
            .max_steps(10)
            .tolerance(1e-8)
            .restart_period(3)
            .build()
            .unwrap()
    }

    #[test]
    fn first_direction_is_the_force_then_conjugates() {
        let mut cg = ConjugateGradient::default();
        let f1 = vec![Vector3::new(2.0, 0.0, 0.0)];
        assert_eq!(cg.next_direction(&f1, 10), f1);
        cg.direction = f1.clone();

        let f2 = vec![Vector3::new(0.0, 1.0, 0.0)];
        let d2 = cg.next_direction(&f2, 10);
        assert!((d2[0] - Vector3::new(0.5, 1.0, 0.0)).norm() < 1e-15);
    }

    #[test]
    fn restart_period_resets_direction() {
        let mut cg = ConjugateGradient::default();
        let f = vec![Vector3::new(1.0, 1.0, 0.0)];
        cg.direction = cg.next_direction(&f, 1);
        cg.direction = cg.next_direction(&f, 1);
        assert_eq!(cg.steps_since_restart, 1);
        assert_eq!(cg.next_direction(&f, 1), f);
        assert_eq!(cg.steps_since_restart, 0);
    }

    #[test]
    fn dpd_and_line_search_range_are_checked() {
        let (topology, state) = icosphere(1.0, 1).unwrap();
        let parameters = Parameters {
            dpd: Some(DpdParams {
                gamma: 0.5,
                kbt: 1.0,
            }),
            ..Parameters::bending_only(1.0)
        };
        let system = MembraneSystem::new(topology, state, parameters, 0).unwrap();
        let mut config = config();
        config.line_search.c1 = 1.0;
        config.restart_period = 0;
        let err = ConjugateGradient::default()
            .check_parameters(&system, &config)
            .into_result()
            .unwrap_err();
        assert!(err.contains("dpd"));
        assert!(err.contains("integrator.c1"));
        assert!(err.contains("integrator.restart_period"));
    }

    #[test]
    fn steps_lower_the_energy() {
        let (topology, mut state) = icosphere(1.0, 2).unwrap();
        for p in state.positions_mut() {
            p.y *= 0.8;
        }
        let mut system =
            MembraneSystem::new(topology, state, Parameters::bending_only(1.0), 0).unwrap();
        let config = config();
        let mut cg = ConjugateGradient::default();
        let mut energy = system.potential_free_energy().unwrap();
        for _ in 0..5 {
            cg.step(&mut system, &config, &RunState::new(0.0, 0.1)).unwrap();
            let next = system.potential_free_energy().unwrap();
            assert!(next <= energy);
            energy = next;
        }
    }

    #[test]
    fn chemical_update_starts_from_the_adaptive_step() {
        let (topology, state) = icosphere(1.0, 1).unwrap();
        let parameters = Parameters {
            adsorption: Some(AdsorptionParams { epsilon: -1.0 }),
            protein: Some(ProteinParams {
                mobility: 1.0,
                interior_penalty: 0.0,
            }),
            variation: VariationParams {
                shape: false,
                protein: true,
            },
            ..Parameters::bending_only(1.0)
        };
        let mut system =
            MembraneSystem::new(topology, state.with_uniform_protein_density(0.5), parameters, 0)
                .unwrap();
        let mut config = config();
        config.time_step = 1.0;
        config.adaptive_step_ratio = Some(0.5);

        let evaluation = system.evaluate().unwrap();
        let mut run = RunState::new(0.0, 1.0);
        run.initial_max_force = Some(driving_magnitude(system.parameters(), &evaluation));
        let edge = system.geometry().unwrap().min_edge_length;
        let expected = 0.5 * edge * edge;
        let before = system.state().positions().to_vec();

        let report = ConjugateGradient::default()
            .step(&mut system, &config, &run)
            .unwrap();
        assert!(report.chemical_accepted);
        assert!((report.time_step - expected).abs() < 1e-12);
        assert_eq!(system.state().positions(), before.as_slice());
        for (phi, mu) in system
            .state()
            .protein_density()
            .iter()
            .zip(&evaluation.chemical_potential)
        {
            assert!((phi - 0.5 - expected * mu).abs() < 1e-12);
        }
    }
}
