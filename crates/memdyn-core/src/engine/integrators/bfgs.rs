use super::{
    Integrator, StepReport, characteristic_step, check_no_dissipation, relax_chemistry,
};
use crate::core::params::Violations;
use crate::engine::backtrack::mechanical_backtrack;
use crate::engine::config::IntegratorConfig;
use crate::engine::error::EngineError;
use crate::engine::state::RunState;
use crate::engine::system::MembraneSystem;
use nalgebra::{DMatrix, DVector, Vector3};
use tracing::debug;

/// Curvature condition threshold relative to `|y| |s|`.
const CURVATURE_EPSILON: f64 = 1e-12;

/// Quasi-Newton relaxation with a dense inverse Hessian over all `3n`
/// coordinates.
///
/// The secant pair of a step is only known once the next gradient has been
/// evaluated, so the update of step `k` is applied at the start of step
/// `k + 1`. A pair that violates the curvature condition resets the inverse
/// Hessian to the identity.
#[derive(Debug, Default, Clone)]
pub struct Bfgs {
    inverse_hessian: Option<DMatrix<f64>>,
    pending: Option<(DVector<f64>, DVector<f64>)>,
}

fn flatten(vectors: &[Vector3<f64>]) -> DVector<f64> {
    DVector::from_iterator(vectors.len() * 3, vectors.iter().flat_map(|v| v.iter().copied()))
}

fn unflatten(vector: &DVector<f64>) -> Vec<Vector3<f64>> {
    vector
        .as_slice()
        .chunks_exact(3)
        .map(Vector3::from_column_slice)
        .collect()
}

/// `H ← (I − ρ s yᵀ) H (I − ρ y sᵀ) + ρ s sᵀ` with `ρ = 1 / yᵀs`, expanded
/// for a symmetric `H`.
fn update_inverse_hessian(h: &mut DMatrix<f64>, s: &DVector<f64>, y: &DVector<f64>) -> bool {
    let ys = y.dot(s);
    if ys <= CURVATURE_EPSILON * y.norm() * s.norm() {
        return false;
    }
    let rho = 1.0 / ys;
    let hy = &*h * y;
    let yhy = y.dot(&hy);
    h.ger(-rho, s, &hy, 1.0);
    h.ger(-rho, &hy, s, 1.0);
    h.ger(rho * rho * yhy + rho, s, s, 1.0);
    true
}

impl Integrator for Bfgs {
    fn name(&self) -> &'static str {
        "bfgs"
    }

    fn check_parameters(&self, system: &MembraneSystem, config: &IntegratorConfig) -> Violations {
        let mut v = config.line_search_violations();
        check_no_dissipation(&mut v, system.parameters(), "BFGS relaxation");
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

        let gradient = -flatten(&force);
        let dimension = gradient.len();
        let mut h = match self.inverse_hessian.take() {
            Some(h) if h.nrows() == dimension => h,
            _ => DMatrix::identity(dimension, dimension),
        };
        if let Some((s, previous_gradient)) = self.pending.take() {
            let y = &gradient - previous_gradient;
            if !update_inverse_hessian(&mut h, &s, &y) {
                debug!("BFGS curvature condition failed, resetting the inverse Hessian.");
                h = DMatrix::identity(dimension, dimension);
            }
        }

        let direction = unflatten(&(&h * flatten(&force)));
        let accepted = mechanical_backtrack(
            system,
            evaluation.energy.potential_free_energy(),
            &force,
            &direction,
            initial_step,
            &config.line_search,
        )?;

        let searched = if accepted.used_gradient {
            h = DMatrix::identity(dimension, dimension);
            &force
        } else {
            &direction
        };
        self.pending = Some((flatten(searched) * accepted.step, gradient));
        self.inverse_hessian = Some(h);

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
    use crate::core::params::Parameters;
    use crate::engine::config::{IntegratorConfigBuilder, IntegratorKind};

    #[test]
    fn update_satisfies_secant_equation() {
        let mut h = DMatrix::identity(3, 3);
        let s = DVector::from_vec(vec![1.0, 0.5, -0.2]);
        let y = DVector::from_vec(vec![2.0, 0.3, 0.1]);
        assert!(update_inverse_hessian(&mut h, &s, &y));
        assert!((&h * &y - &s).norm() < 1e-12);
        assert!((&h - h.transpose()).norm() < 1e-12);
    }

    #[test]
    fn negative_curvature_is_refused() {
        let mut h = DMatrix::identity(2, 2);
        let s = DVector::from_vec(vec![1.0, 0.0]);
        let y = DVector::from_vec(vec![-1.0, 0.0]);
        assert!(!update_inverse_hessian(&mut h, &s, &y));
        assert_eq!(h, DMatrix::identity(2, 2));
    }

    #[test]
    fn flatten_round_trips_vertex_vectors() {
        let vectors = vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0)];
        let flat = flatten(&vectors);
        assert_eq!(flat.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(unflatten(&flat), vectors);
    }

    #[test]
    fn steps_lower_the_energy_and_keep_history() {
        let (topology, mut state) = icosphere(1.0, 1).unwrap();
        for p in state.positions_mut() {
            p.z *= 1.2;
        }
        let mut system =
            MembraneSystem::new(topology, state, Parameters::bending_only(1.0), 0).unwrap();
        let config = IntegratorConfigBuilder::new()
            .kind(IntegratorKind::Bfgs)
            .time_step(0.1)
            .max_steps(10)
            .tolerance(1e-8)
            .build()
            .unwrap();
        let mut bfgs = Bfgs::default();
        let mut energy = system.potential_free_energy().unwrap();
        for _ in 0..4 {
            bfgs.step(&mut system, &config, &RunState::new(0.0, 0.1)).unwrap();
            let next = system.potential_free_energy().unwrap();
            assert!(next <= energy);
            energy = next;
        }
        assert!(bfgs.pending.is_some());
        bfgs.reset();
        assert!(bfgs.inverse_hessian.is_none());
    }
}
