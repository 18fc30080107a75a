use super::error::EngineError;
use crate::core::energy::dissipative::{damping_forces, dpd_forces};
use crate::core::energy::{
    self, Evaluation, ForceBreakdown, TermContext, pressure::energy_and_slope,
    surface::energy_and_tension,
};
use crate::core::geometry::{GeometryError, GeometrySnapshot, ReferenceGeometry};
use crate::core::mesh::{BoundaryMask, MeshError, MeshState, MeshTopology};
use crate::core::params::{OsmoticModel, Parameters, TensionModel, TermKind, Violations};
use nalgebra::Vector3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
struct CachedEvaluation {
    revision: u64,
    time: f64,
    evaluation: Evaluation,
}

/// A membrane under simulation: connectivity, the mutable mesh state and the
/// physics applied to it.
///
/// Geometry and energy evaluations are cached against the state's revision
/// counter, so repeated queries between mutations are free and any mutation
/// through [`MembraneSystem::state_mut`] invalidates them.
pub struct MembraneSystem {
    topology: MeshTopology,
    state: MeshState,
    parameters: Parameters,
    reference: ReferenceGeometry,
    time: f64,
    rng: StdRng,
    geometry: GeometrySnapshot,
    evaluation: Option<CachedEvaluation>,
}

impl MembraneSystem {
    /// Builds a system and captures the current configuration as its reference.
    pub fn new(
        topology: MeshTopology,
        state: MeshState,
        parameters: Parameters,
        seed: u64,
    ) -> Result<Self, EngineError> {
        if state.vertex_count() != topology.vertex_count() {
            return Err(MeshError::LengthMismatch {
                what: "vertices",
                expected: topology.vertex_count(),
                found: state.vertex_count(),
            }
            .into());
        }
        let geometry = GeometrySnapshot::compute(&topology, &state)?;
        let reference = ReferenceGeometry::capture(&topology, &state, &geometry);
        debug!(
            vertices = topology.vertex_count(),
            faces = topology.face_count(),
            area = geometry.total_area,
            volume = geometry.volume,
            "Membrane system constructed"
        );
        Ok(Self {
            topology,
            state,
            parameters,
            reference,
            time: 0.0,
            rng: StdRng::seed_from_u64(seed),
            geometry,
            evaluation: None,
        })
    }

    pub fn topology(&self) -> &MeshTopology {
        &self.topology
    }

    pub fn state(&self) -> &MeshState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MeshState {
        &mut self.state
    }

    pub fn into_state(self) -> MeshState {
        self.state
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut Parameters {
        self.evaluation = None;
        &mut self.parameters
    }

    pub fn reference(&self) -> &ReferenceGeometry {
        &self.reference
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Geometry of the current state, recomputed only if the state changed.
    pub fn geometry(&mut self) -> Result<&GeometrySnapshot, GeometryError> {
        if self.geometry.revision != self.state.revision() {
            trace!(revision = self.state.revision(), "Refreshing geometry");
            self.geometry = GeometrySnapshot::compute(&self.topology, &self.state)?;
        }
        Ok(&self.geometry)
    }

    /// Energies, conservative forces and chemical potential of the current
    /// state, with the kinetic energy filled in. Forces and chemical potential
    /// are masked by the variation toggles and boundary conditions.
    pub fn evaluate(&mut self) -> Result<Evaluation, GeometryError> {
        if let Some(cached) = &self.evaluation {
            if cached.revision == self.state.revision() && cached.time == self.time {
                return Ok(cached.evaluation.clone());
            }
        }
        self.geometry()?;
        let ctx = TermContext {
            topology: &self.topology,
            state: &self.state,
            geometry: &self.geometry,
            reference: &self.reference,
            parameters: &self.parameters,
            time: self.time,
        };
        let mut evaluation = energy::evaluate(&ctx)?;
        evaluation.energy.kinetic = self.state.kinetic_energy(self.parameters.vertex_mass);
        self.constrain(&mut evaluation.forces, &mut evaluation.chemical_potential);

        self.evaluation = Some(CachedEvaluation {
            revision: self.state.revision(),
            time: self.time,
            evaluation: evaluation.clone(),
        });
        Ok(evaluation)
    }

    /// Like [`MembraneSystem::evaluate`], with the DPD and damping fields
    /// filled for a step of size `time_step`. Draws from the system's RNG.
    pub fn evaluate_with_dissipation(&mut self, time_step: f64) -> Result<Evaluation, GeometryError> {
        let mut evaluation = self.evaluate()?;
        if let Some(dpd) = &self.parameters.dpd {
            evaluation.forces.dpd =
                dpd_forces(&self.topology, &self.state, dpd, time_step, &mut self.rng);
        }
        if let Some(damping) = &self.parameters.damping {
            evaluation.forces.damping = damping_forces(&self.state, damping);
        }
        self.constrain(&mut evaluation.forces, &mut evaluation.chemical_potential);
        Ok(evaluation)
    }

    fn constrain(&self, forces: &mut ForceBreakdown, chemical_potential: &mut [f64]) {
        let variation = self.parameters.variation;
        let mask = BoundaryMask::new(&self.topology, &self.parameters.boundary);
        forces.for_each_field_mut(|field| {
            if variation.shape {
                mask.mask_forces(field);
            } else {
                field.fill(Vector3::zeros());
            }
        });
        if variation.protein {
            mask.mask_protein(chemical_potential);
        } else {
            chemical_potential.fill(0.0);
        }
    }

    /// The objective minimized by relaxation schemes, `potential − T·S`.
    pub fn potential_free_energy(&mut self) -> Result<f64, GeometryError> {
        Ok(self.evaluate()?.energy.potential_free_energy())
    }

    /// Effective surface tension `dE/dA`, if a tension group is enabled.
    pub fn surface_tension(&mut self) -> Result<Option<f64>, GeometryError> {
        let area = self.geometry()?.total_area;
        Ok(self
            .parameters
            .tension
            .as_ref()
            .map(|t| energy_and_tension(t, area).1))
    }

    /// Osmotic pressure `−dE/dV`, if an osmotic group is enabled.
    pub fn osmotic_pressure(&mut self) -> Result<Option<f64>, GeometryError> {
        let volume = self.geometry()?.volume;
        self.parameters
            .osmotic
            .as_ref()
            .map(|o| energy_and_slope(o, volume).map(|(_, slope)| -slope))
            .transpose()
    }

    /// Relative area and volume errors of the constrained models.
    pub fn constraint_errors(&mut self) -> Result<(Option<f64>, Option<f64>), GeometryError> {
        let geometry = self.geometry()?;
        let (area, volume) = (geometry.total_area, geometry.volume);
        let area_error = self
            .parameters
            .tension
            .as_ref()
            .filter(|t| t.model == TensionModel::AreaConstrained)
            .map(|t| (area / t.target_area - 1.0).abs());
        let volume_error = self
            .parameters
            .osmotic
            .as_ref()
            .filter(|o| o.model == OsmoticModel::PreferredVolume)
            .map(|o| (volume / o.target_volume - 1.0).abs());
        Ok((area_error, volume_error))
    }

    /// Augmented Lagrangian update of the area and volume multipliers,
    /// `λ ← λ + k (X − Xt) / Xt`, applied to every constraint whose relative
    /// error exceeds `tolerance`. Returns whether any multiplier changed.
    pub fn update_constraint_multipliers(&mut self, tolerance: f64) -> Result<bool, GeometryError> {
        let (area_error, volume_error) = self.constraint_errors()?;
        let (area, volume) = (self.geometry.total_area, self.geometry.volume);
        let mut updated = false;

        if area_error.is_some_and(|e| e > tolerance) {
            if let Some(t) = self.parameters_mut().tension.as_mut() {
                t.lambda += t.ksg * (area - t.target_area) / t.target_area;
                debug!(lambda = t.lambda, "Updated area multiplier");
                updated = true;
            }
        }
        if volume_error.is_some_and(|e| e > tolerance) {
            if let Some(o) = self.parameters_mut().osmotic.as_mut() {
                o.lambda += o.kv * (volume - o.target_volume) / o.target_volume;
                debug!(lambda = o.lambda, "Updated volume multiplier");
                updated = true;
            }
        }
        Ok(updated)
    }

    /// Parameter validation composed with the checks that need the mesh.
    pub fn check_parameters_and_options(&self) -> Violations {
        let mut v = self.parameters.violations();
        let p = &self.parameters;

        if p.osmotic.is_some() {
            v.check(
                self.topology.is_closed(),
                "osmotic",
                "osmotic pressure requires a closed mesh",
            );
        }

        let density = self.state.protein_density();
        if p.is_enabled(TermKind::Entropy) || p.is_enabled(TermKind::InteriorPenalty) {
            v.check(
                density.iter().all(|&phi| phi > 0.0 && phi < 1.0),
                "protein_density",
                "entropy and the interior penalty need every density inside (0, 1)",
            );
        } else if p.protein_dynamics_enabled() {
            v.check(
                density.iter().all(|&phi| (0.0..=1.0).contains(&phi)),
                "protein_density",
                "densities must lie in [0, 1]",
            );
        }

        v.check(
            self.state.is_finite(),
            "mesh_state",
            "positions, velocities and densities must be finite",
        );
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mesh::factory::{hexagonal_patch, icosphere};
    use crate::core::params::{
        AdsorptionParams, BoundaryParams, OsmoticParams, ProteinBoundary, ProteinParams,
        ShapeBoundary, TensionParams,
    };

    fn sphere(parameters: Parameters) -> MembraneSystem {
        let (topology, state) = icosphere(1.0, 2).unwrap();
        MembraneSystem::new(topology, state, parameters, 42).unwrap()
    }

    #[test]
    fn evaluation_is_cached_until_the_state_changes() {
        let mut system = sphere(Parameters::bending_only(1.0));
        let first = system.evaluate().unwrap();
        assert_eq!(system.evaluate().unwrap(), first);

        let n = system.state().vertex_count();
        system
            .state_mut()
            .displace(&vec![Vector3::new(0.0, 0.0, 0.01); n], 1.0);
        let moved = system.evaluate().unwrap();
        assert!((moved.energy.bending - first.energy.bending).abs() < 1e-10);
        let revision = system.state().revision();
        assert_eq!(system.geometry().unwrap().revision, revision);

        system.state_mut().positions_mut()[0].x *= 1.1;
        assert_ne!(system.evaluate().unwrap().energy.bending, first.energy.bending);
    }

    #[test]
    fn kinetic_energy_is_reported() {
        let mut system = sphere(Parameters::bending_only(1.0));
        for v in system.state_mut().velocities_mut() {
            *v = Vector3::new(1.0, 0.0, 0.0);
        }
        let n = system.state().vertex_count() as f64;
        assert!((system.evaluate().unwrap().energy.kinetic - 0.5 * n).abs() < 1e-12);
    }

    #[test]
    fn osmotic_pressure_on_open_mesh_is_rejected() {
        let (topology, state) = hexagonal_patch(1.0, 2).unwrap();
        let parameters = Parameters {
            osmotic: Some(OsmoticParams {
                kv: 1.0,
                target_volume: 1.0,
                ..Default::default()
            }),
            ..Parameters::bending_only(1.0)
        };
        let system = MembraneSystem::new(topology, state, parameters, 0).unwrap();
        let err = system.check_parameters_and_options().into_result().unwrap_err();
        assert!(err.contains("osmotic"));
    }

    #[test]
    fn density_range_is_checked_against_enabled_terms() {
        let parameters = Parameters {
            protein: Some(ProteinParams {
                mobility: 1.0,
                interior_penalty: 0.1,
            }),
            ..Parameters::bending_only(1.0)
        };
        let system = sphere(parameters);
        let err = system.check_parameters_and_options().into_result().unwrap_err();
        assert!(err.contains("protein_density"));
    }

    #[test]
    fn augmented_lagrangian_moves_multiplier_toward_constraint() {
        let parameters = Parameters {
            tension: Some(TensionParams {
                model: TensionModel::AreaConstrained,
                ksg: 1.0,
                target_area: 10.0,
                lambda: 0.0,
            }),
            ..Parameters::bending_only(1.0)
        };
        let mut system = sphere(parameters);
        let area = system.geometry().unwrap().total_area;
        assert!(system.update_constraint_multipliers(1e-3).unwrap());
        let lambda = system.parameters().tension.as_ref().unwrap().lambda;
        assert!((lambda - (area - 10.0) / 10.0).abs() < 1e-12);
        assert!(lambda > 0.0);

        assert!(!system.update_constraint_multipliers(10.0).unwrap());
    }

    #[test]
    fn reported_tension_and_pressure_follow_models() {
        let parameters = Parameters {
            tension: Some(TensionParams {
                ksg: 0.5,
                ..Default::default()
            }),
            osmotic: Some(OsmoticParams {
                model: OsmoticModel::ConstantPressure,
                kv: 0.25,
                ..Default::default()
            }),
            ..Parameters::bending_only(1.0)
        };
        let mut system = sphere(parameters);
        assert_eq!(system.surface_tension().unwrap(), Some(0.5));
        assert_eq!(system.osmotic_pressure().unwrap(), Some(0.25));
    }

    #[test]
    fn pinned_boundary_receives_no_force_or_chemical_drive() {
        let (topology, mut state) = hexagonal_patch(1.0, 2).unwrap();
        for p in state.positions_mut() {
            p.z = 0.1 * (p.x * p.x - p.y);
        }
        let state = state.with_uniform_protein_density(0.3);
        let parameters = Parameters {
            tension: Some(TensionParams {
                ksg: 1.0,
                ..Default::default()
            }),
            adsorption: Some(AdsorptionParams { epsilon: -1.0 }),
            protein: Some(ProteinParams {
                mobility: 1.0,
                interior_penalty: 0.0,
            }),
            boundary: BoundaryParams {
                shape: ShapeBoundary::Pin,
                protein: ProteinBoundary::Pin,
            },
            ..Parameters::bending_only(1.0)
        };
        let mut system = MembraneSystem::new(topology, state, parameters, 0).unwrap();
        let evaluation = system.evaluate_with_dissipation(0.1).unwrap();
        let force = evaluation.forces.conservative();

        let mut interior_moves = false;
        for v in 0..system.topology().vertex_count() {
            if system.topology().is_boundary_vertex(v) {
                assert_eq!(force[v], Vector3::zeros(), "vertex {v}");
                assert_eq!(evaluation.chemical_potential[v], 0.0, "vertex {v}");
            } else {
                interior_moves |= force[v].norm() > 0.0;
                assert_ne!(evaluation.chemical_potential[v], 0.0, "vertex {v}");
            }
        }
        assert!(interior_moves);
    }

    #[test]
    fn frozen_shape_zeroes_every_force_but_keeps_energy() {
        let mut parameters = Parameters::bending_only(1.0);
        let free = sphere(parameters.clone()).evaluate().unwrap();

        parameters.variation.shape = false;
        let mut system = sphere(parameters);
        let frozen = system.evaluate().unwrap();
        assert_eq!(frozen.energy, free.energy);
        assert!(frozen.forces.conservative().iter().all(|f| *f == Vector3::zeros()));
        assert!(free.forces.conservative().iter().any(|f| f.norm() > 0.0));
    }
}
