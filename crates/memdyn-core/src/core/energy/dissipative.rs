use crate::core::mesh::{MeshState, MeshTopology};
use crate::core::params::{DampingParams, DpdParams};
use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Pairwise dissipative and random forces along every edge.
///
/// The damping part is `−γ ((v_a − v_b)·ê) ê`; the random part has amplitude
/// `sqrt(2 γ kT / dt)` so that the pair satisfies fluctuation-dissipation at
/// step `time_step`. Both act equal and opposite on the two ends.
pub fn dpd_forces<R: Rng + ?Sized>(
    topology: &MeshTopology,
    state: &MeshState,
    params: &DpdParams,
    time_step: f64,
    rng: &mut R,
) -> Vec<Vector3<f64>> {
    let x = state.positions();
    let v = state.velocities();
    let sigma = if params.kbt > 0.0 && time_step > 0.0 {
        (2.0 * params.gamma * params.kbt / time_step).sqrt()
    } else {
        0.0
    };

    let mut forces = vec![Vector3::zeros(); topology.vertex_count()];
    for edge in topology.edges() {
        let [a, b] = edge.vertices;
        let direction = (x[a] - x[b]).normalize();
        let damping = -params.gamma * (v[a] - v[b]).dot(&direction);
        let noise = if sigma > 0.0 {
            let xi: f64 = StandardNormal.sample(rng);
            sigma * xi
        } else {
            0.0
        };
        let pair = (damping + noise) * direction;
        forces[a] += pair;
        forces[b] -= pair;
    }
    forces
}

/// Viscous drag `−c v` on every vertex.
pub fn damping_forces(state: &MeshState, params: &DampingParams) -> Vec<Vector3<f64>> {
    state
        .velocities()
        .iter()
        .map(|v| -params.coefficient * v)
        .collect()
}
