use super::{TermContext, TermContribution};
use crate::core::geometry::GeometryError;
use crate::core::geometry::variation::triangle_area_gradients;
use nalgebra::Vector3;

/// Line tension of density interfaces: `E = (η/2) Σ_f |∇φ|_f² A_f`.
///
/// On a linear triangle `∇φ = (N × Σ_k φ_k e_k) / 2A`, with `e_k` the edge
/// opposite corner `k`, so each face contributes `(η/8) |Σ_k φ_k e_k|² / A`.
pub fn compute(ctx: &TermContext<'_>) -> Result<TermContribution, GeometryError> {
    let n = ctx.topology.vertex_count();
    let Some(p) = ctx.parameters.dirichlet.as_ref() else {
        return Ok(TermContribution::zero(n));
    };
    let x = ctx.state.positions();
    let phi = ctx.state.protein_density();
    let eta = p.eta;

    let mut energy = 0.0;
    let mut forces = vec![Vector3::zeros(); n];
    let mut chemical_potential = vec![0.0; n];

    for (f, face) in ctx.topology.faces().iter().enumerate() {
        let corners = [&x[face[0]], &x[face[1]], &x[face[2]]];
        let values = [phi[face[0]], phi[face[1]], phi[face[2]]];
        let edges: [Vector3<f64>; 3] =
            std::array::from_fn(|k| corners[(k + 2) % 3] - corners[(k + 1) % 3]);
        let g: Vector3<f64> = (0..3).map(|k| values[k] * edges[k]).sum();
        let g2 = g.norm_squared();
        let area = ctx.geometry.face_areas[f];

        energy += eta / 8.0 * g2 / area;

        let area_grads = triangle_area_gradients(corners);
        for k in 0..3 {
            let dg = 2.0 * (values[(k + 1) % 3] - values[(k + 2) % 3]) / area * g;
            let grad = eta / 8.0 * (dg - g2 / (area * area) * area_grads[k]);
            forces[face[k]] -= grad;
            chemical_potential[face[k]] -= eta / 4.0 * g.dot(&edges[k]) / area;
        }
    }

    Ok(TermContribution {
        energy,
        forces,
        chemical_potential: Some(chemical_potential),
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::core::params::TermKind;

    #[test]
    fn uniform_density_has_no_line_tension() {
        let mut fixture = sphere_fixture(all_terms());
        for phi in fixture.state.protein_density_mut() {
            *phi = 0.4;
        }
        let c = fixture.contribution(TermKind::Dirichlet, &fixture.state);
        assert!(c.energy.abs() < 1e-20);
        assert!(c.forces.iter().all(|f| f.norm() < 1e-12));
        assert!(c.chemical_potential.unwrap().iter().all(|mu| mu.abs() < 1e-12));
    }
}
