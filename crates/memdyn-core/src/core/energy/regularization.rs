use super::{TermContext, TermContribution};
use crate::core::geometry::GeometryError;
use crate::core::geometry::variation::{
    edge_length_gradient, length_cross_ratio, length_cross_ratio_gradients,
    triangle_area_gradients,
};
use nalgebra::Vector3;

/// Mesh-quality springs toward the reference configuration:
///
/// `E = Kse/2 Σ_e ((l − l⁰)/l⁰)² + Ksl/2 Σ_f ((A − A⁰)/A⁰)² + Kst/2 Σ_e ((c − c⁰)/c⁰)²`
///
/// where `c` is the length cross ratio of an interior edge's diamond.
pub fn compute(ctx: &TermContext<'_>) -> Result<TermContribution, GeometryError> {
    let n = ctx.topology.vertex_count();
    let Some(p) = ctx.parameters.regularization.as_ref() else {
        return Ok(TermContribution::zero(n));
    };
    let x = ctx.state.positions();
    let geo = ctx.geometry;
    let reference = ctx.reference;

    let mut energy = 0.0;
    let mut forces = vec![Vector3::zeros(); n];

    for (e, edge) in ctx.topology.edges().iter().enumerate() {
        let [a, b] = edge.vertices;
        if p.kse != 0.0 {
            let rest = reference.edge_lengths[e];
            let strain = (geo.edge_lengths[e] - rest) / rest;
            energy += 0.5 * p.kse * strain * strain;
            let grad = p.kse * strain / rest * edge_length_gradient(&x[a], &x[b]);
            forces[a] -= grad;
            forces[b] += grad;
        }
        if p.kst != 0.0 {
            if let (Some([a, b, c, d]), Some(rest)) =
                (edge.diamond(), reference.length_cross_ratios[e])
            {
                let strain = (length_cross_ratio(&x[a], &x[b], &x[c], &x[d]) - rest) / rest;
                energy += 0.5 * p.kst * strain * strain;
                let grads = length_cross_ratio_gradients(&x[a], &x[b], &x[c], &x[d]);
                for (v, grad) in [a, b, c, d].into_iter().zip(grads) {
                    forces[v] -= p.kst * strain / rest * grad;
                }
            }
        }
    }

    if p.ksl != 0.0 {
        for (f, face) in ctx.topology.faces().iter().enumerate() {
            let rest = reference.face_areas[f];
            let strain = (geo.face_areas[f] - rest) / rest;
            energy += 0.5 * p.ksl * strain * strain;
            let grads = triangle_area_gradients([&x[face[0]], &x[face[1]], &x[face[2]]]);
            for (k, grad) in grads.iter().enumerate() {
                forces[face[k]] -= p.ksl * strain / rest * grad;
            }
        }
    }

    Ok(TermContribution {
        energy,
        forces,
        chemical_potential: None,
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::core::params::{RegularizationParams, TermKind};

    #[test]
    fn reference_configuration_is_unstrained() {
        let mut fixture = sphere_fixture(all_terms());
        let rest = fixture.reference.positions.clone();
        fixture.state.positions_mut().copy_from_slice(&rest);
        let c = fixture.contribution(TermKind::Regularization, &fixture.state);
        assert!(c.energy.abs() < 1e-20);
        assert!(c.forces.iter().all(|f| f.norm() < 1e-12));
    }

    #[test]
    fn each_spring_family_matches_its_gradient_alone() {
        for (kse, ksl, kst) in [(1.0, 0.0, 0.0), (0.0, 1.0, 0.0), (0.0, 0.0, 1.0)] {
            let mut parameters = all_terms();
            parameters.regularization = Some(RegularizationParams { kse, ksl, kst });
            let fixture = sphere_fixture(parameters);
            assert_force_is_negative_gradient(&fixture, TermKind::Regularization);
        }
    }
}
