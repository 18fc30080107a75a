use super::{TermContext, TermContribution, add_area_forces};
use crate::core::geometry::GeometryError;
use crate::core::geometry::variation::{dihedral_angle_gradients, edge_length_gradient};

/// Helfrich bending: `E = Σ_i Kb_i (H_i − H0_i)² A_i`.
///
/// The rigidity `Kb_i = kb + kbc f(φ_i)` and spontaneous curvature
/// `H0_i = h0c f(φ_i)` follow the configured curvature relation. The
/// integrated mean curvature is `¼ Σ l θ` over incident interior edges.
pub fn compute(ctx: &TermContext<'_>) -> Result<TermContribution, GeometryError> {
    let n = ctx.topology.vertex_count();
    let Some(p) = ctx.parameters.bending.as_ref() else {
        return Ok(TermContribution::zero(n));
    };
    let x = ctx.state.positions();
    let phi = ctx.state.protein_density();
    let geo = ctx.geometry;

    let mut rigidity = Vec::with_capacity(n);
    let mut rigidity_slope = Vec::with_capacity(n);
    let mut spontaneous = Vec::with_capacity(n);
    let mut spontaneous_slope = Vec::with_capacity(n);
    for &density in phi {
        let (f, df) = p.relation.eval(density);
        rigidity.push(p.kb + p.kbc * f);
        rigidity_slope.push(p.kbc * df);
        spontaneous.push(p.h0c * f);
        spontaneous_slope.push(p.h0c * df);
    }
    let h: Vec<f64> = (0..n).map(|v| geo.mean_curvature(v)).collect();

    let energy = (0..n)
        .map(|v| rigidity[v] * (h[v] - spontaneous[v]).powi(2) * geo.vertex_dual_areas[v])
        .sum();

    let weight: Vec<f64> = (0..n)
        .map(|v| 2.0 * rigidity[v] * (h[v] - spontaneous[v]))
        .collect();

    let mut forces = vec![nalgebra::Vector3::zeros(); n];
    for (e, edge) in ctx.topology.edges().iter().enumerate() {
        let Some([a, b, c, d]) = edge.diamond() else {
            continue;
        };
        let coefficient = 0.25 * (weight[a] + weight[b]);
        let theta = geo.edge_dihedral_angles[e];
        let length = geo.edge_lengths[e];

        let length_grad = coefficient * theta * edge_length_gradient(&x[a], &x[b]);
        forces[a] -= length_grad;
        forces[b] += length_grad;

        let angle_grads = dihedral_angle_gradients(&x[a], &x[b], &x[c], &x[d]);
        for (v, grad) in [a, b, c, d].into_iter().zip(angle_grads) {
            forces[v] -= coefficient * length * grad;
        }
    }

    // Differentiating H = Hint / A through the dual area.
    add_area_forces(ctx, &mut forces, |face| {
        face.iter()
            .map(|&v| rigidity[v] * (spontaneous[v].powi(2) - h[v].powi(2)))
            .sum::<f64>()
            / 3.0
    });

    let chemical_potential = (0..n)
        .map(|v| {
            let dh = h[v] - spontaneous[v];
            -geo.vertex_dual_areas[v]
                * (dh * dh * rigidity_slope[v] - 2.0 * rigidity[v] * dh * spontaneous_slope[v])
        })
        .collect();

    Ok(TermContribution {
        energy,
        forces,
        chemical_potential: Some(chemical_potential),
    })
}
