use super::{TermContext, TermContribution, add_area_forces};
use crate::core::geometry::GeometryError;
use nalgebra::Vector3;

/// Adsorption: `E = ε Σ_i φ_i A_i`.
pub fn compute_adsorption(ctx: &TermContext<'_>) -> Result<TermContribution, GeometryError> {
    let n = ctx.topology.vertex_count();
    let Some(p) = ctx.parameters.adsorption.as_ref() else {
        return Ok(TermContribution::zero(n));
    };
    density_weighted_area(ctx, |phi| p.epsilon * phi, |_| p.epsilon)
}

/// Aggregation: `E = χ Σ_i φ_i² A_i`.
pub fn compute_aggregation(ctx: &TermContext<'_>) -> Result<TermContribution, GeometryError> {
    let n = ctx.topology.vertex_count();
    let Some(p) = ctx.parameters.aggregation.as_ref() else {
        return Ok(TermContribution::zero(n));
    };
    density_weighted_area(ctx, |phi| p.chi * phi * phi, |phi| 2.0 * p.chi * phi)
}

/// Shared form `E = Σ_i g(φ_i) A_i` with `μ_i = −g'(φ_i) A_i`.
pub(crate) fn density_weighted_area(
    ctx: &TermContext<'_>,
    density: impl Fn(f64) -> f64,
    slope: impl Fn(f64) -> f64,
) -> Result<TermContribution, GeometryError> {
    let phi = ctx.state.protein_density();
    let areas = &ctx.geometry.vertex_dual_areas;
    let g: Vec<f64> = phi.iter().map(|&x| density(x)).collect();

    let energy = g.iter().zip(areas).map(|(g, a)| g * a).sum();

    let mut forces = vec![Vector3::zeros(); phi.len()];
    add_area_forces(ctx, &mut forces, |face| {
        face.iter().map(|&v| g[v]).sum::<f64>() / 3.0
    });

    let chemical_potential = phi
        .iter()
        .zip(areas)
        .map(|(&x, a)| -slope(x) * a)
        .collect();

    Ok(TermContribution {
        energy,
        forces,
        chemical_potential: Some(chemical_potential),
    })
}
