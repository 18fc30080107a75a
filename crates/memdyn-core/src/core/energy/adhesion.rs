use super::{TermContext, TermContribution, add_area_forces};
use crate::core::geometry::GeometryError;
use nalgebra::Vector3;

/// Adhesion to a flat substrate: `E = −w Σ_i A_i exp(−(z_i − z0)² / 2ρ²)`.
pub fn compute(ctx: &TermContext<'_>) -> Result<TermContribution, GeometryError> {
    let n = ctx.topology.vertex_count();
    let Some(p) = ctx.parameters.adhesion.as_ref() else {
        return Ok(TermContribution::zero(n));
    };
    let x = ctx.state.positions();
    let areas = &ctx.geometry.vertex_dual_areas;
    let range2 = p.range * p.range;

    let well: Vec<f64> = x
        .iter()
        .map(|pos| (-(pos.z - p.substrate_height).powi(2) / (2.0 * range2)).exp())
        .collect();

    let energy = -p.energy * well.iter().zip(areas).map(|(g, a)| g * a).sum::<f64>();

    let mut forces = vec![Vector3::zeros(); n];
    add_area_forces(ctx, &mut forces, |face| {
        -p.energy * face.iter().map(|&v| well[v]).sum::<f64>() / 3.0
    });
    for (v, force) in forces.iter_mut().enumerate() {
        let dz = x[v].z - p.substrate_height;
        force.z -= p.energy * areas[v] * well[v] * dz / range2;
    }

    Ok(TermContribution {
        energy,
        forces,
        chemical_potential: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{GeometrySnapshot, ReferenceGeometry};
    use crate::core::mesh::factory::hexagonal_patch;
    use crate::core::params::{AdhesionParams, Parameters};

    #[test]
    fn flat_membrane_above_substrate_is_pulled_down() {
        let (topology, state) = hexagonal_patch(0.5, 2).unwrap();
        let geometry = GeometrySnapshot::compute(&topology, &state).unwrap();
        let reference = ReferenceGeometry::capture(&topology, &state, &geometry);
        let parameters = Parameters {
            adhesion: Some(AdhesionParams {
                energy: 1.0,
                range: 0.5,
                substrate_height: -0.2,
            }),
            ..Default::default()
        };
        let ctx = TermContext {
            topology: &topology,
            state: &state,
            geometry: &geometry,
            reference: &reference,
            parameters: &parameters,
            time: 0.0,
        };
        let c = compute(&ctx).unwrap();
        let well = (-0.04f64 / 0.5).exp();
        assert!((c.energy + well * geometry.total_area).abs() < 1e-12);
        assert!(c.forces.iter().all(|f| f.z < 0.0));
    }
}
