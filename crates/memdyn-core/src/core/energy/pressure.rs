use super::{TermContext, TermContribution};
use crate::core::geometry::GeometryError;
use crate::core::geometry::variation::signed_volume_gradients;
use crate::core::params::{OsmoticModel, OsmoticParams};
use nalgebra::Vector3;

/// Osmotic energy and `dE/dV` at enclosed volume `volume`.
///
/// The osmotic pressure acting on the membrane is `−dE/dV`.
pub fn energy_and_slope(params: &OsmoticParams, volume: f64) -> Result<(f64, f64), GeometryError> {
    match params.model {
        OsmoticModel::PreferredVolume => {
            let excess = volume - params.target_volume;
            Ok((
                params.kv * excess * excess / (2.0 * params.target_volume) + params.lambda * excess,
                params.kv * excess / params.target_volume + params.lambda,
            ))
        }
        OsmoticModel::AmbientConcentration => {
            if !(volume > 0.0) {
                return Err(GeometryError::NonPositiveVolume { volume });
            }
            let n = params.enclosed_solute;
            let c = params.ambient_concentration;
            let ratio = c * volume / n;
            Ok((
                params.kv * n * (ratio - ratio.ln() - 1.0),
                params.kv * (c - n / volume),
            ))
        }
        OsmoticModel::ConstantPressure => Ok((-params.kv * volume, -params.kv)),
    }
}

pub fn compute(ctx: &TermContext<'_>) -> Result<TermContribution, GeometryError> {
    let n = ctx.topology.vertex_count();
    let Some(p) = ctx.parameters.osmotic.as_ref() else {
        return Ok(TermContribution::zero(n));
    };
    let (energy, slope) = energy_and_slope(p, ctx.geometry.volume)?;

    let x = ctx.state.positions();
    let mut forces = vec![Vector3::zeros(); n];
    for face in ctx.topology.faces() {
        let grads = signed_volume_gradients([&x[face[0]], &x[face[1]], &x[face[2]]]);
        for (k, grad) in grads.iter().enumerate() {
            forces[face[k]] -= slope * grad;
        }
    }

    Ok(TermContribution {
        energy,
        forces,
        chemical_potential: None,
    })
}
