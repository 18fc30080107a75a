use super::{TermContext, TermContribution, add_area_forces};
use crate::core::geometry::GeometryError;
use crate::core::params::{TensionModel, TensionParams};

/// Surface energy and tension `γ = dE/dA` at total area `area`.
pub fn energy_and_tension(params: &TensionParams, area: f64) -> (f64, f64) {
    match params.model {
        TensionModel::Constant => (params.ksg * area, params.ksg),
        TensionModel::AreaConstrained => {
            let excess = area - params.target_area;
            (
                params.ksg * excess * excess / (2.0 * params.target_area) + params.lambda * excess,
                params.ksg * excess / params.target_area + params.lambda,
            )
        }
    }
}

/// Capillary force `−γ ∇A` of the surface energy.
pub fn compute(ctx: &TermContext<'_>) -> Result<TermContribution, GeometryError> {
    let n = ctx.topology.vertex_count();
    let Some(p) = ctx.parameters.tension.as_ref() else {
        return Ok(TermContribution::zero(n));
    };
    let (energy, tension) = energy_and_tension(p, ctx.geometry.total_area);

    let mut forces = vec![nalgebra::Vector3::zeros(); n];
    add_area_forces(ctx, &mut forces, |_| tension);

    Ok(TermContribution {
        energy,
        forces,
        chemical_potential: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_tension_is_linear_in_area() {
        let p = TensionParams {
            model: TensionModel::Constant,
            ksg: 0.3,
            ..Default::default()
        };
        assert_eq!(energy_and_tension(&p, 2.0), (0.6, 0.3));
    }

    #[test]
    fn area_constrained_tension_vanishes_at_target_without_multiplier() {
        let p = TensionParams {
            model: TensionModel::AreaConstrained,
            ksg: 2.0,
            target_area: 4.0,
            lambda: 0.0,
        };
        assert_eq!(energy_and_tension(&p, 4.0), (0.0, 0.0));
        let (energy, tension) = energy_and_tension(&p, 5.0);
        assert!((energy - 0.25).abs() < 1e-12);
        assert!((tension - 0.5).abs() < 1e-12);
    }
}
