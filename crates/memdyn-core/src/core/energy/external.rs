use super::{TermContext, TermContribution};
use crate::core::geometry::GeometryError;
use crate::core::params::ExternalParams;
use nalgebra::{Point3, Vector3};

/// Magnitude multiplier of the external field at time `time`.
pub fn decay(params: &ExternalParams, time: f64) -> f64 {
    params.decay_time.map_or(1.0, |tau| (-time / tau).exp())
}

/// Prescribed force on every vertex.
///
/// The profile is laid out on the reference configuration: a Gaussian of
/// width `σ` in the distance to the anchor, scaled by the reference dual
/// area and pointing along the configured direction.
pub fn field(ctx: &TermContext<'_>) -> Vec<Vector3<f64>> {
    let n = ctx.topology.vertex_count();
    let Some(p) = ctx.parameters.external.as_ref() else {
        return vec![Vector3::zeros(); n];
    };
    let anchor = Point3::from(p.anchor);
    let direction = Vector3::from(p.direction).normalize();
    let magnitude = p.kf * decay(p, ctx.time);
    let width2 = p.width * p.width;

    ctx.reference
        .positions
        .iter()
        .zip(&ctx.reference.vertex_dual_areas)
        .map(|(x0, a0)| {
            let d2 = (x0 - anchor).norm_squared();
            magnitude * a0 * (-d2 / (2.0 * width2)).exp() * direction
        })
        .collect()
}

/// Work potential `E = −Σ_i f_i · (x_i − x_i⁰)` of the prescribed field.
pub fn compute(ctx: &TermContext<'_>) -> Result<TermContribution, GeometryError> {
    let forces = field(ctx);
    let energy = -forces
        .iter()
        .zip(ctx.state.positions())
        .zip(&ctx.reference.positions)
        .map(|((f, x), x0)| f.dot(&(x - x0)))
        .sum::<f64>();

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
    use crate::core::params::TermKind;

    #[test]
    fn decay_is_exponential_when_configured() {
        let mut p = ExternalParams {
            decay_time: Some(2.0),
            ..Default::default()
        };
        assert!((decay(&p, 2.0) - (-1.0f64).exp()).abs() < 1e-15);
        p.decay_time = None;
        assert_eq!(decay(&p, 100.0), 1.0);
    }

    #[test]
    fn field_points_along_direction_and_peaks_at_anchor() {
        let fixture = sphere_fixture(all_terms());
        let c = fixture.contribution(TermKind::External, &fixture.state);
        let closest = fixture
            .reference
            .positions
            .iter()
            .enumerate()
            .min_by(|a, b| {
                let anchor = Point3::new(0.0, 0.0, 1.0);
                (a.1 - anchor).norm().total_cmp(&(b.1 - anchor).norm())
            })
            .map(|(v, _)| v)
            .unwrap();
        for f in &c.forces {
            assert!(f.x == 0.0 && f.y == 0.0 && f.z > 0.0);
        }
        let peak = c.forces[closest].z / fixture.reference.vertex_dual_areas[closest];
        for (f, a) in c.forces.iter().zip(&fixture.reference.vertex_dual_areas) {
            assert!(f.z / a <= peak + 1e-12);
        }
    }
}
