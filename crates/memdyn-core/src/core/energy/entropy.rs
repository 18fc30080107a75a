use super::adsorption::density_weighted_area;
use super::{TermContext, TermContribution, require_open_unit_density};
use crate::core::geometry::GeometryError;

/// Mixing entropy, reported as its free-energy contribution
/// `−T·S = kT Σ_i A_i [φ ln φ + (1 − φ) ln(1 − φ)]`.
pub fn compute_entropy(ctx: &TermContext<'_>) -> Result<TermContribution, GeometryError> {
    let n = ctx.topology.vertex_count();
    let Some(p) = ctx.parameters.entropy.as_ref() else {
        return Ok(TermContribution::zero(n));
    };
    require_open_unit_density(ctx.state)?;
    let kbt = p.kbt;
    density_weighted_area(
        ctx,
        |phi| kbt * (phi * phi.ln() + (1.0 - phi) * (1.0 - phi).ln()),
        |phi| kbt * (phi / (1.0 - phi)).ln(),
    )
}

/// Barrier `E = −λ Σ_i [ln φ_i + ln(1 − φ_i)]` keeping the density inside `(0, 1)`.
pub fn compute_interior_penalty(ctx: &TermContext<'_>) -> Result<TermContribution, GeometryError> {
    let n = ctx.topology.vertex_count();
    let lambda = match ctx.parameters.protein.as_ref() {
        Some(p) if p.interior_penalty > 0.0 => p.interior_penalty,
        _ => return Ok(TermContribution::zero(n)),
    };
    require_open_unit_density(ctx.state)?;
    let phi = ctx.state.protein_density();

    let energy = -lambda * phi.iter().map(|&x| x.ln() + (1.0 - x).ln()).sum::<f64>();
    let chemical_potential = phi
        .iter()
        .map(|&x| lambda * (1.0 / x - 1.0 / (1.0 - x)))
        .collect();

    Ok(TermContribution {
        energy,
        chemical_potential: Some(chemical_potential),
        ..TermContribution::zero(n)
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::core::params::TermKind;

    #[test]
    fn entropy_is_maximal_at_half_coverage() {
        let mut fixture = sphere_fixture(all_terms());
        for phi in fixture.state.protein_density_mut() {
            *phi = 0.5;
        }
        let c = fixture.contribution(TermKind::Entropy, &fixture.state);
        let area = fixture.geometry().total_area;
        assert!((c.energy - 0.2 * area * 0.5f64.ln()).abs() < 1e-12);
        assert!(c.chemical_potential.unwrap().iter().all(|mu| mu.abs() < 1e-15));
    }

    #[test]
    fn interior_penalty_pushes_density_toward_the_middle() {
        let mut fixture = sphere_fixture(all_terms());
        fixture.state.protein_density_mut()[0] = 0.05;
        fixture.state.protein_density_mut()[1] = 0.95;
        let c = fixture.contribution(TermKind::InteriorPenalty, &fixture.state);
        let mu = c.chemical_potential.unwrap();
        assert!(mu[0] > 0.0);
        assert!(mu[1] < 0.0);
        assert!(c.forces.iter().all(|f| f.norm() == 0.0));
    }
}
