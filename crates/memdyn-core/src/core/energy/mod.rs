//! # Energy Module
//!
//! The force/energy engine of the membrane model.
//!
//! ## Overview
//!
//! Each named term lives in its own submodule and exposes a pure
//! `compute(&TermContext) -> Result<TermContribution, GeometryError>` returning the
//! term's energy, its per-vertex force (the exact negative gradient of that energy with
//! respect to vertex positions) and, for density-dependent terms, its contribution to
//! the chemical potential `μ = −∂E/∂φ`.
//!
//! Dispatch is a static table, [`TERMS`], of `(kind, predicate, compute)` entries; the
//! predicate is evaluated against the [`Parameters`] each time, so disabled terms cost
//! nothing. [`evaluate`] runs every enabled entry (in parallel with the `parallel`
//! feature) and folds the results in table order, which keeps the sums bit-reproducible.
//!
//! ## Key Components
//!
//! - [`breakdown`] - [`EnergyBreakdown`] and [`ForceBreakdown`] records
//! - [`bending`], [`surface`], [`pressure`], [`adsorption`], [`adhesion`], [`dirichlet`],
//!   [`entropy`], [`external`], [`regularization`] - conservative terms
//! - [`dissipative`] - DPD and viscous damping, which depend on velocities and have no
//!   energy

pub mod adhesion;
pub mod adsorption;
pub mod bending;
pub mod breakdown;
pub mod dirichlet;
pub mod dissipative;
pub mod entropy;
pub mod external;
pub mod pressure;
pub mod regularization;
pub mod surface;

pub use breakdown::{EnergyBreakdown, ForceBreakdown};

use crate::core::geometry::variation::triangle_area_gradients;
use crate::core::geometry::{GeometryError, GeometrySnapshot, ReferenceGeometry};
use crate::core::mesh::{MeshState, MeshTopology};
use crate::core::params::{Parameters, TermKind};
use nalgebra::Vector3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Everything a term needs to evaluate itself.
#[derive(Clone, Copy)]
pub struct TermContext<'a> {
    pub topology: &'a MeshTopology,
    pub state: &'a MeshState,
    pub geometry: &'a GeometrySnapshot,
    pub reference: &'a ReferenceGeometry,
    pub parameters: &'a Parameters,
    pub time: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TermContribution {
    pub energy: f64,
    pub forces: Vec<Vector3<f64>>,
    pub chemical_potential: Option<Vec<f64>>,
}

impl TermContribution {
    pub fn zero(vertex_count: usize) -> Self {
        Self {
            energy: 0.0,
            forces: vec![Vector3::zeros(); vertex_count],
            chemical_potential: None,
        }
    }
}

pub type ComputeFn = fn(&TermContext<'_>) -> Result<TermContribution, GeometryError>;

pub struct TermEntry {
    pub kind: TermKind,
    pub is_enabled: fn(&Parameters) -> bool,
    pub compute: ComputeFn,
}

/// Conservative terms in evaluation order.
pub static TERMS: [TermEntry; 11] = [
    TermEntry {
        kind: TermKind::Bending,
        is_enabled: |p| p.is_enabled(TermKind::Bending),
        compute: bending::compute,
    },
    TermEntry {
        kind: TermKind::Surface,
        is_enabled: |p| p.is_enabled(TermKind::Surface),
        compute: surface::compute,
    },
    TermEntry {
        kind: TermKind::Pressure,
        is_enabled: |p| p.is_enabled(TermKind::Pressure),
        compute: pressure::compute,
    },
    TermEntry {
        kind: TermKind::Adsorption,
        is_enabled: |p| p.is_enabled(TermKind::Adsorption),
        compute: adsorption::compute_adsorption,
    },
    TermEntry {
        kind: TermKind::Aggregation,
        is_enabled: |p| p.is_enabled(TermKind::Aggregation),
        compute: adsorption::compute_aggregation,
    },
    TermEntry {
        kind: TermKind::Adhesion,
        is_enabled: |p| p.is_enabled(TermKind::Adhesion),
        compute: adhesion::compute,
    },
    TermEntry {
        kind: TermKind::Dirichlet,
        is_enabled: |p| p.is_enabled(TermKind::Dirichlet),
        compute: dirichlet::compute,
    },
    TermEntry {
        kind: TermKind::Entropy,
        is_enabled: |p| p.is_enabled(TermKind::Entropy),
        compute: entropy::compute_entropy,
    },
    TermEntry {
        kind: TermKind::InteriorPenalty,
        is_enabled: |p| p.is_enabled(TermKind::InteriorPenalty),
        compute: entropy::compute_interior_penalty,
    },
    TermEntry {
        kind: TermKind::External,
        is_enabled: |p| p.is_enabled(TermKind::External),
        compute: external::compute,
    },
    TermEntry {
        kind: TermKind::Regularization,
        is_enabled: |p| p.is_enabled(TermKind::Regularization),
        compute: regularization::compute,
    },
];

/// Looks up the table entry for a conservative term.
pub fn entry(kind: TermKind) -> Option<&'static TermEntry> {
    TERMS.iter().find(|e| e.kind == kind)
}

/// Result of one full pass over the enabled terms.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub energy: EnergyBreakdown,
    pub forces: ForceBreakdown,
    pub chemical_potential: Vec<f64>,
}

/// Evaluates every enabled conservative term.
///
/// The kinetic entry of the returned breakdown is zero; dissipative forces are
/// not included.
pub fn evaluate(ctx: &TermContext<'_>) -> Result<Evaluation, GeometryError> {
    let n = ctx.topology.vertex_count();
    let enabled: Vec<&TermEntry> = TERMS
        .iter()
        .filter(|entry| (entry.is_enabled)(ctx.parameters))
        .collect();

    let iterator = enabled.iter();

    #[cfg(feature = "parallel")]
    let iterator = enabled.par_iter();

    let contributions: Vec<(TermKind, TermContribution)> = iterator
        .map(|entry| (entry.compute)(ctx).map(|c| (entry.kind, c)))
        .collect::<Result<_, _>>()?;

    let mut energy = EnergyBreakdown::default();
    let mut forces = ForceBreakdown::zeros(n);
    let mut chemical_potential = vec![0.0; n];
    for (kind, contribution) in contributions {
        if !contribution.energy.is_finite() {
            return Err(GeometryError::NonFinite {
                quantity: kind.name(),
            });
        }
        energy.record(kind, contribution.energy);
        if let Some(field) = forces.field_mut(kind) {
            *field = contribution.forces;
        }
        if let Some(mu) = contribution.chemical_potential {
            for (total, m) in chemical_potential.iter_mut().zip(mu) {
                *total += m;
            }
        }
    }

    Ok(Evaluation {
        energy,
        forces,
        chemical_potential,
    })
}

/// Sums every enabled conservative force into its named field.
pub fn compute_physical_forces(ctx: &TermContext<'_>) -> Result<ForceBreakdown, GeometryError> {
    evaluate(ctx).map(|e| e.forces)
}

/// Energy breakdown of the enabled terms plus the supplied kinetic energy.
pub fn compute_free_energy(
    ctx: &TermContext<'_>,
    kinetic: f64,
) -> Result<EnergyBreakdown, GeometryError> {
    let mut energy = evaluate(ctx)?.energy;
    energy.kinetic = kinetic;
    Ok(energy)
}

/// Chemical potential `μ = −∂F/∂φ` summed over density-dependent terms.
pub fn compute_chemical_potential(ctx: &TermContext<'_>) -> Result<Vec<f64>, GeometryError> {
    evaluate(ctx).map(|e| e.chemical_potential)
}

/// Adds `−c_f ∇A_f` to the corners of every face, where `c_f` is the
/// coefficient returned for that face.
pub(crate) fn add_area_forces(
    ctx: &TermContext<'_>,
    forces: &mut [Vector3<f64>],
    coefficient: impl Fn(&[usize; 3]) -> f64,
) {
    let x = ctx.state.positions();
    for face in ctx.topology.faces() {
        let c = coefficient(face);
        if c == 0.0 {
            continue;
        }
        let grads = triangle_area_gradients([&x[face[0]], &x[face[1]], &x[face[2]]]);
        for (k, grad) in grads.iter().enumerate() {
            forces[face[k]] -= c * grad;
        }
    }
}

/// Checks that every density value lies strictly inside `(0, 1)`.
pub(crate) fn require_open_unit_density(state: &MeshState) -> Result<(), GeometryError> {
    match state
        .protein_density()
        .iter()
        .position(|&phi| !(phi > 0.0 && phi < 1.0))
    {
        Some(vertex) => Err(GeometryError::DensityOutOfRange {
            vertex,
            value: state.protein_density()[vertex],
        }),
        None => Ok(()),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn every_term_force_is_negative_energy_gradient_on_closed_mesh() {
        let fixture = sphere_fixture(all_terms());
        for entry in TERMS.iter() {
            assert!((entry.is_enabled)(&fixture.parameters));
            assert_force_is_negative_gradient(&fixture, entry.kind);
        }
    }

    #[test]
    fn every_term_force_is_negative_energy_gradient_on_open_mesh() {
        let fixture = patch_fixture(all_terms());
        for entry in TERMS.iter().filter(|e| e.kind != TermKind::Pressure) {
            assert_force_is_negative_gradient(&fixture, entry.kind);
        }
    }

    #[test]
    fn evaluate_skips_disabled_terms() {
        let fixture = sphere_fixture(Parameters::bending_only(1.0));
        let geometry = fixture.geometry();
        let ctx = TermContext {
            topology: &fixture.topology,
            state: &fixture.state,
            geometry: &geometry,
            reference: &fixture.reference,
            parameters: &fixture.parameters,
            time: 0.0,
        };
        let eval = evaluate(&ctx).unwrap();
        assert!(eval.energy.bending > 0.0);
        assert_eq!(eval.energy.potential(), eval.energy.bending);
        assert!(eval.forces.capillary.iter().all(|f| *f == Vector3::zeros()));
        assert!(eval.chemical_potential.iter().all(|&mu| mu == 0.0));
    }

    #[test]
    fn evaluation_matches_individual_terms() {
        let fixture = sphere_fixture(all_terms());
        let geometry = fixture.geometry();
        let ctx = TermContext {
            topology: &fixture.topology,
            state: &fixture.state,
            geometry: &geometry,
            reference: &fixture.reference,
            parameters: &fixture.parameters,
            time: 0.3,
        };
        let eval = evaluate(&ctx).unwrap();
        let mut expected_mu = vec![0.0; fixture.state.vertex_count()];
        for entry in TERMS.iter() {
            let c = fixture.contribution(entry.kind, &fixture.state);
            assert_eq!(eval.energy.contribution(entry.kind), c.energy);
            if let Some(field) = eval.forces.field(entry.kind) {
                assert_eq!(field, c.forces.as_slice());
            }
            if let Some(mu) = c.chemical_potential {
                for (e, m) in expected_mu.iter_mut().zip(mu) {
                    *e += m;
                }
            }
        }
        for (a, b) in eval.chemical_potential.iter().zip(&expected_mu) {
            assert!((a - b).abs() < 1e-12);
        }

        let free = compute_free_energy(&ctx, 2.0).unwrap();
        assert_eq!(free.kinetic, 2.0);
        assert_eq!(free.potential(), eval.energy.potential());
        assert_eq!(compute_physical_forces(&ctx).unwrap(), eval.forces);
        assert_eq!(compute_chemical_potential(&ctx).unwrap(), eval.chemical_potential);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let fixture = sphere_fixture(all_terms());
        let geometry = fixture.geometry();
        let ctx = TermContext {
            topology: &fixture.topology,
            state: &fixture.state,
            geometry: &geometry,
            reference: &fixture.reference,
            parameters: &fixture.parameters,
            time: 0.3,
        };
        assert_eq!(evaluate(&ctx).unwrap(), evaluate(&ctx).unwrap());
    }

    #[test]
    fn density_outside_unit_interval_is_rejected_by_entropy() {
        let mut fixture = sphere_fixture(all_terms());
        fixture.state.protein_density_mut()[3] = 1.0;
        let geometry = fixture.geometry();
        let ctx = TermContext {
            topology: &fixture.topology,
            state: &fixture.state,
            geometry: &geometry,
            reference: &fixture.reference,
            parameters: &fixture.parameters,
            time: 0.0,
        };
        assert_eq!(
            evaluate(&ctx).unwrap_err(),
            GeometryError::DensityOutOfRange {
                vertex: 3,
                value: 1.0
            }
        );
    }
}
