//! Backtracking line searches for the mechanical and chemical updates.
//!
//! Both searches test the Armijo condition `E(α) ≤ E(0) − c1 α (F·d)` on the
//! potential free energy, where `F` is the negative gradient and `d` the search
//! direction, and shrink `α ← ρ α` after every rejection. A trial whose
//! geometry is degenerate counts as a rejection. Once `α` would fall below
//! `min_step_ratio · α0` the search gives up, restores the starting state and
//! returns a [`ConvergenceError`].
//!
//! The two searches evaluate the energy independently, so the mechanical
//! update can be accepted while the chemical one is backtracked or rejected.

use super::config::LineSearchConfig;
use super::system::MembraneSystem;
use crate::core::mesh::MeshState;
use nalgebra::Vector3;
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Mechanical,
    Chemical,
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mechanical => "mechanical",
            Self::Chemical => "chemical",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error(
    "{search} line search found no sufficient decrease in {evaluations} trials; step {step:e} fell below the floor {floor:e}"
)]
pub struct ConvergenceError {
    pub search: SearchKind,
    pub step: f64,
    pub floor: f64,
    pub evaluations: usize,
}

/// An accepted trial; the system is left at the accepted state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accepted {
    pub step: f64,
    pub energy: f64,
    pub evaluations: usize,
    /// The supplied direction was uphill and the bare gradient was searched instead.
    pub used_gradient: bool,
}

/// Searches along `direction` in position space.
pub fn mechanical_backtrack(
    system: &mut MembraneSystem,
    initial_energy: f64,
    force: &[Vector3<f64>],
    direction: &[Vector3<f64>],
    initial_step: f64,
    config: &LineSearchConfig,
) -> Result<Accepted, ConvergenceError> {
    let mut projection: f64 = force.iter().zip(direction).map(|(f, d)| f.dot(d)).sum();
    let mut direction = direction;
    let used_gradient = projection < 0.0;
    if used_gradient {
        debug!("Mechanical direction points uphill, searching along the force instead.");
        direction = force;
        projection = force.iter().map(|f| f.norm_squared()).sum();
    }

    backtrack(
        system,
        SearchKind::Mechanical,
        initial_energy,
        projection,
        initial_step,
        config,
        |state, alpha| state.displace(direction, alpha),
    )
    .map(|accepted| Accepted {
        used_gradient,
        ..accepted
    })
}

/// Searches along `rate` in protein density space.
///
/// `chemical_potential` is `−∂F/∂φ` at the starting state.
pub fn chemical_backtrack(
    system: &mut MembraneSystem,
    initial_energy: f64,
    chemical_potential: &[f64],
    rate: &[f64],
    initial_step: f64,
    config: &LineSearchConfig,
) -> Result<Accepted, ConvergenceError> {
    let mut projection: f64 = chemical_potential.iter().zip(rate).map(|(m, r)| m * r).sum();
    let mut rate = rate;
    let used_gradient = projection < 0.0;
    if used_gradient {
        debug!("Chemical direction points uphill, searching along the chemical potential instead.");
        rate = chemical_potential;
        projection = chemical_potential.iter().map(|m| m * m).sum();
    }

    backtrack(
        system,
        SearchKind::Chemical,
        initial_energy,
        projection,
        initial_step,
        config,
        |state, alpha| state.advance_protein_density(rate, alpha),
    )
    .map(|accepted| Accepted {
        used_gradient,
        ..accepted
    })
}

fn backtrack(
    system: &mut MembraneSystem,
    search: SearchKind,
    initial_energy: f64,
    projection: f64,
    initial_step: f64,
    config: &LineSearchConfig,
    apply: impl Fn(&mut MeshState, f64),
) -> Result<Accepted, ConvergenceError> {
    let origin = system.snapshot();
    let floor = config.min_step_ratio * initial_step;
    let mut alpha = initial_step;
    let mut evaluations = 0;

    loop {
        if evaluations > 0 {
            system.restore(&origin);
        }
        apply(system.state_mut(), alpha);
        evaluations += 1;

        match system.potential_free_energy() {
            Ok(energy)
                if energy.is_finite()
                    && energy <= initial_energy - config.c1 * alpha * projection =>
            {
                trace!(%search, alpha, energy, evaluations, "Trial step accepted");
                return Ok(Accepted {
                    step: alpha,
                    energy,
                    evaluations,
                    used_gradient: false,
                });
            }
            Ok(energy) => trace!(%search, alpha, energy, "Trial step rejected"),
            Err(e) => trace!(%search, alpha, error = %e, "Trial geometry rejected"),
        }

        let next = alpha * config.rho;
        if next < floor {
            system.restore(&origin);
            return Err(ConvergenceError {
                search,
                step: next,
                floor,
                evaluations,
            });
        }
        alpha = next;
    }
}
