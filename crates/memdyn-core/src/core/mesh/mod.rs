//! # Mesh Module
//!
//! Arena representation of a triangulated membrane surface.
//!
//! Connectivity ([`MeshTopology`]) is fixed for the duration of a run and stored as flat
//! index lists: faces, a derived edge table with the faces on either side, and
//! per-vertex incidence. The evolving quantities ([`MeshState`]) are positions,
//! velocities and the protein density field, with a revision counter that downstream
//! caches key on.
//!
//! The [`factory`] submodule builds the reference surfaces used by the CLI and tests:
//! icospheres and flat hexagonal patches. [`BoundaryMask`] turns the boundary conditions
//! of an open patch into per-vertex multipliers on forces and chemical potentials.

pub mod boundary;
pub mod factory;
pub mod state;
pub mod topology;

pub use boundary::BoundaryMask;
pub use state::MeshState;
pub use topology::{Edge, MeshError, MeshTopology};
