//! Provides input/output for surface meshes and simulation trajectories.
//!
//! Mesh formats implement the [`traits::MeshFile`] interface; trajectories are
//! written through the append-only [`trajectory::TrajectorySink`] capability the
//! integrators call at a configured cadence.

pub mod obj;
pub mod traits;
pub mod trajectory;
