//! # memdyn Core Library
//!
//! Mechanics of fluid membranes on triangulated surfaces: discrete geometry,
//! energies with their exact forces, and the integrators that evolve or relax
//! a membrane under them.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data and pure functions: the
//!   arena mesh (`MeshTopology`, `MeshState`), the geometry snapshot and its
//!   variational derivatives, the parameter set with exhaustive validation,
//!   every energy term as a pure `compute` function, and mesh and trajectory I/O.
//!
//! - **[`engine`]: The Logic Core.** The stateful layer. `MembraneSystem`
//!   caches geometry and evaluations against the state revision, transactions
//!   guarantee that a failed step commits nothing, and the driver runs one of
//!   the integrators (Euler, velocity Verlet, conjugate gradient, BFGS) through
//!   a validated run state machine.
//!
//! - **[`workflows`]: The Public API.** Complete procedures built from the two
//!   layers below, such as running one simulation from a mesh and a parameter
//!   file to a summarized final state.

pub mod core;
pub mod engine;
pub mod workflows;
