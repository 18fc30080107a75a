//! # Engine Module
//!
//! The stateful layer that moves a membrane through time. It owns the
//! [`system::MembraneSystem`] (mesh state, parameters and evaluation cache),
//! the integrators that advance it, and the driver that decides when a run
//! stops.
//!
//! ## Architecture
//!
//! - **System** ([`system`]) - Mesh state, reference geometry, parameters and
//!   the cached energy evaluation, plus constraint bookkeeping
//! - **Transactions** ([`transaction`]) - Snapshot and restore around every
//!   step, so a failed step commits nothing
//! - **Line searches** ([`backtrack`]) - Armijo backtracking on positions and
//!   on protein density, each evaluated independently
//! - **Integrators** ([`integrators`]) - Euler, velocity Verlet, conjugate
//!   gradient and BFGS behind one trait
//! - **Driver** ([`driver`]) - The run state machine, termination criteria and
//!   trajectory output
//! - **Configuration** ([`config`]) - Integrator options and their builder
//! - **State Tracking** ([`state`]) - Run phases, outcomes and the final report
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Engine-level error type
//!
//! Reaching the step limit, the time limit or a divergent energy ends a run
//! normally with an [`state::Outcome`]; only invalid configuration, degenerate
//! geometry, failed line searches and sink failures under the abort policy
//! surface as [`error::EngineError`].

pub mod backtrack;
pub mod config;
pub mod driver;
pub mod error;
pub mod integrators;
pub mod progress;
pub mod state;
pub mod system;
pub mod transaction;
