//! # Workflows Module
//!
//! High-level entry points that tie [`crate::core`] and [`crate::engine`]
//! together into complete procedures.
//!
//! - [`simulate`] builds a membrane system from a mesh and parameters, validates
//!   it against the chosen integrator, runs it to an outcome and summarizes the
//!   final state.

pub mod simulate;
