//! # Core Module
//!
//! This module provides the stateless building blocks of the membrane model: the mesh,
//! its discrete differential geometry, the physical parameters and the force/energy
//! engine that turns the three into energies and forces.
//!
//! ## Overview
//!
//! Nothing in this layer mutates a simulation. Every function takes a mesh state by
//! shared reference and returns freshly computed values, which keeps the results
//! deterministic for a given state and lets the engine layer above decide when a
//! candidate update is committed.
//!
//! ## Architecture
//!
//! - **Mesh** ([`mesh`]) - Arena connectivity (`MeshTopology`), mutable vertex data
//!   (`MeshState`) and procedural mesh factories
//! - **Geometry** ([`geometry`]) - `GeometrySnapshot` of areas, curvatures and volume,
//!   the captured reference configuration, and exact first variations
//! - **Parameters** ([`params`]) - Optional parameter groups with exhaustive validation
//! - **Energy** ([`energy`]) - One pure function per energy term plus the aggregation
//!   into energy and force breakdowns
//! - **File I/O** ([`io`]) - OBJ meshes and trajectory sinks
//!
//! ## Key Capabilities
//!
//! - **Exact forces** obtained as analytic negative gradients of the discrete energies
//! - **Protein density coupling** through curvature, adsorption, aggregation, line
//!   tension and mixing entropy, with matching chemical potentials
//! - **Degeneracy detection** that reports collapsed faces and edges as errors rather
//!   than letting non-finite values propagate

pub mod energy;
pub mod geometry;
pub mod io;
pub mod mesh;
pub mod params;
