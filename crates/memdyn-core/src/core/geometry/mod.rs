//! # Geometry Module
//!
//! Read-only discrete differential geometry over a [`MeshState`](crate::core::mesh::MeshState).
//!
//! ## Overview
//!
//! [`GeometrySnapshot`] is a pure function of the mesh state: face areas and normals,
//! edge lengths, signed dihedral angles and cotangent weights, barycentric dual and mixed
//! Voronoi vertex areas, integrated mean and Gaussian curvature, area-weighted vertex
//! normals and the signed enclosed volume. Collapsed faces or edges and non-finite
//! positions are reported as [`GeometryError`] instead of leaking NaN into the energy
//! engine.
//!
//! The [`variation`] submodule holds the exact first variations (area, edge length,
//! signed volume, dihedral angle) from which every conservative force is assembled.
//!
//! ## Conventions
//!
//! - Faces are counter-clockwise when seen from the side their normal points to.
//! - Integrated mean curvature is `Hint_i = 1/4 Σ l_e θ_e` over edges incident to vertex
//!   `i`, so a sphere of radius `R` has `Hint_i / A_i ≈ 1 / R`.
//! - Dihedral angles on boundary edges are zero.

pub mod reference;
pub mod snapshot;
pub mod variation;

pub use reference::ReferenceGeometry;
pub use snapshot::{GeometryError, GeometrySnapshot};
