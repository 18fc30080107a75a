use super::variation::{dihedral_angle, signed_volume};
use crate::core::mesh::{MeshState, MeshTopology};
use nalgebra::{Point3, Vector3};
use std::f64::consts::{PI, TAU};
use thiserror::Error;
use tracing::trace;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Edges shorter than this are treated as collapsed.
pub const DEGENERATE_EDGE_LENGTH: f64 = 1e-12;
/// Faces whose area falls below this fraction of their squared longest edge
/// are treated as collapsed.
pub const DEGENERATE_AREA_RATIO: f64 = 1e-12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Mesh state has {found} vertices but the topology expects {expected}")]
    VertexCountMismatch { expected: usize, found: usize },

    #[error("Vertex {vertex} has a non-finite position")]
    NonFinitePosition { vertex: usize },

    #[error("Face {face} is degenerate (area {area:e})")]
    DegenerateFace { face: usize, area: f64 },

    #[error("Edge ({a}, {b}) is degenerate (length {length:e})")]
    DegenerateEdge { a: usize, b: usize, length: f64 },

    #[error("Enclosed volume must be positive, got {volume:e}")]
    NonPositiveVolume { volume: f64 },

    #[error("Protein density {value} at vertex {vertex} lies outside the open interval (0, 1)")]
    DensityOutOfRange { vertex: usize, value: f64 },

    #[error("Non-finite value produced while computing {quantity}")]
    NonFinite { quantity: &'static str },
}

#[derive(Debug, Clone, Copy)]
struct FaceGeometry {
    area: f64,
    normal: Vector3<f64>,
    corner_angles: [f64; 3],
    signed_volume: f64,
}

/// Discrete differential quantities derived from one [`MeshState`].
///
/// Curvatures are stored integrated over the vertex dual cell; use
/// [`GeometrySnapshot::mean_curvature`] for pointwise values.
#[derive(Debug, Clone)]
pub struct GeometrySnapshot {
    pub revision: u64,
    pub face_areas: Vec<f64>,
    pub face_normals: Vec<Vector3<f64>>,
    pub face_corner_angles: Vec<[f64; 3]>,
    pub edge_lengths: Vec<f64>,
    pub edge_dihedral_angles: Vec<f64>,
    pub edge_cotan_weights: Vec<f64>,
    pub vertex_dual_areas: Vec<f64>,
    pub vertex_voronoi_areas: Vec<f64>,
    pub vertex_mean_curvatures: Vec<f64>,
    pub vertex_gaussian_curvatures: Vec<f64>,
    pub vertex_normals: Vec<Vector3<f64>>,
    pub total_area: f64,
    pub volume: f64,
    pub min_edge_length: f64,
}

impl GeometrySnapshot {
    pub fn compute(topology: &MeshTopology, state: &MeshState) -> Result<Self, GeometryError> {
        if state.vertex_count() != topology.vertex_count() {
            return Err(GeometryError::VertexCountMismatch {
                expected: topology.vertex_count(),
                found: state.vertex_count(),
            });
        }
        let x = state.positions();
        if let Some(vertex) = x
            .iter()
            .position(|p| !p.coords.iter().all(|c| c.is_finite()))
        {
            return Err(GeometryError::NonFinitePosition { vertex });
        }

        let faces = topology.faces();
        let iterator = faces.iter().enumerate();

        #[cfg(feature = "parallel")]
        let iterator = faces.par_iter().enumerate();

        let face_geometry: Vec<FaceGeometry> = iterator
            .map(|(face_idx, face)| face_geometry(face_idx, face, x))
            .collect::<Result<_, _>>()?;

        let mut edge_lengths = Vec::with_capacity(topology.edge_count());
        let mut edge_dihedral_angles = Vec::with_capacity(topology.edge_count());
        let mut edge_cotan_weights = Vec::with_capacity(topology.edge_count());
        for edge in topology.edges() {
            let [a, b] = edge.vertices;
            let length = (x[a] - x[b]).norm();
            if length < DEGENERATE_EDGE_LENGTH {
                return Err(GeometryError::DegenerateEdge { a, b, length });
            }
            edge_lengths.push(length);

            let dihedral = edge
                .diamond()
                .map(|[a, b, c, d]| dihedral_angle(&x[a], &x[b], &x[c], &x[d]))
                .unwrap_or(0.0);
            edge_dihedral_angles.push(dihedral);

            let mut cotan = 0.0;
            for side in 0..2 {
                if let (Some(f), Some(opp)) = (edge.faces[side], edge.opposite[side]) {
                    let corner = corner_of(&faces[f], opp);
                    cotan += 0.5 / face_geometry[f].corner_angles[corner].tan();
                }
            }
            edge_cotan_weights.push(cotan);
        }

        let n = topology.vertex_count();
        let mut vertex_dual_areas = vec![0.0; n];
        let mut vertex_voronoi_areas = vec![0.0; n];
        let mut angle_sums = vec![0.0; n];
        let mut weighted_normals = vec![Vector3::zeros(); n];
        for (face, geo) in faces.iter().zip(&face_geometry) {
            let voronoi = mixed_voronoi_areas(face, geo, x);
            for k in 0..3 {
                let v = face[k];
                vertex_dual_areas[v] += geo.area / 3.0;
                vertex_voronoi_areas[v] += voronoi[k];
                angle_sums[v] += geo.corner_angles[k];
                weighted_normals[v] += geo.area * geo.normal;
            }
        }

        let mut vertex_mean_curvatures = vec![0.0; n];
        for ((edge, &length), &dihedral) in topology
            .edges()
            .iter()
            .zip(&edge_lengths)
            .zip(&edge_dihedral_angles)
        {
            let contribution = 0.25 * length * dihedral;
            vertex_mean_curvatures[edge.vertices[0]] += contribution;
            vertex_mean_curvatures[edge.vertices[1]] += contribution;
        }

        let vertex_gaussian_curvatures = (0..n)
            .map(|v| {
                let full_turn = if topology.is_boundary_vertex(v) { PI } else { TAU };
                full_turn - angle_sums[v]
            })
            .collect();
        let vertex_normals = weighted_normals.into_iter().map(|n| n.normalize()).collect();

        let total_area = face_geometry.iter().map(|g| g.area).sum();
        let volume = face_geometry.iter().map(|g| g.signed_volume).sum();
        let min_edge_length = edge_lengths.iter().copied().fold(f64::INFINITY, f64::min);

        trace!(
            revision = state.revision(),
            total_area,
            volume,
            "Geometry snapshot recomputed"
        );

        Ok(Self {
            revision: state.revision(),
            face_areas: face_geometry.iter().map(|g| g.area).collect(),
            face_normals: face_geometry.iter().map(|g| g.normal).collect(),
            face_corner_angles: face_geometry.iter().map(|g| g.corner_angles).collect(),
            edge_lengths,
            edge_dihedral_angles,
            edge_cotan_weights,
            vertex_dual_areas,
            vertex_voronoi_areas,
            vertex_mean_curvatures,
            vertex_gaussian_curvatures,
            vertex_normals,
            total_area,
            volume,
            min_edge_length,
        })
    }

    /// Pointwise mean curvature `H = Hint / A` at a vertex.
    #[inline]
    pub fn mean_curvature(&self, vertex: usize) -> f64 {
        self.vertex_mean_curvatures[vertex] / self.vertex_dual_areas[vertex]
    }

    /// Pointwise Gaussian curvature `K = Kint / A` at a vertex.
    #[inline]
    pub fn gaussian_curvature(&self, vertex: usize) -> f64 {
        self.vertex_gaussian_curvatures[vertex] / self.vertex_dual_areas[vertex]
    }

    /// Integrated mean curvature normal `Σ w_ij (x_i - x_j) / 2` built from
    /// cotangent weights.
    pub fn cotan_mean_curvature_normals(
        &self,
        topology: &MeshTopology,
        state: &MeshState,
    ) -> Vec<Vector3<f64>> {
        let x = state.positions();
        let mut normals = vec![Vector3::zeros(); topology.vertex_count()];
        for (edge, &w) in topology.edges().iter().zip(&self.edge_cotan_weights) {
            let [a, b] = edge.vertices;
            let diff = 0.5 * w * (x[a] - x[b]);
            normals[a] += diff;
            normals[b] -= diff;
        }
        normals
    }
}

fn face_geometry(
    face_idx: usize,
    face: &[usize; 3],
    x: &[Point3<f64>],
) -> Result<FaceGeometry, GeometryError> {
    let p = [&x[face[0]], &x[face[1]], &x[face[2]]];
    let cross = (p[1] - p[0]).cross(&(p[2] - p[0]));
    let area = 0.5 * cross.norm();
    let longest = (0..3)
        .map(|k| (p[(k + 1) % 3] - p[k]).norm_squared())
        .fold(0.0, f64::max);
    if !(area > DEGENERATE_AREA_RATIO * longest) {
        return Err(GeometryError::DegenerateFace {
            face: face_idx,
            area,
        });
    }

    let corner_angles = std::array::from_fn(|k| {
        let u = p[(k + 1) % 3] - p[k];
        let v = p[(k + 2) % 3] - p[k];
        u.cross(&v).norm().atan2(u.dot(&v))
    });

    Ok(FaceGeometry {
        area,
        normal: cross / (2.0 * area),
        corner_angles,
        signed_volume: signed_volume(p),
    })
}

#[inline]
fn corner_of(face: &[usize; 3], vertex: usize) -> usize {
    face.iter().position(|&v| v == vertex).unwrap_or(0)
}

/// Meyer et al. mixed Voronoi areas of the three corners of a face.
fn mixed_voronoi_areas(face: &[usize; 3], geo: &FaceGeometry, x: &[Point3<f64>]) -> [f64; 3] {
    let angles = geo.corner_angles;
    if let Some(obtuse) = angles.iter().position(|&a| a > PI / 2.0) {
        return std::array::from_fn(|k| {
            if k == obtuse {
                geo.area / 2.0
            } else {
                geo.area / 4.0
            }
        });
    }
    std::array::from_fn(|k| {
        let i = face[k];
        let j = face[(k + 1) % 3];
        let l = face[(k + 2) % 3];
        let cot_at_l = 1.0 / angles[(k + 2) % 3].tan();
        let cot_at_j = 1.0 / angles[(k + 1) % 3].tan();
        ((x[i] - x[j]).norm_squared() * cot_at_l + (x[i] - x[l]).norm_squared() * cot_at_j) / 8.0
    })
}
