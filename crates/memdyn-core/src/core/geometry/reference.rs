use super::snapshot::GeometrySnapshot;
use super::variation::length_cross_ratio;
use crate::core::mesh::{MeshState, MeshTopology};
use nalgebra::Point3;

/// Rest configuration captured once at system construction.
///
/// Regularization penalizes departures from it, and the external force
/// profile is laid out on it.
#[derive(Debug, Clone)]
pub struct ReferenceGeometry {
    pub positions: Vec<Point3<f64>>,
    pub edge_lengths: Vec<f64>,
    pub face_areas: Vec<f64>,
    /// Cross ratio of each interior edge's diamond; `None` on the boundary.
    pub length_cross_ratios: Vec<Option<f64>>,
    pub vertex_dual_areas: Vec<f64>,
}

impl ReferenceGeometry {
    pub fn capture(topology: &MeshTopology, state: &MeshState, geometry: &GeometrySnapshot) -> Self {
        let x = state.positions();
        let length_cross_ratios = topology
            .edges()
            .iter()
            .map(|edge| {
                edge.diamond()
                    .map(|[a, b, c, d]| length_cross_ratio(&x[a], &x[b], &x[c], &x[d]))
            })
            .collect();

        Self {
            positions: x.to_vec(),
            edge_lengths: geometry.edge_lengths.clone(),
            face_areas: geometry.face_areas.clone(),
            length_cross_ratios,
            vertex_dual_areas: geometry.vertex_dual_areas.clone(),
        }
    }
}
