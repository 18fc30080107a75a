use super::MeshTopology;
use crate::core::params::{BoundaryParams, ProteinBoundary, ShapeBoundary};
use nalgebra::Vector3;

/// Per-vertex multipliers that hold the boundary of an open mesh in place.
///
/// Forces are multiplied component-wise by [`BoundaryMask::force`], chemical
/// potentials by [`BoundaryMask::protein`]. A zero freezes that degree of
/// freedom. Closed meshes have no boundary vertices and get an all-ones mask.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryMask {
    force: Vec<Vector3<f64>>,
    protein: Vec<f64>,
}

impl BoundaryMask {
    pub fn new(topology: &MeshTopology, conditions: &BoundaryParams) -> Self {
        let n = topology.vertex_count();
        let mut force = vec![Vector3::repeat(1.0); n];
        let mut protein = vec![1.0; n];
        let boundary: Vec<usize> = (0..n).filter(|&v| topology.is_boundary_vertex(v)).collect();

        match conditions.shape {
            ShapeBoundary::Free => {}
            ShapeBoundary::Roller => {
                for &v in &boundary {
                    force[v].z = 0.0;
                }
            }
            ShapeBoundary::Pin => {
                for &v in &boundary {
                    force[v] = Vector3::zeros();
                }
            }
            ShapeBoundary::Fixed => {
                for &v in &boundary {
                    force[v] = Vector3::zeros();
                    for &e in topology.vertex_edges(v) {
                        let [a, b] = topology.edges()[e].vertices;
                        force[if a == v { b } else { a }] = Vector3::zeros();
                    }
                }
            }
        }

        if conditions.protein == ProteinBoundary::Pin {
            for &v in &boundary {
                protein[v] = 0.0;
            }
        }

        Self { force, protein }
    }

    pub fn force(&self) -> &[Vector3<f64>] {
        &self.force
    }

    pub fn protein(&self) -> &[f64] {
        &self.protein
    }

    pub fn mask_forces(&self, forces: &mut [Vector3<f64>]) {
        for (f, m) in forces.iter_mut().zip(&self.force) {
            f.component_mul_assign(m);
        }
    }

    pub fn mask_protein(&self, values: &mut [f64]) {
        for (value, m) in values.iter_mut().zip(&self.protein) {
            *value *= m;
        }
    }
}
