use super::topology::MeshError;
use nalgebra::{Point3, Vector3};

/// Mutable per-vertex state of a membrane: positions, velocities and the
/// protein density field.
///
/// Every mutable accessor bumps [`MeshState::revision`], which is what the
/// geometry cache keys on.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshState {
    positions: Vec<Point3<f64>>,
    velocities: Vec<Vector3<f64>>,
    protein_density: Vec<f64>,
    revision: u64,
}

impl MeshState {
    pub fn new(positions: Vec<Point3<f64>>) -> Self {
        let n = positions.len();
        Self {
            positions,
            velocities: vec![Vector3::zeros(); n],
            protein_density: vec![0.0; n],
            revision: 0,
        }
    }

    pub fn with_velocities(mut self, velocities: Vec<Vector3<f64>>) -> Result<Self, MeshError> {
        check_len("velocities", self.positions.len(), velocities.len())?;
        self.velocities = velocities;
        self.revision += 1;
        Ok(self)
    }

    pub fn with_protein_density(mut self, density: Vec<f64>) -> Result<Self, MeshError> {
        check_len("protein densities", self.positions.len(), density.len())?;
        self.protein_density = density;
        self.revision += 1;
        Ok(self)
    }

    pub fn with_uniform_protein_density(mut self, value: f64) -> Self {
        self.protein_density.iter_mut().for_each(|phi| *phi = value);
        self.revision += 1;
        self
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    #[inline]
    pub fn velocities(&self) -> &[Vector3<f64>] {
        &self.velocities
    }

    #[inline]
    pub fn protein_density(&self) -> &[f64] {
        &self.protein_density
    }

    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn positions_mut(&mut self) -> &mut [Point3<f64>] {
        self.revision += 1;
        &mut self.positions
    }

    pub fn velocities_mut(&mut self) -> &mut [Vector3<f64>] {
        self.revision += 1;
        &mut self.velocities
    }

    pub fn protein_density_mut(&mut self) -> &mut [f64] {
        self.revision += 1;
        &mut self.protein_density
    }

    /// Moves every vertex by `step * direction[i]`.
    pub fn displace(&mut self, direction: &[Vector3<f64>], step: f64) {
        for (x, d) in self.positions_mut().iter_mut().zip(direction) {
            *x += d * step;
        }
    }

    /// Moves the protein density by `step * rate[i]`.
    pub fn advance_protein_density(&mut self, rate: &[f64], step: f64) {
        for (phi, r) in self.protein_density_mut().iter_mut().zip(rate) {
            *phi += r * step;
        }
    }

    /// Overwrites this state with `other` while keeping the revision counter
    /// strictly increasing.
    pub fn restore_from(&mut self, other: &MeshState) {
        let revision = self.revision.max(other.revision) + 1;
        self.positions.clone_from(&other.positions);
        self.velocities.clone_from(&other.velocities);
        self.protein_density.clone_from(&other.protein_density);
        self.revision = revision;
    }

    pub fn kinetic_energy(&self, vertex_mass: f64) -> f64 {
        0.5 * vertex_mass * self.velocities.iter().map(|v| v.norm_squared()).sum::<f64>()
    }

    pub fn is_finite(&self) -> bool {
        self.positions.iter().all(|p| p.coords.iter().all(|c| c.is_finite()))
            && self.velocities.iter().all(|v| v.iter().all(|c| c.is_finite()))
            && self.protein_density.iter().all(|phi| phi.is_finite())
    }
}

fn check_len(what: &'static str, expected: usize, found: usize) -> Result<(), MeshError> {
    if expected != found {
        return Err(MeshError::LengthMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}
