use crate::core::params::TermKind;
use nalgebra::Vector3;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Named energy components of one evaluation.
///
/// `entropy` holds `T·S`, which enters the free energy with a negative sign.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyBreakdown {
    pub bending: f64,
    pub surface: f64,
    pub pressure: f64,
    pub adsorption: f64,
    pub aggregation: f64,
    pub adhesion: f64,
    pub dirichlet: f64,
    pub interior_penalty: f64,
    pub external: f64,
    pub regularization: f64,
    pub entropy: f64,
    pub kinetic: f64,
}

impl EnergyBreakdown {
    /// Sum of every conservative mechanical and chemical term.
    #[inline]
    pub fn potential(&self) -> f64 {
        self.bending
            + self.surface
            + self.pressure
            + self.adsorption
            + self.aggregation
            + self.adhesion
            + self.dirichlet
            + self.interior_penalty
            + self.external
            + self.regularization
    }

    /// Potential plus kinetic energy.
    #[inline]
    pub fn total(&self) -> f64 {
        self.potential() + self.kinetic
    }

    /// `total − T·S`.
    #[inline]
    pub fn free_energy(&self) -> f64 {
        self.total() - self.entropy
    }

    /// `potential − T·S`, the objective minimized by relaxation schemes.
    #[inline]
    pub fn potential_free_energy(&self) -> f64 {
        self.potential() - self.entropy
    }

    /// The energy contributed by the term `kind`, as it enters the free energy.
    pub fn contribution(&self, kind: TermKind) -> f64 {
        match kind {
            TermKind::Bending => self.bending,
            TermKind::Surface => self.surface,
            TermKind::Pressure => self.pressure,
            TermKind::Adsorption => self.adsorption,
            TermKind::Aggregation => self.aggregation,
            TermKind::Adhesion => self.adhesion,
            TermKind::Dirichlet => self.dirichlet,
            TermKind::Entropy => -self.entropy,
            TermKind::InteriorPenalty => self.interior_penalty,
            TermKind::External => self.external,
            TermKind::Regularization => self.regularization,
            TermKind::Dpd | TermKind::Damping => 0.0,
        }
    }

    pub(crate) fn record(&mut self, kind: TermKind, energy: f64) {
        match kind {
            TermKind::Bending => self.bending += energy,
            TermKind::Surface => self.surface += energy,
            TermKind::Pressure => self.pressure += energy,
            TermKind::Adsorption => self.adsorption += energy,
            TermKind::Aggregation => self.aggregation += energy,
            TermKind::Adhesion => self.adhesion += energy,
            TermKind::Dirichlet => self.dirichlet += energy,
            TermKind::Entropy => self.entropy -= energy,
            TermKind::InteriorPenalty => self.interior_penalty += energy,
            TermKind::External => self.external += energy,
            TermKind::Regularization => self.regularization += energy,
            TermKind::Dpd | TermKind::Damping => {}
        }
    }

    pub fn is_finite(&self) -> bool {
        self.free_energy().is_finite() && self.total().is_finite()
    }
}

impl Add for EnergyBreakdown {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign for EnergyBreakdown {
    fn add_assign(&mut self, rhs: Self) {
        self.bending += rhs.bending;
        self.surface += rhs.surface;
        self.pressure += rhs.pressure;
        self.adsorption += rhs.adsorption;
        self.aggregation += rhs.aggregation;
        self.adhesion += rhs.adhesion;
        self.dirichlet += rhs.dirichlet;
        self.interior_penalty += rhs.interior_penalty;
        self.external += rhs.external;
        self.regularization += rhs.regularization;
        self.entropy += rhs.entropy;
        self.kinetic += rhs.kinetic;
    }
}

impl Sum for EnergyBreakdown {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Per-vertex force fields, one per term that produces a mechanical force.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceBreakdown {
    pub bending: Vec<Vector3<f64>>,
    pub capillary: Vec<Vector3<f64>>,
    pub osmotic: Vec<Vector3<f64>>,
    pub adsorption: Vec<Vector3<f64>>,
    pub aggregation: Vec<Vector3<f64>>,
    pub adhesion: Vec<Vector3<f64>>,
    pub line_capillary: Vec<Vector3<f64>>,
    pub entropy: Vec<Vector3<f64>>,
    pub external: Vec<Vector3<f64>>,
    pub regularization: Vec<Vector3<f64>>,
    pub dpd: Vec<Vector3<f64>>,
    pub damping: Vec<Vector3<f64>>,
}

impl ForceBreakdown {
    pub fn zeros(vertex_count: usize) -> Self {
        let z = vec![Vector3::zeros(); vertex_count];
        Self {
            bending: z.clone(),
            capillary: z.clone(),
            osmotic: z.clone(),
            adsorption: z.clone(),
            aggregation: z.clone(),
            adhesion: z.clone(),
            line_capillary: z.clone(),
            entropy: z.clone(),
            external: z.clone(),
            regularization: z.clone(),
            dpd: z.clone(),
            damping: z,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.bending.len()
    }

    pub fn field(&self, kind: TermKind) -> Option<&[Vector3<f64>]> {
        let field = match kind {
            TermKind::Bending => &self.bending,
            TermKind::Surface => &self.capillary,
            TermKind::Pressure => &self.osmotic,
            TermKind::Adsorption => &self.adsorption,
            TermKind::Aggregation => &self.aggregation,
            TermKind::Adhesion => &self.adhesion,
            TermKind::Dirichlet => &self.line_capillary,
            TermKind::Entropy => &self.entropy,
            TermKind::External => &self.external,
            TermKind::Regularization => &self.regularization,
            TermKind::Dpd => &self.dpd,
            TermKind::Damping => &self.damping,
            TermKind::InteriorPenalty => return None,
        };
        Some(field)
    }

    pub(crate) fn field_mut(&mut self, kind: TermKind) -> Option<&mut Vec<Vector3<f64>>> {
        let field = match kind {
            TermKind::Bending => &mut self.bending,
            TermKind::Surface => &mut self.capillary,
            TermKind::Pressure => &mut self.osmotic,
            TermKind::Adsorption => &mut self.adsorption,
            TermKind::Aggregation => &mut self.aggregation,
            TermKind::Adhesion => &mut self.adhesion,
            TermKind::Dirichlet => &mut self.line_capillary,
            TermKind::Entropy => &mut self.entropy,
            TermKind::External => &mut self.external,
            TermKind::Regularization => &mut self.regularization,
            TermKind::Dpd => &mut self.dpd,
            TermKind::Damping => &mut self.damping,
            TermKind::InteriorPenalty => return None,
        };
        Some(field)
    }

    fn all(&self) -> [&Vec<Vector3<f64>>; 12] {
        [
            &self.bending,
            &self.capillary,
            &self.osmotic,
            &self.adsorption,
            &self.aggregation,
            &self.adhesion,
            &self.line_capillary,
            &self.entropy,
            &self.external,
            &self.regularization,
            &self.dpd,
            &self.damping,
        ]
    }

    /// Applies `f` to every field in turn.
    pub fn for_each_field_mut(&mut self, mut f: impl FnMut(&mut [Vector3<f64>])) {
        for field in [
            &mut self.bending,
            &mut self.capillary,
            &mut self.osmotic,
            &mut self.adsorption,
            &mut self.aggregation,
            &mut self.adhesion,
            &mut self.line_capillary,
            &mut self.entropy,
            &mut self.external,
            &mut self.regularization,
            &mut self.dpd,
            &mut self.damping,
        ] {
            f(field);
        }
    }

    /// Forces that derive from the density-dependent area terms.
    pub fn chemical_gradient(&self) -> Vec<Vector3<f64>> {
        sum_fields(&[&self.adsorption, &self.aggregation, &self.entropy], self.vertex_count())
    }

    /// Sum of every conservative field.
    pub fn conservative(&self) -> Vec<Vector3<f64>> {
        let all = self.all();
        sum_fields(&all[..10], self.vertex_count())
    }

    /// Sum of every field, including the dissipative and stochastic ones.
    pub fn mechanical(&self) -> Vec<Vector3<f64>> {
        sum_fields(&self.all(), self.vertex_count())
    }
}

fn sum_fields(fields: &[&Vec<Vector3<f64>>], vertex_count: usize) -> Vec<Vector3<f64>> {
    let mut total = vec![Vector3::zeros(); vertex_count];
    for field in fields {
        for (t, f) in total.iter_mut().zip(field.iter()) {
            *t += f;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EnergyBreakdown {
        EnergyBreakdown {
            bending: 1.0,
            surface: 2.0,
            pressure: 3.0,
            entropy: 0.5,
            kinetic: 4.0,
            ..Default::default()
        }
    }

    #[test]
    fn potential_excludes_kinetic_and_entropy() {
        assert_eq!(sample().potential(), 6.0);
    }

    #[test]
    fn total_adds_kinetic() {
        assert_eq!(sample().total(), 10.0);
    }

    #[test]
    fn free_energy_subtracts_entropy() {
        assert_eq!(sample().free_energy(), 9.5);
        assert_eq!(sample().potential_free_energy(), 5.5);
    }

    #[test]
    fn record_stores_entropy_with_opposite_sign() {
        let mut e = EnergyBreakdown::default();
        e.record(TermKind::Entropy, -0.25);
        e.record(TermKind::Bending, 2.0);
        assert_eq!(e.entropy, 0.25);
        assert_eq!(e.contribution(TermKind::Entropy), -0.25);
        assert_eq!(e.free_energy(), 1.75);
    }

    #[test]
    fn add_and_sum_accumulate_each_field() {
        let a = sample();
        let b = EnergyBreakdown {
            dirichlet: 1.5,
            ..sample()
        };
        let sum: EnergyBreakdown = [a, b].into_iter().sum();
        assert_eq!(sum, a + b);
        assert_eq!(sum.bending, 2.0);
        assert_eq!(sum.dirichlet, 1.5);
        let mut c = a;
        c += b;
        assert_eq!(c, sum);
    }

    #[test]
    fn default_is_all_zero() {
        let e = EnergyBreakdown::default();
        assert_eq!(e.free_energy(), 0.0);
        assert!(e.is_finite());
    }

    #[test]
    fn force_sums_separate_dissipative_fields() {
        let mut forces = ForceBreakdown::zeros(2);
        forces.bending[0] = Vector3::new(1.0, 0.0, 0.0);
        forces.adsorption[1] = Vector3::new(0.0, 1.0, 0.0);
        forces.damping[0] = Vector3::new(0.0, 0.0, 1.0);
        assert_eq!(forces.conservative()[0], Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(forces.mechanical()[0], Vector3::new(1.0, 0.0, 1.0));
        assert_eq!(forces.chemical_gradient()[1], Vector3::new(0.0, 1.0, 0.0));
        assert!(forces.field(TermKind::InteriorPenalty).is_none());
    }
}
