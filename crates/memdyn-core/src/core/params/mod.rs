//! # Parameter Module
//!
//! Physical coefficients of the membrane model, grouped by the energy terms they govern.
//!
//! ## Overview
//!
//! Each group of [`Parameters`] is an `Option`: an absent group disables its terms
//! entirely, a present group must be fully and consistently specified. Groups
//! deserialize with field defaults of zero so that a partially written TOML table is
//! still loaded and then rejected by [`Parameters::validate`], which reports every
//! violated constraint at once through [`ConfigurationError`].
//!
//! [`Parameters::is_enabled`] is the cheap predicate the energy engine consults to skip
//! disabled terms.

mod groups;
mod validation;

pub use groups::*;
pub use validation::{ConfigurationError, Violation, Violations};

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Every term the energy engine can evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    Bending,
    Surface,
    Pressure,
    Adsorption,
    Aggregation,
    Adhesion,
    Dirichlet,
    Entropy,
    InteriorPenalty,
    External,
    Regularization,
    Dpd,
    Damping,
}

impl TermKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bending => "bending",
            Self::Surface => "surface",
            Self::Pressure => "pressure",
            Self::Adsorption => "adsorption",
            Self::Aggregation => "aggregation",
            Self::Adhesion => "adhesion",
            Self::Dirichlet => "dirichlet",
            Self::Entropy => "entropy",
            Self::InteriorPenalty => "interior_penalty",
            Self::External => "external",
            Self::Regularization => "regularization",
            Self::Dpd => "dpd",
            Self::Damping => "damping",
        }
    }
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    /// Mass carried by every vertex in the dynamic integrators.
    pub vertex_mass: f64,
    pub bending: Option<BendingParams>,
    pub tension: Option<TensionParams>,
    pub osmotic: Option<OsmoticParams>,
    pub adsorption: Option<AdsorptionParams>,
    pub aggregation: Option<AggregationParams>,
    pub adhesion: Option<AdhesionParams>,
    pub dirichlet: Option<DirichletParams>,
    pub entropy: Option<EntropyParams>,
    pub protein: Option<ProteinParams>,
    pub dpd: Option<DpdParams>,
    pub damping: Option<DampingParams>,
    pub external: Option<ExternalParams>,
    pub regularization: Option<RegularizationParams>,
    pub boundary: BoundaryParams,
    pub variation: VariationParams,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            vertex_mass: 1.0,
            bending: None,
            tension: None,
            osmotic: None,
            adsorption: None,
            aggregation: None,
            adhesion: None,
            dirichlet: None,
            entropy: None,
            protein: None,
            dpd: None,
            damping: None,
            external: None,
            regularization: None,
            boundary: BoundaryParams::default(),
            variation: VariationParams::default(),
        }
    }
}

impl Parameters {
    /// Pure bending with modulus `kb` and no protein coupling.
    pub fn bending_only(kb: f64) -> Self {
        Self {
            bending: Some(BendingParams {
                kb,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content).map_err(|e| ParamLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn is_enabled(&self, kind: TermKind) -> bool {
        match kind {
            TermKind::Bending => self.bending.is_some(),
            TermKind::Surface => self.tension.is_some(),
            TermKind::Pressure => self.osmotic.is_some(),
            TermKind::Adsorption => self.adsorption.is_some(),
            TermKind::Aggregation => self.aggregation.is_some(),
            TermKind::Adhesion => self.adhesion.is_some(),
            TermKind::Dirichlet => self.dirichlet.is_some(),
            TermKind::Entropy => self.entropy.is_some(),
            TermKind::InteriorPenalty => self
                .protein
                .as_ref()
                .is_some_and(|p| p.interior_penalty > 0.0),
            TermKind::External => self.external.is_some(),
            TermKind::Regularization => self.regularization.is_some(),
            TermKind::Dpd => self.dpd.is_some(),
            TermKind::Damping => self.damping.is_some(),
        }
    }

    /// Whether the protein density evolves under its chemical potential.
    pub fn protein_dynamics_enabled(&self) -> bool {
        self.protein.is_some() && self.variation.protein
    }

    /// Mobility of the density field, if it evolves.
    pub fn mobility(&self) -> Option<f64> {
        self.protein
            .as_ref()
            .filter(|_| self.variation.protein)
            .map(|p| p.mobility)
    }

    /// Whether any enabled term depends on the protein density.
    pub fn has_density_coupling(&self) -> bool {
        self.bending
            .as_ref()
            .is_some_and(|b| b.kbc != 0.0 || b.h0c != 0.0)
            || self.adsorption.is_some()
            || self.aggregation.is_some()
            || self.dirichlet.is_some()
            || self.entropy.is_some()
            || self.is_enabled(TermKind::InteriorPenalty)
    }

    /// Checks every cross-field constraint and reports all failures together.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.violations().into_result()
    }

    pub fn violations(&self) -> Violations {
        let mut v = Violations::new();
        v.positive(self.vertex_mass, "vertex_mass").check(
            self.variation.shape || self.protein_dynamics_enabled(),
            "variation",
            "shape variation is off and the protein density does not evolve",
        );

        if let Some(b) = &self.bending {
            v.non_negative(b.kb, "bending.kb")
                .finite(b.kbc, "bending.kbc")
                .finite(b.h0c, "bending.h0c")
                .check(
                    b.kb + b.kbc >= 0.0,
                    "bending.kbc",
                    "rigidity at full coverage (kb + kbc) must be non-negative",
                )
                .check(
                    b.kb != 0.0 || b.kbc != 0.0,
                    "bending",
                    "enabled with both kb and kbc equal to zero",
                );
        }

        if let Some(t) = &self.tension {
            v.positive(t.ksg, "tension.ksg").finite(t.lambda, "tension.lambda");
            if t.model == TensionModel::AreaConstrained {
                v.positive(t.target_area, "tension.target_area");
            }
        }

        if let Some(o) = &self.osmotic {
            match o.model {
                OsmoticModel::PreferredVolume => {
                    v.positive(o.kv, "osmotic.kv")
                        .positive(o.target_volume, "osmotic.target_volume")
                        .finite(o.lambda, "osmotic.lambda");
                }
                OsmoticModel::AmbientConcentration => {
                    v.positive(o.kv, "osmotic.kv")
                        .positive(o.ambient_concentration, "osmotic.ambient_concentration")
                        .positive(o.enclosed_solute, "osmotic.enclosed_solute");
                }
                OsmoticModel::ConstantPressure => {
                    v.non_zero(o.kv, "osmotic.kv");
                }
            }
        }

        if let Some(a) = &self.adsorption {
            v.non_zero(a.epsilon, "adsorption.epsilon");
        }

        if let Some(a) = &self.aggregation {
            v.non_zero(a.chi, "aggregation.chi").check(
                self.protein.is_some(),
                "aggregation",
                "protein interaction enabled without a protein group (mobility)",
            );
        }

        if let Some(a) = &self.adhesion {
            v.non_zero(a.energy, "adhesion.energy")
                .positive(a.range, "adhesion.range")
                .finite(a.substrate_height, "adhesion.substrate_height");
        }

        if let Some(d) = &self.dirichlet {
            v.positive(d.eta, "dirichlet.eta");
        }

        if let Some(e) = &self.entropy {
            v.positive(e.kbt, "entropy.kbt").check(
                self.protein.is_some(),
                "entropy",
                "entropy weight given without a protein group (mobility)",
            );
        }

        if let Some(p) = &self.protein {
            v.positive(p.mobility, "protein.mobility")
                .non_negative(p.interior_penalty, "protein.interior_penalty")
                .check(
                    self.has_density_coupling(),
                    "protein",
                    "protein dynamics enabled but no enabled term depends on the density",
                );
        }

        if let Some(d) = &self.dpd {
            v.positive(d.gamma, "dpd.gamma").non_negative(d.kbt, "dpd.kbt");
        }

        if let Some(d) = &self.damping {
            v.positive(d.coefficient, "damping.coefficient");
        }

        if let Some(e) = &self.external {
            let direction_norm = e.direction.iter().map(|c| c * c).sum::<f64>().sqrt();
            v.non_zero(e.kf, "external.kf")
                .positive(e.width, "external.width")
                .check(
                    direction_norm > 0.0 && direction_norm.is_finite(),
                    "external.direction",
                    "must be a finite non-zero vector",
                )
                .check(
                    e.anchor.iter().all(|c| c.is_finite()),
                    "external.anchor",
                    "must be finite",
                );
            if let Some(tau) = e.decay_time {
                v.positive(tau, "external.decay_time");
            }
        }

        if let Some(r) = &self.regularization {
            v.non_negative(r.kse, "regularization.kse")
                .non_negative(r.ksl, "regularization.ksl")
                .non_negative(r.kst, "regularization.kst")
                .check(
                    r.kse > 0.0 || r.ksl > 0.0 || r.kst > 0.0,
                    "regularization",
                    "enabled with every stiffness equal to zero",
                );
        }

        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn violated_fields(params: &Parameters) -> Vec<String> {
        match params.validate() {
            Ok(()) => Vec::new(),
            Err(e) => e.violations.into_iter().map(|v| v.field).collect(),
        }
    }

    #[test]
    fn default_parameters_are_valid_and_disable_every_term() {
        let params = Parameters::default();
        assert!(params.validate().is_ok());
        assert!(!params.is_enabled(TermKind::Bending));
        assert!(!params.protein_dynamics_enabled());
    }

    #[test]
    fn bending_only_is_valid() {
        let params = Parameters::bending_only(1.0);
        assert!(params.validate().is_ok());
        assert!(params.is_enabled(TermKind::Bending));
        assert!(!params.has_density_coupling());
    }

    #[test]
    fn each_invalid_combination_is_reported() {
        let cases: Vec<(Parameters, &str)> = vec![
            (
                Parameters {
                    osmotic: Some(OsmoticParams {
                        kv: 1.0,
                        target_volume: 0.0,
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                "osmotic.target_volume",
            ),
            (
                Parameters {
                    protein: Some(ProteinParams {
                        mobility: 0.0,
                        ..Default::default()
                    }),
                    adsorption: Some(AdsorptionParams { epsilon: -1.0 }),
                    ..Default::default()
                },
                "protein.mobility",
            ),
            (
                Parameters {
                    aggregation: Some(AggregationParams { chi: 1.0 }),
                    ..Default::default()
                },
                "aggregation",
            ),
            (
                Parameters {
                    adhesion: Some(AdhesionParams {
                        energy: 1.0,
                        range: 0.0,
                        substrate_height: 0.0,
                    }),
                    ..Default::default()
                },
                "adhesion.range",
            ),
            (
                Parameters {
                    tension: Some(TensionParams {
                        model: TensionModel::AreaConstrained,
                        ksg: 1.0,
                        target_area: -2.0,
                        lambda: 0.0,
                    }),
                    ..Default::default()
                },
                "tension.target_area",
            ),
            (
                Parameters {
                    dpd: Some(DpdParams { gamma: -1.0, kbt: 1.0 }),
                    ..Default::default()
                },
                "dpd.gamma",
            ),
            (
                Parameters {
                    bending: Some(BendingParams::default()),
                    ..Default::default()
                },
                "bending",
            ),
            (
                Parameters {
                    external: Some(ExternalParams {
                        kf: 1.0,
                        width: 1.0,
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                "external.direction",
            ),
            (
                Parameters {
                    protein: Some(ProteinParams {
                        mobility: 1.0,
                        interior_penalty: 0.0,
                    }),
                    ..Parameters::bending_only(1.0)
                },
                "protein",
            ),
            (
                Parameters {
                    vertex_mass: 0.0,
                    ..Default::default()
                },
                "vertex_mass",
            ),
        ];

        for (params, field) in cases {
            let fields = violated_fields(&params);
            assert!(
                fields.iter().any(|f| f == field),
                "expected violation of '{field}', got {fields:?}"
            );
        }
    }

    #[test]
    fn validation_reports_all_violations_in_one_call() {
        let params = Parameters {
            vertex_mass: -1.0,
            osmotic: Some(OsmoticParams {
                kv: 1.0,
                target_volume: 0.0,
                ..Default::default()
            }),
            entropy: Some(EntropyParams { kbt: 0.0 }),
            regularization: Some(RegularizationParams::default()),
            dirichlet: Some(DirichletParams { eta: -0.5 }),
            ..Default::default()
        };
        let fields = violated_fields(&params);
        for expected in [
            "vertex_mass",
            "osmotic.target_volume",
            "entropy.kbt",
            "entropy",
            "regularization",
            "dirichlet.eta",
        ] {
            assert!(fields.iter().any(|f| f == expected), "missing {expected} in {fields:?}");
        }
        assert_eq!(fields.len(), 6);
    }

    #[test]
    fn interior_penalty_is_enabled_only_when_positive() {
        let mut params = Parameters {
            protein: Some(ProteinParams {
                mobility: 1.0,
                interior_penalty: 0.0,
            }),
            ..Default::default()
        };
        assert!(!params.is_enabled(TermKind::InteriorPenalty));
        params.protein.as_mut().unwrap().interior_penalty = 1e-3;
        assert!(params.is_enabled(TermKind::InteriorPenalty));
        assert!(params.has_density_coupling());
    }

    #[test]
    fn curvature_relations_have_consistent_derivatives() {
        for relation in [CurvatureRelation::Linear, CurvatureRelation::Hill] {
            let h = 1e-6;
            let (_, df) = relation.eval(0.4);
            let numeric = (relation.eval(0.4 + h).0 - relation.eval(0.4 - h).0) / (2.0 * h);
            assert!((df - numeric).abs() < 1e-8);
        }
    }

    #[test]
    fn partial_toml_group_loads_and_fails_validation() {
        let params = Parameters::from_toml_str(
            r#"
            [osmotic]
            kv = 0.5

            [bending]
            kb = 1.0
            "#,
        )
        .unwrap();
        assert!(params.is_enabled(TermKind::Pressure));
        let err = params.validate().unwrap_err();
        assert!(err.contains("osmotic.target_volume"));
        assert!(!err.contains("bending"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = Parameters::from_toml_str("[bending]\nkappa = 1.0\n");
        assert!(result.is_err());
    }

    #[test]
    fn load_reads_parameters_from_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("params.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(
            file,
            r#"
            vertex_mass = 2.0

            [bending]
            kb = 8.22e-5
            kbc = 1e-4
            h0c = 10.0
            relation = "hill"

            [tension]
            model = "area_constrained"
            ksg = 0.01
            target_area = 12.0

            [osmotic]
            model = "ambient_concentration"
            kv = 0.01
            ambient_concentration = 0.5
            enclosed_solute = 1.0
            "#
        )
        .unwrap();

        let params = Parameters::load(&file_path).unwrap();
        assert_eq!(params.vertex_mass, 2.0);
        let bending = params.bending.as_ref().unwrap();
        assert_eq!(bending.relation, CurvatureRelation::Hill);
        assert_eq!(params.tension.as_ref().unwrap().model, TensionModel::AreaConstrained);
        assert_eq!(
            params.osmotic.as_ref().unwrap().model,
            OsmoticModel::AmbientConcentration
        );
        assert!(params.validate().is_ok());
    }

    #[test]
    fn boundary_and_variation_tables_load() {
        let params = Parameters::from_toml_str(
            r#"
            [bending]
            kb = 1.0

            [adsorption]
            epsilon = -1.0

            [protein]
            mobility = 1.0

            [boundary]
            shape = "roller"
            protein = "pin"

            [variation]
            shape = false
            "#,
        )
        .unwrap();
        assert_eq!(params.boundary.shape, ShapeBoundary::Roller);
        assert_eq!(params.boundary.protein, ProteinBoundary::Pin);
        assert!(!params.variation.shape);
        assert!(params.variation.protein);
        assert_eq!(params.mobility(), Some(1.0));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn frozen_shape_needs_evolving_protein() {
        let mut params = Parameters::bending_only(1.0);
        params.variation.shape = false;
        assert_eq!(violated_fields(&params), ["variation"]);

        params.protein = Some(ProteinParams {
            mobility: 1.0,
            interior_penalty: 0.0,
        });
        params.bending.as_mut().unwrap().kbc = 1.0;
        assert!(params.validate().is_ok());

        params.variation.protein = false;
        assert!(!params.protein_dynamics_enabled());
        assert_eq!(params.mobility(), None);
        assert_eq!(violated_fields(&params), ["variation"]);
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let result = Parameters::load(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ParamLoadError::Io { .. })));
    }
}
