use serde::Deserialize;

/// How the protein density modulates bending rigidity and spontaneous curvature.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CurvatureRelation {
    /// `f(φ) = φ`
    #[default]
    Linear,
    /// `f(φ) = φ² / (1 + φ²)`
    Hill,
}

impl CurvatureRelation {
    /// Returns `(f(φ), f'(φ))`.
    #[inline]
    pub fn eval(self, phi: f64) -> (f64, f64) {
        match self {
            Self::Linear => (phi, 1.0),
            Self::Hill => {
                let phi2 = phi * phi;
                let denom = 1.0 + phi2;
                (phi2 / denom, 2.0 * phi / (denom * denom))
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct BendingParams {
    /// Bare bending modulus.
    pub kb: f64,
    /// Protein-induced bending modulus.
    pub kbc: f64,
    /// Protein-induced spontaneous curvature.
    pub h0c: f64,
    pub relation: CurvatureRelation,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TensionModel {
    /// `E = ksg · A`
    #[default]
    Constant,
    /// `E = ksg (A − At)² / (2 At) + λ (A − At)`
    AreaConstrained,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct TensionParams {
    pub model: TensionModel,
    pub ksg: f64,
    pub target_area: f64,
    pub lambda: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OsmoticModel {
    /// `E = kv (V − Vt)² / (2 Vt) + λ (V − Vt)`
    #[default]
    PreferredVolume,
    /// van 't Hoff: `E = kv n (r − ln r − 1)`, `r = c V / n`
    AmbientConcentration,
    /// `E = −kv V`
    ConstantPressure,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct OsmoticParams {
    pub model: OsmoticModel,
    pub kv: f64,
    pub target_volume: f64,
    pub lambda: f64,
    pub ambient_concentration: f64,
    pub enclosed_solute: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AdsorptionParams {
    /// Adsorption energy per unit area per unit density.
    pub epsilon: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AggregationParams {
    /// Protein-protein interaction coefficient.
    pub chi: f64,
}

/// Adhesion to a flat substrate at `z = substrate_height` through a Gaussian well.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AdhesionParams {
    pub energy: f64,
    pub range: f64,
    pub substrate_height: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct DirichletParams {
    /// Line tension coefficient of the density gradient energy.
    pub eta: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct EntropyParams {
    /// Thermal energy `kB T` weighting the mixing entropy.
    pub kbt: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ProteinParams {
    /// Mobility (diffusivity) of the density field under its chemical potential.
    pub mobility: f64,
    /// Barrier keeping the density inside `(0, 1)`.
    pub interior_penalty: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct DpdParams {
    pub gamma: f64,
    pub kbt: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct DampingParams {
    pub coefficient: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ExternalParams {
    pub kf: f64,
    pub anchor: [f64; 3],
    pub direction: [f64; 3],
    pub width: f64,
    /// Exponential decay time of the magnitude; `None` keeps it constant.
    pub decay_time: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RegularizationParams {
    /// Edge length stiffness.
    pub kse: f64,
    /// Face area stiffness.
    pub ksl: f64,
    /// Conformal (length cross ratio) stiffness.
    pub kst: f64,
}

/// Motion allowed to the boundary vertices of an open mesh.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShapeBoundary {
    #[default]
    Free,
    /// Boundary vertices slide in the `xy` plane.
    Roller,
    /// Boundary vertices do not move.
    Pin,
    /// Boundary vertices and their neighbours do not move.
    Fixed,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProteinBoundary {
    #[default]
    Free,
    /// The density on boundary vertices keeps its initial value.
    Pin,
}

/// Boundary conditions of an open mesh; ignored on closed meshes.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct BoundaryParams {
    pub shape: ShapeBoundary,
    pub protein: ProteinBoundary,
}

/// Which degrees of freedom the integrators may change.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct VariationParams {
    /// Vertex positions respond to the mechanical force.
    pub shape: bool,
    /// The protein density responds to its chemical potential.
    pub protein: bool,
}

impl Default for VariationParams {
    fn default() -> Self {
        Self {
            shape: true,
            protein: true,
        }
    }
}
