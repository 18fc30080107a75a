use memdyn::core::params::Parameters;
use memdyn::engine::config::IntegratorConfig;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum MeshSource {
    File(PathBuf),
    Icosphere { radius: f64, subdivisions: u32 },
    HexagonalPatch { edge_length: f64, rings: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshConfig {
    pub source: MeshSource,
    /// Uniform initial protein density; overrides densities read from a file.
    pub protein_density: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mesh: MeshConfig,
    pub parameters: Parameters,
    pub integrator: IntegratorConfig,
    pub seed: u64,
    pub output_directory: PathBuf,
    pub final_mesh: Option<PathBuf>,
}
