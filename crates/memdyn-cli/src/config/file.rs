use crate::error::{CliError, Result};
use memdyn::core::params::Parameters;
use memdyn::engine::config as core_config;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FileMeshShape {
    Icosphere,
    HexagonalPatch,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileMeshConfig {
    pub shape: Option<FileMeshShape>,
    pub path: Option<PathBuf>,
    pub radius: Option<f64>,
    pub subdivisions: Option<u32>,
    pub edge_length: Option<f64>,
    pub rings: Option<usize>,
    pub protein_density: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FileIntegratorKind {
    Euler,
    VelocityVerlet,
    ConjugateGradient,
    Bfgs,
}

impl From<FileIntegratorKind> for core_config::IntegratorKind {
    fn from(kind: FileIntegratorKind) -> Self {
        match kind {
            FileIntegratorKind::Euler => Self::Euler,
            FileIntegratorKind::VelocityVerlet => Self::VelocityVerlet,
            FileIntegratorKind::ConjugateGradient => Self::ConjugateGradient,
            FileIntegratorKind::Bfgs => Self::Bfgs,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FileConvergenceNorm {
    L1,
    GradientSquared,
}

impl From<FileConvergenceNorm> for core_config::ConvergenceNorm {
    fn from(norm: FileConvergenceNorm) -> Self {
        match norm {
            FileConvergenceNorm::L1 => Self::L1,
            FileConvergenceNorm::GradientSquared => Self::GradientSquared,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FileSinkPolicy {
    Continue,
    Abort,
}

impl From<FileSinkPolicy> for core_config::SinkPolicy {
    fn from(policy: FileSinkPolicy) -> Self {
        match policy {
            FileSinkPolicy::Continue => Self::Continue,
            FileSinkPolicy::Abort => Self::Abort,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone, Copy)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileLineSearchConfig {
    pub rho: Option<f64>,
    pub c1: Option<f64>,
    pub min_step_ratio: Option<f64>,
}

impl FileLineSearchConfig {
    pub fn merge_onto(self, base: core_config::LineSearchConfig) -> core_config::LineSearchConfig {
        core_config::LineSearchConfig {
            rho: self.rho.unwrap_or(base.rho),
            c1: self.c1.unwrap_or(base.c1),
            min_step_ratio: self.min_step_ratio.unwrap_or(base.min_step_ratio),
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileIntegratorConfig {
    pub kind: Option<FileIntegratorKind>,
    pub time_step: Option<f64>,
    pub max_steps: Option<u64>,
    pub tolerance: Option<f64>,
    pub total_time: Option<f64>,
    pub convergence_norm: Option<FileConvergenceNorm>,
    pub divergence_factor: Option<f64>,
    pub adaptive_step_ratio: Option<f64>,
    pub backtrack: Option<bool>,
    pub restart_period: Option<u64>,
    pub constraint_tolerance: Option<f64>,
    pub abort_on_chemical_failure: Option<bool>,
    pub line_search: Option<FileLineSearchConfig>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileOutputConfig {
    pub directory: Option<PathBuf>,
    pub frame_period: Option<u64>,
    pub sink_policy: Option<FileSinkPolicy>,
    pub final_mesh: Option<PathBuf>,
}

/// A run file. Every field is optional; the `[physics]` table uses the
/// parameter file schema of the core library.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub seed: Option<u64>,
    pub parameters_file: Option<PathBuf>,
    pub mesh: Option<FileMeshConfig>,
    pub integrator: Option<FileIntegratorConfig>,
    pub output: Option<FileOutputConfig>,
    pub physics: Option<Parameters>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading run file from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        if let Some(base) = path.parent() {
            config.resolve_relative_paths(base);
        }
        Ok(config)
    }

    /// Interprets relative paths in the file as relative to `base`.
    fn resolve_relative_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(p) = self.parameters_file.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.mesh.as_mut().and_then(|m| m.path.as_mut()) {
            resolve(p);
        }
        if let Some(output) = self.output.as_mut() {
            if let Some(p) = output.directory.as_mut() {
                resolve(p);
            }
            if let Some(p) = output.final_mesh.as_mut() {
                resolve(p);
            }
        }
    }
}
