use thiserror::Error;

use super::backtrack::ConvergenceError;
use super::config::ConfigError;
use super::state::RunPhase;
use crate::core::geometry::GeometryError;
use crate::core::io::trajectory::SinkError;
use crate::core::mesh::MeshError;
use crate::core::params::{ConfigurationError, ParamLoadError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Incomplete integrator options: {0}")]
    Options(#[from] ConfigError),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Line search failed: {0}")]
    Convergence(#[from] ConvergenceError),

    #[error("Trajectory sink failed: {0}")]
    Sink(#[from] SinkError),

    #[error("Invalid mesh: {0}")]
    Mesh(#[from] MeshError),

    #[error("Failed to load parameters: {0}")]
    ParamLoad(#[from] ParamLoadError),

    #[error("Operation '{operation}' is not allowed in run phase {phase:?}")]
    InvalidPhase {
        operation: &'static str,
        phase: RunPhase,
    },
}
