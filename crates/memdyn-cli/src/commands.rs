pub mod check;
pub mod run;

use crate::config::{AppConfig, MeshConfig, MeshSource};
use crate::error::{CliError, Result};
use memdyn::core::io::{obj::ObjFile, traits::MeshFile};
use memdyn::core::mesh::{MeshState, MeshTopology, factory};
use memdyn::engine::error::EngineError;
use memdyn::workflows::simulate::SimulationInput;
use tracing::info;

/// Builds or reads the initial mesh described by `config`.
pub fn load_mesh(config: &MeshConfig) -> Result<(MeshTopology, MeshState)> {
    let (topology, state) = match &config.source {
        MeshSource::File(path) => {
            info!("Loading input mesh from {:?}", path);
            let (topology, state, _) =
                ObjFile::read_from_path(path).map_err(|e| CliError::FileParsing {
                    path: path.clone(),
                    source: e.into(),
                })?;
            (topology, state)
        }
        MeshSource::Icosphere {
            radius,
            subdivisions,
        } => {
            info!(radius, subdivisions, "Generating icosphere.");
            factory::icosphere(*radius, *subdivisions).map_err(EngineError::from)?
        }
        MeshSource::HexagonalPatch { edge_length, rings } => {
            info!(edge_length, rings, "Generating hexagonal patch.");
            factory::hexagonal_patch(*edge_length, *rings).map_err(EngineError::from)?
        }
    };
    let state = match config.protein_density {
        Some(phi) => state.with_uniform_protein_density(phi),
        None => state,
    };
    Ok((topology, state))
}

pub fn simulation_input(config: &AppConfig) -> Result<SimulationInput> {
    let (topology, state) = load_mesh(&config.mesh)?;
    Ok(SimulationInput {
        topology,
        state,
        parameters: config.parameters.clone(),
        seed: config.seed,
    })
}
