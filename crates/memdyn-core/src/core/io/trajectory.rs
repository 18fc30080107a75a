use crate::core::energy::EnergyBreakdown;
use crate::core::mesh::MeshState;
use itertools::izip;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Frame for step {step} arrived after step {last}; frames are append-only")]
    OutOfOrder { last: u64, step: u64 },
}

/// Append-only destination for periodic snapshots of a run.
pub trait TrajectorySink {
    /// Appends one frame. Steps must be strictly increasing.
    fn append_frame(
        &mut self,
        step: u64,
        time: f64,
        state: &MeshState,
        energy: &EnergyBreakdown,
    ) -> Result<(), SinkError>;
}

fn check_order(last: Option<u64>, step: u64) -> Result<(), SinkError> {
    match last {
        Some(last) if step <= last => Err(SinkError::OutOfOrder { last, step }),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub step: u64,
    pub time: f64,
    pub state: MeshState,
    pub energy: EnergyBreakdown,
}

/// Keeps every frame in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    frames: Vec<Frame>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

impl TrajectorySink for MemorySink {
    fn append_frame(
        &mut self,
        step: u64,
        time: f64,
        state: &MeshState,
        energy: &EnergyBreakdown,
    ) -> Result<(), SinkError> {
        check_order(self.frames.last().map(|f| f.step), step)?;
        self.frames.push(Frame {
            step,
            time,
            state: state.clone(),
            energy: *energy,
        });
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct VertexRecord {
    step: u64,
    time: f64,
    vertex: usize,
    x: f64,
    y: f64,
    z: f64,
    vx: f64,
    vy: f64,
    vz: f64,
    phi: f64,
}

#[derive(Debug, Serialize)]
struct EnergyRecord {
    step: u64,
    time: f64,
    bending: f64,
    surface: f64,
    pressure: f64,
    adsorption: f64,
    aggregation: f64,
    adhesion: f64,
    dirichlet: f64,
    interior_penalty: f64,
    external: f64,
    regularization: f64,
    entropy: f64,
    kinetic: f64,
    potential: f64,
    free_energy: f64,
}

impl EnergyRecord {
    fn new(step: u64, time: f64, e: &EnergyBreakdown) -> Self {
        Self {
            step,
            time,
            bending: e.bending,
            surface: e.surface,
            pressure: e.pressure,
            adsorption: e.adsorption,
            aggregation: e.aggregation,
            adhesion: e.adhesion,
            dirichlet: e.dirichlet,
            interior_penalty: e.interior_penalty,
            external: e.external,
            regularization: e.regularization,
            entropy: e.entropy,
            kinetic: e.kinetic,
            potential: e.potential(),
            free_energy: e.free_energy(),
        }
    }
}

/// Writes `vertices.csv` (one row per vertex per frame) and `energy.csv`
/// (one row per frame) into a directory.
pub struct CsvTrajectorySink {
    vertices: csv::Writer<File>,
    energy: csv::Writer<File>,
    directory: PathBuf,
    last_step: Option<u64>,
}

impl CsvTrajectorySink {
    pub const VERTEX_FILE: &'static str = "vertices.csv";
    pub const ENERGY_FILE: &'static str = "energy.csv";

    /// Creates the directory if needed and truncates both files.
    pub fn create(directory: impl AsRef<Path>) -> Result<Self, SinkError> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory).map_err(|e| SinkError::Io {
            path: directory.to_string_lossy().to_string(),
            source: e,
        })?;
        let vertices = csv::Writer::from_path(directory.join(Self::VERTEX_FILE))?;
        let energy = csv::Writer::from_path(directory.join(Self::ENERGY_FILE))?;
        Ok(Self {
            vertices,
            energy,
            directory,
            last_step: None,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl TrajectorySink for CsvTrajectorySink {
    fn append_frame(
        &mut self,
        step: u64,
        time: f64,
        state: &MeshState,
        energy: &EnergyBreakdown,
    ) -> Result<(), SinkError> {
        check_order(self.last_step, step)?;

        let rows = izip!(
            state.positions(),
            state.velocities(),
            state.protein_density()
        )
        .enumerate();
        for (vertex, (p, v, &phi)) in rows {
            self.vertices.serialize(VertexRecord {
                step,
                time,
                vertex,
                x: p.x,
                y: p.y,
                z: p.z,
                vx: v.x,
                vy: v.y,
                vz: v.z,
                phi,
            })?;
        }
        self.energy.serialize(EnergyRecord::new(step, time, energy))?;

        let flush_error = |e: std::io::Error| SinkError::Io {
            path: self.directory.to_string_lossy().to_string(),
            source: e,
        };
        self.vertices.flush().map_err(flush_error)?;
        self.energy.flush().map_err(flush_error)?;

        self.last_step = Some(step);
        Ok(())
    }
}
