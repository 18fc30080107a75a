use crate::core::energy::EnergyBreakdown;
use std::fmt;

/// Lifecycle of one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Uninitialized,
    Validated,
    Running,
    Terminated(Outcome),
    Finalized,
    /// A configuration, geometry or line search error ended the run.
    Failed,
}

/// Normal ends of a run; none of them is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Converged,
    Diverged,
    StepLimitReached,
    TimeLimitReached,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        self == Self::Converged
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Converged => "converged",
            Self::Diverged => "diverged",
            Self::StepLimitReached => "step limit reached",
            Self::TimeLimitReached => "time limit reached",
        };
        f.write_str(label)
    }
}

/// Mutable bookkeeping of the integrator loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    pub step: u64,
    pub time: f64,
    /// Step size used by the most recent update.
    pub time_step: f64,
    pub initial_energy: Option<f64>,
    pub last_energy: f64,
    /// Largest absolute force component at the start of the run, for adaptive stepping.
    pub initial_max_force: Option<f64>,
    pub mechanical_norm: f64,
    pub chemical_norm: f64,
    pub last_frame: Option<u64>,
    pub frames_written: u64,
    pub sink_failures: u64,
    pub chemical_failures: u64,
}

impl RunState {
    pub fn new(time: f64, time_step: f64) -> Self {
        Self {
            step: 0,
            time,
            time_step,
            initial_energy: None,
            last_energy: f64::NAN,
            initial_max_force: None,
            mechanical_norm: f64::INFINITY,
            chemical_norm: f64::INFINITY,
            last_frame: None,
            frames_written: 0,
            sink_failures: 0,
            chemical_failures: 0,
        }
    }
}

/// Summary handed back once a run is finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub integrator: &'static str,
    pub outcome: Outcome,
    pub steps: u64,
    pub time: f64,
    pub initial_energy: f64,
    pub energy: EnergyBreakdown,
    pub mechanical_norm: f64,
    pub chemical_norm: f64,
    pub frames_written: u64,
    pub sink_failures: u64,
    pub chemical_failures: u64,
}
