use crate::core::params::Violations;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegratorKind {
    Euler,
    VelocityVerlet,
    ConjugateGradient,
    Bfgs,
}

impl IntegratorKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Euler => "euler",
            Self::VelocityVerlet => "velocity_verlet",
            Self::ConjugateGradient => "conjugate_gradient",
            Self::Bfgs => "bfgs",
        }
    }
}

/// Which norm of the force and chemical potential is compared with the tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvergenceNorm {
    /// Sum of absolute components.
    #[default]
    L1,
    /// Squared Euclidean norm.
    GradientSquared,
}

/// What the driver does when the trajectory sink fails to append a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkPolicy {
    /// Log the failure and keep integrating.
    #[default]
    Continue,
    /// End the run with the sink error.
    Abort,
}

/// Backtracking line search constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSearchConfig {
    /// Shrink factor applied after every rejected trial.
    pub rho: f64,
    /// Armijo sufficient-decrease constant.
    pub c1: f64,
    /// The search fails once the step falls below this fraction of the initial step.
    pub min_step_ratio: f64,
}

impl Default for LineSearchConfig {
    fn default() -> Self {
        Self {
            rho: 0.5,
            c1: 1e-4,
            min_step_ratio: 1e-5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminationConfig {
    pub max_steps: u64,
    /// Simulated time after which the run stops.
    pub total_time: f64,
    pub tolerance: f64,
    pub norm: ConvergenceNorm,
    /// The run diverges once the objective rises above its initial value by
    /// this multiple of `max(|E0|, 1)`.
    pub divergence_factor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputConfig {
    /// Steps between trajectory frames; zero writes only the first and last frame.
    pub frame_period: u64,
    pub sink_policy: SinkPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegratorConfig {
    pub kind: IntegratorKind,
    /// Characteristic time step; also the initial trial step of line searches.
    pub time_step: f64,
    /// When set, `dt = ratio · min_edge² · (initial_max_force / max_force)`.
    pub adaptive_step_ratio: Option<f64>,
    /// Backtrack the mechanical update of explicit Euler.
    pub backtrack: bool,
    /// Steps between conjugate gradient restarts.
    pub restart_period: u64,
    /// Relative area and volume error above which converged relaxation keeps
    /// going with updated constraint multipliers.
    pub constraint_tolerance: Option<f64>,
    /// Treat a failed chemical line search as fatal instead of skipping the update.
    pub abort_on_chemical_failure: bool,
    pub line_search: LineSearchConfig,
    pub termination: TerminationConfig,
    pub output: OutputConfig,
}

impl IntegratorConfig {
    /// Options that are invalid for every scheme.
    pub fn violations(&self) -> Violations {
        let mut v = Violations::new();
        v.positive(self.time_step, "integrator.time_step")
            .non_negative(self.termination.tolerance, "integrator.tolerance")
            .positive(self.termination.divergence_factor, "integrator.divergence_factor")
            .check(
                self.termination.total_time > 0.0,
                "integrator.total_time",
                "must be positive",
            )
            .check(
                self.termination.max_steps > 0,
                "integrator.max_steps",
                "must be positive",
            );
        if let Some(ratio) = self.adaptive_step_ratio {
            v.positive(ratio, "integrator.adaptive_step_ratio");
        }
        if let Some(tolerance) = self.constraint_tolerance {
            v.positive(tolerance, "integrator.constraint_tolerance");
        }
        v
    }

    /// Range checks on the line search constants.
    pub fn line_search_violations(&self) -> Violations {
        let mut v = Violations::new();
        v.in_open_unit_interval(self.line_search.rho, "integrator.rho")
            .in_open_unit_interval(self.line_search.c1, "integrator.c1")
            .in_open_unit_interval(self.line_search.min_step_ratio, "integrator.min_step_ratio");
        v
    }
}

#[derive(Default)]
pub struct IntegratorConfigBuilder {
    kind: Option<IntegratorKind>,
    time_step: Option<f64>,
    max_steps: Option<u64>,
    tolerance: Option<f64>,
    total_time: Option<f64>,
    norm: Option<ConvergenceNorm>,
    divergence_factor: Option<f64>,
    adaptive_step_ratio: Option<f64>,
    backtrack: Option<bool>,
    restart_period: Option<u64>,
    constraint_tolerance: Option<f64>,
    abort_on_chemical_failure: Option<bool>,
    line_search: Option<LineSearchConfig>,
    frame_period: Option<u64>,
    sink_policy: Option<SinkPolicy>,
}

impl IntegratorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: IntegratorKind) -> Self {
        self.kind = Some(kind);
        self
    }
    pub fn time_step(mut self, dt: f64) -> Self {
        self.time_step = Some(dt);
        self
    }
    pub fn max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }
    pub fn total_time(mut self, time: f64) -> Self {
        self.total_time = Some(time);
        self
    }
    pub fn convergence_norm(mut self, norm: ConvergenceNorm) -> Self {
        self.norm = Some(norm);
        self
    }
    pub fn divergence_factor(mut self, factor: f64) -> Self {
        self.divergence_factor = Some(factor);
        self
    }
    pub fn adaptive_step_ratio(mut self, ratio: f64) -> Self {
        self.adaptive_step_ratio = Some(ratio);
        self
    }
    pub fn backtrack(mut self, enabled: bool) -> Self {
        self.backtrack = Some(enabled);
        self
    }
    pub fn restart_period(mut self, period: u64) -> Self {
        self.restart_period = Some(period);
        self
    }
    pub fn constraint_tolerance(mut self, tolerance: f64) -> Self {
        self.constraint_tolerance = Some(tolerance);
        self
    }
    pub fn abort_on_chemical_failure(mut self, abort: bool) -> Self {
        self.abort_on_chemical_failure = Some(abort);
        self
    }
    pub fn line_search(mut self, line_search: LineSearchConfig) -> Self {
        self.line_search = Some(line_search);
        self
    }
    pub fn frame_period(mut self, period: u64) -> Self {
        self.frame_period = Some(period);
        self
    }
    pub fn sink_policy(mut self, policy: SinkPolicy) -> Self {
        self.sink_policy = Some(policy);
        self
    }

    pub fn build(self) -> Result<IntegratorConfig, ConfigError> {
        let termination = TerminationConfig {
            max_steps: self
                .max_steps
                .ok_or(ConfigError::MissingParameter("max_steps"))?,
            total_time: self.total_time.unwrap_or(f64::INFINITY),
            tolerance: self
                .tolerance
                .ok_or(ConfigError::MissingParameter("tolerance"))?,
            norm: self.norm.unwrap_or_default(),
            divergence_factor: self.divergence_factor.unwrap_or(10.0),
        };
        let output = OutputConfig {
            frame_period: self.frame_period.unwrap_or(0),
            sink_policy: self.sink_policy.unwrap_or_default(),
        };
        Ok(IntegratorConfig {
            kind: self.kind.ok_or(ConfigError::MissingParameter("kind"))?,
            time_step: self
                .time_step
                .ok_or(ConfigError::MissingParameter("time_step"))?,
            adaptive_step_ratio: self.adaptive_step_ratio,
            backtrack: self.backtrack.unwrap_or(false),
            restart_period: self.restart_period.unwrap_or(50),
            constraint_tolerance: self.constraint_tolerance,
            abort_on_chemical_failure: self.abort_on_chemical_failure.unwrap_or(false),
            line_search: self.line_search.unwrap_or_default(),
            termination,
            output,
        })
    }
}
