use super::config::{ConvergenceNorm, IntegratorConfig, SinkPolicy};
use super::error::EngineError;
use super::integrators::{self, Integrator, driving_magnitude};
use super::progress::{Progress, ProgressReporter};
use super::state::{Outcome, RunPhase, RunReport, RunState};
use super::system::MembraneSystem;
use crate::core::energy::EnergyBreakdown;
use crate::core::geometry::GeometryError;
use crate::core::io::trajectory::TrajectorySink;
use tracing::{debug, info, instrument, warn};

/// One integration run over a [`MembraneSystem`].
///
/// The run moves through `Uninitialized → Validated → Running →
/// Terminated(outcome) → Finalized`; any error on the way leaves it in
/// [`RunPhase::Failed`]. Each operation checks the phase it is called in.
pub struct Simulation {
    integrator: Box<dyn Integrator>,
    config: IntegratorConfig,
    system: MembraneSystem,
    phase: RunPhase,
    run: RunState,
}

impl Simulation {
    pub fn new(system: MembraneSystem, config: IntegratorConfig) -> Self {
        let integrator = integrators::build(config.kind);
        Self::with_integrator(system, config, integrator)
    }

    /// Uses a caller-supplied scheme instead of the one named by `config.kind`.
    pub fn with_integrator(
        system: MembraneSystem,
        config: IntegratorConfig,
        integrator: Box<dyn Integrator>,
    ) -> Self {
        let run = RunState::new(system.time(), config.time_step);
        Self {
            integrator,
            config,
            system,
            phase: RunPhase::Uninitialized,
            run,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn system(&self) -> &MembraneSystem {
        &self.system
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    pub fn run_state(&self) -> &RunState {
        &self.run
    }

    pub fn into_system(self) -> MembraneSystem {
        self.system
    }

    fn require(&self, operation: &'static str, allowed: bool) -> Result<(), EngineError> {
        if allowed {
            Ok(())
        } else {
            Err(EngineError::InvalidPhase {
                operation,
                phase: self.phase,
            })
        }
    }

    /// Checks the general options, the scheme's own requirements and the
    /// parameters against the mesh, reporting every violation at once.
    #[instrument(skip_all, name = "validate", fields(integrator = self.integrator.name()))]
    pub fn validate(&mut self) -> Result<(), EngineError> {
        self.require("validate", self.phase == RunPhase::Uninitialized)?;

        let mut violations = self.config.violations();
        violations.extend(self.integrator.check_parameters(&self.system, &self.config));
        violations.extend(self.system.check_parameters_and_options());

        match violations.into_result() {
            Ok(()) => {
                self.phase = RunPhase::Validated;
                debug!("Configuration validated.");
                Ok(())
            }
            Err(e) => {
                self.phase = RunPhase::Failed;
                warn!("{}", e);
                Err(e.into())
            }
        }
    }

    /// Integrates until one of the termination criteria is met.
    #[instrument(skip_all, name = "integrate", fields(integrator = self.integrator.name()))]
    pub fn run(
        &mut self,
        sink: &mut dyn TrajectorySink,
        reporter: &ProgressReporter,
    ) -> Result<Outcome, EngineError> {
        self.require("run", self.phase == RunPhase::Validated)?;
        self.phase = RunPhase::Running;
        self.integrator.reset();
        info!(
            max_steps = self.config.termination.max_steps,
            time_step = self.config.time_step,
            "Starting integration."
        );

        reporter.report(Progress::TaskStart {
            total_steps: self.config.termination.max_steps,
        });
        let result = self.integrate(sink, reporter);
        reporter.report(Progress::TaskFinish);

        match result {
            Ok(outcome) => {
                self.phase = RunPhase::Terminated(outcome);
                info!(
                    steps = self.run.step,
                    time = self.run.time,
                    energy = self.run.last_energy,
                    "Integration finished: {}.",
                    outcome
                );
                Ok(outcome)
            }
            Err(e) => {
                self.phase = RunPhase::Failed;
                Err(e)
            }
        }
    }

    /// Closes a terminated run and summarizes it.
    pub fn finalize(&mut self) -> Result<RunReport, EngineError> {
        let RunPhase::Terminated(outcome) = self.phase else {
            return Err(EngineError::InvalidPhase {
                operation: "finalize",
                phase: self.phase,
            });
        };
        let energy = self.system.evaluate()?.energy;
        self.phase = RunPhase::Finalized;

        Ok(RunReport {
            integrator: self.integrator.name(),
            outcome,
            steps: self.run.step,
            time: self.run.time,
            initial_energy: self.run.initial_energy.unwrap_or(self.run.last_energy),
            energy,
            mechanical_norm: self.run.mechanical_norm,
            chemical_norm: self.run.chemical_norm,
            frames_written: self.run.frames_written,
            sink_failures: self.run.sink_failures,
            chemical_failures: self.run.chemical_failures,
        })
    }

    fn integrate(
        &mut self,
        sink: &mut dyn TrajectorySink,
        reporter: &ProgressReporter,
    ) -> Result<Outcome, EngineError> {
        loop {
            let evaluation = match self.system.evaluate() {
                Ok(evaluation) => evaluation,
                Err(e) if is_blow_up(&e) => {
                    warn!(step = self.run.step, "State became non-finite: {}", e);
                    return Ok(Outcome::Diverged);
                }
                Err(e) => return Err(e.into()),
            };
            let energy = self.integrator.objective(&evaluation.energy);
            let force = evaluation.forces.conservative();

            let norm = self.config.termination.norm;
            self.run.mechanical_norm = measure(norm, force.iter().flat_map(|f| f.iter().copied()));
            self.run.chemical_norm = if self.system.parameters().protein_dynamics_enabled() {
                measure(norm, evaluation.chemical_potential.iter().copied())
            } else {
                0.0
            };
            self.run.last_energy = energy;
            self.run.time = self.system.time();
            let initial_energy = *self.run.initial_energy.get_or_insert(energy);
            if self.run.initial_max_force.is_none() {
                self.run.initial_max_force =
                    Some(driving_magnitude(self.system.parameters(), &evaluation));
            }

            reporter.report(Progress::Status {
                step: self.run.step,
                time: self.run.time,
                energy,
                force_norm: self.run.mechanical_norm,
            });

            let outcome = self.termination(energy, initial_energy)?;
            let period = self.config.output.frame_period;
            let frame_due = self.run.step == 0
                || (period > 0 && self.run.step % period == 0)
                || outcome.is_some();
            if frame_due {
                self.emit_frame(sink, &evaluation.energy)?;
            }
            if let Some(outcome) = outcome {
                return Ok(outcome);
            }

            let Self {
                integrator,
                config,
                system,
                run,
                ..
            } = self;
            // The stepped state is evaluated before commit, so a step that
            // breaks the geometry is rolled back with the rest of it.
            let stepped = system.transaction(|system| {
                let report = integrator.step(system, config, run)?;
                system.evaluate()?;
                Ok(report)
            });
            let report = match stepped {
                Ok(report) => report,
                Err(EngineError::Geometry(e)) if is_blow_up(&e) => {
                    warn!(step = run.step, "Step produced a non-finite state: {}", e);
                    return Ok(Outcome::Diverged);
                }
                Err(e) => return Err(e),
            };

            self.run.step += 1;
            self.run.time_step = report.time_step;
            if !report.chemical_accepted {
                self.run.chemical_failures += 1;
            }
            reporter.report(Progress::TaskIncrement);
        }
    }

    /// Decides whether the run stops at the current state. Divergence is
    /// checked first, then convergence, then the step and time limits.
    fn termination(&mut self, energy: f64, initial_energy: f64) -> Result<Option<Outcome>, EngineError> {
        let limits = self.config.termination;

        if !energy.is_finite() || !self.run.mechanical_norm.is_finite() {
            warn!(step = self.run.step, "Energy or force became non-finite.");
            return Ok(Some(Outcome::Diverged));
        }
        if energy - initial_energy > limits.divergence_factor * initial_energy.abs().max(1.0) {
            warn!(
                step = self.run.step,
                energy, initial_energy, "Energy rose past the divergence threshold."
            );
            return Ok(Some(Outcome::Diverged));
        }

        if self.integrator.has_converged(&self.run, limits.tolerance) {
            let constrained = match self.config.constraint_tolerance {
                Some(tolerance) => self.system.update_constraint_multipliers(tolerance)?,
                None => false,
            };
            if !constrained {
                return Ok(Some(Outcome::Converged));
            }
            debug!(step = self.run.step, "Forces converged, constraint multipliers updated.");
        }

        if self.run.step >= limits.max_steps {
            return Ok(Some(Outcome::StepLimitReached));
        }
        if self.run.time >= limits.total_time {
            return Ok(Some(Outcome::TimeLimitReached));
        }
        Ok(None)
    }

    fn emit_frame(
        &mut self,
        sink: &mut dyn TrajectorySink,
        energy: &EnergyBreakdown,
    ) -> Result<(), EngineError> {
        if self.run.last_frame == Some(self.run.step) {
            return Ok(());
        }
        match sink.append_frame(self.run.step, self.run.time, self.system.state(), energy) {
            Ok(()) => {
                self.run.last_frame = Some(self.run.step);
                self.run.frames_written += 1;
                Ok(())
            }
            Err(e) => match self.config.output.sink_policy {
                SinkPolicy::Abort => Err(e.into()),
                SinkPolicy::Continue => {
                    warn!(step = self.run.step, "Failed to write frame: {}", e);
                    self.run.sink_failures += 1;
                    Ok(())
                }
            },
        }
    }
}

fn is_blow_up(error: &GeometryError) -> bool {
    matches!(
        error,
        GeometryError::NonFinite { .. } | GeometryError::NonFinitePosition { .. }
    )
}

fn measure(norm: ConvergenceNorm, components: impl Iterator<Item = f64>) -> f64 {
    match norm {
        ConvergenceNorm::L1 => components.map(f64::abs).sum(),
        ConvergenceNorm::GradientSquared => components.map(|c| c * c).sum(),
    }
}

/// Validates, integrates and finalizes in one call, handing back the report
/// together with the final system.
pub fn run(
    system: MembraneSystem,
    config: IntegratorConfig,
    sink: &mut dyn TrajectorySink,
    reporter: &ProgressReporter,
) -> Result<(RunReport, MembraneSystem), EngineError> {
    let mut simulation = Simulation::new(system, config);
    simulation.validate()?;
    simulation.run(sink, reporter)?;
    let report = simulation.finalize()?;
    Ok((report, simulation.into_system()))
}
