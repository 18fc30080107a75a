use crate::core::io::trajectory::TrajectorySink;
use crate::core::mesh::{MeshState, MeshTopology};
use crate::core::params::Parameters;
use crate::engine::config::IntegratorConfig;
use crate::engine::driver::Simulation;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::RunReport;
use crate::engine::system::MembraneSystem;
use tracing::{info, instrument};

/// Everything a simulation starts from.
#[derive(Debug, Clone)]
pub struct SimulationInput {
    pub topology: MeshTopology,
    pub state: MeshState,
    pub parameters: Parameters,
    /// Seed of the DPD noise stream.
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub report: RunReport,
    pub state: MeshState,
    pub surface_tension: Option<f64>,
    pub osmotic_pressure: Option<f64>,
    pub area_error: Option<f64>,
    pub volume_error: Option<f64>,
}

#[instrument(skip_all, name = "simulation_workflow")]
pub fn run(
    input: SimulationInput,
    config: &IntegratorConfig,
    sink: &mut dyn TrajectorySink,
    reporter: &ProgressReporter,
) -> Result<SimulationResult, EngineError> {
    // === Phase 1: Build the system ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    info!(
        vertices = input.topology.vertex_count(),
        faces = input.topology.face_count(),
        integrator = config.kind.name(),
        "Preparing membrane system."
    );
    let system = MembraneSystem::new(input.topology, input.state, input.parameters, input.seed)?;
    let mut simulation = Simulation::new(system, config.clone());
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Validate parameters and options ===
    reporter.report(Progress::PhaseStart { name: "Validation" });
    simulation.validate()?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Integrate ===
    reporter.report(Progress::PhaseStart {
        name: "Integration",
    });
    simulation.run(sink, reporter)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 4: Summarize ===
    reporter.report(Progress::PhaseStart {
        name: "Finalization",
    });
    let report = simulation.finalize()?;
    let mut system = simulation.into_system();
    let surface_tension = system.surface_tension()?;
    let osmotic_pressure = system.osmotic_pressure()?;
    let (area_error, volume_error) = system.constraint_errors()?;
    reporter.report(Progress::PhaseFinish);

    info!(
        outcome = %report.outcome,
        steps = report.steps,
        energy = report.energy.free_energy(),
        "Simulation workflow complete."
    );
    Ok(SimulationResult {
        report,
        state: system.into_state(),
        surface_tension,
        osmotic_pressure,
        area_error,
        volume_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::trajectory::MemorySink;
    use crate::core::mesh::factory::icosphere;
    use crate::core::params::{TensionModel, TensionParams};
    use crate::engine::config::{IntegratorConfigBuilder, IntegratorKind};
    use crate::engine::state::Outcome;
    use std::sync::Mutex;

    fn input(parameters: Parameters) -> SimulationInput {
        let (topology, state) = icosphere(1.0, 1).unwrap();
        SimulationInput {
            topology,
            state,
            parameters,
            seed: 3,
        }
    }

    fn config() -> IntegratorConfig {
        IntegratorConfigBuilder::new()
            .kind(IntegratorKind::ConjugateGradient)
            .time_step(0.05)
            .max_steps(5)
            .tolerance(1e-12)
            .frame_period(2)
            .build()
            .unwrap()
    }

    #[test]
    fn phases_are_reported_in_order() {
        let phases = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::PhaseStart { name } = event {
                phases.lock().unwrap().push(name);
            }
        }));
        let parameters = Parameters {
            tension: Some(TensionParams {
                model: TensionModel::AreaConstrained,
                ksg: 2.0,
                target_area: 12.0,
                lambda: 0.0,
            }),
            ..Parameters::bending_only(1.0)
        };

        let mut sink = MemorySink::new();
        let result = run(input(parameters), &config(), &mut sink, &reporter).unwrap();
        drop(reporter);

        assert_eq!(
            phases.into_inner().unwrap(),
            vec!["Preparation", "Validation", "Integration", "Finalization"]
        );
        assert_eq!(result.report.outcome, Outcome::StepLimitReached);
        assert_eq!(result.state.vertex_count(), 42);
        assert!(result.surface_tension.is_some());
        assert!(result.area_error.is_some());
        assert_eq!(result.osmotic_pressure, None);
        assert_eq!(
            sink.frames().iter().map(|f| f.step).collect::<Vec<_>>(),
            vec![0, 2, 4, 5]
        );
    }

    #[test]
    fn invalid_parameters_stop_before_integration() {
        let mut parameters = Parameters::bending_only(-1.0);
        parameters.vertex_mass = -2.0;
        let err = run(
            input(parameters),
            &config(),
            &mut MemorySink::new(),
            &ProgressReporter::new(),
        )
        .unwrap_err();
        let EngineError::Configuration(err) = err else {
            panic!("expected a configuration error, got {err:?}");
        };
        assert!(err.contains("bending.kb"));
        assert!(err.contains("vertex_mass"));
    }

    #[test]
    fn mismatched_state_is_rejected() {
        let (topology, _) = icosphere(1.0, 1).unwrap();
        let (_, state) = icosphere(1.0, 0).unwrap();
        let input = SimulationInput {
            topology,
            state,
            parameters: Parameters::bending_only(1.0),
            seed: 0,
        };
        let err = run(input, &config(), &mut MemorySink::new(), &ProgressReporter::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::Mesh(_)));
    }
}
