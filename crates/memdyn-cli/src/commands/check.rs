use crate::cli::CheckArgs;
use crate::config::{CliOverrides, build_config};
use crate::error::Result;
use memdyn::core::energy::EnergyBreakdown;
use memdyn::core::params::TermKind;
use memdyn::engine::driver::Simulation;
use memdyn::engine::error::EngineError;
use memdyn::engine::system::MembraneSystem;
use tracing::info;

const REPORTED_TERMS: [TermKind; 11] = [
    TermKind::Bending,
    TermKind::Surface,
    TermKind::Pressure,
    TermKind::Adsorption,
    TermKind::Aggregation,
    TermKind::Adhesion,
    TermKind::Dirichlet,
    TermKind::InteriorPenalty,
    TermKind::External,
    TermKind::Regularization,
    TermKind::Entropy,
];

pub fn run(args: CheckArgs) -> Result<()> {
    let energy = check(&args)?;
    println!(
        "  potential {:.6e}, free energy {:.6e}",
        energy.potential(),
        energy.free_energy()
    );
    println!("✓ Configuration is valid.");
    Ok(())
}

/// Validates the run described by `args` and evaluates its initial state.
fn check(args: &CheckArgs) -> Result<EnergyBreakdown> {
    let config = build_config(&args.system, &CliOverrides::default())?;
    let input = super::simulation_input(&config)?;
    let system = MembraneSystem::new(input.topology, input.state, input.parameters, input.seed)?;

    let mut simulation = Simulation::new(system, config.integrator.clone());
    if let Err(e) = simulation.validate() {
        if let EngineError::Configuration(err) = &e {
            println!("✗ {} invalid setting(s):", err.violations.len());
            for violation in &err.violations {
                println!("  - {}", violation);
            }
        }
        return Err(e.into());
    }

    let mut system = simulation.into_system();
    let evaluation = system.evaluate().map_err(EngineError::from)?;
    info!(
        vertices = system.topology().vertex_count(),
        integrator = config.integrator.kind.name(),
        "Initial state evaluated."
    );

    println!("{:<18} {:>14} {:>14}", "term", "energy", "max |force|");
    for kind in REPORTED_TERMS {
        if !system.parameters().is_enabled(kind) {
            continue;
        }
        let max_force = evaluation
            .forces
            .field(kind)
            .map(|field| field.iter().map(|f| f.norm()).fold(0.0, f64::max));
        match max_force {
            Some(force) => println!(
                "{:<18} {:>14.6e} {:>14.6e}",
                kind.name(),
                evaluation.energy.contribution(kind),
                force
            ),
            None => println!(
                "{:<18} {:>14.6e} {:>14}",
                kind.name(),
                evaluation.energy.contribution(kind),
                "-"
            ),
        }
    }
    Ok(evaluation.energy)
}
