use crate::cli::RunArgs;
use crate::config::{CliOverrides, build_config};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use memdyn::{
    core::io::{
        obj::{ObjFile, ObjMetadata},
        traits::MeshFile,
        trajectory::CsvTrajectorySink,
    },
    engine::{error::EngineError, progress::ProgressReporter},
    workflows,
};
use tracing::{info, warn};

pub fn run(args: RunArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let config = build_config(&args.system, &CliOverrides::from(&args))?;
    let input = super::simulation_input(&config)?;

    let mut sink =
        CsvTrajectorySink::create(&config.output_directory).map_err(EngineError::from)?;
    info!("Writing trajectory to {:?}", sink.directory());

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Starting {} on {} vertices...",
        config.integrator.kind.name(),
        input.state.vertex_count()
    );
    info!("Invoking the core simulation workflow...");

    let topology = input.topology.clone();
    let result = workflows::simulate::run(input, &config.integrator, &mut sink, &reporter)?;
    let report = &result.report;

    if report.outcome.is_success() {
        println!(
            "✓ {} after {} step(s), free energy {:.6e}",
            report.outcome,
            report.steps,
            report.energy.free_energy()
        );
    } else {
        warn!(outcome = %report.outcome, "Run ended without converging.");
        println!(
            "Run ended: {} after {} step(s), free energy {:.6e}",
            report.outcome,
            report.steps,
            report.energy.free_energy()
        );
    }
    println!(
        "  force norm {:.3e}, chemical norm {:.3e}, {} frame(s) written",
        report.mechanical_norm, report.chemical_norm, report.frames_written
    );
    if let Some(tension) = result.surface_tension {
        println!("  surface tension {:.6e}", tension);
    }
    if let Some(pressure) = result.osmotic_pressure {
        println!("  osmotic pressure {:.6e}", pressure);
    }
    if report.sink_failures > 0 {
        warn!(
            failures = report.sink_failures,
            "Some trajectory frames could not be written."
        );
    }
    if report.chemical_failures > 0 {
        warn!(
            failures = report.chemical_failures,
            "Some chemical updates were skipped after failed line searches."
        );
    }

    if let Some(path) = &config.final_mesh {
        let metadata = ObjMetadata {
            comments: vec![format!(
                "memdyn {} {}: {} steps, outcome {}",
                env!("CARGO_PKG_VERSION"),
                report.integrator,
                report.steps,
                report.outcome
            )],
        };
        ObjFile::write_to_path(&topology, &result.state, &metadata, path).map_err(|e| {
            CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            }
        })?;
        println!("✓ Final mesh written to: {}", path.display());
    }

    Ok(())
}
