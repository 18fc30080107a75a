use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileMeshConfig, FileMeshShape};
use super::models::{AppConfig, MeshConfig, MeshSource};
use crate::cli::{IntegratorChoice, RunArgs, SystemArgs};
use crate::error::{CliError, Result};
use memdyn::core::params::Parameters;
use memdyn::engine::config as core_config;
use serde::Deserialize;
use serde::de::IntoDeserializer;
use serde::de::value::{Error as ValueError, StrDeserializer};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

impl From<IntegratorChoice> for core_config::IntegratorKind {
    fn from(choice: IntegratorChoice) -> Self {
        match choice {
            IntegratorChoice::Euler => Self::Euler,
            IntegratorChoice::VelocityVerlet => Self::VelocityVerlet,
            IntegratorChoice::ConjugateGradient => Self::ConjugateGradient,
            IntegratorChoice::Bfgs => Self::Bfgs,
        }
    }
}

/// Command-line flags that take precedence over the run file.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub integrator: Option<core_config::IntegratorKind>,
    pub time_step: Option<f64>,
    pub max_steps: Option<u64>,
    pub tolerance: Option<f64>,
    pub frame_period: Option<u64>,
    pub output_directory: Option<PathBuf>,
    pub final_mesh: Option<PathBuf>,
}

impl From<&RunArgs> for CliOverrides {
    fn from(args: &RunArgs) -> Self {
        Self {
            integrator: args.integrator.map(Into::into),
            time_step: args.time_step,
            max_steps: args.max_steps,
            tolerance: args.tolerance,
            frame_period: args.frame_period,
            output_directory: args.output.clone(),
            final_mesh: args.final_mesh.clone(),
        }
    }
}

pub fn build_config(args: &SystemArgs, overrides: &CliOverrides) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let parameters = resolve_parameters(
        args.parameters.as_deref(),
        file_config.parameters_file.take(),
        file_config.physics.take(),
        &defaults,
    )?;

    let mesh = resolve_mesh(
        args.mesh.clone(),
        file_config.mesh.take().unwrap_or_default(),
        &defaults,
    )?;

    let integrator_file = file_config.integrator.take().unwrap_or_default();
    let output_file = file_config.output.take().unwrap_or_default();

    let kind = overrides
        .integrator
        .or(integrator_file.kind.map(Into::into))
        .unwrap_or(defaults.integrator);
    let time_step = overrides
        .time_step
        .or(integrator_file.time_step)
        .unwrap_or(defaults.time_step);
    let max_steps = overrides
        .max_steps
        .or(integrator_file.max_steps)
        .unwrap_or(defaults.max_steps);
    let tolerance = overrides
        .tolerance
        .or(integrator_file.tolerance)
        .unwrap_or(defaults.tolerance);
    let frame_period = overrides
        .frame_period
        .or(output_file.frame_period)
        .unwrap_or(defaults.frame_period);
    let line_search = integrator_file
        .line_search
        .unwrap_or_default()
        .merge_onto(core_config::LineSearchConfig::default());

    let mut builder = core_config::IntegratorConfigBuilder::new()
        .kind(kind)
        .time_step(time_step)
        .max_steps(max_steps)
        .tolerance(tolerance)
        .frame_period(frame_period)
        .line_search(line_search);
    if let Some(total_time) = integrator_file.total_time {
        builder = builder.total_time(total_time);
    }
    if let Some(norm) = integrator_file.convergence_norm {
        builder = builder.convergence_norm(norm.into());
    }
    if let Some(factor) = integrator_file.divergence_factor {
        builder = builder.divergence_factor(factor);
    }
    if let Some(ratio) = integrator_file.adaptive_step_ratio {
        builder = builder.adaptive_step_ratio(ratio);
    }
    if let Some(backtrack) = integrator_file.backtrack {
        builder = builder.backtrack(backtrack);
    }
    if let Some(period) = integrator_file.restart_period {
        builder = builder.restart_period(period);
    }
    if let Some(tolerance) = integrator_file.constraint_tolerance {
        builder = builder.constraint_tolerance(tolerance);
    }
    if let Some(abort) = integrator_file.abort_on_chemical_failure {
        builder = builder.abort_on_chemical_failure(abort);
    }
    if let Some(policy) = output_file.sink_policy {
        builder = builder.sink_policy(policy.into());
    }
    let integrator = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let output_directory = overrides
        .output_directory
        .clone()
        .or(output_file.directory)
        .unwrap_or_else(|| PathBuf::from(&defaults.output_directory));
    let final_mesh = overrides.final_mesh.clone().or(output_file.final_mesh);

    Ok(AppConfig {
        mesh,
        parameters,
        integrator,
        seed: args.seed.or(file_config.seed).unwrap_or(defaults.seed),
        output_directory,
        final_mesh,
    })
}

fn resolve_parameters(
    cli_path: Option<&Path>,
    file_path: Option<PathBuf>,
    inline: Option<Parameters>,
    defaults: &DefaultsConfig,
) -> Result<Parameters> {
    if let Some(path) = cli_path.map(Path::to_path_buf).or(file_path) {
        debug!("Loading physical parameters from {:?}", path);
        return Parameters::load(&path).map_err(|e| CliError::FileParsing {
            path,
            source: e.into(),
        });
    }
    if let Some(parameters) = inline {
        return Ok(parameters);
    }
    info!(
        kb = defaults.bending_rigidity,
        "No physical parameters given; using pure bending."
    );
    Ok(Parameters::bending_only(defaults.bending_rigidity))
}

fn resolve_mesh(
    cli_path: Option<PathBuf>,
    file_mesh: FileMeshConfig,
    defaults: &DefaultsConfig,
) -> Result<MeshConfig> {
    if file_mesh.path.is_some() && file_mesh.shape.is_some() {
        return Err(CliError::Config(
            "mesh.path and mesh.shape cannot both be set".to_string(),
        ));
    }
    let source = match (cli_path.or(file_mesh.path), file_mesh.shape) {
        (Some(path), _) => MeshSource::File(path),
        (None, Some(FileMeshShape::HexagonalPatch)) => MeshSource::HexagonalPatch {
            edge_length: file_mesh.edge_length.unwrap_or(defaults.edge_length),
            rings: file_mesh.rings.unwrap_or(defaults.rings),
        },
        (None, Some(FileMeshShape::Icosphere) | None) => MeshSource::Icosphere {
            radius: file_mesh.radius.unwrap_or(defaults.radius),
            subdivisions: file_mesh.subdivisions.unwrap_or(defaults.subdivisions),
        },
    };
    Ok(MeshConfig {
        source,
        protein_density: file_mesh.protein_density,
    })
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

fn parse_keyword<'de, T: Deserialize<'de>>(key: &str, value: &'de str) -> Result<T> {
    let deserializer: StrDeserializer<'de, ValueError> = value.into_deserializer();
    T::deserialize(deserializer)
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    if set_values.is_empty() {
        return Ok(config);
    }
    for kv_pair in set_values {
        let parts: Vec<_> = kv_pair.splitn(2, '=').collect();
        if parts.len() != 2 {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        }
        let key = parts[0];
        let value_str = parts[1];

        if let Some(field) = key.strip_prefix("mesh.") {
            let mesh = config.mesh.get_or_insert_with(Default::default);
            match field {
                "shape" => mesh.shape = Some(parse_keyword(key, value_str)?),
                "path" => mesh.path = Some(PathBuf::from(value_str)),
                "radius" => mesh.radius = Some(parse_value(key, value_str)?),
                "subdivisions" => mesh.subdivisions = Some(parse_value(key, value_str)?),
                "edge-length" => mesh.edge_length = Some(parse_value(key, value_str)?),
                "rings" => mesh.rings = Some(parse_value(key, value_str)?),
                "protein-density" => mesh.protein_density = Some(parse_value(key, value_str)?),
                _ => return Err(unsupported(key)),
            }
            continue;
        }

        if let Some(field) = key.strip_prefix("integrator.line-search.") {
            let line_search = config
                .integrator
                .get_or_insert_with(Default::default)
                .line_search
                .get_or_insert_with(Default::default);
            match field {
                "rho" => line_search.rho = Some(parse_value(key, value_str)?),
                "c1" => line_search.c1 = Some(parse_value(key, value_str)?),
                "min-step-ratio" => line_search.min_step_ratio = Some(parse_value(key, value_str)?),
                _ => return Err(unsupported(key)),
            }
            continue;
        }

        if let Some(field) = key.strip_prefix("integrator.") {
            let integrator = config.integrator.get_or_insert_with(Default::default);
            match field {
                "kind" => integrator.kind = Some(parse_keyword(key, value_str)?),
                "time-step" => integrator.time_step = Some(parse_value(key, value_str)?),
                "max-steps" => integrator.max_steps = Some(parse_value(key, value_str)?),
                "tolerance" => integrator.tolerance = Some(parse_value(key, value_str)?),
                "total-time" => integrator.total_time = Some(parse_value(key, value_str)?),
                "convergence-norm" => {
                    integrator.convergence_norm = Some(parse_keyword(key, value_str)?)
                }
                "divergence-factor" => {
                    integrator.divergence_factor = Some(parse_value(key, value_str)?)
                }
                "adaptive-step-ratio" => {
                    integrator.adaptive_step_ratio = Some(parse_value(key, value_str)?)
                }
                "backtrack" => integrator.backtrack = Some(parse_value(key, value_str)?),
                "restart-period" => integrator.restart_period = Some(parse_value(key, value_str)?),
                "constraint-tolerance" => {
                    integrator.constraint_tolerance = Some(parse_value(key, value_str)?)
                }
                "abort-on-chemical-failure" => {
                    integrator.abort_on_chemical_failure = Some(parse_value(key, value_str)?)
                }
                _ => return Err(unsupported(key)),
            }
            continue;
        }

        match key {
            "seed" => config.seed = Some(parse_value(key, value_str)?),
            "parameters-file" => config.parameters_file = Some(PathBuf::from(value_str)),
            "output.directory" => {
                config.output.get_or_insert_with(Default::default).directory =
                    Some(PathBuf::from(value_str));
            }
            "output.frame-period" => {
                config.output.get_or_insert_with(Default::default).frame_period =
                    Some(parse_value(key, value_str)?);
            }
            "output.sink-policy" => {
                config.output.get_or_insert_with(Default::default).sink_policy =
                    Some(parse_keyword(key, value_str)?);
            }
            _ => return Err(unsupported(key)),
        }
    }
    Ok(config)
}

fn unsupported(key: &str) -> CliError {
    CliError::Config(format!(
        "Unsupported configuration key for --set: '{}'",
        key
    ))
}
