use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FilePlacementConfig, FileSite};
use super::models::AppConfig;
use crate::cli::RelaxationArgs;
use crate::error::{CliError, Result};
use adsorbent_search::engine::config::{AdsorbateSite, EvaluatorSettings, RelaxationConfig};
use directories::ProjectDirs;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

/// Merges CLI flags, `--set` values, the config file and built-in defaults, in that
/// order of precedence.
pub fn build_config(
    args: &RelaxationArgs,
    max_turns: Option<usize>,
    history: Option<PathBuf>,
) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let model_file = file_config.model.take().unwrap_or_default();
    let optimizer_file = file_config.optimizer.take().unwrap_or_default();
    let placement_file = file_config.placement.take().unwrap_or_default();
    let search_file = file_config.search.take().unwrap_or_default();

    let model_name = args
        .model_name
        .clone()
        .or(model_file.name)
        .unwrap_or(defaults.model_name);
    let cache_dir = match args.model_local_cache.clone().or(model_file.local_cache) {
        Some(dir) => dir,
        None => default_cache_dir()?,
    };
    let checkpoint_path = args
        .checkpoint_path
        .clone()
        .or(model_file.checkpoint_path);
    let run_on_cpu = args.cpu || model_file.cpu.unwrap_or(defaults.run_on_cpu);

    let fmax = args
        .fmax
        .or(optimizer_file.fmax)
        .unwrap_or(defaults.fmax);
    let steps = args
        .steps
        .or(optimizer_file.steps)
        .unwrap_or(defaults.steps);

    let mut settings = merge_placement(placement_file)?;
    if let Some(max_step) = optimizer_file.max_step {
        settings.max_step = max_step;
    }
    if let Some(curvature) = optimizer_file.initial_curvature {
        settings.initial_curvature = curvature;
    }
    if let Some(max_atoms) = optimizer_file.max_atoms {
        settings.max_atoms = max_atoms;
    }

    debug!(
        model = %model_name,
        cache = %cache_dir.display(),
        fmax,
        steps,
        "Resolved relaxation configuration"
    );

    let relaxation = RelaxationConfig::builder()
        .model_name(model_name)
        .cache_dir(cache_dir)
        .checkpoint_path(checkpoint_path)
        .run_on_cpu(run_on_cpu)
        .force_convergence_threshold(fmax)
        .max_steps(steps)
        .settings(settings)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        relaxation,
        max_turns: max_turns
            .or(search_file.max_turns)
            .unwrap_or(defaults.max_turns),
        history: history.or(search_file.history),
    })
}

/// The per-user checkpoint cache, e.g. `~/.cache/adsorbent-search/checkpoints` on Linux.
pub fn default_cache_dir() -> Result<PathBuf> {
    ProjectDirs::from("com", "awentzonline", "adsorbent-search")
        .map(|dirs| dirs.cache_dir().join("checkpoints"))
        .ok_or_else(|| {
            CliError::Config("Could not determine the default model cache directory.".to_string())
        })
}

fn merge_placement(file: FilePlacementConfig) -> Result<EvaluatorSettings> {
    let mut settings = EvaluatorSettings::default();
    if let Some(vacuum) = file.vacuum {
        settings.vacuum = vacuum;
    }
    if let Some(height) = file.height {
        settings.adsorbate_height = height;
    }
    if let Some(tolerance) = file.surface_tolerance {
        settings.surface_layer_tolerance = tolerance;
    }
    if let Some(site) = file.site {
        settings.site = match site {
            FileSite::Position([x, y]) => AdsorbateSite::Position { x, y },
            FileSite::Named(name) => match name.as_str() {
                "top-atom" => AdsorbateSite::TopAtom,
                "origin" => AdsorbateSite::Origin,
                other => {
                    return Err(CliError::Config(format!(
                        "Unknown placement site '{}'. Expected 'top-atom', 'origin' or [x, y].",
                        other
                    )));
                }
            },
        };
    }
    Ok(settings)
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "model.name" => {
                config.model.get_or_insert_with(Default::default).name = Some(value_str.to_string());
            }
            "model.local-cache" => {
                config.model.get_or_insert_with(Default::default).local_cache =
                    Some(PathBuf::from(value_str));
            }
            "model.cpu" => {
                config.model.get_or_insert_with(Default::default).cpu =
                    Some(parse_value(key, value_str, "boolean")?);
            }
            "optimizer.fmax" => {
                config.optimizer.get_or_insert_with(Default::default).fmax =
                    Some(parse_value(key, value_str, "float")?);
            }
            "optimizer.steps" => {
                config.optimizer.get_or_insert_with(Default::default).steps =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "optimizer.max-step" => {
                config.optimizer.get_or_insert_with(Default::default).max_step =
                    Some(parse_value(key, value_str, "float")?);
            }
            "optimizer.max-atoms" => {
                config.optimizer.get_or_insert_with(Default::default).max_atoms =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "placement.vacuum" => {
                config.placement.get_or_insert_with(Default::default).vacuum =
                    Some(parse_value(key, value_str, "float")?);
            }
            "placement.height" => {
                config.placement.get_or_insert_with(Default::default).height =
                    Some(parse_value(key, value_str, "float")?);
            }
            "placement.site" => {
                config.placement.get_or_insert_with(Default::default).site =
                    Some(FileSite::Named(value_str.to_string()));
            }
            "placement.surface-tolerance" => {
                config
                    .placement
                    .get_or_insert_with(Default::default)
                    .surface_tolerance = Some(parse_value(key, value_str, "float")?);
            }
            "search.max-turns" => {
                config.search.get_or_insert_with(Default::default).max_turns =
                    Some(parse_value(key, value_str, "integer")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
