use crate::error::{CliError, Result};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{
    EnvFilter,
    filter::LevelFilter,
    fmt::{self},
    prelude::*,
};

/// Crates whose events follow `-v`. Everything else stays at WARN.
const WORKSPACE_TARGETS: [&str; 2] = ["adsorbent_search", "adsorb"];

pub fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Filter directives for the given flags, e.g. `warn,adsorbent_search=debug,adsorb=debug`.
fn directives(verbosity: u8, quiet: bool) -> String {
    let level = level_filter(verbosity, quiet);
    let mut directives = vec![level.min(LevelFilter::WARN).to_string().to_lowercase()];
    directives.extend(
        WORKSPACE_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level.to_string().to_lowercase())),
    );
    directives.join(",")
}

/// `RUST_LOG` wins when it is set and no `-v`/`-q` flag was given.
fn build_filter(verbosity: u8, quiet: bool) -> Result<EnvFilter> {
    if verbosity == 0 && !quiet {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
    }
    EnvFilter::try_new(directives(verbosity, quiet))
        .map_err(|e| CliError::Config(format!("Invalid log filter: {}", e)))
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let filter = build_filter(verbosity, quiet)?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(&path).map_err(CliError::Io)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_thread_ids(true)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to install logger: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tracing::{debug, info};

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_filter(0, false), LevelFilter::WARN);
        assert_eq!(level_filter(1, false), LevelFilter::INFO);
        assert_eq!(level_filter(2, false), LevelFilter::DEBUG);
        assert_eq!(level_filter(7, false), LevelFilter::TRACE);
        assert_eq!(level_filter(3, true), LevelFilter::ERROR);
    }

    #[test]
    fn verbose_levels_apply_to_workspace_crates_only() {
        assert_eq!(
            directives(2, false),
            "warn,adsorbent_search=debug,adsorb=debug"
        );
        assert_eq!(
            directives(0, true),
            "error,adsorbent_search=error,adsorb=error"
        );
    }

    #[test]
    #[serial]
    fn file_layer_records_debug_events() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let file = File::create(&log_path).unwrap();
        let file_layer = fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_thread_ids(true);
        let subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new(directives(2, false)))
            .with(file_layer);

        tracing::subscriber::with_default(subscriber, || {
            debug!(adsorbent = "Cu1", "Relaxing adsorbent");
            debug!(target: "reqwest", "Filtered out");
            info!(target: "reqwest", "Also filtered out");
        });

        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains("Relaxing adsorbent"));
        assert!(content.contains("DEBUG"));
        assert!(!content.contains("filtered out"));
    }

    #[test]
    #[serial]
    fn invalid_log_file_path_propagates_error() {
        let invalid_path = PathBuf::from("/");

        if cfg!(unix) && invalid_path.is_dir() {
            let result = setup_logging(0, false, Some(invalid_path));
            assert!(matches!(result, Err(CliError::Io(_))));
        }
    }
}
