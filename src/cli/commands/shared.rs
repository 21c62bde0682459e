//! Shared utilities for CLI commands
//!
//! Logging setup, layered configuration loading and the default baseline
//! location used by more than one command.

use crate::cli::args::ProcessArgs;
use crate::config::ProcessorConfig;
use crate::constants::{APP_DATA_DIR, BASELINE_FILENAME};
use crate::error::{Result, StdfError};
use std::path::PathBuf;
use tracing::debug;

/// Set up structured logging on stderr
///
/// `RUST_LOG` wins over the level derived from the verbosity flags.
pub fn setup_logging(log_level: &str, compact: bool) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("stdf_processor={}", log_level)));

    let initialized = if compact {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .with_timer(fmt::time::uptime()),
            )
            .try_init()
    };

    initialized
        .map_err(|e| StdfError::configuration(format!("Failed to initialize logging: {}", e)))
}

/// Baseline location in the user data directory
pub fn default_baseline_path() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DATA_DIR).join(BASELINE_FILENAME))
        .ok_or_else(|| {
            StdfError::configuration("No user data directory; pass --baseline explicitly")
        })
}

/// Baseline path for a run, if one is used at all
///
/// An explicit `--baseline` always applies. Without one, the default
/// location is used only when the run saves its mappings.
pub fn resolve_baseline_path(args: &ProcessArgs) -> Result<Option<PathBuf>> {
    match &args.baseline {
        Some(path) => Ok(Some(path.clone())),
        None if args.save_baseline => default_baseline_path().map(Some),
        None => Ok(None),
    }
}

/// Load configuration: defaults, then the config file, then CLI flags
pub fn load_configuration(args: &ProcessArgs) -> Result<ProcessorConfig> {
    let config = match &args.config_file {
        Some(path) => ProcessorConfig::from_json_file(path)?,
        None => ProcessorConfig::default(),
    };

    let config = apply_cli_overrides(config, args);
    config.validate()?;
    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

/// Apply command line overrides to configuration
fn apply_cli_overrides(mut config: ProcessorConfig, args: &ProcessArgs) -> ProcessorConfig {
    if args.all_tests {
        config = config.with_pixel_filtering(false);
    }
    if args.parallel {
        config = config.with_parallel_assembly(true);
    }
    if let Some(jobs) = args.jobs {
        config = config.with_decode_concurrency(jobs);
    }
    if let Some(compression) = args.compression {
        config = config.with_compression(compression);
    }
    if args.no_devices {
        config = config.with_device_info(false);
    }
    config
}

/// Format a byte count for display
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}
