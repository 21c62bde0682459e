//! Process command implementation
//!
//! Discovers inputs, seeds identities from the baseline, runs every file
//! through one processing session and writes Parquet outputs, then
//! optionally persists the newly minted identifiers.

use super::shared::{format_size, load_configuration, resolve_baseline_path, setup_logging};
use crate::cli::args::{OutputFormat, ProcessArgs};
use crate::identity::{Baseline, IdentityResolver};
use crate::processor::StdfProcessor;
use crate::processor::discovery::discover_inputs;
use crate::processor::session::{FileOutcome, ProcessingSession, SessionStats};
use crate::processor::writer::OutputWriter;

use anyhow::{Context, Result, bail};
use colored::*;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-file line of the final report
#[derive(Debug, Clone)]
struct FileSummary {
    path: PathBuf,
    measurements: usize,
    devices: usize,
    decode_error: Option<String>,
    output_bytes: u64,
}

impl FileSummary {
    fn from_outcome(outcome: &FileOutcome) -> Self {
        let output_bytes = outcome
            .written
            .iter()
            .flat_map(|written| {
                std::iter::once(&written.measurements)
                    .chain(written.devices.as_ref())
                    .chain(std::iter::once(&written.report))
            })
            .filter_map(|path| std::fs::metadata(path).ok())
            .map(|meta| meta.len())
            .sum();

        Self {
            path: outcome.path.clone(),
            measurements: outcome.result.measurements.len(),
            devices: outcome.result.devices.len(),
            decode_error: outcome.result.stats.decode_error.clone(),
            output_bytes,
        }
    }
}

fn create_progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message("Decoding...");
    pb
}

/// Run the process command
pub async fn run_process(args: ProcessArgs) -> Result<SessionStats> {
    setup_logging(args.get_log_level(), args.quiet)?;

    info!("Starting STDF processor");
    debug!("Command line arguments: {:?}", args);

    args.validate()?;
    let config = load_configuration(&args).context("Failed to load configuration")?;

    let inputs = discover_inputs(&args.inputs).context("Failed to discover input files")?;
    if inputs.is_empty() {
        bail!("No STDF files found in {}", args.inputs.join(", "));
    }
    info!("Discovered {} input files", inputs.len());

    let baseline_path = resolve_baseline_path(&args)?;
    let mut baseline = match &baseline_path {
        Some(path) => Baseline::load_or_default(path)
            .with_context(|| format!("Failed to load baseline {}", path.display()))?,
        None => Baseline::default(),
    };
    let resolver = IdentityResolver::from_baseline(&baseline)
        .context("Baseline mappings are inconsistent")?;

    let processor = StdfProcessor::new(resolver)?.with_config(config.clone());
    let writer = OutputWriter::new(args.output_path.clone(), config.output.clone());
    let mut session = ProcessingSession::new(processor)
        .with_writer(writer)
        .with_token_override(args.file_token.clone());
    session
        .check_inputs(&inputs)
        .context("Inputs cannot be processed together")?;

    let progress_bar = args.show_progress().then(|| create_progress_bar(inputs.len()));
    let mut summaries = Vec::with_capacity(inputs.len());

    let stats = session
        .run(&inputs, |outcome| {
            if let Some(pb) = &progress_bar {
                pb.inc(1);
                pb.set_message(
                    outcome
                        .path
                        .file_name()
                        .map(|name| name.to_string_lossy().to_string())
                        .unwrap_or_default(),
                );
            }
            summaries.push(FileSummary::from_outcome(outcome));
        })
        .await
        .context("Processing failed")?;

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    if args.save_baseline {
        let resolver = session.into_processor().into_resolver();
        persist_baseline(&mut baseline, &resolver, baseline_path)?;
    }

    match args.output_format {
        OutputFormat::Human if !args.quiet => generate_human_report(&stats, &summaries),
        OutputFormat::Human => {}
        OutputFormat::Json => generate_json_report(&stats, &summaries)?,
    }

    Ok(stats)
}

/// Append the session's new mappings to the baseline and write it back
fn persist_baseline(
    baseline: &mut Baseline,
    resolver: &IdentityResolver,
    path: Option<PathBuf>,
) -> Result<()> {
    let Some(path) = path else {
        bail!("No baseline path available to save identifiers");
    };

    let new_devices = resolver.new_device_mappings();
    let new_parameters = resolver.new_parameter_mappings();
    if new_devices.is_empty() && new_parameters.is_empty() && path.exists() {
        debug!("No new identifiers; leaving {} untouched", path.display());
        return Ok(());
    }

    baseline.extend(&new_devices, &new_parameters);
    baseline
        .save(&path)
        .with_context(|| format!("Failed to save baseline {}", path.display()))?;

    info!(
        "Saved baseline to {} (+{} devices, +{} parameters)",
        path.display(),
        new_devices.len(),
        new_parameters.len()
    );
    Ok(())
}

fn generate_human_report(stats: &SessionStats, summaries: &[FileSummary]) {
    let duration = HumanDuration(Duration::from_millis(stats.processing_time_ms as u64));
    let total_size: u64 = summaries.iter().map(|s| s.output_bytes).sum();

    println!("\n{}", "Processing Summary".bright_green().bold());
    println!(
        "  {} {}",
        "Files processed:".bright_cyan(),
        stats.files_processed.to_string().bright_white().bold()
    );
    if stats.files_failed > 0 {
        println!(
            "  {} {}",
            "Files failed:".bright_red(),
            stats.files_failed.to_string().bright_red().bold()
        );
    }
    println!(
        "  {} {}",
        "Measurements:".bright_cyan(),
        stats.total_measurements.to_string().bright_white().bold()
    );
    println!(
        "  {} {}",
        "Devices:".bright_cyan(),
        stats.total_devices.to_string().bright_white().bold()
    );
    println!(
        "  {} {} devices, {} parameters",
        "New identifiers:".bright_cyan(),
        stats.new_devices,
        stats.new_parameters
    );
    println!(
        "  {} {}",
        "Output size:".bright_cyan(),
        format_size(total_size)
    );
    println!("  {} {}", "Processing time:".bright_cyan(), duration);

    if !summaries.is_empty() {
        println!("\n{}", "Files".bright_green().bold());
        for summary in summaries {
            match &summary.decode_error {
                Some(error) => {
                    warn!("{}: {}", summary.path.display(), error);
                    println!(
                        "  {} {}",
                        summary.path.display().to_string().bright_red(),
                        error
                    );
                }
                None => println!(
                    "  {}: {} rows, {} devices, {}",
                    summary.path.display(),
                    summary.measurements,
                    summary.devices,
                    format_size(summary.output_bytes)
                ),
            }
        }
    }
    println!();
}

/// Generate JSON report for machine consumption
fn generate_json_report(stats: &SessionStats, summaries: &[FileSummary]) -> Result<()> {
    let report = serde_json::json!({
        "files_processed": stats.files_processed,
        "files_failed": stats.files_failed,
        "total_measurements": stats.total_measurements,
        "total_devices": stats.total_devices,
        "new_devices": stats.new_devices,
        "new_parameters": stats.new_parameters,
        "processing_time_ms": stats.processing_time_ms as u64,
        "files": summaries.iter().map(|summary| {
            serde_json::json!({
                "path": summary.path.display().to_string(),
                "measurements": summary.measurements,
                "devices": summary.devices,
                "decode_error": summary.decode_error,
                "output_bytes": summary.output_bytes,
            })
        }).collect::<Vec<_>>()
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
