//! Inspect command implementation
//!
//! Decodes a single STDF file and prints what the processor would see:
//! record counts by kind, run metadata and the test participation rate.

use super::shared::setup_logging;
use crate::cli::args::InspectArgs;
use crate::decoder::{RecordDecoder, StdfDecoder};
use crate::processor::classifier::{ClassifiedRecords, count_by_kind};
use crate::processor::metadata::extract_metadata;
use crate::processor::preprocess::is_pixel_test;
use crate::schema::{DEVICE_FIELDS, MEASUREMENT_FIELDS, column_ddl};

use anyhow::{Result, bail};
use colored::*;
use tracing::info;

/// Run the inspect command
pub async fn run_inspect(args: InspectArgs) -> Result<()> {
    setup_logging(args.get_log_level(), true)?;

    if !args.input.is_file() {
        bail!("Input file not found: {}", args.input.display());
    }

    let decoder = StdfDecoder::new();
    let path = args.input.clone();
    let outcome = tokio::task::spawn_blocking(move || decoder.decode(&path)).await?;
    info!(
        "Decoded {} records from {}",
        outcome.records.len(),
        args.input.display()
    );

    println!(
        "\n{} {}",
        "STDF file".bright_green().bold(),
        args.input.display()
    );
    if let Some(error) = &outcome.error {
        println!("  {} {}", "Decode error:".bright_red(), error);
    }

    println!("\n{}", "Records".bright_green().bold());
    for (kind, count) in count_by_kind(&outcome.records) {
        println!("  {:<6} {}", kind.as_str().bright_cyan(), count);
    }

    let classified = ClassifiedRecords::classify(&outcome.records);
    let metadata = extract_metadata(&classified.headers);
    println!("\n{}", "Metadata".bright_green().bold());
    for (label, value) in [
        ("Facility", &metadata.facility),
        ("Operation", &metadata.operation),
        ("Lot", &metadata.lot_name),
        ("Equipment", &metadata.equipment),
        ("Program", &metadata.prog_name),
        ("Version", &metadata.prog_version),
    ] {
        println!("  {:<10} {}", format!("{label}:").as_str().bright_cyan(), value);
    }
    match metadata.start_time_utc() {
        Some(start) => println!("  {:<10} {}", "Started:".bright_cyan(), start.to_rfc3339()),
        None => println!("  {:<10} {}", "Started:".bright_cyan(), metadata.start_time),
    }

    let pixel_tests = classified
        .tests
        .iter()
        .filter(|record| is_pixel_test(record))
        .count();
    println!("\n{}", "Participation".bright_green().bold());
    println!(
        "  {} devices, {} test records, {} pixel tests",
        classified.devices.len(),
        classified.tests.len(),
        pixel_tests
    );

    if args.show_schema {
        println!("\n{}", "Measurement columns".bright_green().bold());
        println!("  {}", column_ddl(MEASUREMENT_FIELDS));
        println!("\n{}", "Device columns".bright_green().bold());
        println!("  {}", column_ddl(DEVICE_FIELDS));
    }

    println!();
    Ok(())
}
