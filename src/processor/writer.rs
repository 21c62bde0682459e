//! Parquet and JSON output for processed runs.
//!
//! Each input file produces `<stem>.measurements.parquet`, optionally
//! `<stem>.devices.parquet`, and a `<stem>.run.json` report carrying the
//! run statistics and the identifiers minted by the run.

use crate::config::OutputConfig;
use crate::constants::{
    DEVICES_SUFFIX, GZIP_EXTENSION, MEASUREMENTS_SUFFIX, RUN_REPORT_SUFFIX, STDF_EXTENSIONS,
};
use crate::error::{Result, StdfError};
use crate::identity::Mapping;
use crate::models::Metadata;
use crate::processor::sink::{RunResult, RunStats};
use crate::schema::{devices_to_dataframe, measurements_to_dataframe};

use polars::prelude::{DataFrame, ParquetWriter as PolarsParquetWriter};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// JSON report written next to the Parquet files
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub source: String,
    pub file_token: &'a str,
    pub metadata: &'a Metadata,
    pub stats: &'a RunStats,
    pub new_device_mappings: &'a [Mapping],
    pub new_parameter_mappings: &'a [Mapping],
}

/// Paths written for one run
#[derive(Debug, Clone, Default)]
pub struct WrittenFiles {
    pub measurements: PathBuf,
    pub devices: Option<PathBuf>,
    pub report: PathBuf,
}

/// Output file name stem: the input name without `.gz` and the STDF extension
pub fn output_stem(input: &Path) -> String {
    let mut name = input
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    for extension in std::iter::once(GZIP_EXTENSION).chain(STDF_EXTENSIONS.iter().copied()) {
        let suffix = format!(".{extension}");
        if name.len() > suffix.len() && name.to_ascii_lowercase().ends_with(&suffix) {
            name.truncate(name.len() - suffix.len());
        }
    }
    name
}

/// Fail when two inputs would write to the same output files
pub fn check_unique_stems(inputs: &[PathBuf]) -> Result<()> {
    let mut seen: HashMap<String, &Path> = HashMap::with_capacity(inputs.len());
    for input in inputs {
        if let Some(previous) = seen.insert(output_stem(input), input) {
            return Err(StdfError::configuration(format!(
                "{} and {} both produce output stem '{}'",
                previous.display(),
                input.display(),
                output_stem(input)
            )));
        }
    }
    Ok(())
}

/// Writes run results into an output directory
#[derive(Debug, Clone)]
pub struct OutputWriter {
    output_dir: PathBuf,
    config: OutputConfig,
}

impl OutputWriter {
    pub fn new(output_dir: PathBuf, config: OutputConfig) -> Self {
        Self { output_dir, config }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every output of one run
    pub fn write_run(&self, source: &Path, result: &RunResult) -> Result<WrittenFiles> {
        std::fs::create_dir_all(&self.output_dir)?;
        let stem = output_stem(source);

        let measurements = self.path_for(&stem, MEASUREMENTS_SUFFIX);
        let mut df = measurements_to_dataframe(&result.measurements)?;
        self.write_parquet(&measurements, &mut df)?;

        let devices = if self.config.write_device_info {
            let path = self.path_for(&stem, DEVICES_SUFFIX);
            let mut df = devices_to_dataframe(&result.devices)?;
            self.write_parquet(&path, &mut df)?;
            Some(path)
        } else {
            None
        };

        let report = self.path_for(&stem, RUN_REPORT_SUFFIX);
        self.write_report(&report, source, result)?;

        info!(
            "Wrote {} measurements and {} devices for {}",
            result.measurements.len(),
            result.devices.len(),
            source.display()
        );

        Ok(WrittenFiles {
            measurements,
            devices,
            report,
        })
    }

    fn path_for(&self, stem: &str, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{stem}.{suffix}"))
    }

    fn write_parquet(&self, path: &Path, df: &mut DataFrame) -> Result<()> {
        debug!(
            "Writing {} rows to {} (compression {:?}, row groups of {})",
            df.height(),
            path.display(),
            self.config.compression,
            self.config.row_group_size
        );

        let file = File::create(path)?;
        PolarsParquetWriter::new(file)
            .with_compression(self.config.compression.to_polars_compression())
            .with_statistics(self.config.statistics_options())
            .with_row_group_size(Some(self.config.row_group_size))
            .finish(df)
            .map_err(|e| StdfError::OutputFailed {
                path: path.to_path_buf(),
                reason: format!("Failed to write parquet: {}", e),
            })?;

        Ok(())
    }

    fn write_report(&self, path: &Path, source: &Path, result: &RunResult) -> Result<()> {
        let report = RunReport {
            source: source.display().to_string(),
            file_token: &result.file_token,
            metadata: &result.metadata,
            stats: &result.stats,
            new_device_mappings: &result.new_device_mappings,
            new_parameter_mappings: &result.new_parameter_mappings,
        };

        let content = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, content).map_err(|e| StdfError::OutputFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
