//! Command-line argument definitions for the STDF processor
//!
//! Defines the CLI interface using the clap derive API.

use crate::config::CompressionAlgorithm;
use crate::error::{Result, StdfError};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the STDF measurement processor
///
/// Turns STDF V4 test files into flat measurement tables with stable
/// integer identifiers for devices and parameters.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stdf-processor",
    version,
    about = "Convert STDF semiconductor test data into Parquet measurement tables",
    long_about = "Decodes STDF V4 test files, assembles one measurement row per device, \
                  test and value, and writes the rows as Parquet. Device and parameter names \
                  are mapped to compact integer identifiers that stay stable across runs \
                  when a baseline file is used."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Process STDF files into Parquet measurement tables
    Process(ProcessArgs),
    /// Decode one STDF file and summarize its contents
    Inspect(InspectArgs),
}

/// Arguments for the process command
#[derive(Debug, Clone, Parser)]
pub struct ProcessArgs {
    /// STDF files, directories or glob patterns to process
    #[arg(value_name = "INPUT", required = true, num_args = 1..)]
    pub inputs: Vec<String>,

    /// Output directory for Parquet files and run reports
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        default_value = "stdf-output",
        help = "Output directory for generated files"
    )]
    pub output_path: PathBuf,

    /// Identity baseline to seed device and parameter identifiers
    ///
    /// Defaults to the baseline in the user data directory when
    /// `--save-baseline` is given without an explicit path.
    #[arg(long = "baseline", value_name = "FILE", help = "Identity baseline JSON file")]
    pub baseline: Option<PathBuf>,

    /// Append the identifiers minted by this run to the baseline
    #[arg(long = "save-baseline", help = "Persist newly minted identifiers")]
    pub save_baseline: bool,

    /// Use a fixed content token instead of hashing each input file
    #[arg(long = "file-token", value_name = "TOKEN", help = "Override the content token")]
    pub file_token: Option<String>,

    /// Keep every test record, not only pixel tests
    #[arg(long = "all-tests", help = "Disable pixel test filtering")]
    pub all_tests: bool,

    /// Assemble rows for different devices on the rayon pool
    #[arg(long = "parallel", help = "Assemble devices in parallel")]
    pub parallel: bool,

    /// Number of files decoded concurrently
    #[arg(
        short = 'j',
        long = "jobs",
        value_name = "N",
        help = "Files decoded concurrently (default: number of CPUs)"
    )]
    pub jobs: Option<usize>,

    /// Parquet compression algorithm
    #[arg(
        long = "compression",
        value_enum,
        value_name = "ALGORITHM",
        help = "Parquet compression algorithm"
    )]
    pub compression: Option<CompressionAlgorithm>,

    /// Skip the per-device Parquet table
    #[arg(long = "no-devices", help = "Do not write the device table")]
    pub no_devices: bool,

    /// Processor configuration file (JSON)
    #[arg(long = "config", value_name = "FILE", help = "Configuration file")]
    pub config_file: Option<PathBuf>,

    /// Increase logging verbosity
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Output format for the final summary
    #[arg(
        long = "output-format",
        value_enum,
        default_value = "human",
        help = "Output format for results"
    )]
    pub output_format: OutputFormat,
}

/// Arguments for the inspect command
#[derive(Debug, Clone, Parser)]
pub struct InspectArgs {
    /// STDF file to decode
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Also print the measurement table schema as SQL column definitions
    #[arg(long = "schema", help = "Print the output schema")]
    pub show_schema: bool,

    /// Enable verbose logging output
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Enable verbose logging (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,
}

/// Output format options for the final summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON format for scripting
    Json,
}

impl ProcessArgs {
    /// Validate the process command arguments for consistency
    pub fn validate(&self) -> Result<()> {
        if self.jobs == Some(0) {
            return Err(StdfError::configuration("--jobs must be at least 1"));
        }
        if self.output_path.is_file() {
            return Err(StdfError::configuration(format!(
                "Output path is a file: {}",
                self.output_path.display()
            )));
        }
        if let Some(token) = &self.file_token
            && token.trim().is_empty()
        {
            return Err(StdfError::configuration("--file-token must not be empty"));
        }
        Ok(())
    }

    /// Get the log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet && self.output_format == OutputFormat::Human
    }
}

impl InspectArgs {
    pub fn get_log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    fn process_args(argv: &[&str]) -> ProcessArgs {
        match parse(argv).command {
            Some(Commands::Process(args)) => args,
            other => panic!("expected process command, got {other:?}"),
        }
    }

    #[test]
    fn test_process_defaults() {
        let args = process_args(&["stdf-processor", "process", "lot1.stdf"]);

        assert_eq!(args.inputs, vec!["lot1.stdf".to_string()]);
        assert_eq!(args.output_path, PathBuf::from("stdf-output"));
        assert!(!args.all_tests);
        assert!(!args.save_baseline);
        assert!(args.compression.is_none());
        assert_eq!(args.get_log_level(), "warn");
        assert!(args.show_progress());
    }

    #[test]
    fn test_process_options() {
        let args = process_args(&[
            "stdf-processor",
            "process",
            "a.stdf",
            "lots/",
            "-o",
            "out",
            "--baseline",
            "ids.json",
            "--save-baseline",
            "--all-tests",
            "--compression",
            "zstd",
            "-j",
            "2",
            "-vv",
        ]);

        assert_eq!(args.inputs.len(), 2);
        assert_eq!(args.baseline, Some(PathBuf::from("ids.json")));
        assert!(args.save_baseline);
        assert!(args.all_tests);
        assert_eq!(args.compression, Some(CompressionAlgorithm::Zstd));
        assert_eq!(args.jobs, Some(2));
        assert_eq!(args.get_log_level(), "debug");
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Args::try_parse_from(["stdf-processor", "process", "a.stdf", "-q", "-v"]).is_err());

        let args = process_args(&["stdf-processor", "process", "a.stdf", "-q"]);
        assert_eq!(args.get_log_level(), "error");
        assert!(!args.show_progress());
    }

    #[test]
    fn test_process_requires_input() {
        assert!(Args::try_parse_from(["stdf-processor", "process"]).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_jobs_and_blank_token() {
        let args = process_args(&["stdf-processor", "process", "a.stdf", "-j", "0"]);
        assert!(args.validate().is_err());

        let args = process_args(&["stdf-processor", "process", "a.stdf", "--file-token", " "]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_inspect_args() {
        match parse(&["stdf-processor", "inspect", "lot.stdf", "--schema"]).command {
            Some(Commands::Inspect(args)) => {
                assert_eq!(args.input, PathBuf::from("lot.stdf"));
                assert!(args.show_schema);
                assert_eq!(args.get_log_level(), "warn");
            }
            other => panic!("expected inspect command, got {other:?}"),
        }
    }
}
