//! Command implementations for the STDF processor CLI
//!
//! Each command lives in its own module:
//! - `process`: decode STDF files and write Parquet measurement tables
//! - `inspect`: summarize the records and metadata of one file

pub mod inspect;
pub mod process;
pub mod shared;

use crate::cli::args::{Args, Commands};
use anyhow::{Result, bail};

/// Dispatch to the selected subcommand
pub async fn run(args: Args) -> Result<()> {
    match args.command {
        Some(Commands::Process(process_args)) => {
            process::run_process(process_args).await?;
            Ok(())
        }
        Some(Commands::Inspect(inspect_args)) => inspect::run_inspect(inspect_args).await,
        None => bail!("No command given"),
    }
}
