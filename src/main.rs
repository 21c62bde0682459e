use clap::Parser;
use std::process;
use stdf_processor::cli::{args::Args, commands};

fn main() {
    let args = Args::parse();

    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        tokio::select! {
            result = commands::run(args) => result,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nReceived CTRL+C, shutting down...");
                Err(anyhow::anyhow!("Processing interrupted by user"))
            }
        }
    });

    if let Err(error) = result {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("STDF Processor - semiconductor test data to Parquet");
    println!("===================================================");
    println!();
    println!("Decode STDF V4 test files into flat measurement tables with stable");
    println!("integer identifiers for devices and parameters.");
    println!();
    println!("USAGE:");
    println!("    stdf-processor <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    process     Process STDF files into Parquet measurement tables");
    println!("    inspect     Summarize the records and metadata of one STDF file");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("EXAMPLES:");
    println!("    # Process a directory of STDF files:");
    println!("    stdf-processor process lots/ --output parquet/");
    println!();
    println!("    # Keep identifiers stable across runs:");
    println!("    stdf-processor process 'lots/*.stdf.gz' --baseline ids.json --save-baseline");
    println!();
    println!("    # Look inside a file:");
    println!("    stdf-processor inspect lot1.stdf --schema");
    println!();
    println!("For detailed help on any command, use:");
    println!("    stdf-processor <COMMAND> --help");
}
