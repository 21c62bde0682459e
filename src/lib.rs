//! STDF Processor Library
//!
//! A Rust library for turning STDF V4 semiconductor test files into flat
//! measurement tables.
//!
//! This library provides tools for:
//! - Decoding STDF records, including gzip-compressed files
//! - Classifying records and extracting lot and equipment metadata
//! - Normalizing test names and pixel coordinates
//! - Assigning stable integer identifiers to devices and parameters
//! - Expanding every device against every test into measurement rows
//! - Writing the rows as Parquet with a fixed column schema

pub mod config;
pub mod constants;
pub mod decoder;
pub mod error;
pub mod identity;
pub mod models;
pub mod processor;
pub mod schema;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::{CompressionAlgorithm, OutputConfig, ProcessorConfig};
pub use decoder::{DecodeOutcome, RecordDecoder, StdfDecoder};
pub use error::{Result, StdfError};
pub use identity::{Baseline, IdentityResolver, Mapping};
pub use models::{DecodedRecord, DeviceInfo, Measurement, Metadata, ProcessedTest, RecordKind};
pub use processor::StdfProcessor;
pub use processor::session::{ProcessingSession, SessionStats};
pub use processor::sink::{RunResult, RunStats};
