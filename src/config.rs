//! Configuration management and validation.
//!
//! Provides the processing configuration (pixel filtering, parallel
//! assembly, decode concurrency) and the output configuration for Parquet
//! writing. Configuration can be loaded from a JSON file; CLI flags override
//! individual settings.

use crate::constants::PARQUET_ROW_GROUP_SIZE;
use crate::error::{Result, StdfError};
use polars::prelude::{ParquetCompression, StatisticsOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Supported compression algorithms for parquet files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    #[default]
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    None,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::None => ParquetCompression::Uncompressed,
        }
    }
}

/// Parquet output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Compression algorithm selection
    pub compression: CompressionAlgorithm,

    /// Rows per row group
    pub row_group_size: usize,

    /// Enable column statistics for query pruning
    pub statistics: bool,

    /// Also write the per-device table
    pub write_device_info: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            compression: CompressionAlgorithm::Snappy,
            row_group_size: PARQUET_ROW_GROUP_SIZE,
            statistics: true,
            write_device_info: true,
        }
    }
}

impl OutputConfig {
    pub fn statistics_options(&self) -> StatisticsOptions {
        if self.statistics {
            StatisticsOptions::full()
        } else {
            StatisticsOptions::empty()
        }
    }
}

/// Main configuration for STDF processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Only tests whose name carries a pixel token participate
    pub pixel_filtering: bool,

    /// Expand device rows across the rayon pool
    pub parallel_assembly: bool,

    /// Files decoded concurrently by the CLI
    pub decode_concurrency: usize,

    pub output: OutputConfig,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            pixel_filtering: true,
            parallel_assembly: false,
            decode_concurrency: num_cpus::get(),
            output: OutputConfig::default(),
        }
    }
}

impl ProcessorConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file; missing keys keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StdfError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: ProcessorConfig = serde_json::from_str(&content)?;
        debug!("Loaded configuration from {}: {:?}", path.display(), config);
        config.validate()?;
        Ok(config)
    }

    pub fn with_pixel_filtering(mut self, enabled: bool) -> Self {
        self.pixel_filtering = enabled;
        self
    }

    pub fn with_parallel_assembly(mut self, enabled: bool) -> Self {
        self.parallel_assembly = enabled;
        self
    }

    pub fn with_decode_concurrency(mut self, concurrency: usize) -> Self {
        self.decode_concurrency = concurrency;
        self
    }

    pub fn with_compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.output.compression = compression;
        self
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.output.row_group_size = size;
        self
    }

    pub fn with_device_info(mut self, enabled: bool) -> Self {
        self.output.write_device_info = enabled;
        self
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        if self.decode_concurrency == 0 {
            return Err(StdfError::configuration(
                "decode_concurrency must be greater than 0",
            ));
        }

        if self.output.row_group_size == 0 {
            return Err(StdfError::configuration(
                "row_group_size must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = ProcessorConfig::default();
        assert!(config.pixel_filtering);
        assert!(!config.parallel_assembly);
        assert!(config.decode_concurrency > 0);
        assert_eq!(config.output.compression, CompressionAlgorithm::Snappy);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = ProcessorConfig::new()
            .with_pixel_filtering(false)
            .with_parallel_assembly(true)
            .with_decode_concurrency(2)
            .with_compression(CompressionAlgorithm::Zstd)
            .with_row_group_size(1000)
            .with_device_info(false);

        assert!(!config.pixel_filtering);
        assert!(config.parallel_assembly);
        assert_eq!(config.decode_concurrency, 2);
        assert_eq!(config.output.compression, CompressionAlgorithm::Zstd);
        assert_eq!(config.output.row_group_size, 1000);
        assert!(!config.output.write_device_info);
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        assert!(ProcessorConfig::new().with_decode_concurrency(0).validate().is_err());
        assert!(ProcessorConfig::new().with_row_group_size(0).validate().is_err());
    }

    #[test]
    fn test_partial_json_file_keeps_defaults() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"{ "pixel_filtering": false, "output": { "compression": "lz4" } }"#,
        )
        .unwrap();

        let config = ProcessorConfig::from_json_file(file.path()).unwrap();
        assert!(!config.pixel_filtering);
        assert_eq!(config.output.compression, CompressionAlgorithm::Lz4);
        assert_eq!(config.output.row_group_size, PARQUET_ROW_GROUP_SIZE);
        assert!(config.output.statistics);
    }

    #[test]
    fn test_invalid_json_file_rejected() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{ "decode_concurrency": 0 }"#).unwrap();
        assert!(ProcessorConfig::from_json_file(file.path()).is_err());
    }
}
