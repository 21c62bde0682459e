//! Run results and statistics.

use crate::identity::Mapping;
use crate::models::{DeviceInfo, Measurement, Metadata};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Statistics for one processed file
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    /// Records returned by the decoder
    pub total_records: usize,
    /// Decoded record counts keyed by kind mnemonic
    pub records_by_kind: BTreeMap<String, usize>,
    /// Records that landed in a classifier view
    pub records_classified: usize,
    /// Test-value records seen
    pub test_records: usize,
    /// Test-value records that participated in the cross product
    pub tests_preprocessed: usize,
    /// Device-result records
    pub devices: usize,
    pub measurements: usize,
    pub new_devices: usize,
    pub new_parameters: usize,
    pub decode_ms: u64,
    pub assembly_ms: u64,
    /// Error reported by the decoder, if any
    pub decode_error: Option<String>,
    pub processed_at: DateTime<Utc>,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            total_records: 0,
            records_by_kind: BTreeMap::new(),
            records_classified: 0,
            test_records: 0,
            tests_preprocessed: 0,
            devices: 0,
            measurements: 0,
            new_devices: 0,
            new_parameters: 0,
            decode_ms: 0,
            assembly_ms: 0,
            decode_error: None,
            processed_at: Utc::now(),
        }
    }

    /// Share of test records that participated, as a percentage
    pub fn participation_rate(&self) -> f64 {
        if self.test_records == 0 {
            0.0
        } else {
            (self.tests_preprocessed as f64 / self.test_records as f64) * 100.0
        }
    }

    pub fn is_decode_failure(&self) -> bool {
        self.decode_error.is_some()
    }

    /// One-line description of the run
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Run Summary: {} records -> {} measurements | {} devices x {} tests \
             ({:.1}% of {} test records) | New ids: {} devices, {} parameters | \
             Decode: {}ms, Assembly: {}ms",
            self.total_records,
            self.measurements,
            self.devices,
            self.tests_preprocessed,
            self.participation_rate(),
            self.test_records,
            self.new_devices,
            self.new_parameters,
            self.decode_ms,
            self.assembly_ms
        );
        if let Some(error) = &self.decode_error {
            summary.push_str(&format!(" | Decode error: {error}"));
        }
        summary
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything one file run produces
#[derive(Debug, Clone)]
pub struct RunResult {
    pub measurements: Vec<Measurement>,
    pub devices: Vec<DeviceInfo>,
    pub metadata: Arc<Metadata>,
    pub file_token: Arc<str>,
    /// Device ids minted by this run, sorted by id
    pub new_device_mappings: Vec<Mapping>,
    /// Parameter ids minted by this run, sorted by id
    pub new_parameter_mappings: Vec<Mapping>,
    pub stats: RunStats,
}

impl RunResult {
    /// Empty result for a file that produced no records
    pub fn empty(file_token: Arc<str>, stats: RunStats) -> Self {
        Self {
            measurements: Vec::new(),
            devices: Vec::new(),
            metadata: Arc::new(Metadata::default()),
            file_token,
            new_device_mappings: Vec::new(),
            new_parameter_mappings: Vec::new(),
            stats,
        }
    }

    pub fn measurement_count(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty() && self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participation_rate() {
        let mut stats = RunStats::new();
        assert_eq!(stats.participation_rate(), 0.0);

        stats.test_records = 8;
        stats.tests_preprocessed = 2;
        assert_eq!(stats.participation_rate(), 25.0);
    }

    #[test]
    fn test_summary_mentions_decode_error() {
        let mut stats = RunStats::new();
        assert!(!stats.summary().contains("Decode error"));

        stats.decode_error = Some("truncated PRR record".to_string());
        assert!(stats.is_decode_failure());
        assert!(stats.summary().contains("Decode error: truncated PRR record"));
    }

    #[test]
    fn test_stats_serialize_to_json() {
        let mut stats = RunStats::new();
        stats.records_by_kind.insert("PTR".to_string(), 3);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["records_by_kind"]["PTR"], 3);
        assert!(json["decode_error"].is_null());
    }
}
