//! Cross-product assembly of measurement rows.
//!
//! Every device record is combined with every preprocessed test and every
//! value that test captured. Device identities are always resolved
//! sequentially in input order; only the row expansion itself may fan out
//! across a rayon pool, and the output keeps the sequential order either way.

use crate::constants::bin_fields::{HBIN_NAM, HBIN_NUM, SBIN_NAM, SBIN_NUM};
use crate::constants::device_fields::{HARD_BIN, PART_ID, PART_TXT, SOFT_BIN, X_COORD, Y_COORD};
use crate::constants::{DEFAULT_SEGMENT, PASS_BIN_CODE};
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::models::{DecodedRecord, DeviceInfo, Measurement, Metadata, ProcessedTest, RecordKind};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Pass flag for a bin code: only the exact text `"1"` passes
pub fn pass_flag(bin_code: &str) -> u8 {
    u8::from(bin_code == PASS_BIN_CODE)
}

/// Per-device attributes resolved before expansion
#[derive(Debug, Clone)]
struct ResolvedDevice {
    device_id: u32,
    label: Arc<str>,
    bin_code: String,
    soft_bin: bool,
    pass_flag: u8,
    pos_x: i32,
    pos_y: i32,
}

impl ResolvedDevice {
    fn resolve(record: &DecodedRecord, resolver: &mut IdentityResolver) -> Result<Self> {
        let label = record.field_or(PART_ID, PART_TXT);
        let soft_bin = record.field(SOFT_BIN).is_some();
        let bin_code = record.field_or(SOFT_BIN, HARD_BIN).to_string();
        let coordinate = |key| {
            record
                .field(key)
                .and_then(|value| value.trim().parse::<i32>().ok())
                .unwrap_or(0)
        };

        Ok(Self {
            device_id: resolver.resolve_device(label)?,
            label: Arc::from(label),
            pass_flag: pass_flag(&bin_code),
            bin_code,
            soft_bin,
            pos_x: coordinate(X_COORD),
            pos_y: coordinate(Y_COORD),
        })
    }

    fn expand_into(&self, tests: &[ProcessedTest], file_token: &Arc<str>, out: &mut Vec<Measurement>) {
        for test in tests {
            let pos_x = if test.pixel_x != 0 { test.pixel_x } else { self.pos_x };
            let pos_y = if test.pixel_y != 0 { test.pixel_y } else { self.pos_y };

            for &value in &test.values {
                out.push(Measurement {
                    device_id: self.device_id,
                    param_id: test.param_id,
                    pos_x,
                    pos_y,
                    value,
                    pass_flag: self.pass_flag,
                    segment: DEFAULT_SEGMENT,
                    file_token: Arc::clone(file_token),
                    device_label: Arc::clone(&self.label),
                    param_name: Arc::clone(&test.param_name),
                    units: Arc::clone(&test.units),
                    test_num: test.test_num,
                    test_flg: test.test_flg,
                });
            }
        }
    }
}

/// Bin number to bin name, per bin kind
#[derive(Debug, Default)]
struct BinNames {
    soft: HashMap<String, String>,
    hard: HashMap<String, String>,
}

impl BinNames {
    fn from_records(bins: &[&DecodedRecord]) -> Self {
        let mut names = Self::default();
        for record in bins {
            let (table, num_key, name_key) = match record.kind {
                RecordKind::Sbr => (&mut names.soft, SBIN_NUM, SBIN_NAM),
                RecordKind::Hbr => (&mut names.hard, HBIN_NUM, HBIN_NAM),
                _ => continue,
            };
            if let (Some(num), Some(name)) = (record.field(num_key), record.field(name_key)) {
                table.entry(num.to_string()).or_insert_with(|| name.to_string());
            }
        }
        names
    }

    fn describe(&self, device: &ResolvedDevice) -> String {
        let table = if device.soft_bin { &self.soft } else { &self.hard };
        table.get(&device.bin_code).cloned().unwrap_or_default()
    }
}

/// Output of one assembly pass
#[derive(Debug, Default)]
pub struct Assembly {
    pub measurements: Vec<Measurement>,
    pub devices: Vec<DeviceInfo>,
}

/// Combines device records with preprocessed tests
#[derive(Debug, Clone, Default)]
pub struct CrossProductAssembler {
    parallel: bool,
}

impl CrossProductAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand rows across the rayon pool
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn assemble(
        &self,
        device_records: &[&DecodedRecord],
        bin_records: &[&DecodedRecord],
        tests: &[ProcessedTest],
        file_token: &Arc<str>,
        metadata: &Arc<Metadata>,
        resolver: &mut IdentityResolver,
    ) -> Result<Assembly> {
        let resolved = device_records
            .iter()
            .map(|record| ResolvedDevice::resolve(record, resolver))
            .collect::<Result<Vec<_>>>()?;

        let expected = resolved.len() * tests.len();
        debug!(
            "Cross product: {} devices x {} tests (at least {} rows)",
            resolved.len(),
            tests.len(),
            expected
        );

        let measurements = if self.parallel {
            let chunks: Vec<Vec<Measurement>> = resolved
                .par_iter()
                .map(|device| {
                    let mut rows = Vec::with_capacity(tests.len());
                    device.expand_into(tests, file_token, &mut rows);
                    rows
                })
                .collect();

            let mut measurements = Vec::with_capacity(chunks.iter().map(Vec::len).sum());
            for chunk in chunks {
                measurements.extend(chunk);
            }
            measurements
        } else {
            let mut measurements = Vec::with_capacity(expected);
            for device in &resolved {
                device.expand_into(tests, file_token, &mut measurements);
            }
            measurements
        };

        let bin_names = BinNames::from_records(bin_records);
        let devices = resolved
            .iter()
            .map(|device| DeviceInfo {
                device_id: device.device_id,
                device_label: Arc::clone(&device.label),
                bin_code: device.bin_code.clone(),
                bin_desc: bin_names.describe(device),
                pass_flag: device.pass_flag,
                pos_x: device.pos_x,
                pos_y: device.pos_y,
                file_token: Arc::clone(file_token),
                metadata: Arc::clone(metadata),
            })
            .collect();

        Ok(Assembly {
            measurements,
            devices,
        })
    }
}
