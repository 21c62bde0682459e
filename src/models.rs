//! Core data structures and types for STDF processing.
//!
//! Defines decoded record kinds, the decoded record itself, per-file
//! metadata, preprocessed tests and the flat measurement rows produced
//! by the cross-product assembler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// STDF V4 record kinds, keyed by (REC_TYP, REC_SUB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordKind {
    Far,
    Atr,
    Mir,
    Mrr,
    Pcr,
    Hbr,
    Sbr,
    Pmr,
    Pgr,
    Plr,
    Rdr,
    Sdr,
    Wir,
    Wrr,
    Wcr,
    Pir,
    Prr,
    Tsr,
    Ptr,
    Mpr,
    Ftr,
    Bps,
    Eps,
    Gdr,
    Dtr,
    Unknown { rec_typ: u8, rec_sub: u8 },
}

impl RecordKind {
    /// Map a record header (type, subtype) pair onto a kind
    pub fn from_header(rec_typ: u8, rec_sub: u8) -> Self {
        match (rec_typ, rec_sub) {
            (0, 10) => RecordKind::Far,
            (0, 20) => RecordKind::Atr,
            (1, 10) => RecordKind::Mir,
            (1, 20) => RecordKind::Mrr,
            (1, 30) => RecordKind::Pcr,
            (1, 40) => RecordKind::Hbr,
            (1, 50) => RecordKind::Sbr,
            (1, 60) => RecordKind::Pmr,
            (1, 62) => RecordKind::Pgr,
            (1, 63) => RecordKind::Plr,
            (1, 70) => RecordKind::Rdr,
            (1, 80) => RecordKind::Sdr,
            (2, 10) => RecordKind::Wir,
            (2, 20) => RecordKind::Wrr,
            (2, 30) => RecordKind::Wcr,
            (5, 10) => RecordKind::Pir,
            (5, 20) => RecordKind::Prr,
            (10, 30) => RecordKind::Tsr,
            (15, 10) => RecordKind::Ptr,
            (15, 15) => RecordKind::Mpr,
            (15, 20) => RecordKind::Ftr,
            (20, 10) => RecordKind::Bps,
            (20, 20) => RecordKind::Eps,
            (50, 10) => RecordKind::Gdr,
            (50, 30) => RecordKind::Dtr,
            (rec_typ, rec_sub) => RecordKind::Unknown { rec_typ, rec_sub },
        }
    }

    /// Three-letter STDF mnemonic
    pub fn name(&self) -> &'static str {
        match self {
            RecordKind::Far => "FAR",
            RecordKind::Atr => "ATR",
            RecordKind::Mir => "MIR",
            RecordKind::Mrr => "MRR",
            RecordKind::Pcr => "PCR",
            RecordKind::Hbr => "HBR",
            RecordKind::Sbr => "SBR",
            RecordKind::Pmr => "PMR",
            RecordKind::Pgr => "PGR",
            RecordKind::Plr => "PLR",
            RecordKind::Rdr => "RDR",
            RecordKind::Sdr => "SDR",
            RecordKind::Wir => "WIR",
            RecordKind::Wrr => "WRR",
            RecordKind::Wcr => "WCR",
            RecordKind::Pir => "PIR",
            RecordKind::Prr => "PRR",
            RecordKind::Tsr => "TSR",
            RecordKind::Ptr => "PTR",
            RecordKind::Mpr => "MPR",
            RecordKind::Ftr => "FTR",
            RecordKind::Bps => "BPS",
            RecordKind::Eps => "EPS",
            RecordKind::Gdr => "GDR",
            RecordKind::Dtr => "DTR",
            RecordKind::Unknown { .. } => "UNKNOWN",
        }
    }

    /// Whether this kind carries per-test measurement values
    pub fn is_test_value(&self) -> bool {
        matches!(self, RecordKind::Ptr | RecordKind::Mpr | RecordKind::Ftr)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Unknown { rec_typ, rec_sub } => write!(f, "UNKNOWN({rec_typ},{rec_sub})"),
            kind => f.write_str(kind.name()),
        }
    }
}

/// A record as produced by the decoder
///
/// Every decoded field is available as text in `fields`; the handful of
/// scalars the engine reads on hot paths are also exposed typed.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    pub kind: RecordKind,
    pub fields: HashMap<String, String>,
    pub test_num: u32,
    pub head_num: u8,
    pub site_num: u8,
    /// Primary numeric result (PTR RESULT) when the record carries one
    pub result: Option<f64>,
    pub test_txt: String,
    pub alarm_id: String,
    pub units: String,
}

impl DecodedRecord {
    /// Create an empty record of the given kind
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            fields: HashMap::new(),
            test_num: 0,
            head_num: 0,
            site_num: 0,
            result: None,
            test_txt: String::new(),
            alarm_id: String::new(),
            units: String::new(),
        }
    }

    /// Add a text field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_test_num(mut self, test_num: u32) -> Self {
        self.test_num = test_num;
        self
    }

    pub fn with_result(mut self, result: f64) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_test_txt(mut self, test_txt: impl Into<String>) -> Self {
        self.test_txt = test_txt.into();
        self
    }

    pub fn with_alarm_id(mut self, alarm_id: impl Into<String>) -> Self {
        self.alarm_id = alarm_id.into();
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    /// Look up a field, treating an empty value as absent
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Primary field, else fallback field, else empty
    pub fn field_or(&self, primary: &str, fallback: &str) -> &str {
        self.field(primary)
            .or_else(|| self.field(fallback))
            .unwrap_or("")
    }
}

/// Lot, facility and equipment context of one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub facility: String,
    pub operation: String,
    pub lot_name: String,
    pub equipment: String,
    pub prog_name: String,
    pub prog_version: String,
    pub start_time: String,
}

impl Metadata {
    /// Interpret the start time as STDF epoch seconds
    pub fn start_time_utc(&self) -> Option<DateTime<Utc>> {
        let seconds = self.start_time.trim().parse::<i64>().ok()?;
        DateTime::from_timestamp(seconds, 0)
    }

    pub fn is_empty(&self) -> bool {
        *self == Metadata::default()
    }
}

/// A test-value record normalized once and shared by every device
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedTest {
    /// Parsed values, never empty
    pub values: Vec<f64>,
    pub param_name: Arc<str>,
    pub param_id: u32,
    pub units: Arc<str>,
    pub test_num: u32,
    pub test_flg: u8,
    pub pixel_x: i32,
    pub pixel_y: i32,
}

/// One output row: one device, one parameter, one captured value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub device_id: u32,
    pub param_id: u32,
    pub pos_x: i32,
    pub pos_y: i32,
    pub value: f64,
    pub pass_flag: u8,
    pub segment: u8,
    pub file_token: Arc<str>,
    pub device_label: Arc<str>,
    pub param_name: Arc<str>,
    pub units: Arc<str>,
    pub test_num: u32,
    pub test_flg: u8,
}

/// Per-device attributes, one row per device-result record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub device_id: u32,
    pub device_label: Arc<str>,
    pub bin_code: String,
    pub bin_desc: String,
    pub pass_flag: u8,
    pub pos_x: i32,
    pub pos_y: i32,
    pub file_token: Arc<str>,
    pub metadata: Arc<Metadata>,
}
