//! Application constants for the STDF processor
//!
//! This module contains the field-name keys read from decoded records,
//! pixel-token patterns, identity defaults and output naming used
//! throughout the processor.

// =============================================================================
// Decoded Record Field Keys
// =============================================================================

/// Field keys of the header (MIR) record used for metadata extraction
pub mod header_fields {
    pub const FACIL_ID: &str = "FACIL_ID";
    pub const FLOOR_ID: &str = "FLOOR_ID";
    pub const OPER_NAM: &str = "OPER_NAM";
    pub const SPEC_NAM: &str = "SPEC_NAM";
    pub const LOT_ID: &str = "LOT_ID";
    pub const PART_TYP: &str = "PART_TYP";
    pub const NODE_NAM: &str = "NODE_NAM";
    pub const JOB_NAM: &str = "JOB_NAM";
    pub const JOB_REV: &str = "JOB_REV";
    pub const SBLOT_ID: &str = "SBLOT_ID";
    pub const START_T: &str = "START_T";
    pub const SETUP_T: &str = "SETUP_T";
}

/// Field keys of device-result (PRR) records
pub mod device_fields {
    pub const PART_ID: &str = "PART_ID";
    pub const PART_TXT: &str = "PART_TXT";
    pub const SOFT_BIN: &str = "SOFT_BIN";
    pub const HARD_BIN: &str = "HARD_BIN";
    pub const X_COORD: &str = "X_COORD";
    pub const Y_COORD: &str = "Y_COORD";
}

/// Field keys of test-value (PTR/MPR/FTR) records
pub mod test_fields {
    pub const TEST_FLG: &str = "TEST_FLG";
    pub const RTN_RSLT: &str = "RTN_RSLT";
    pub const RESULT: &str = "RESULT";
    pub const TEST_TXT: &str = "TEST_TXT";
    pub const ALARM_ID: &str = "ALARM_ID";
    pub const UNITS: &str = "UNITS";
}

/// Field keys of bin-summary (HBR/SBR) records
pub mod bin_fields {
    pub const HBIN_NUM: &str = "HBIN_NUM";
    pub const HBIN_NAM: &str = "HBIN_NAM";
    pub const SBIN_NUM: &str = "SBIN_NUM";
    pub const SBIN_NAM: &str = "SBIN_NAM";
}

// =============================================================================
// Pixel Tokens
// =============================================================================

/// Marker that identifies a pixel test in a label or free-text field
pub const PIXEL_MARKER: &str = "Pixel=";

/// Canonical pixel token with row and column capture groups
pub const PIXEL_TOKEN_PATTERN: &str = r"Pixel=R(\d+)C(\d+)";

/// Pixel token embedded after a `;` separator
pub const PIXEL_INFIX_PATTERN: &str = r";Pixel=R\d+C\d+";

/// Pixel token at the start of a name followed by a `;` separator
pub const PIXEL_PREFIX_PATTERN: &str = r"^Pixel=R\d+C\d+;";

// =============================================================================
// Measurement Defaults
// =============================================================================

/// Bin code that marks a passing device
pub const PASS_BIN_CODE: &str = "1";

/// Segment marker written on every measurement row
pub const DEFAULT_SEGMENT: u8 = 0;

/// Value list used when a test record carries no parseable result
pub const DEFAULT_TEST_VALUE: f64 = 0.0;

/// First identifier handed out by an empty identity namespace
pub const IDENTITY_START: u32 = 0;

// =============================================================================
// File and Directory Constants
// =============================================================================

/// File extensions recognised as STDF input during directory discovery
pub const STDF_EXTENSIONS: &[&str] = &["stdf", "std"];

/// Extension of gzip-compressed STDF input
pub const GZIP_EXTENSION: &str = "gz";

/// Suffix of the measurement Parquet output
pub const MEASUREMENTS_SUFFIX: &str = "measurements.parquet";

/// Suffix of the device-info Parquet output
pub const DEVICES_SUFFIX: &str = "devices.parquet";

/// Suffix of the per-file run report
pub const RUN_REPORT_SUFFIX: &str = "run.json";

/// Application directory under the user data dir
pub const APP_DATA_DIR: &str = "stdf-processor";

/// Default baseline filename inside the application data dir
pub const BASELINE_FILENAME: &str = "baseline.json";

// =============================================================================
// Parquet Writer Defaults
// =============================================================================

/// Default row group size for measurement output
pub const PARQUET_ROW_GROUP_SIZE: usize = 512 * 1024;
