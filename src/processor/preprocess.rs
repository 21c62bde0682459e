//! Test preprocessing: participation, value parsing, name cleaning and
//! parameter identity.
//!
//! Runs once per test-value record, before and independent of the device
//! loop. Every regex is compiled once per preprocessor.

use crate::constants::test_fields::{RESULT, RTN_RSLT, TEST_FLG};
use crate::constants::{
    DEFAULT_TEST_VALUE, PIXEL_INFIX_PATTERN, PIXEL_MARKER, PIXEL_PREFIX_PATTERN,
    PIXEL_TOKEN_PATTERN,
};
use crate::error::{Result, StdfError};
use crate::identity::IdentityResolver;
use crate::models::{DecodedRecord, ProcessedTest};
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

/// Normalizes test-value records into [`ProcessedTest`]s
#[derive(Debug, Clone)]
pub struct TestPreprocessor {
    pixel_filtering: bool,
    pixel_token: Regex,
    pixel_infix: Regex,
    pixel_prefix: Regex,
}

impl TestPreprocessor {
    pub fn new(pixel_filtering: bool) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                StdfError::configuration(format!("invalid pixel pattern {pattern}: {e}"))
            })
        };

        Ok(Self {
            pixel_filtering,
            pixel_token: compile(PIXEL_TOKEN_PATTERN)?,
            pixel_infix: compile(PIXEL_INFIX_PATTERN)?,
            pixel_prefix: compile(PIXEL_PREFIX_PATTERN)?,
        })
    }

    pub fn with_pixel_filtering(mut self, enabled: bool) -> Self {
        self.pixel_filtering = enabled;
        self
    }

    pub fn pixel_filtering(&self) -> bool {
        self.pixel_filtering
    }

    /// Preprocess every participating test record, in input order
    ///
    /// Parameter names are resolved here, sequentially, so the parameter
    /// namespace has a single writer.
    pub fn preprocess(
        &self,
        tests: &[&DecodedRecord],
        resolver: &mut IdentityResolver,
    ) -> Result<Vec<ProcessedTest>> {
        let mut processed = Vec::with_capacity(tests.len());

        for record in tests {
            if self.pixel_filtering && !is_pixel_test(record) {
                continue;
            }
            processed.push(self.preprocess_one(record, resolver)?);
        }

        debug!(
            "Preprocessed {} of {} test records (pixel filtering {})",
            processed.len(),
            tests.len(),
            if self.pixel_filtering { "on" } else { "off" }
        );
        Ok(processed)
    }

    fn preprocess_one(
        &self,
        record: &DecodedRecord,
        resolver: &mut IdentityResolver,
    ) -> Result<ProcessedTest> {
        let source_name = source_param_name(record);
        let param_name = self.clean_param_name(source_name);
        let param_id = resolver.resolve_parameter(&param_name)?;
        let (pixel_x, pixel_y) = self.extract_pixel_coordinates(source_name);

        let test_flg = record
            .field(TEST_FLG)
            .and_then(|flag| flag.trim().parse::<u8>().ok())
            .unwrap_or(0);

        Ok(ProcessedTest {
            values: parse_test_values(record),
            param_name: Arc::from(param_name),
            param_id,
            units: Arc::from(record.units.as_str()),
            test_num: record.test_num,
            test_flg,
            pixel_x,
            pixel_y,
        })
    }

    /// Strip `;Pixel=R#C#` infixes and a leading `Pixel=R#C#;` prefix
    ///
    /// Applied until nothing changes, so the result is always clean.
    pub fn clean_param_name(&self, name: &str) -> String {
        let mut current = name.to_string();
        loop {
            let without_infix = self.pixel_infix.replace_all(&current, "");
            let cleaned = self.pixel_prefix.replace(&without_infix, "").into_owned();
            if cleaned == current {
                return current;
            }
            current = cleaned;
        }
    }

    /// First `Pixel=R<row>C<col>` token as `(x, y)` = `(col, row)`
    pub fn extract_pixel_coordinates(&self, text: &str) -> (i32, i32) {
        let Some(captures) = self.pixel_token.captures(text) else {
            return (0, 0);
        };

        let row = captures[1].parse::<i32>();
        let col = captures[2].parse::<i32>();
        match (col, row) {
            (Ok(x), Ok(y)) => (x, y),
            _ => (0, 0),
        }
    }
}

/// Label when present, else the free-text field
fn source_param_name(record: &DecodedRecord) -> &str {
    if record.alarm_id.is_empty() {
        &record.test_txt
    } else {
        &record.alarm_id
    }
}

/// Whether the label or free text carries a pixel location token
pub fn is_pixel_test(record: &DecodedRecord) -> bool {
    record.alarm_id.contains(PIXEL_MARKER) || record.test_txt.contains(PIXEL_MARKER)
}

/// Values captured by a test record, never empty
pub fn parse_test_values(record: &DecodedRecord) -> Vec<f64> {
    if let Some(value) = record.result.filter(|value| value.is_finite()) {
        return vec![value];
    }

    let candidate = record
        .field(RTN_RSLT)
        .or_else(|| record.field(RESULT))
        .or_else(|| Some(record.test_txt.as_str()).filter(|text| !text.is_empty()));

    match candidate {
        Some(text) => parse_value_text(text),
        None => vec![DEFAULT_TEST_VALUE],
    }
}

/// Comma lists drop unparseable tokens; single values fall back to 0.0
pub fn parse_value_text(text: &str) -> Vec<f64> {
    let values: Vec<f64> = if text.contains(',') {
        text.split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .filter_map(|token| token.parse::<f64>().ok())
            .collect()
    } else {
        text.trim().parse::<f64>().into_iter().collect()
    };

    if values.is_empty() {
        vec![DEFAULT_TEST_VALUE]
    } else {
        values
    }
}
