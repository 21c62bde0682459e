//! STDF V4 decoding into generic tagged records.
//!
//! The processing engine only ever sees [`DecodedRecord`] values; this module
//! is the default collaborator that produces them from `.stdf` / `.stdf.gz`
//! files. Any other decoder can be plugged in through [`RecordDecoder`].
//!
//! Stream-level failures (missing file, not an STDF stream, truncated
//! record, I/O error) never surface as `Err`: the outcome carries an empty
//! record list and the error text, so a run over a broken file completes
//! with zero rows.

pub mod reader;
pub mod records;

use crate::constants::GZIP_EXTENSION;
use crate::models::{DecodedRecord, RecordKind};
use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::fmt::Debug;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

/// Result of decoding one file
#[derive(Debug, Clone, Default)]
pub struct DecodeOutcome {
    pub records: Vec<DecodedRecord>,
    pub error: Option<String>,
}

impl DecodeOutcome {
    pub fn success(records: Vec<DecodedRecord>) -> Self {
        Self {
            records,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Source of decoded records for a file
pub trait RecordDecoder: Send + Sync + Debug {
    fn decode(&self, path: &Path) -> DecodeOutcome;
}

/// Default STDF V4 decoder
#[derive(Debug, Clone, Default)]
pub struct StdfDecoder;

impl StdfDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode an in-memory or streamed STDF byte source
    pub fn decode_stream<R: Read>(&self, reader: R) -> io::Result<Vec<DecodedRecord>> {
        StreamState::new(reader).run()
    }
}

impl RecordDecoder for StdfDecoder {
    fn decode(&self, path: &Path) -> DecodeOutcome {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Cannot open {}: {}", path.display(), e);
                return DecodeOutcome::failure(format!("cannot open {}: {}", path.display(), e));
            }
        };

        let is_gz = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(GZIP_EXTENSION));

        let result = if is_gz {
            self.decode_stream(BufReader::new(GzDecoder::new(file)))
        } else {
            self.decode_stream(BufReader::new(file))
        };

        match result {
            Ok(records) => {
                debug!("Decoded {} records from {}", records.len(), path.display());
                DecodeOutcome::success(records)
            }
            Err(e) => {
                warn!("Failed to decode {}: {}", path.display(), e);
                DecodeOutcome::failure(format!("{}: {}", path.display(), e))
            }
        }
    }
}

/// Test text and units from the first record of each test number
///
/// STDF writers may omit TEST_TXT and UNITS on later records of the same
/// test; these are restored from the first occurrence.
#[derive(Default)]
struct TestDefaults {
    by_test: HashMap<(RecordKind, u32), (String, String)>,
}

impl TestDefaults {
    fn apply(&mut self, record: &mut DecodedRecord) {
        let key = (record.kind, record.test_num);
        match self.by_test.get(&key) {
            Some((test_txt, units)) => {
                if record.test_txt.is_empty() && !test_txt.is_empty() {
                    record.test_txt = test_txt.clone();
                    record
                        .fields
                        .insert("TEST_TXT".to_string(), test_txt.clone());
                }
                if record.units.is_empty() && !units.is_empty() {
                    record.units = units.clone();
                    record.fields.insert("UNITS".to_string(), units.clone());
                }
            }
            None => {
                self.by_test
                    .insert(key, (record.test_txt.clone(), record.units.clone()));
            }
        }
    }
}

struct StreamState<R: Read> {
    reader: R,
    little_endian: bool,
    defaults: TestDefaults,
}

impl<R: Read> StreamState<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            little_endian: true,
            defaults: TestDefaults::default(),
        }
    }

    fn run(mut self) -> io::Result<Vec<DecodedRecord>> {
        let mut records = Vec::new();

        let far = self.read_far()?;
        records.push(far);

        let mut header = [0u8; 4];
        loop {
            match read_header(&mut self.reader, &mut header)? {
                HeaderRead::Eof => break,
                HeaderRead::Complete => {}
            }

            let rec_len = if self.little_endian {
                u16::from_le_bytes([header[0], header[1]])
            } else {
                u16::from_be_bytes([header[0], header[1]])
            };
            let kind = RecordKind::from_header(header[2], header[3]);

            let mut body = vec![0u8; rec_len as usize];
            self.reader.read_exact(&mut body).map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("truncated {} record after {} records", kind, records.len()),
                )
            })?;

            let mut record = records::decode_body(kind, &body, self.little_endian);
            if kind.is_test_value() {
                self.defaults.apply(&mut record);
            }
            records.push(record);
        }

        Ok(records)
    }

    /// Read the leading FAR and fix the stream byte order from CPU_TYPE
    fn read_far(&mut self) -> io::Result<DecodedRecord> {
        let mut header = [0u8; 4];
        self.reader.read_exact(&mut header).map_err(|e| {
            io::Error::new(e.kind(), "stream too short for a FAR record".to_string())
        })?;

        if RecordKind::from_header(header[2], header[3]) != RecordKind::Far {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "not an STDF stream: first record is ({}, {})",
                    header[2], header[3]
                ),
            ));
        }

        // FAR is always two bytes long; whichever byte order yields 2 is the file's
        let le_len = u16::from_le_bytes([header[0], header[1]]);
        let be_len = u16::from_be_bytes([header[0], header[1]]);
        let rec_len = if le_len == 2 || be_len != 2 { le_len } else { be_len };

        let mut body = vec![0u8; rec_len as usize];
        self.reader.read_exact(&mut body)?;

        let cpu_type = body.first().copied().unwrap_or(2);
        self.little_endian = cpu_type != 1;

        Ok(records::decode_body(RecordKind::Far, &body, self.little_endian))
    }
}

enum HeaderRead {
    Complete,
    Eof,
}

/// Read a 4-byte record header, distinguishing clean EOF from truncation
fn read_header<R: Read>(reader: &mut R, header: &mut [u8; 4]) -> io::Result<HeaderRead> {
    let mut filled = 0;
    while filled < header.len() {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(HeaderRead::Eof),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated record header",
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(HeaderRead::Complete)
}
