//! Main processing engine with modular architecture.
//!
//! Runs one input file through classification, metadata extraction, test
//! preprocessing and cross-product assembly, consulting the processor's
//! identity resolver. A processor can be reused across files so identifiers
//! stay stable for a whole session.

pub mod assembler;
pub mod classifier;
pub mod discovery;
pub mod metadata;
pub mod preprocess;
pub mod session;
pub mod sink;
pub mod token;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::{
    assembler::CrossProductAssembler,
    classifier::{ClassifiedRecords, count_by_kind},
    metadata::extract_metadata,
    preprocess::TestPreprocessor,
    sink::{RunResult, RunStats},
    token::{ContentTokenizer, Sha256Tokenizer},
};

use crate::config::ProcessorConfig;
use crate::decoder::{DecodeOutcome, RecordDecoder, StdfDecoder};
use crate::error::Result;
use crate::identity::{IdentityResolver, Mapping};
use crate::models::DecodedRecord;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A decoded file together with its content token
#[derive(Debug, Clone)]
pub struct DecodedFile {
    pub path: PathBuf,
    pub outcome: DecodeOutcome,
    pub file_token: String,
    pub decode_time: Duration,
}

/// Decode a file and compute its content token
///
/// A caller-supplied token replaces the computed one. Never fails: decoder
/// problems travel in the outcome, and a token that cannot be computed is
/// left empty.
pub fn decode_file(
    decoder: &dyn RecordDecoder,
    tokenizer: &dyn ContentTokenizer,
    path: &Path,
    token_override: Option<&str>,
) -> DecodedFile {
    let start = Instant::now();
    let outcome = decoder.decode(path);
    let decode_time = start.elapsed();

    let file_token = match token_override {
        Some(token) => token.to_string(),
        None => tokenizer.token(path).unwrap_or_else(|e| {
            warn!("Cannot compute content token for {}: {}", path.display(), e);
            String::new()
        }),
    };

    DecodedFile {
        path: path.to_path_buf(),
        outcome,
        file_token,
        decode_time,
    }
}

/// Mappings minted at or after a counter value, i.e. during one run
fn minted_since(mappings: Vec<Mapping>, first_id: u32) -> Vec<Mapping> {
    mappings
        .into_iter()
        .filter(|(_, id)| *id >= first_id)
        .collect()
}

/// Main processor turning decoded STDF records into measurement rows
#[derive(Debug)]
pub struct StdfProcessor {
    config: ProcessorConfig,
    decoder: Arc<dyn RecordDecoder>,
    tokenizer: Arc<dyn ContentTokenizer>,
    preprocessor: TestPreprocessor,
    assembler: CrossProductAssembler,
    resolver: IdentityResolver,
}

impl StdfProcessor {
    /// Create a processor with the default configuration around a resolver
    pub fn new(resolver: IdentityResolver) -> Result<Self> {
        let config = ProcessorConfig::default();
        config.validate()?;

        Ok(Self {
            preprocessor: TestPreprocessor::new(config.pixel_filtering)?,
            assembler: CrossProductAssembler::new().with_parallel(config.parallel_assembly),
            decoder: Arc::new(StdfDecoder::new()),
            tokenizer: Arc::new(Sha256Tokenizer),
            config,
            resolver,
        })
    }

    /// Configure the processor
    pub fn with_config(mut self, config: ProcessorConfig) -> Self {
        self.preprocessor = self
            .preprocessor
            .with_pixel_filtering(config.pixel_filtering);
        self.assembler = CrossProductAssembler::new().with_parallel(config.parallel_assembly);
        self.config = config;
        self
    }

    /// Replace the record decoder
    pub fn with_decoder(mut self, decoder: Arc<dyn RecordDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Replace the content tokenizer
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn ContentTokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn decoder(&self) -> Arc<dyn RecordDecoder> {
        Arc::clone(&self.decoder)
    }

    pub fn tokenizer(&self) -> Arc<dyn ContentTokenizer> {
        Arc::clone(&self.tokenizer)
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// Give back the resolver, e.g. to persist its new mappings
    pub fn into_resolver(self) -> IdentityResolver {
        self.resolver
    }

    /// Decode and process one file
    pub fn process_file(&mut self, path: &Path, token_override: Option<&str>) -> Result<RunResult> {
        let decoded = decode_file(
            self.decoder.as_ref(),
            self.tokenizer.as_ref(),
            path,
            token_override,
        );
        self.process_decoded(decoded)
    }

    /// Process a file decoded elsewhere
    pub fn process_decoded(&mut self, decoded: DecodedFile) -> Result<RunResult> {
        let mut stats = RunStats::new();
        stats.decode_ms = decoded.decode_time.as_millis() as u64;
        stats.decode_error = decoded.outcome.error;

        self.assemble_run(
            &decoded.outcome.records,
            Arc::from(decoded.file_token),
            stats,
        )
    }

    /// Process an already-decoded record sequence
    pub fn process_records(
        &mut self,
        records: &[DecodedRecord],
        file_token: &str,
    ) -> Result<RunResult> {
        self.assemble_run(records, Arc::from(file_token), RunStats::new())
    }

    fn assemble_run(
        &mut self,
        records: &[DecodedRecord],
        file_token: Arc<str>,
        mut stats: RunStats,
    ) -> Result<RunResult> {
        let start = Instant::now();
        let first_device_id = self.resolver.devices().next_id();
        let first_parameter_id = self.resolver.parameters().next_id();

        stats.total_records = records.len();
        stats.records_by_kind = count_by_kind(records);

        let classified = ClassifiedRecords::classify(records);
        stats.records_classified = classified.classified_count();
        stats.test_records = classified.tests.len();
        stats.devices = classified.devices.len();

        let metadata = Arc::new(extract_metadata(&classified.headers));
        let tests = self
            .preprocessor
            .preprocess(&classified.tests, &mut self.resolver)?;
        stats.tests_preprocessed = tests.len();

        let assembly = self.assembler.assemble(
            &classified.devices,
            &classified.bins,
            &tests,
            &file_token,
            &metadata,
            &mut self.resolver,
        )?;

        let new_device_mappings =
            minted_since(self.resolver.new_device_mappings(), first_device_id);
        let new_parameter_mappings =
            minted_since(self.resolver.new_parameter_mappings(), first_parameter_id);

        stats.measurements = assembly.measurements.len();
        stats.new_devices = new_device_mappings.len();
        stats.new_parameters = new_parameter_mappings.len();
        stats.assembly_ms = start.elapsed().as_millis() as u64;

        debug!("{}", stats.summary());

        Ok(RunResult {
            measurements: assembly.measurements,
            devices: assembly.devices,
            metadata,
            file_token,
            new_device_mappings,
            new_parameter_mappings,
            stats,
        })
    }
}
