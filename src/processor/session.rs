//! Multi-file processing sessions.
//!
//! Files are decoded concurrently on tokio's blocking pool, at most the
//! configured decode concurrency at a time via `buffered`, and then assembled strictly in input
//! order through the processor's single identity resolver. Identifiers are
//! therefore the same as for a sequential run over the same inputs.

use super::token::ContentTokenizer;
use super::writer::{OutputWriter, WrittenFiles, check_unique_stems};
use super::{DecodedFile, StdfProcessor, decode_file, sink::RunResult};
use crate::decoder::RecordDecoder;
use crate::error::{Result, StdfError};

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::task;
use tracing::{info, warn};

/// Statistics for a whole session
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub files_processed: usize,
    /// Files whose decoder reported an error
    pub files_failed: usize,
    pub total_measurements: usize,
    pub total_devices: usize,
    pub new_devices: usize,
    pub new_parameters: usize,
    pub processing_time_ms: u128,
}

/// One finished file
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: RunResult,
    pub written: Option<WrittenFiles>,
}

/// Decode one file on the blocking pool
async fn decode_blocking(
    decoder: Arc<dyn RecordDecoder>,
    tokenizer: Arc<dyn ContentTokenizer>,
    path: PathBuf,
    token_override: Option<String>,
) -> Result<DecodedFile> {
    let task_path = path.clone();
    task::spawn_blocking(move || {
        decode_file(
            decoder.as_ref(),
            tokenizer.as_ref(),
            &task_path,
            token_override.as_deref(),
        )
    })
    .await
    .map_err(|e| StdfError::Decode {
        path,
        reason: format!("decode task failed: {e}"),
    })
}

/// Processes several files through one processor
#[derive(Debug)]
pub struct ProcessingSession {
    processor: StdfProcessor,
    writer: Option<OutputWriter>,
    token_override: Option<String>,
}

impl ProcessingSession {
    pub fn new(processor: StdfProcessor) -> Self {
        Self {
            processor,
            writer: None,
            token_override: None,
        }
    }

    /// Write every run's outputs with this writer
    pub fn with_writer(mut self, writer: OutputWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Use a fixed content token instead of hashing each file
    pub fn with_token_override(mut self, token: Option<String>) -> Self {
        self.token_override = token;
        self
    }

    pub fn processor(&self) -> &StdfProcessor {
        &self.processor
    }

    pub fn into_processor(self) -> StdfProcessor {
        self.processor
    }

    /// Reject input sets whose runs would share a file token or output files
    pub fn check_inputs(&self, inputs: &[PathBuf]) -> Result<()> {
        if self.token_override.is_some() && inputs.len() > 1 {
            return Err(StdfError::configuration(format!(
                "a fixed file token applies to a single input, got {}",
                inputs.len()
            )));
        }
        if self.writer.is_some() {
            check_unique_stems(inputs)?;
        }
        Ok(())
    }

    /// Process all inputs; `on_file` sees each finished file in input order
    pub async fn run<F>(&mut self, inputs: &[PathBuf], mut on_file: F) -> Result<SessionStats>
    where
        F: FnMut(&FileOutcome),
    {
        let start = Instant::now();
        self.check_inputs(inputs)?;
        let concurrency = self.processor.config().decode_concurrency.max(1);
        let decoder = self.processor.decoder();
        let tokenizer = self.processor.tokenizer();
        let token_override = self.token_override.clone();

        info!(
            "Processing {} files with up to {} concurrent decoders",
            inputs.len(),
            concurrency
        );

        let mut decoded_files = pin!(stream::iter(inputs.iter().cloned())
            .map(|path| {
                decode_blocking(
                    Arc::clone(&decoder),
                    Arc::clone(&tokenizer),
                    path,
                    token_override.clone(),
                )
            })
            .buffered(concurrency));

        let mut stats = SessionStats::default();
        while let Some(decoded) = decoded_files.next().await {
            let outcome = self.assemble(decoded?)?;

            stats.files_processed += 1;
            if outcome.result.stats.is_decode_failure() {
                stats.files_failed += 1;
            }
            stats.total_measurements += outcome.result.measurements.len();
            stats.total_devices += outcome.result.devices.len();
            stats.new_devices += outcome.result.new_device_mappings.len();
            stats.new_parameters += outcome.result.new_parameter_mappings.len();

            on_file(&outcome);
        }

        stats.processing_time_ms = start.elapsed().as_millis();
        info!(
            "Session complete: {} files ({} failed), {} measurements in {}ms",
            stats.files_processed,
            stats.files_failed,
            stats.total_measurements,
            stats.processing_time_ms
        );
        Ok(stats)
    }

    fn assemble(&mut self, decoded: DecodedFile) -> Result<FileOutcome> {
        let path = decoded.path.clone();
        if let Some(error) = &decoded.outcome.error {
            warn!("{}: {}", path.display(), error);
        }

        let result = self.processor.process_decoded(decoded)?;
        let written = match &self.writer {
            Some(writer) => Some(writer.write_run(&path, &result)?),
            None => None,
        };

        Ok(FileOutcome {
            path,
            result,
            written,
        })
    }

    /// Process a single file synchronously through the session's processor
    pub fn process_one(&mut self, path: &Path) -> Result<FileOutcome> {
        let decoded = decode_file(
            self.processor.decoder().as_ref(),
            self.processor.tokenizer().as_ref(),
            path,
            self.token_override.as_deref(),
        );
        self.assemble(decoded)
    }
}
