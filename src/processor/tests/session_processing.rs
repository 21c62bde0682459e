//! Multi-file session tests

use super::fixtures::{StdfBytes, two_device_file};
use crate::config::{OutputConfig, ProcessorConfig};
use crate::error::StdfError;
use crate::identity::IdentityResolver;
use crate::processor::StdfProcessor;
use crate::processor::session::ProcessingSession;
use crate::processor::writer::OutputWriter;
use polars::prelude::{ParquetReader, SerReader};
use std::fs::File;
use std::path::PathBuf;
use tempfile::TempDir;

/// Two lots sharing device D1 plus a third lot with a new device
fn create_lots(temp_dir: &TempDir) -> Vec<PathBuf> {
    let first = two_device_file("LOT1").write_to(temp_dir.path(), "lot1.stdf");
    let second = two_device_file("LOT2").write_to(temp_dir.path(), "lot2.stdf");

    let mut third = StdfBytes::new();
    third
        .mir("LOT3", "pixel_test")
        .pir()
        .ptr(200, 3.5, "Q;Pixel=R2C2", "A")
        .prr("D9", 1, 0, 0);
    let third = third.write_to(temp_dir.path(), "lot3.std");

    vec![first, second, third]
}

fn session(concurrency: usize) -> ProcessingSession {
    let config = ProcessorConfig::default().with_decode_concurrency(concurrency);
    let processor = StdfProcessor::new(IdentityResolver::new())
        .unwrap()
        .with_config(config);
    ProcessingSession::new(processor)
}

#[tokio::test]
async fn test_session_ids_stable_across_files() {
    let temp_dir = TempDir::new().unwrap();
    let inputs = create_lots(&temp_dir);

    let mut session = session(3);
    let mut seen = Vec::new();
    let stats = session
        .run(&inputs, |outcome| {
            seen.push((
                outcome.path.clone(),
                outcome.result.new_device_mappings.clone(),
                outcome.result.new_parameter_mappings.clone(),
            ))
        })
        .await
        .unwrap();

    assert_eq!(stats.files_processed, 3);
    assert_eq!(stats.files_failed, 0);
    assert_eq!(stats.total_measurements, 8 + 8 + 1);
    assert_eq!(stats.new_devices, 3);
    assert_eq!(stats.new_parameters, 2);

    let paths: Vec<PathBuf> = seen.iter().map(|(path, _, _)| path.clone()).collect();
    assert_eq!(paths, inputs);

    assert_eq!(
        seen[0].1,
        vec![("D1".to_string(), 0), ("D2".to_string(), 1)]
    );
    assert!(seen[1].1.is_empty());
    assert_eq!(seen[2].1, vec![("D9".to_string(), 2)]);
    assert_eq!(seen[2].2, vec![("Q".to_string(), 1)]);
}

#[tokio::test]
async fn test_concurrency_does_not_change_ids() {
    let temp_dir = TempDir::new().unwrap();
    let inputs = create_lots(&temp_dir);

    let mut sequential = session(1);
    sequential.run(&inputs, |_| {}).await.unwrap();
    let mut concurrent = session(4);
    concurrent.run(&inputs, |_| {}).await.unwrap();

    let sequential = sequential.into_processor().into_resolver();
    let concurrent = concurrent.into_processor().into_resolver();
    assert_eq!(
        sequential.new_device_mappings(),
        concurrent.new_device_mappings()
    );
    assert_eq!(
        sequential.new_parameter_mappings(),
        concurrent.new_parameter_mappings()
    );
}

#[tokio::test]
async fn test_session_writes_outputs() {
    let temp_dir = TempDir::new().unwrap();
    let inputs = create_lots(&temp_dir);
    let output_dir = temp_dir.path().join("out");

    let writer = OutputWriter::new(output_dir.clone(), OutputConfig::default());
    let mut session = session(2).with_writer(writer);

    let mut written = Vec::new();
    session
        .run(&inputs, |outcome| written.push(outcome.written.clone()))
        .await
        .unwrap();

    assert!(written.iter().all(|files| files.is_some()));
    assert!(output_dir.join("lot1.measurements.parquet").exists());
    assert!(output_dir.join("lot2.devices.parquet").exists());
    assert!(output_dir.join("lot3.run.json").exists());

    let df = ParquetReader::new(File::open(output_dir.join("lot3.measurements.parquet")).unwrap())
        .finish()
        .unwrap();
    assert_eq!(df.height(), 1);
}

#[tokio::test]
async fn test_failed_file_does_not_stop_session() {
    let temp_dir = TempDir::new().unwrap();
    let mut inputs = create_lots(&temp_dir);
    let broken = temp_dir.path().join("broken.stdf");
    std::fs::write(&broken, b"garbage").unwrap();
    inputs.insert(1, broken);

    let mut session = session(2);
    let stats = session.run(&inputs, |_| {}).await.unwrap();

    assert_eq!(stats.files_processed, 4);
    assert_eq!(stats.files_failed, 1);
    assert_eq!(stats.total_measurements, 17);
}

#[test]
fn test_process_one_uses_session_token_override() {
    let temp_dir = TempDir::new().unwrap();
    let inputs = create_lots(&temp_dir);

    let mut session = session(1).with_token_override(Some("run-7".to_string()));
    let outcome = session.process_one(&inputs[0]).unwrap();

    assert_eq!(&*outcome.result.file_token, "run-7");
    assert!(outcome.written.is_none());
}

#[tokio::test]
async fn test_fixed_token_rejected_for_several_inputs() {
    let temp_dir = TempDir::new().unwrap();
    let inputs = create_lots(&temp_dir);

    let mut session = session(2).with_token_override(Some("run-7".to_string()));
    let mut seen = 0;
    let result = session.run(&inputs, |_| seen += 1).await;

    assert!(matches!(result, Err(StdfError::Configuration { .. })));
    assert_eq!(seen, 0);
    assert!(session.processor().resolver().devices().is_empty());

    let stats = session.run(&inputs[..1], |_| seen += 1).await.unwrap();
    assert_eq!(stats.files_processed, 1);
    assert_eq!(seen, 1);
}

#[tokio::test]
async fn test_colliding_output_stems_rejected_before_writing() {
    let temp_dir = TempDir::new().unwrap();
    let lot_a = temp_dir.path().join("lotA");
    let lot_b = temp_dir.path().join("lotB");
    std::fs::create_dir_all(&lot_a).unwrap();
    std::fs::create_dir_all(&lot_b).unwrap();
    let inputs = vec![
        two_device_file("LOTA").write_to(&lot_a, "wafer1.stdf"),
        two_device_file("LOTB").write_to(&lot_b, "wafer1.stdf"),
    ];
    let output_dir = temp_dir.path().join("out");

    let writer = OutputWriter::new(output_dir.clone(), OutputConfig::default());
    let mut writing = session(2).with_writer(writer);
    let result = writing.run(&inputs, |_| {}).await;

    assert!(matches!(result, Err(StdfError::Configuration { .. })));
    assert!(!output_dir.join("wafer1.measurements.parquet").exists());

    // Without a writer nothing collides
    let mut unwritten = session(2);
    let stats = unwritten.run(&inputs, |_| {}).await.unwrap();
    assert_eq!(stats.files_processed, 2);
}
