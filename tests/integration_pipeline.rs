//! End-to-end tests from STDF bytes on disk to Parquet tables

use flate2::Compression;
use flate2::write::GzEncoder;
use polars::prelude::*;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use stdf_processor::processor::discovery::discover_inputs;
use stdf_processor::processor::writer::OutputWriter;
use stdf_processor::schema::{MEASUREMENT_FIELDS, column_names};
use stdf_processor::{
    Baseline, IdentityResolver, OutputConfig, ProcessingSession, ProcessorConfig, StdfProcessor,
};
use tempfile::TempDir;

fn record(typ: u8, sub: u8, body: &[u8]) -> Vec<u8> {
    let mut bytes = (body.len() as u16).to_le_bytes().to_vec();
    bytes.extend_from_slice(&[typ, sub]);
    bytes.extend_from_slice(body);
    bytes
}

fn cn(body: &mut Vec<u8>, text: &str) {
    body.push(text.len() as u8);
    body.extend_from_slice(text.as_bytes());
}

fn mir(lot: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0u32.to_le_bytes());
    body.extend_from_slice(&1_700_000_000u32.to_le_bytes());
    body.extend_from_slice(&[1, b'P', b' ', b' ', 0, 0, b' ']);
    for text in [lot, "SENSOR", "prober-2", "T", "flatfield", "v5", "W03", "CP1"] {
        cn(&mut body, text);
    }
    record(1, 10, &body)
}

fn ptr(test_num: u32, result: f32, text: &str) -> Vec<u8> {
    let mut body = test_num.to_le_bytes().to_vec();
    body.extend_from_slice(&[1, 0, 0, 0]);
    body.extend_from_slice(&result.to_le_bytes());
    cn(&mut body, text);
    cn(&mut body, "");
    body.extend_from_slice(&[0, 0, 0, 0]);
    body.extend_from_slice(&0f32.to_le_bytes());
    body.extend_from_slice(&0f32.to_le_bytes());
    cn(&mut body, "mV");
    record(15, 10, &body)
}

fn prr(part_id: &str, bin: u16) -> Vec<u8> {
    let mut body = vec![1, 0, 0];
    body.extend_from_slice(&1u16.to_le_bytes());
    body.extend_from_slice(&bin.to_le_bytes());
    body.extend_from_slice(&bin.to_le_bytes());
    body.extend_from_slice(&5i16.to_le_bytes());
    body.extend_from_slice(&6i16.to_le_bytes());
    body.extend_from_slice(&0u32.to_le_bytes());
    cn(&mut body, part_id);
    record(5, 20, &body)
}

/// A wafer where each listed device is measured by the same pixel tests
fn wafer(lot: &str, parts: &[(&str, u16)]) -> Vec<u8> {
    let mut bytes = record(0, 10, &[2, 4]);
    bytes.extend(mir(lot));
    for (part, bin) in parts {
        bytes.extend(record(5, 10, &[1, 0]));
        bytes.extend(ptr(1, 10.0, "Dark;Pixel=R1C1;mean"));
        bytes.extend(ptr(1, 11.0, "Dark;Pixel=R1C2;mean"));
        bytes.extend(ptr(2, 0.5, "Leak"));
        bytes.extend(prr(part, *bin));
    }
    bytes
}

fn write_plain(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn write_gz(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap();
    path
}

fn read_parquet(path: &Path) -> DataFrame {
    ParquetReader::new(File::open(path).unwrap())
        .finish()
        .unwrap()
}

#[test]
fn test_file_to_parquet() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_plain(
        temp_dir.path(),
        "w03.stdf",
        &wafer("LOTA", &[("1-1", 1), ("1-2", 3)]),
    );

    let mut processor = StdfProcessor::new(IdentityResolver::new()).unwrap();
    let result = processor.process_file(&input, Some("abc123")).unwrap();
    assert_eq!(result.measurements.len(), 2 * 4);

    let writer = OutputWriter::new(temp_dir.path().join("out"), OutputConfig::default());
    let written = writer.write_run(&input, &result).unwrap();

    let df = read_parquet(&written.measurements);
    assert_eq!(df.height(), 8);

    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let expected: Vec<String> = column_names(MEASUREMENT_FIELDS)
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(names, expected);

    let param_names = df
        .column("param_name")
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .clone();
    assert_eq!(param_names.get(0), Some("Dark;mean"));

    let devices = read_parquet(written.devices.as_ref().unwrap());
    assert_eq!(devices.height(), 2);
    let lots = devices
        .column("lot_name")
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .clone();
    assert_eq!(lots.get(1), Some("LOTA"));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&written.report).unwrap()).unwrap();
    assert_eq!(report["file_token"], "abc123");
    assert_eq!(report["stats"]["measurements"], 8);
    assert_eq!(report["new_parameter_mappings"][0][0], "Dark;mean");
}

#[test]
fn test_gzip_input_matches_plain() {
    let temp_dir = TempDir::new().unwrap();
    let bytes = wafer("LOTB", &[("7", 1)]);
    let plain = write_plain(temp_dir.path(), "b.stdf", &bytes);
    let gz = write_gz(temp_dir.path(), "b.stdf.gz", &bytes);

    let mut first = StdfProcessor::new(IdentityResolver::new()).unwrap();
    let mut second = StdfProcessor::new(IdentityResolver::new()).unwrap();
    let from_plain = first.process_file(&plain, Some("t")).unwrap();
    let from_gz = second.process_file(&gz, Some("t")).unwrap();

    assert!(from_gz.stats.decode_error.is_none());
    assert_eq!(from_plain.measurements, from_gz.measurements);
}

#[test]
fn test_baseline_round_trip_keeps_ids_stable() {
    let temp_dir = TempDir::new().unwrap();
    let baseline_path = temp_dir.path().join("ids.json");
    let first = write_plain(temp_dir.path(), "a.stdf", &wafer("L1", &[("A", 1), ("B", 1)]));
    let second = write_plain(temp_dir.path(), "b.stdf", &wafer("L2", &[("B", 2), ("C", 1)]));

    // First run: mint and persist
    let mut baseline = Baseline::load_or_default(&baseline_path).unwrap();
    assert!(baseline.is_empty());
    let mut processor =
        StdfProcessor::new(IdentityResolver::from_baseline(&baseline).unwrap()).unwrap();
    processor.process_file(&first, None).unwrap();
    let resolver = processor.into_resolver();
    baseline.extend(
        &resolver.new_device_mappings(),
        &resolver.new_parameter_mappings(),
    );
    baseline.save(&baseline_path).unwrap();

    // Second run in a fresh resolver seeded from disk
    let baseline = Baseline::load_or_default(&baseline_path).unwrap();
    let mut processor =
        StdfProcessor::new(IdentityResolver::from_baseline(&baseline).unwrap()).unwrap();
    let result = processor.process_file(&second, None).unwrap();

    assert_eq!(result.new_device_mappings, vec![("C".to_string(), 2)]);
    assert!(result.new_parameter_mappings.is_empty());
    let b_ids: Vec<u32> = result
        .devices
        .iter()
        .filter(|device| &*device.device_label == "B")
        .map(|device| device.device_id)
        .collect();
    assert_eq!(b_ids, vec![1]);
}

#[tokio::test]
async fn test_directory_session() {
    let temp_dir = TempDir::new().unwrap();
    let lots = temp_dir.path().join("lots");
    std::fs::create_dir_all(lots.join("nested")).unwrap();
    write_plain(&lots, "a.stdf", &wafer("L1", &[("A", 1)]));
    write_gz(&lots.join("nested"), "b.std.gz", &wafer("L2", &[("B", 1)]));
    write_plain(&lots, "readme.txt", b"not an stdf file");

    let inputs = discover_inputs(&[lots.display().to_string()]).unwrap();
    assert_eq!(inputs.len(), 2);

    let config = ProcessorConfig::default()
        .with_pixel_filtering(false)
        .with_parallel_assembly(true);
    let processor = StdfProcessor::new(IdentityResolver::new())
        .unwrap()
        .with_config(config.clone());
    let output_dir = temp_dir.path().join("out");
    let mut session = ProcessingSession::new(processor)
        .with_writer(OutputWriter::new(output_dir.clone(), config.output));

    let stats = session.run(&inputs, |_| {}).await.unwrap();

    // Pixel filtering off: three tests per device
    assert_eq!(stats.total_measurements, 3 + 3);
    assert_eq!(stats.new_devices, 2);
    assert!(output_dir.join("a.measurements.parquet").exists());
    assert!(output_dir.join("b.measurements.parquet").exists());
}
