use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use polars::prelude::*;

use etl_pipeline::{
    Controller, EtlError, Extractor, Loader, PipelineConfig, Stage, Table, Transformer,
};

const FIXTURES: &str = "tests/fixtures";

fn fixture(name: &str) -> String {
    format!("{FIXTURES}/{name}")
}

fn transformer() -> Transformer {
    let at = NaiveDate::from_ymd_opt(2025, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 5)
        .unwrap();
    Transformer::at(at)
}

fn config(source: impl AsRef<Path>, destination: impl AsRef<Path>) -> PipelineConfig {
    PipelineConfig::default()
        .source_path(source.as_ref())
        .destination_path(destination.as_ref())
        .log_file(None::<std::path::PathBuf>)
}

fn column_strings(table: &Table, name: &str) -> Vec<String> {
    let column = table.frame().column(name).unwrap();
    let text = column.as_materialized_series().cast(&DataType::String).unwrap();
    text.str()
        .unwrap()
        .into_no_null_iter()
        .map(|s| s.to_string())
        .collect()
}

#[test]
fn csv_scenario_drops_bob_and_numbers_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("processed.csv");

    let summary = Controller::new(&config(fixture("people.csv"), &out))
        .with_transformer(transformer())
        .run()
        .unwrap();
    assert_eq!(summary.records_extracted, 3);
    assert_eq!(summary.records_loaded, 2);

    let written = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(
        lines,
        vec![
            "name,age,city,id,etl_timestamp",
            "Alice,25,Mumbai,1,2025-01-02 03:04:05",
            "Charlie,30,Kolkata,2,2025-01-02 03:04:05",
        ]
    );
}

#[test]
fn json_source_to_csv_destination() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("people.csv");

    Controller::new(&config(fixture("people.json"), &out))
        .with_transformer(transformer())
        .run()
        .unwrap();

    let table = Extractor::new(&out).extract().unwrap();
    assert_eq!(table.height(), 2);
    assert_eq!(column_strings(&table, "name"), vec!["Alice", "Charlie"]);
    assert_eq!(column_strings(&table, "id"), vec!["1", "2"]);
}

#[test]
fn existing_id_column_is_kept() {
    let raw = Extractor::new(fixture("products.csv")).extract().unwrap();
    let out = transformer().transform(raw).unwrap();

    assert_eq!(out.column_names(), vec!["id", "product", "price", "etl_timestamp"]);
    assert_eq!(column_strings(&out, "id"), vec!["7", "11"]);
}

#[test]
fn output_reads_back_like_the_transformer_produced_it() {
    let dir = tempfile::tempdir().unwrap();
    let raw = Extractor::new(fixture("people.csv")).extract().unwrap();
    let transformed = transformer().transform(raw).unwrap();

    for name in ["out.csv", "out.json", "out.xlsx", "out.parquet"] {
        let path = dir.path().join(name);
        Loader::new(&path).load(&transformed).unwrap();
        let reread = Extractor::new(&path).extract().unwrap();

        let mut expected = transformed.column_names();
        let mut actual = reread.column_names();
        expected.sort();
        actual.sort();
        assert_eq!(actual, expected, "columns of {name}");
        for column in transformed.column_names() {
            assert_eq!(
                column_strings(&reread, &column),
                column_strings(&transformed, &column),
                "{column} in {name}"
            );
        }
    }
}

#[test]
fn unsupported_source_fails_in_extract_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("notes.txt");
    fs::write(&source, "Name\nAlice\n").unwrap();
    let out = dir.path().join("out.csv");

    let failure = Controller::new(&config(&source, &out)).run().unwrap_err();
    assert_eq!(failure.stage, Stage::Extract);
    assert!(matches!(failure.source, EtlError::UnsupportedFormat { .. }));
    assert!(!out.exists());
}

#[test]
fn unsupported_destination_fails_in_load_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("report/out.txt");

    let failure = Controller::new(&config(fixture("people.csv"), &out))
        .run()
        .unwrap_err();
    assert_eq!(failure.stage, Stage::Load);
    assert!(matches!(failure.source, EtlError::UnsupportedFormat { .. }));
    assert!(!out.exists());
    assert!(!dir.path().join("report").exists());
}

#[test]
fn missing_source_stops_before_transform_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested/out.csv");

    let failure = Controller::new(&config(dir.path().join("absent.csv"), &out))
        .run()
        .unwrap_err();
    assert_eq!(failure.stage, Stage::Extract);
    assert!(matches!(failure.source, EtlError::Extraction { .. }));
    // The loader would have created the parent directory.
    assert!(!dir.path().join("nested").exists());
}

#[test]
fn xls_destination_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("legacy.xls");

    let failure = Controller::new(&config(fixture("people.csv"), &out))
        .run()
        .unwrap_err();
    assert_eq!(failure.stage, Stage::Load);
    assert!(matches!(failure.source, EtlError::UnsupportedFormat { .. }));
    assert!(!out.exists());
}

#[test]
fn config_file_fixture_parses() {
    let cfg = PipelineConfig::from_file(Path::new(&fixture("etl.toml"))).unwrap();
    assert_eq!(cfg.source_path, Path::new("tests/fixtures/people.csv"));
    assert_eq!(cfg.destination_path, Path::new("out/people.json"));
    assert_eq!(cfg.log_file.as_deref(), Some(Path::new("logs/etl.log")));
}

#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLog {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

#[test]
fn failed_run_logs_stage_and_cause() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("absent.csv");
    let out = dir.path().join("out.csv");

    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();

    let failure = tracing::subscriber::with_default(subscriber, || {
        Controller::new(&config(&source, &out)).run().unwrap_err()
    });
    assert_eq!(failure.stage, Stage::Extract);

    let text = log.contents();
    assert!(text.contains("Starting ETL pipeline"), "{text}");
    assert!(
        text.contains("Error during extract: failed to extract"),
        "{text}"
    );
    assert!(text.contains("absent.csv: file not found"), "{text}");
    assert!(text.contains("ETL pipeline failed"), "{text}");
    assert!(!text.contains("Transforming data"), "{text}");
}
