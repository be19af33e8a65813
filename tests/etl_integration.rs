//! Integration tests for ETL pipeline functionality
//!
//! These tests demonstrate end-to-end workflows using the ETL framework
//! with real file I/O operations.

use eyre::Result;
use rowpipe::etl::{Channel, Discard, Emit, Extractor, Output, Pipeline, Rows, Transformer, single};
use rowpipe::extract::{CacheConfig, CachedFileExtract, ExtractConfig, FileExtract};
use rowpipe::storage::{NdjsonReader, NdjsonWriter};
use rowpipe::testing::{SharedBuffer, assert_stream_eq};
use rowpipe::transform::{Clean, Filter, Log, LogConfig, Override, Stop};
use rowpipe::{EtlError, PipelineConfig, Row, row};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Mock extractor that produces sample records
struct MockRecordsExtractor {
    rows: Vec<Row>,
}

impl MockRecordsExtractor {
    fn new() -> Self {
        Self {
            rows: vec![
                row! {
                    "type" => "dashboard",
                    "id" => "dashboard-1",
                    "title" => "My Dashboard",
                    "_fetched_at" => "2024-01-01T00:00:00Z",
                },
                row! {
                    "type" => "visualization",
                    "id" => "viz-1",
                    "title" => "My Visualization",
                    "_fetched_at" => "2024-01-01T00:00:00Z",
                },
                row! {
                    "type" => "search",
                    "id" => "search-1",
                    "columns" => json!(["field1", "field2"]),
                    "_fetched_at" => "2024-01-01T00:00:00Z",
                },
            ],
        }
    }
}

impl Extractor for MockRecordsExtractor {
    fn name(&self) -> &str {
        "mock_records"
    }

    fn extract(&mut self) -> Rows<'_> {
        Box::new(std::mem::take(&mut self.rows).into_iter().map(Ok))
    }
}

/// Transformer that drops specified fields from rows
struct FieldDropper {
    fields_to_drop: Vec<String>,
}

impl FieldDropper {
    fn new(fields: Vec<&str>) -> Self {
        Self {
            fields_to_drop: fields.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Transformer for FieldDropper {
    fn name(&self) -> &str {
        "field_dropper"
    }

    fn transform(&mut self, mut row: Row, _channel: &Channel) -> Output<'_> {
        for field in &self.fields_to_drop {
            row.remove(field);
        }
        single(row)
    }
}

/// Transformer buffering rows and releasing them, counted, at finalize
#[derive(Default)]
struct Counter {
    seen: Vec<Row>,
}

impl Transformer for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    fn transform(&mut self, row: Row, _channel: &Channel) -> Output<'_> {
        self.seen.push(row);
        rowpipe::etl::nothing()
    }

    fn finalize(&mut self) -> Output<'_> {
        let total = self.seen.len();
        Box::new(
            std::mem::take(&mut self.seen)
                .into_iter()
                .map(move |row| Ok(Emit::main(row.with("total", total)))),
        )
    }
}

fn static_reader(body: &'static [u8]) -> impl Fn() -> Result<Vec<u8>> + Send + Sync {
    move || Ok(body.to_vec())
}

#[test]
fn test_extract_to_clean_scenario() -> Result<()> {
    let config = ExtractConfig::new("https://example.com/data.json").output_field("_raw");

    let mut builder = Pipeline::builder();
    let extract =
        builder.add_source(FileExtract::new(config.clone()).with_reader(static_reader(b"hello")));
    builder.output(extract);
    let raw = builder.build()?.collect()?;
    assert_eq!(raw[0].as_map(), row! { "_raw" => "hello" }.as_map());

    let mut builder = Pipeline::builder();
    let extract = builder.add_source(FileExtract::new(config).with_reader(static_reader(b"hello")));
    let clean = builder.add(Clean);
    builder.connect(extract, clean).output(clean);
    let cleaned = builder.build()?.collect()?;
    assert_eq!(cleaned.len(), 1);
    assert!(cleaned[0].is_empty());

    Ok(())
}

#[test]
fn test_override_scenario() -> Result<()> {
    let mut builder = Pipeline::builder();
    let source = builder.add_source(rowpipe::etl::RowsExtractor::new(vec![
        row! { "status" => "pending", "id" => 7 },
    ]));
    let tag = builder.add(Override::new(row! { "status" => "ok", "extra" => true }));
    builder.connect(source, tag).output(tag);

    let rows = builder.build()?.collect()?;
    assert_eq!(rows[0].to_string(), r#"{"status":"ok","id":7,"extra":true}"#);
    Ok(())
}

#[test]
fn test_mock_pipeline_drops_fields_and_counts() -> Result<()> {
    let mut builder = Pipeline::builder();
    let source = builder.add_source(MockRecordsExtractor::new());
    let dropper = builder.add(FieldDropper::new(vec!["title"]));
    let counter = builder.add(Counter::default());
    let clean = builder.add(Clean);
    builder.chain(&[source, dropper, counter, clean]).output(clean);

    let rows = builder.build()?.collect()?;
    assert_stream_eq(
        rows,
        vec![
            row! { "type" => "dashboard", "id" => "dashboard-1", "total" => 3 },
            row! { "type" => "visualization", "id" => "viz-1", "total" => 3 },
            row! { "type" => "search", "id" => "search-1", "columns" => json!(["field1", "field2"]), "total" => 3 },
        ],
    );
    Ok(())
}

#[test]
fn test_stop_absorbs_everything_downstream() -> Result<()> {
    let mut builder = Pipeline::builder();
    let source = builder.add_source(MockRecordsExtractor::new());
    let stop = builder.add(Stop);
    builder.connect(source, stop);

    let summary = builder.build()?.run(&mut Discard)?;
    assert_eq!(summary.extracted, 3);
    assert_eq!(summary.loaded, 0);
    Ok(())
}

#[test]
fn test_stop_cannot_feed_another_node() {
    let mut builder = Pipeline::builder();
    let source = builder.add_source(MockRecordsExtractor::new());
    let stop = builder.add(Stop);
    let clean = builder.add(Clean);
    builder.chain(&[source, stop, clean]).output(clean);

    let err = builder.build().err().expect("stop declares no output");
    assert!(matches!(EtlError::of(&err), Some(EtlError::Routing(_))));
}

#[test]
fn test_log_passes_rows_through() -> Result<()> {
    let buffer = SharedBuffer::new();
    let mut builder = Pipeline::builder();
    let source = builder.add_source(MockRecordsExtractor::new());
    let log = builder.add(Log::new(LogConfig::default()).with_writer(buffer.clone()));
    builder.connect(source, log).output(log);

    let rows = builder.build()?.collect()?;
    assert_stream_eq(rows, MockRecordsExtractor::new().rows);

    let output = buffer.contents();
    assert!(output.contains("····{1}·"));
    assert!(output.contains("····{3}·"));
    assert!(output.contains("  id:str → «viz-1»"));
    assert!(output.contains("  columns:list → «[\"field1\",\"field2\"]»"));
    Ok(())
}

#[test]
fn test_filter_fan_out_with_reject_channel() -> Result<()> {
    let mut builder = Pipeline::builder();
    let source = builder.add_source(MockRecordsExtractor::new());
    let dashboards = builder.add(
        Filter::new(|row| row.find("type") == Some(&json!("dashboard"))).reject_to("other"),
    );
    let tag = builder.add(Override::new(row! { "kind" => "other" }));
    builder
        .connect(source, dashboards)
        .connect_channel(dashboards, "other", tag, Channel::main())
        .output(dashboards)
        .output(tag);

    let mut emitted: Vec<Emit> = Vec::new();
    builder.build()?.run(&mut emitted)?;

    let kinds: Vec<_> = emitted.iter().map(|e| e.row.get_or("kind", "dashboard")).collect();
    assert_eq!(kinds, vec![json!("dashboard"), json!("other"), json!("other")]);
    Ok(())
}

#[test]
fn test_ndjson_round_trip_through_pipeline() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("input.ndjson");
    let output = temp_dir.path().join("output.ndjson");

    NdjsonWriter::new(&input).write(&MockRecordsExtractor::new().rows)?;

    let mut builder = Pipeline::builder();
    let source = builder.add_source(NdjsonReader::new(&input));
    let clean = builder.add(Clean);
    builder.connect(source, clean).output(clean);

    let summary = builder.build()?.run(&mut NdjsonWriter::new(&output))?;
    assert_eq!(summary.loaded, 3);

    let written = NdjsonReader::new(&output).read()?;
    assert_stream_eq(written.clone(), MockRecordsExtractor::new().rows);
    assert!(written.iter().all(|row| !row.contains("_fetched_at")));
    Ok(())
}

#[test]
fn test_yaml_pipeline_end_to_end() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("input.ndjson");
    NdjsonWriter::new(&input).write(&MockRecordsExtractor::new().rows)?;

    let pipeline_file = temp_dir.path().join("pipeline.yml");
    fs::write(
        &pipeline_file,
        format!(
            r#"
nodes:
  - id: records
    type: ndjson
    path: {}
  - id: searches
    type: filter
    field: type
    equals: search
  - id: tag
    type: override
    data:
      reviewed: true
"#,
            input.display()
        ),
    )?;

    let rows = PipelineConfig::load(&pipeline_file)?.build()?.collect()?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("id")?, "search-1");
    assert_eq!(rows[0].get("reviewed")?, true);
    Ok(())
}

#[test]
fn test_cached_extract_across_runs() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let cache_path = temp_dir.path().join("data.cache");
    let fetches = Arc::new(AtomicUsize::new(0));

    let run = || -> Result<Vec<Row>> {
        let fetches = fetches.clone();
        let extract = CachedFileExtract::new(
            ExtractConfig::new("https://example.com/data.json"),
            CacheConfig::new(&cache_path, Duration::from_secs(60)),
        )
        .with_reader(move || -> Result<Vec<u8>> {
            fetches.fetch_add(1, Ordering::SeqCst);
            Ok(b"payload".to_vec())
        });

        let mut builder = Pipeline::builder();
        let source = builder.add_source(extract);
        builder.output(source);
        builder.build()?.collect()
    };

    let before = SystemTime::now() - Duration::from_secs(1);
    let first = run()?;
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert!(fs::metadata(&cache_path)?.modified()? >= before);

    // T+30s: still fresh
    fs::File::options()
        .write(true)
        .open(&cache_path)?
        .set_modified(SystemTime::now() - Duration::from_secs(30))?;
    let second = run()?;
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(first[0].as_map(), second[0].as_map());

    // T+90s: stale
    fs::File::options()
        .write(true)
        .open(&cache_path)?
        .set_modified(SystemTime::now() - Duration::from_secs(90))?;
    let refetched_at = SystemTime::now();
    run()?;
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
    assert!(fs::metadata(&cache_path)?.modified()? >= refetched_at);
    Ok(())
}

#[test]
fn test_failing_node_still_finalizes_pipeline() {
    let buffer = SharedBuffer::new();
    let mut builder = Pipeline::builder();
    let source = builder.add_source(
        FileExtract::new(ExtractConfig::new("https://example.com/missing.json")).with_reader(
            || -> Result<Vec<u8>> {
                Err(EtlError::fetch("https://example.com/missing.json", "404 Not Found").into())
            },
        ),
    );
    let log = builder.add(Log::new(LogConfig::default()).with_writer(buffer.clone()));
    builder.connect(source, log).output(log);

    let err = builder.build().unwrap().collect().unwrap_err();
    assert!(matches!(EtlError::of(&err), Some(EtlError::Fetch { .. })));
    assert!(buffer.contents().is_empty());
}
