//! CLI helper functions

use crate::{
    config::PipelineConfig,
    etl::{Extractor, PipelineBuilder, RunSummary, StdoutLoader},
    extract::{CacheConfig, CachedFileExtract, ExtractConfig, FileExtract},
    row::Row,
    storage::NdjsonWriter,
    transform::{Log, LogConfig},
};
use eyre::{Context, Result};
use std::path::Path;

/// Run a YAML pipeline
///
/// Pipeline: nodes from the file → NdjsonWriter (with `output`) or stdout
pub fn run_pipeline(pipeline_file: impl AsRef<Path>, output: Option<&Path>) -> Result<RunSummary> {
    let pipeline_file = pipeline_file.as_ref();

    log::info!("Loading pipeline from {}", pipeline_file.display());
    let pipeline = PipelineConfig::load(pipeline_file)?
        .build()
        .with_context(|| format!("Invalid pipeline: {}", pipeline_file.display()))?;
    log::debug!("Execution order: {}", pipeline.node_names().join(" → "));

    match output {
        Some(path) => {
            log::info!("Writing rows to {}", path.display());
            pipeline.run(&mut NdjsonWriter::new(path))
        }
        None => pipeline.run(&mut StdoutLoader),
    }
}

/// Build a YAML pipeline without running it
///
/// Returns the node names in execution order.
pub fn check_pipeline(pipeline_file: impl AsRef<Path>) -> Result<Vec<String>> {
    let pipeline_file = pipeline_file.as_ref();

    let pipeline = PipelineConfig::load(pipeline_file)?
        .build()
        .with_context(|| format!("Invalid pipeline: {}", pipeline_file.display()))?;

    Ok(pipeline
        .node_names()
        .into_iter()
        .map(str::to_string)
        .collect())
}

/// Fetch one resource and display it
///
/// Pipeline: FileExtract (or CachedFileExtract) → Log
pub fn fetch_resource(uri: &str, field: &str, cache: Option<CacheConfig>) -> Result<Vec<Row>> {
    let config = ExtractConfig::new(uri).output_field(field);
    let source: Box<dyn Extractor> = match cache {
        Some(cache) => {
            log::info!(
                "Fetching {} through cache {} (ttl {}s)",
                uri,
                cache.path.display(),
                cache.ttl.as_secs()
            );
            Box::new(CachedFileExtract::new(config, cache))
        }
        None => {
            log::info!("Fetching {}", uri);
            Box::new(FileExtract::new(config))
        }
    };

    let mut builder = PipelineBuilder::new();
    let source = builder.add_boxed_source(source);
    let log = builder.add(Log::new(LogConfig::default()));
    builder.connect(source, log).output(log);

    builder
        .build()?
        .collect()
        .with_context(|| format!("Failed to fetch {uri}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_pipeline(dir: &TempDir, input: &Path, extra: &str) -> std::path::PathBuf {
        let path = dir.path().join("pipeline.yml");
        let yaml = format!(
            "nodes:\n  - {{ id: rows, type: ndjson, path: {} }}\n{extra}",
            input.display()
        );
        std::fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn test_run_pipeline_writes_ndjson() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.ndjson");
        std::fs::write(&input, "{\"id\":1,\"_raw\":\"x\"}\n{\"id\":2}\n").unwrap();
        let pipeline = write_pipeline(&dir, &input, "  - { id: clean, type: clean }\n");
        let output = dir.path().join("out.ndjson");

        let summary = run_pipeline(&pipeline, Some(&output)).unwrap();
        assert_eq!(summary.extracted, 2);
        assert_eq!(summary.loaded, 2);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "{\"id\":1}\n{\"id\":2}\n"
        );
    }

    #[test]
    fn test_check_pipeline_lists_nodes() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.ndjson");
        let pipeline = write_pipeline(&dir, &input, "  - { id: end, type: stop }\n");

        assert_eq!(check_pipeline(&pipeline).unwrap(), vec!["ndjson_reader", "stop"]);
    }

    #[test]
    fn test_check_pipeline_reports_routing_errors() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.ndjson");
        let pipeline = write_pipeline(
            &dir,
            &input,
            "  - { id: keep, type: filter, field: id, reject: dropped }\n",
        );

        let err = check_pipeline(&pipeline).unwrap_err();
        assert!(matches!(EtlError::of(&err), Some(EtlError::Routing(_))));
    }

    #[test]
    fn test_missing_pipeline_file() {
        let dir = TempDir::new().unwrap();
        assert!(check_pipeline(dir.path().join("absent.yml")).is_err());
    }

    #[test]
    fn test_fetch_local_file_through_cache() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("greeting.txt");
        std::fs::write(&source, "hello").unwrap();
        let cache = CacheConfig::new(dir.path().join("greeting.cache"), Duration::from_secs(60));

        let rows = fetch_resource(source.to_str().unwrap(), "_raw", Some(cache)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("_raw").unwrap(), "hello");
        assert_eq!(
            std::fs::read(dir.path().join("greeting.cache")).unwrap(),
            b"hello"
        );
    }

    #[test]
    fn test_fetch_missing_file_is_a_fetch_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.txt");
        let err = fetch_resource(missing.to_str().unwrap(), "_", None).unwrap_err();
        assert!(matches!(EtlError::of(&err), Some(EtlError::Fetch { .. })));
    }
}
