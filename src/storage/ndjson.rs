//! NDJSON (Newline Delimited JSON) file operations

use crate::etl::{Emit, Extractor, Loader, Rows};
use crate::row::Row;

use eyre::{Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Read rows from an NDJSON file, one JSON object per line
///
/// Blank lines are skipped. Lines are parsed as they are pulled, so a large
/// file is never held in memory at once.
pub struct NdjsonReader {
    path: PathBuf,
}

impl NdjsonReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all rows at once
    pub fn read(&self) -> Result<Vec<Row>> {
        self.rows().collect()
    }

    fn rows(&self) -> Rows<'_> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) => {
                let err = eyre::Report::new(err)
                    .wrap_err(format!("Failed to read NDJSON file: {}", self.path.display()));
                return Box::new(std::iter::once(Err(err)));
            }
        };

        Box::new(
            BufReader::new(file)
                .lines()
                .enumerate()
                .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
                .map(move |(index, line)| {
                    let line = line.with_context(|| {
                        format!("Failed to read NDJSON file: {}", self.path.display())
                    })?;
                    let value: Value = serde_json::from_str(&line).with_context(|| {
                        format!("Failed to parse JSON line {}: {}", index + 1, line)
                    })?;
                    Row::try_from(value).map_err(eyre::Report::from)
                }),
        )
    }
}

impl Extractor for NdjsonReader {
    fn name(&self) -> &str {
        "ndjson_reader"
    }

    fn extract(&mut self) -> Rows<'_> {
        log::debug!("Reading rows from {}", self.path.display());
        self.rows()
    }
}

/// Write rows to an NDJSON file, one line per row
///
/// As a [`Loader`] the writer truncates the file on the first row and flushes
/// in [`Loader::finish`]; a run that loads nothing leaves an empty file.
pub struct NdjsonWriter {
    path: PathBuf,
    file: Option<BufWriter<File>>,
}

impl NdjsonWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write rows as NDJSON, replacing the file
    pub fn write(&self, rows: &[Row]) -> Result<()> {
        let mut content = String::new();
        for row in rows {
            content.push_str(&serde_json::to_string(row)?);
            content.push('\n');
        }

        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write NDJSON file: {}", self.path.display()))?;

        Ok(())
    }

    fn file(&mut self) -> Result<&mut BufWriter<File>> {
        let file = match self.file.take() {
            Some(file) => file,
            None => {
                let file = File::create(&self.path).with_context(|| {
                    format!("Failed to create NDJSON file: {}", self.path.display())
                })?;
                BufWriter::new(file)
            }
        };
        Ok(self.file.insert(file))
    }
}

impl Loader for NdjsonWriter {
    fn load(&mut self, emit: Emit) -> Result<()> {
        let line = serde_json::to_string(&emit.row)?;
        let file = self.file()?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        // create the file even when nothing was loaded
        let file = self.file()?;
        file.flush()
            .with_context(|| format!("Failed to flush NDJSON file: {}", self.path.display()))?;
        self.file = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;
    use serde_json::json;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_write() {
        let temp = NamedTempFile::new().unwrap();
        let writer = NdjsonWriter::new(temp.path());

        let data = vec![row! { "a" => 1 }, row! { "b" => 2 }];
        writer.write(&data).unwrap();

        let reader = NdjsonReader::new(temp.path());
        let read_data = reader.read().unwrap();

        assert_eq!(data, read_data);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "{\"a\":1}\n\n   \n{\"a\":2}\n").unwrap();

        let rows = NdjsonReader::new(temp.path()).read().unwrap();
        assert_eq!(rows, vec![row! { "a" => 1 }, row! { "a" => 2 }]);
    }

    #[test]
    fn test_non_object_line_is_rejected() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[1, 2]\n").unwrap();

        assert!(NdjsonReader::new(temp.path()).read().is_err());
    }

    #[test]
    fn test_extract_stops_after_bad_line() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "{\"a\":1}\nnot json\n").unwrap();

        let mut reader = NdjsonReader::new(temp.path());
        let results: Vec<_> = reader.extract().collect();
        assert!(results[0].is_ok());
        let err = results[1].as_ref().unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut reader = NdjsonReader::new(dir.path().join("absent.ndjson"));
        let results: Vec<_> = reader.extract().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn test_loader_writes_one_line_per_row() {
        let temp = NamedTempFile::new().unwrap();
        let mut writer = NdjsonWriter::new(temp.path());

        writer.load(Emit::main(row! { "id" => 1, "name" => "a" })).unwrap();
        writer.load(Emit::main(row! { "id" => 2, "nested" => json!({"x": null}) })).unwrap();
        writer.finish().unwrap();

        let content = std::fs::read_to_string(temp.path()).unwrap();
        assert_eq!(
            content,
            "{\"id\":1,\"name\":\"a\"}\n{\"id\":2,\"nested\":{\"x\":null}}\n"
        );
    }

    #[test]
    fn test_loader_finish_without_rows_truncates() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "old\n").unwrap();

        let mut writer = NdjsonWriter::new(temp.path());
        writer.finish().unwrap();

        assert_eq!(std::fs::read_to_string(temp.path()).unwrap(), "");
    }
}
