//! File extract backed by a time-to-live file cache

use super::file::{ExtractConfig, FileExtract, bytes_to_value};
use crate::etl::{Extractor, Rows};
use crate::reader::Reader;
use crate::row::Row;
use eyre::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;

/// Location and lifetime of a cache file
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub path: PathBuf,
    pub ttl: Duration,
}

impl CacheConfig {
    pub fn new(path: impl AsRef<Path>, ttl: Duration) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ttl,
        }
    }
}

/// File extract whose content goes through an on-disk cache
///
/// The cache file is fresh while `now - mtime < ttl`. A missing or stale file
/// is refetched through the reader and rewritten before it is read back, so
/// the file on disk is always what the node serves. A failing refetch is an
/// error: stale content is never served.
///
/// Content read from a fresh file is memoised until the file goes stale.
pub struct CachedFileExtract {
    inner: FileExtract,
    cache: CacheConfig,
    content: Option<Vec<u8>>,
}

impl CachedFileExtract {
    pub fn new(config: ExtractConfig, cache: CacheConfig) -> Self {
        Self {
            inner: FileExtract::new(config),
            cache,
            content: None,
        }
    }

    /// Use `reader` instead of resolving one from the URI
    pub fn with_reader(mut self, reader: impl Reader + 'static) -> Self {
        self.inner = self.inner.with_reader(reader);
        self
    }

    pub fn cache(&self) -> &CacheConfig {
        &self.cache
    }

    /// Check whether the cache file exists and is younger than the TTL
    ///
    /// # Errors
    /// Returns an error if the file metadata cannot be read
    pub fn is_fresh(&self) -> Result<bool> {
        let metadata = match fs::metadata(&self.cache.path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Failed to stat cache file: {}", self.cache.path.display())
                });
            }
        };
        let modified = metadata.modified().with_context(|| {
            format!("Failed to read mtime of cache file: {}", self.cache.path.display())
        })?;
        // an mtime in the future counts as brand new
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        Ok(age < self.cache.ttl)
    }

    /// Fetch fresh bytes and atomically replace the cache file
    fn refresh(&mut self) -> Result<()> {
        let path = &self.cache.path;
        log::info!("Refreshing cache {}", path.display());
        let bytes = self.inner.reader()?.read()?;

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        temp.write_all(&bytes)
            .with_context(|| format!("Failed to write cache for {}", path.display()))?;
        // filesystem timestamps may lag the wall clock
        temp.as_file()
            .set_modified(SystemTime::now())
            .with_context(|| format!("Failed to stamp cache for {}", path.display()))?;
        temp.persist(path)
            .with_context(|| format!("Failed to write cache file: {}", path.display()))?;

        log::debug!("Cached {} bytes in {}", bytes.len(), path.display());
        Ok(())
    }

    /// The resource content, served from the cache file
    ///
    /// # Errors
    /// Returns an error if the refetch fails or the cache file cannot be
    /// written or read
    pub fn content(&mut self) -> Result<&[u8]> {
        if !self.is_fresh()? {
            self.content = None;
            self.refresh()?;
        }
        let content = match self.content.take() {
            Some(content) => content,
            None => fs::read(&self.cache.path).with_context(|| {
                format!("Failed to read cache file: {}", self.cache.path.display())
            })?,
        };
        Ok(self.content.insert(content).as_slice())
    }
}

impl Extractor for CachedFileExtract {
    fn name(&self) -> &str {
        "cached_file_extract"
    }

    fn extract(&mut self) -> Rows<'_> {
        Box::new(std::iter::once_with(move || -> Result<Row> {
            let field = self.inner.config().output_field.clone();
            let value = bytes_to_value(self.content()?);
            Ok(Row::new().with(field, value))
        }))
    }
}
