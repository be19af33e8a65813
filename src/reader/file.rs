//! Local filesystem reader

use super::Reader;
use crate::error::EtlError;
use eyre::Result;
use std::path::{Path, PathBuf};

/// Reads a local file as raw bytes
#[derive(Debug, Clone)]
pub struct FileReader {
    path: PathBuf,
}

impl FileReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Reader for FileReader {
    fn read(&self) -> Result<Vec<u8>> {
        log::debug!("Reading {}", self.path.display());
        std::fs::read(&self.path)
            .map_err(|err| EtlError::fetch(self.path.display().to_string(), err).into())
    }
}
