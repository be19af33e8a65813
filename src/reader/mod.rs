//! Readers: deferred operations returning the raw bytes of a resource
//!
//! A reader is built once per resource URI and invoked lazily. The scheme of
//! the URI picks the implementation:
//! - `http://`, `https://` → [`HttpReader`]
//! - `ftp://` → [`FtpReader`]
//! - anything else → [`FileReader`]
//!
//! Readers never retry. Wrap a reader in a closure to add retry policies;
//! any `Fn() -> Result<Vec<u8>>` is a reader too.

mod file;
mod ftp;
mod http;

pub use file::FileReader;
pub use ftp::FtpReader;
pub use http::HttpReader;

use eyre::Result;

/// Deferred, zero-argument fetch of a resource's raw bytes
pub trait Reader: Send + Sync {
    /// Fetch the full content
    ///
    /// # Errors
    /// Returns [`EtlError::Fetch`](crate::EtlError::Fetch) if the resource cannot be read
    fn read(&self) -> Result<Vec<u8>>;
}

impl<F> Reader for F
where
    F: Fn() -> Result<Vec<u8>> + Send + Sync,
{
    fn read(&self) -> Result<Vec<u8>> {
        self()
    }
}

/// Pick a reader for `uri` by its scheme
///
/// # Errors
/// Returns a configuration error if an HTTP client cannot be built or an FTP
/// URI cannot be parsed
pub fn reader_for_uri(uri: &str) -> Result<Box<dyn Reader>> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        log::debug!("Using HTTP reader for {uri}");
        Ok(Box::new(HttpReader::try_new(uri)?))
    } else if uri.starts_with("ftp://") {
        log::debug!("Using FTP reader for {uri}");
        Ok(Box::new(FtpReader::try_new(uri)?))
    } else {
        log::debug!("Using file reader for {uri}");
        Ok(Box::new(FileReader::new(uri)))
    }
}
