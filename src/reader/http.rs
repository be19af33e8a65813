//! HTTP(S) reader

use super::Reader;
use crate::error::EtlError;
use eyre::Result;
use reqwest::blocking::Client;

/// Fetches a resource with a blocking HTTP GET
///
/// Non-2xx responses are fetch errors.
#[derive(Clone, Debug)]
pub struct HttpReader {
    client: Client,
    url: String,
}

impl HttpReader {
    /// Create a reader for `url`
    ///
    /// # Errors
    /// Returns a configuration error if the HTTP client cannot be built
    pub fn try_new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| EtlError::configuration(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Reader for HttpReader {
    fn read(&self) -> Result<Vec<u8>> {
        log::debug!("GET {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|err| EtlError::fetch(&self.url, err))?;
        let body = response
            .bytes()
            .map_err(|err| EtlError::fetch(&self.url, err))?;
        log::debug!("Fetched {} bytes from {}", body.len(), self.url);
        Ok(body.to_vec())
    }
}
