//! Error taxonomy for pipeline construction and execution
//!
//! Functions in this crate return [`eyre::Result`]. When the failure belongs to
//! one of the categories below, the report wraps an [`EtlError`] so callers can
//! tell them apart with `report.downcast_ref::<EtlError>()`.

use thiserror::Error;

/// Boxed source error carried by [`EtlError::Fetch`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum EtlError {
    /// A required setting was missing or invalid at first use
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The underlying reader failed to produce the resource content
    #[error("failed to fetch {uri}: {source}")]
    Fetch {
        uri: String,
        #[source]
        source: BoxError,
    },

    /// A channel has no wired destination, or the graph is malformed
    #[error("routing error: {0}")]
    Routing(String),

    /// A row was asked for a key it does not hold
    #[error("key not found in row: {0}")]
    KeyNotFound(String),
}

impl EtlError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn routing(message: impl Into<String>) -> Self {
        Self::Routing(message.into())
    }

    pub fn fetch(uri: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Fetch {
            uri: uri.into(),
            source: source.into(),
        }
    }

    /// Extract the taxonomy entry from a report, if it carries one
    pub fn of(report: &eyre::Report) -> Option<&EtlError> {
        report
            .downcast_ref::<EtlError>()
            .or_else(|| report.chain().find_map(|err| err.downcast_ref::<EtlError>()))
    }
}
