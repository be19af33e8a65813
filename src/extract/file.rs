//! Extract the content of a file or remote resource into a single row

use crate::error::EtlError;
use crate::etl::{Extractor, Rows};
use crate::reader::{Reader, reader_for_uri};
use crate::row::{Row, TOPIC_FIELD};
use eyre::Result;
use serde_json::Value;

/// Settings shared by file extractors
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractConfig {
    /// Local path or `http(s)://` / `ftp://` URI. Required before first use.
    pub uri: Option<String>,
    /// Field receiving the content. Defaults to the topic field (`_`).
    pub output_field: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            uri: None,
            output_field: TOPIC_FIELD.to_string(),
        }
    }
}

impl ExtractConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    pub fn output_field(mut self, field: impl Into<String>) -> Self {
        self.output_field = field.into();
        self
    }
}

/// Convert raw content to a row value
///
/// UTF-8 content becomes a string, anything else an array of byte values.
pub fn bytes_to_value(bytes: &[u8]) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(text) => Value::String(text.to_string()),
        Err(_) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

/// Source producing one row holding the whole content of a resource
///
/// The reader is resolved from the URI on first use and kept for the node's
/// lifetime. The content is fetched once and memoised.
///
/// # Example
/// ```
/// use rowpipe::etl::Extractor;
/// use rowpipe::extract::{ExtractConfig, FileExtract};
/// use rowpipe::row;
///
/// let mut extract = FileExtract::new(ExtractConfig::new("memory://greeting").output_field("_raw"))
///     .with_reader(|| -> eyre::Result<Vec<u8>> { Ok(b"hello".to_vec()) });
///
/// let rows: Vec<_> = extract.extract().collect::<eyre::Result<_>>().unwrap();
/// assert_eq!(rows[0].get("_raw").unwrap(), "hello");
/// ```
pub struct FileExtract {
    config: ExtractConfig,
    reader: Option<Box<dyn Reader>>,
    content: Option<Vec<u8>>,
}

impl FileExtract {
    pub fn new(config: ExtractConfig) -> Self {
        Self {
            config,
            reader: None,
            content: None,
        }
    }

    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self::new(ExtractConfig::new(uri))
    }

    /// Use `reader` instead of resolving one from the URI
    pub fn with_reader(mut self, reader: impl Reader + 'static) -> Self {
        self.reader = Some(Box::new(reader));
        self
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// The reader for the configured URI, resolved on first call
    ///
    /// # Errors
    /// Returns [`EtlError::Configuration`] if no URI is set
    pub fn reader(&mut self) -> Result<&dyn Reader> {
        let reader = match self.reader.take() {
            Some(reader) => reader,
            None => {
                let uri = self.config.uri.as_deref().ok_or_else(|| {
                    EtlError::configuration("No URI configured in file extract")
                })?;
                reader_for_uri(uri)?
            }
        };
        Ok(&**self.reader.insert(reader))
    }

    /// The resource content, fetched on first call
    ///
    /// # Errors
    /// Returns a configuration error without a URI, or a fetch error if the
    /// reader fails
    pub fn content(&mut self) -> Result<&[u8]> {
        let content = match self.content.take() {
            Some(content) => content,
            None => self.reader()?.read()?,
        };
        Ok(self.content.insert(content).as_slice())
    }
}

impl Extractor for FileExtract {
    fn name(&self) -> &str {
        "file_extract"
    }

    fn extract(&mut self) -> Rows<'_> {
        Box::new(std::iter::once_with(move || -> Result<Row> {
            let field = self.config.output_field.clone();
            let value = bytes_to_value(self.content()?);
            Ok(Row::new().with(field, value))
        }))
    }
}
