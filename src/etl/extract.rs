//! Extractor trait for source nodes

use crate::row::Row;
use eyre::Result;

/// Lazy sequence of rows produced by a source
pub type Rows<'a> = Box<dyn Iterator<Item = Result<Row>> + 'a>;

/// Extractor trait for the source nodes of a pipeline
///
/// An extractor has no input channel. Every row it yields leaves on the main
/// channel. Rows are produced on demand: the pipeline pulls the next one only
/// after the previous row has travelled through the whole graph.
///
/// # Example
/// ```
/// use rowpipe::etl::{Extractor, Rows};
/// use rowpipe::row;
///
/// struct Counter(u32);
///
/// impl Extractor for Counter {
///     fn name(&self) -> &str {
///         "counter"
///     }
///
///     fn extract(&mut self) -> Rows<'_> {
///         let n = self.0;
///         Box::new((1..=n).map(|i| Ok(row! { "n" => i })))
///     }
/// }
///
/// let rows: Vec<_> = Counter(3).extract().collect::<eyre::Result<_>>().unwrap();
/// assert_eq!(rows.len(), 3);
/// ```
pub trait Extractor: Send {
    /// Name used in logs and routing errors
    fn name(&self) -> &str;

    /// Called once before the first row is pulled
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Produce the source rows
    ///
    /// # Errors
    /// Items are `Err` if extraction fails (network, I/O, parsing, etc.)
    fn extract(&mut self) -> Rows<'_>;

    /// Called once after the last row, or when the run aborts
    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory source yielding a fixed list of rows
pub struct RowsExtractor {
    name: String,
    rows: Vec<Row>,
}

impl RowsExtractor {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            name: "rows".to_string(),
            rows,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Extractor for RowsExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&mut self) -> Rows<'_> {
        Box::new(std::mem::take(&mut self.rows).into_iter().map(Ok))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_extractor_yields_in_order() {
        let mut source = RowsExtractor::new(vec![crate::row! { "n" => 1 }, crate::row! { "n" => 2 }]);
        let rows: Vec<Row> = source.extract().collect::<Result<_>>().unwrap();
        assert_eq!(rows, vec![crate::row! { "n" => 1 }, crate::row! { "n" => 2 }]);
    }
}
