//! Transformer trait for pipeline nodes

use super::{Channel, Emit};
use crate::row::Row;
use eyre::Result;

/// Lazy sequence of tagged rows produced by a node
///
/// The iterator borrows the node, so nothing is produced until the consumer
/// pulls. Side effects (such as Log's console output) happen at pull time.
pub type Output<'a> = Box<dyn Iterator<Item = Result<Emit>> + 'a>;

/// Output producing nothing
pub fn nothing<'a>() -> Output<'a> {
    Box::new(std::iter::empty())
}

/// Output producing a single row on the main channel
pub fn single<'a>(row: Row) -> Output<'a> {
    Box::new(std::iter::once(Ok(Emit::main(row))))
}

/// Transformer trait for pipeline nodes
///
/// A node goes through `initialize → transform (per row) → finalize`.
/// Nodes keep state across a run (counters, buffers) but not across runs;
/// build a fresh instance to run again.
///
/// For each input row, `transform` may yield zero, one or many rows, each
/// tagged with an output channel. An `Err` item aborts the run; a node that
/// wants to skip a bad row simply yields nothing for it.
///
/// # Example
/// ```
/// use rowpipe::etl::{Channel, Emit, Output, Transformer};
/// use rowpipe::{Row, row};
///
/// struct Split;
///
/// impl Transformer for Split {
///     fn name(&self) -> &str {
///         "split"
///     }
///
///     fn transform(&mut self, row: Row, _channel: &Channel) -> Output<'_> {
///         let words: Vec<String> = row
///             .find("text")
///             .and_then(|v| v.as_str())
///             .map(|s| s.split_whitespace().map(String::from).collect())
///             .unwrap_or_default();
///         Box::new(words.into_iter().map(|w| Ok(Emit::main(row! { "word" => w }))))
///     }
/// }
///
/// let out = Split.transform_many(vec![row! { "text" => "a b c" }]).unwrap();
/// assert_eq!(out.len(), 3);
/// ```
pub trait Transformer: Send {
    /// Name used in logs and routing errors
    fn name(&self) -> &str;

    /// Input channels this node understands
    fn input_channels(&self) -> Vec<Channel> {
        vec![Channel::main()]
    }

    /// Output channels this node may emit on
    ///
    /// Every declared output must be wired when the pipeline is built.
    fn output_channels(&self) -> Vec<Channel> {
        vec![Channel::main()]
    }

    /// Called exactly once before the first row
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Transform a single row received on `channel`
    fn transform(&mut self, row: Row, channel: &Channel) -> Output<'_>;

    /// Called exactly once after the last row, may flush buffered rows
    fn finalize(&mut self) -> Output<'_> {
        nothing()
    }

    /// Feed rows on the main channel and collect every output row
    ///
    /// Does not call `initialize` or `finalize`.
    ///
    /// # Errors
    /// Returns the first error produced by `transform`
    fn transform_many(&mut self, rows: Vec<Row>) -> Result<Vec<Row>>
    where
        Self: Sized,
    {
        let main = Channel::main();
        let mut out = Vec::new();
        for row in rows {
            for emit in self.transform(row, &main) {
                out.push(emit?.row);
            }
        }
        Ok(out)
    }
}

/// Transformer that passes rows through unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTransformer;

impl IdentityTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for IdentityTransformer {
    fn name(&self) -> &str {
        "identity"
    }

    fn transform(&mut self, row: Row, _channel: &Channel) -> Output<'_> {
        single(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_transformer() {
        let input = vec![crate::row! { "a" => 1 }, crate::row! { "a" => 2 }];
        let output = IdentityTransformer::new()
            .transform_many(input.clone())
            .unwrap();
        assert_eq!(input, output);
    }

    #[test]
    fn test_transform_many_stops_at_first_error() {
        struct Failing;

        impl Transformer for Failing {
            fn name(&self) -> &str {
                "failing"
            }

            fn transform(&mut self, _row: Row, _channel: &Channel) -> Output<'_> {
                Box::new(std::iter::once(Err(eyre::eyre!("bad row"))))
            }
        }

        let err = Failing.transform_many(vec![Row::new()]).unwrap_err();
        assert_eq!(err.to_string(), "bad row");
    }
}
