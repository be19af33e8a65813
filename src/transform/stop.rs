//! Stop transformer
//!
//! Sink terminating a branch of the pipeline.

use crate::etl::{Channel, Output, Transformer, nothing};
use crate::row::Row;

/// Transformer that absorbs every row
///
/// Declares no output channel, so nothing downstream can be wired to it.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stop;

impl Transformer for Stop {
    fn name(&self) -> &str {
        "stop"
    }

    fn output_channels(&self) -> Vec<Channel> {
        Vec::new()
    }

    fn transform(&mut self, _row: Row, _channel: &Channel) -> Output<'_> {
        nothing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    #[test]
    fn test_absorbs_everything() {
        let rows = (0..10).map(|i| row! { "i" => i }).collect();
        assert!(Stop.transform_many(rows).unwrap().is_empty());
    }
}
