//! Clean transformer
//!
//! Removes internal fields (keys starting with `_`).

use crate::etl::{Channel, Output, Transformer, single};
use crate::row::Row;

/// Transformer stripping every internal field
#[derive(Debug, Default, Clone, Copy)]
pub struct Clean;

impl Transformer for Clean {
    fn name(&self) -> &str {
        "clean"
    }

    fn transform(&mut self, row: Row, _channel: &Channel) -> Output<'_> {
        single(row.without_internal_fields())
    }
}
