//! Override transformer
//!
//! Overwrites some fields with constant values.

use crate::etl::{Channel, Output, Transformer, single};
use crate::row::Row;

/// Transformer merging a fixed set of values into every row
///
/// Existing keys are overwritten in place, new keys are appended, all other
/// keys are left alone.
///
/// # Example
/// ```
/// use rowpipe::transform::Override;
/// use rowpipe::etl::Transformer;
/// use rowpipe::row;
///
/// let mut tag = Override::new(row! { "status" => "ok" });
/// let out = tag.transform_many(vec![row! { "status" => "pending", "id" => 7 }]).unwrap();
/// assert_eq!(out, vec![row! { "status" => "ok", "id" => 7 }]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Override {
    data: Row,
}

impl Override {
    pub fn new(data: Row) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &Row {
        &self.data
    }
}

impl Transformer for Override {
    fn name(&self) -> &str {
        "override"
    }

    fn transform(&mut self, mut row: Row, _channel: &Channel) -> Output<'_> {
        row.update(self.data.iter().map(|(k, v)| (k.clone(), v.clone())));
        single(row)
    }
}
