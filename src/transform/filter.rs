//! Filter transformer
//!
//! Lets rows satisfying a predicate through. Rejected rows are dropped, or
//! sent to a dedicated channel.

use super::Condition;
use crate::etl::{Channel, Emit, Output, Transformer, nothing, single};
use crate::row::Row;
use std::sync::Arc;

/// Transformer keeping rows that satisfy a condition
///
/// # Example
/// ```
/// use rowpipe::transform::Filter;
/// use rowpipe::etl::Transformer;
/// use rowpipe::row;
///
/// let mut active = Filter::new(|row| row.find("active") == Some(&true.into()));
/// let out = active
///     .transform_many(vec![row! { "id" => 1, "active" => true }, row! { "id" => 2 }])
///     .unwrap();
/// assert_eq!(out, vec![row! { "id" => 1, "active" => true }]);
/// ```
#[derive(Clone)]
pub struct Filter {
    condition: Condition,
    reject: Option<Channel>,
}

impl Filter {
    pub fn new(condition: impl Fn(&Row) -> bool + Send + Sync + 'static) -> Self {
        Self::from_condition(Arc::new(condition))
    }

    pub fn from_condition(condition: Condition) -> Self {
        Self {
            condition,
            reject: None,
        }
    }

    /// Emit rejected rows on `channel` instead of dropping them
    pub fn reject_to(mut self, channel: impl Into<Channel>) -> Self {
        self.reject = Some(channel.into());
        self
    }
}

impl Transformer for Filter {
    fn name(&self) -> &str {
        "filter"
    }

    fn output_channels(&self) -> Vec<Channel> {
        let mut channels = vec![Channel::main()];
        channels.extend(self.reject.clone());
        channels
    }

    fn transform(&mut self, row: Row, _channel: &Channel) -> Output<'_> {
        if (self.condition)(&row) {
            return single(row);
        }
        match &self.reject {
            Some(channel) => Box::new(std::iter::once(Ok(Emit::new(row, channel.clone())))),
            None => nothing(),
        }
    }
}
