//! Reference transformers
//!
//! Small nodes exercising the full transformer contract:
//! - [`Log`]: pass-through with console output
//! - [`Stop`]: sink
//! - [`Override`]: merge constant values
//! - [`Clean`]: strip internal fields
//! - [`Filter`]: keep rows matching a condition

mod clean;
mod filter;
mod logger;
mod overrides;
mod stop;

pub use clean::Clean;
pub use filter::Filter;
pub use logger::{Log, LogConfig, Loggable};
pub use overrides::Override;
pub use stop::Stop;

use crate::row::Row;
use std::sync::Arc;

/// Shared predicate on a row
pub type Condition = Arc<dyn Fn(&Row) -> bool + Send + Sync>;
