//! Core ETL abstractions: nodes, channels and the pipeline graph
//!
//! Rows flow from [`Extractor`] sources through [`Transformer`] nodes wired
//! together by named [`Channel`]s, and leave through a [`Loader`].

mod channel;
mod extract;
mod load;
mod pipeline;
mod transform;

pub use channel::{Channel, Emit};
pub use extract::{Extractor, Rows, RowsExtractor};
pub use load::{Discard, Loader, StdoutLoader};
pub use pipeline::{NodeId, Pipeline, PipelineBuilder, RunSummary};
pub use transform::{IdentityTransformer, Output, Transformer, nothing, single};
