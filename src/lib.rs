//! Rowpipe
//!
//! A small dataflow ETL library: rows are extracted from files or remote
//! resources, routed between transforms over named channels, and loaded into
//! a sink.
//!
//! ```
//! use rowpipe::etl::{PipelineBuilder, RowsExtractor};
//! use rowpipe::transform::{Clean, Override};
//! use rowpipe::row;
//!
//! # fn main() -> eyre::Result<()> {
//! let mut builder = PipelineBuilder::new();
//! let rows = builder.add_source(RowsExtractor::new(vec![row! { "_raw" => "x", "id" => 1 }]));
//! let tag = builder.add(Override::new(row! { "status" => "ok" }));
//! let clean = builder.add(Clean);
//! builder.chain(&[rows, tag, clean]).output(clean);
//!
//! assert_eq!(builder.build()?.collect()?, vec![row! { "id" => 1, "status" => "ok" }]);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod etl;
pub mod extract;
pub mod reader;
pub mod row;
pub mod storage;
pub mod testing;
pub mod transform;

// Re-exports for convenience
pub use config::PipelineConfig;
pub use error::EtlError;
pub use etl::{Channel, Emit, Extractor, Loader, Pipeline, PipelineBuilder, Transformer};
pub use row::{FieldFilter, Row};
pub use storage::{NdjsonReader, NdjsonWriter};
