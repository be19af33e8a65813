//! File storage for rows
//!
//! NDJSON files can feed a pipeline as a source node and receive its output
//! as a loader.

mod ndjson;

pub use ndjson::{NdjsonReader, NdjsonWriter};
