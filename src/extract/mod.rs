//! Source nodes reading whole resources into rows
//!
//! [`FileExtract`] reads a local file or remote resource once per run;
//! [`CachedFileExtract`] puts a TTL file cache in front of it.

mod cached;
mod file;

pub use cached::{CacheConfig, CachedFileExtract};
pub use file::{ExtractConfig, FileExtract, bytes_to_value};
