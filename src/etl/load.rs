//! Loader trait for rows leaving the pipeline

use super::Emit;
use crate::row::Row;
use eyre::Result;

/// Loader trait for the exposed outputs of a pipeline
///
/// Rows reach a loader only through channels exposed with
/// [`PipelineBuilder::output`](super::PipelineBuilder::output).
///
/// # Example
/// ```
/// use rowpipe::etl::{Emit, Loader};
/// use eyre::Result;
///
/// #[derive(Default)]
/// struct Count(usize);
///
/// impl Loader for Count {
///     fn load(&mut self, _emit: Emit) -> Result<()> {
///         self.0 += 1;
///         Ok(())
///     }
/// }
/// ```
pub trait Loader {
    /// Load one row
    ///
    /// # Errors
    /// Returns an error if loading fails (I/O, serialisation, etc.), which aborts the run
    fn load(&mut self, emit: Emit) -> Result<()>;

    /// Called once after the last row of a successful run
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Loader for Vec<Row> {
    fn load(&mut self, emit: Emit) -> Result<()> {
        self.push(emit.row);
        Ok(())
    }
}

impl Loader for Vec<Emit> {
    fn load(&mut self, emit: Emit) -> Result<()> {
        self.push(emit);
        Ok(())
    }
}

/// Loader that prints each row as a JSON line on stdout
#[derive(Debug, Default)]
pub struct StdoutLoader;

impl Loader for StdoutLoader {
    fn load(&mut self, emit: Emit) -> Result<()> {
        println!("{}", emit.row);
        Ok(())
    }
}

/// Loader that drops everything it receives
#[derive(Debug, Default)]
pub struct Discard;

impl Loader for Discard {
    fn load(&mut self, _emit: Emit) -> Result<()> {
        Ok(())
    }
}
