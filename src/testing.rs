//! Helpers for testing pipelines and transformers

use crate::row::Row;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Compare two row streams, ignoring internal (`_`-prefixed) fields
///
/// # Panics
/// Panics with both streams printed if they differ in length or content.
pub fn assert_stream_eq(left: impl IntoIterator<Item = Row>, right: impl IntoIterator<Item = Row>) {
    let left: Vec<Row> = left.into_iter().map(Row::without_internal_fields).collect();
    let right: Vec<Row> = right.into_iter().map(Row::without_internal_fields).collect();

    let show = |rows: &[Row]| {
        rows.iter()
            .map(Row::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    };

    assert_eq!(
        left.len(),
        right.len(),
        "streams differ in length\nleft:\n{}\nright:\n{}",
        show(&left),
        show(&right)
    );
    for (index, (l, r)) in left.iter().zip(&right).enumerate() {
        assert!(
            l.as_map() == r.as_map(),
            "rows differ at index {index}\nleft:  {l}\nright: {r}"
        );
    }
}

/// In-memory writer whose clones share one buffer
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        let bytes = match self.0.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self
            .0
            .lock()
            .map_err(|_| std::io::Error::other("shared buffer lock poisoned"))?;
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    #[test]
    fn test_streams_equal_modulo_internal_fields() {
        assert_stream_eq(
            vec![row! { "a" => 1, "_raw" => "x" }],
            vec![row! { "a" => 1 }],
        );
    }

    #[test]
    #[should_panic(expected = "differ in length")]
    fn test_length_mismatch_panics() {
        assert_stream_eq(vec![row! { "a" => 1 }], vec![]);
    }

    #[test]
    #[should_panic(expected = "differ at index 0")]
    fn test_content_mismatch_panics() {
        assert_stream_eq(vec![row! { "a" => 1 }], vec![row! { "a" => 2 }]);
    }

    #[test]
    fn test_shared_buffer_clones_share_content() {
        let buffer = SharedBuffer::new();
        let mut writer = buffer.clone();
        write!(writer, "hello").unwrap();
        assert_eq!(buffer.contents(), "hello");
    }
}
