//! Common test fixtures for array-io tests.
//!
//! Instrumented sources and structure layouts shared by the test suites.

use std::io::{self, Write};
use std::sync::Arc;

use array_io::{ByteOrder, DataType, PositionedSource, StructureLayout};
use tempfile::NamedTempFile;

/// A source wrapper that counts every positioned read.
#[derive(Debug)]
pub struct CountingSource<S> {
    inner: S,
    reads: usize,
    bytes: usize,
    order_calls: usize,
}

impl<S: PositionedSource> CountingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reads: 0,
            bytes: 0,
            order_calls: 0,
        }
    }

    /// Number of `read_bytes` calls.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Total bytes requested.
    pub fn bytes_read(&self) -> usize {
        self.bytes
    }

    /// Number of times the byte order was set.
    pub fn order_calls(&self) -> usize {
        self.order_calls
    }

    /// Check that the source was never touched.
    pub fn assert_untouched(&self) {
        assert_eq!(self.reads, 0, "source was read {} times", self.reads);
        assert_eq!(self.order_calls, 0, "source byte order was set");
    }
}

impl<S: PositionedSource> PositionedSource for CountingSource<S> {
    fn order(&mut self, order: ByteOrder) {
        self.order_calls += 1;
        self.inner.order(order);
    }

    fn byte_order(&self) -> ByteOrder {
        self.inner.byte_order()
    }

    fn read_bytes(&mut self, pos: u64, dest: &mut [u8]) -> io::Result<()> {
        self.reads += 1;
        self.bytes += dest.len();
        self.inner.read_bytes(pos, dest)
    }
}

/// A source that succeeds for `ok_reads` reads, then fails every read.
#[derive(Debug)]
pub struct FailingSource<S> {
    inner: S,
    ok_reads: usize,
}

impl<S: PositionedSource> FailingSource<S> {
    pub fn new(inner: S, ok_reads: usize) -> Self {
        Self { inner, ok_reads }
    }
}

impl<S: PositionedSource> PositionedSource for FailingSource<S> {
    fn order(&mut self, order: ByteOrder) {
        self.inner.order(order);
    }

    fn byte_order(&self) -> ByteOrder {
        self.inner.byte_order()
    }

    fn read_bytes(&mut self, pos: u64, dest: &mut [u8]) -> io::Result<()> {
        if self.ok_reads == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "injected read failure"));
        }
        self.ok_reads -= 1;
        self.inner.read_bytes(pos, dest)
    }
}

/// Writes `bytes` to a new temporary file.
pub fn temp_file_with(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(bytes).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

/// Layout of a location record: `lat`, `lon` floats and a `tag` string.
pub fn location_layout() -> Arc<StructureLayout> {
    StructureLayout::builder("location")
        .add_member("lat", DataType::Float, &[])
        .add_member("lon", DataType::Float, &[])
        .add_member("tag", DataType::String, &[])
        .build()
        .expect("valid location layout")
}

/// Layout of an observation record.
///
/// ```text
/// id        int
/// names     string[2]        (heap)
/// values    short[3]
/// location  location          (inline)
/// ```
pub fn observation_layout() -> Arc<StructureLayout> {
    StructureLayout::builder("observation")
        .add_member("id", DataType::Int, &[])
        .add_member("names", DataType::String, &[2])
        .add_member("values", DataType::Short, &[3])
        .add_structure_member("location", &[], location_layout())
        .build()
        .expect("valid observation layout")
}

#[cfg(test)]
mod tests {
    use super::*;
    use array_io::BufferSource;

    #[test]
    fn test_counting_source() {
        let mut source = CountingSource::new(BufferSource::new(vec![1u8, 2, 3, 4]));
        source.assert_untouched();
        let mut buf = [0u8; 2];
        source.read_bytes(1, &mut buf).unwrap();
        assert_eq!(buf, [2, 3]);
        assert_eq!(source.reads(), 1);
        assert_eq!(source.bytes_read(), 2);
    }

    #[test]
    fn test_failing_source() {
        let mut source = FailingSource::new(BufferSource::new(vec![0u8; 8]), 1);
        let mut buf = [0u8; 2];
        assert!(source.read_bytes(0, &mut buf).is_ok());
        assert!(source.read_bytes(0, &mut buf).is_err());
    }

    #[test]
    fn test_observation_layout_size() {
        let layout = observation_layout();
        // id 4 + names index 4 + values 6 + location (4 + 4 + 4)
        assert_eq!(layout.storage_size_bytes(), 26);
    }

    #[test]
    fn test_temp_file_with() {
        let file = temp_file_with(b"abc");
        assert_eq!(std::fs::read(file.path()).unwrap(), b"abc");
    }
}
