//! Chunked Array I/O Engine
//!
//! This crate turns requests for rectangular, possibly strided sections of
//! multidimensional variables into the minimal sequence of contiguous
//! positioned reads against a byte source. It provides:
//!
//! - **Sections**: ranges with start/length/stride, filled against a shape
//!   and composed with each other
//! - **Chunk planning**: maximal runs contiguous in both source and
//!   destination
//! - **Layouts**: chunks mapped to byte positions, regular or custom
//! - **Bulk reads**: typed, byte-order aware reads into flat arrays
//! - **Structured records**: fixed-size record buffers with a heap for
//!   strings, opaque blobs, variable-length members and sequences
//!
//! # Architecture
//!
//! ```text
//! Section request ("1:2,:,0:8:2")
//!      │
//!      ▼
//! Section::fill(shape) / SectionReader::resolve
//!      │
//!      ▼
//! ChunkIterator ──► Chunk { src_elem, dest_elem, nelems }
//!      │
//!      ▼
//! Layout + SrcPosition ──► LayoutChunk { src_pos, .. }
//!      │
//!      ▼
//! BulkReader::read(source, layout, type)
//!      │
//!      ├─► PositionedSource::order(byte_order)
//!      │
//!      └─► PositionedSource::read_*(src_pos, dest[dest_elem..])
//!               │
//!               ▼
//!          PrimitiveArray / StructureDataStorage
//! ```
//!
//! # Example
//!
//! ```ignore
//! use array_io::{read_data_fill, ByteOrder, DataType, FileSource, Layout, Section};
//!
//! let mut source = FileSource::open("data.bin")?;
//! let section: Section = "1:2,:,0:8:2".parse()?;
//! let layout = Layout::regular(var_start, 4, &[4, 5, 9], Some(&section))?;
//! let values = read_data_fill(&mut source, layout, DataType::Float, None, ByteOrder::BigEndian)?;
//! ```

pub mod chunker;
pub mod config;
pub mod error;
pub mod index;
pub mod layout;
pub mod reader;
pub mod section;
pub mod section_reader;
pub mod source;
pub mod structure;
pub mod types;

// Re-export commonly used types at crate root
pub use chunker::{Chunk, ChunkIterator};
pub use config::ReaderConfig;
pub use error::{ArrayIoError, Result};
pub use index::Odometer;
pub use layout::{Layout, LayoutChunk, LinearPosition, SrcPosition};
pub use reader::{read_data_fill, read_into, BulkReader, CancelTask, FillValue, PrimitiveArray};
pub use section::{Range, Section};
pub use section_reader::SectionReader;
pub use source::{BufferSource, FileSource, PositionedSource, SeekSource};
pub use structure::{
    HeapValue, MemberData, MemberValue, StructureDataStorage, StructureLayout,
    StructureLayoutBuilder, StructureMember, StructureRecord, StructureView,
};
pub use types::{ByteOrder, DataType, StorageKind};
