//! Structured (record) data.
//!
//! [`StructureLayout`] describes the members of a record type and their byte
//! offsets. [`StructureDataStorage`] holds a contiguous buffer of records plus
//! a heap for strings, opaque blobs, variable-length members and sequences.

pub mod members;
pub mod storage;

pub use members::{StructureLayout, StructureLayoutBuilder, StructureMember, HEAP_INDEX_SIZE};
pub use storage::{
    HeapValue, MemberData, MemberValue, StructureDataStorage, StructureRecord, StructureView,
};
