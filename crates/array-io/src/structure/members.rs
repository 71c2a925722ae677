//! Structure schemas: members, byte offsets and record size.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::ReaderConfig;
use crate::error::{ArrayIoError, Result};
use crate::types::{ByteOrder, DataType};

/// Size of the heap index slot written in place of heap-stored members.
pub const HEAP_INDEX_SIZE: usize = 4;

/// One member of a structure layout.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureMember {
    name: String,
    data_type: DataType,
    shape: Vec<usize>,
    byte_offset: usize,
    length: usize,
    variable_length: bool,
    on_heap: bool,
    nested: Option<Arc<StructureLayout>>,
    byte_order: ByteOrder,
}

impl StructureMember {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Offset of this member within one record.
    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    /// Number of elements (product of the shape).
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn is_variable_length(&self) -> bool {
        self.variable_length
    }

    /// Check if the record slot holds a heap index rather than the values.
    pub fn is_on_heap(&self) -> bool {
        self.on_heap
    }

    /// Layout of the records of a structure or sequence member.
    pub fn nested(&self) -> Option<&Arc<StructureLayout>> {
        self.nested.as_ref()
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Bytes this member occupies in each record.
    pub fn storage_size_bytes(&self) -> usize {
        if self.on_heap {
            HEAP_INDEX_SIZE
        } else if let Some(nested) = &self.nested {
            nested.storage_size_bytes() * self.length
        } else {
            self.data_type.size() * self.length
        }
    }
}

/// Ordered members sharing one fixed record size.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureLayout {
    name: String,
    members: Vec<StructureMember>,
    storage_size_bytes: usize,
    structures_on_heap: bool,
}

impl StructureLayout {
    pub fn builder(name: impl Into<String>) -> StructureLayoutBuilder {
        StructureLayoutBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[StructureMember] {
        &self.members
    }

    /// Bytes per record.
    pub fn storage_size_bytes(&self) -> usize {
        self.storage_size_bytes
    }

    pub fn structures_on_heap(&self) -> bool {
        self.structures_on_heap
    }

    pub fn member(&self, name: &str) -> Option<&StructureMember> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Look up a member, failing with `UnknownMember`.
    pub fn find_member(&self, name: &str) -> Result<&StructureMember> {
        self.member(name)
            .ok_or_else(|| ArrayIoError::UnknownMember(name.to_string()))
    }

    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.name.as_str())
    }
}

#[derive(Debug, Clone)]
struct PendingMember {
    name: String,
    data_type: DataType,
    shape: Vec<usize>,
    variable_length: bool,
    nested: Option<Arc<StructureLayout>>,
}

/// Builds a [`StructureLayout`], assigning offsets by packing members in order.
#[derive(Debug, Clone)]
pub struct StructureLayoutBuilder {
    name: String,
    byte_order: ByteOrder,
    structures_on_heap: bool,
    members: Vec<PendingMember>,
}

impl StructureLayoutBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            byte_order: ByteOrder::default(),
            structures_on_heap: false,
            members: Vec::new(),
        }
    }

    /// Start from the configured byte order and structure placement.
    pub fn from_config(name: impl Into<String>, config: &ReaderConfig) -> Self {
        Self::new(name)
            .byte_order(config.byte_order)
            .structures_on_heap(config.structures_on_heap)
    }

    /// Byte order of every member.
    pub fn byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    /// Store structure members on the heap instead of inline.
    pub fn structures_on_heap(mut self, on_heap: bool) -> Self {
        self.structures_on_heap = on_heap;
        self
    }

    /// Add a fixed-shape member. Use an empty shape for a scalar.
    pub fn add_member(mut self, name: impl Into<String>, data_type: DataType, shape: &[usize]) -> Self {
        self.members.push(PendingMember {
            name: name.into(),
            data_type,
            shape: shape.to_vec(),
            variable_length: false,
            nested: None,
        });
        self
    }

    /// Add a variable-length member of `data_type` elements.
    pub fn add_vlen_member(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.members.push(PendingMember {
            name: name.into(),
            data_type,
            shape: Vec::new(),
            variable_length: true,
            nested: None,
        });
        self
    }

    /// Add a nested structure member with its own layout.
    pub fn add_structure_member(
        mut self,
        name: impl Into<String>,
        shape: &[usize],
        nested: Arc<StructureLayout>,
    ) -> Self {
        self.members.push(PendingMember {
            name: name.into(),
            data_type: DataType::Structure,
            shape: shape.to_vec(),
            variable_length: false,
            nested: Some(nested),
        });
        self
    }

    /// Add a sequence member: a variable number of `nested` records.
    pub fn add_sequence_member(mut self, name: impl Into<String>, nested: Arc<StructureLayout>) -> Self {
        self.members.push(PendingMember {
            name: name.into(),
            data_type: DataType::Sequence,
            shape: Vec::new(),
            variable_length: true,
            nested: Some(nested),
        });
        self
    }

    /// Assign offsets and validate the members.
    pub fn build(self) -> Result<Arc<StructureLayout>> {
        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(self.members.len());
        let mut offset = 0usize;

        for pending in self.members {
            if !seen.insert(pending.name.clone()) {
                return Err(ArrayIoError::DuplicateMember(pending.name));
            }
            let needs_nested = matches!(pending.data_type, DataType::Structure | DataType::Sequence);
            if needs_nested != pending.nested.is_some() {
                return Err(ArrayIoError::type_mismatch(
                    format!(
                        "{} member {}",
                        pending.data_type,
                        if needs_nested { "with nested layout" } else { "without nested layout" }
                    ),
                    pending.name,
                ));
            }

            let on_heap = pending.variable_length
                || matches!(
                    pending.data_type,
                    DataType::String | DataType::Opaque | DataType::Sequence
                )
                || (pending.data_type == DataType::Structure && self.structures_on_heap);

            let member = StructureMember {
                length: pending.shape.iter().product(),
                name: pending.name,
                data_type: pending.data_type,
                shape: pending.shape,
                byte_offset: offset,
                variable_length: pending.variable_length,
                on_heap,
                nested: pending.nested,
                byte_order: self.byte_order,
            };
            offset += member.storage_size_bytes();
            members.push(member);
        }

        Ok(Arc::new(StructureLayout {
            name: self.name,
            members,
            storage_size_bytes: offset,
            structures_on_heap: self.structures_on_heap,
        }))
    }
}
