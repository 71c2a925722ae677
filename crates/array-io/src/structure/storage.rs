//! Record buffers with a side heap for variable-size member values.
//!
//! Each record is `storage_size_bytes` bytes of the layout. Fixed-size
//! members are encoded in place in the member's byte order. Heap-stored
//! members hold a 4-byte index into an append-only heap of [`HeapValue`]s.
//! Nested fixed-size structures are inline: reading one returns a
//! [`StructureView`] over the same buffer at the member's offset, sharing the
//! parent heap.

use std::sync::Arc;

use bytes::{Buf, BufMut};
use tracing::debug;

use super::members::{StructureLayout, StructureMember, HEAP_INDEX_SIZE};
use crate::error::{ArrayIoError, Result};
use crate::reader::PrimitiveArray;
use crate::types::{ByteOrder, DataType, StorageKind};

/// A variable-size value held on the storage heap.
#[derive(Debug, Clone, PartialEq)]
pub enum HeapValue {
    /// Opaque blob, or a numeric array.
    Primitive(PrimitiveArray),
    /// A string member's values.
    Strings(Vec<String>),
    /// Sequence records, or a structure member stored on the heap.
    Records(StructureDataStorage),
    /// Rows of a variable-length member.
    Vlen(Vec<PrimitiveArray>),
}

/// Data supplied when writing a member.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberData {
    Array(PrimitiveArray),
    Strings(Vec<String>),
    Vlen(Vec<PrimitiveArray>),
    Records(StructureDataStorage),
}

/// A member value read back from a record.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberValue<'a> {
    /// Fixed-size values decoded from the record buffer.
    Array(PrimitiveArray),
    Strings(&'a [String]),
    /// Opaque blob or single-row variable-length member.
    Primitive(&'a PrimitiveArray),
    Vlen(&'a [PrimitiveArray]),
    Records(&'a StructureDataStorage),
    /// Inline nested structure.
    Structure(StructureView<'a>),
}

impl MemberValue<'_> {
    /// Copy the value into data that can be written to another record.
    pub fn to_owned_data(&self) -> Result<MemberData> {
        Ok(match self {
            Self::Array(a) => MemberData::Array(a.clone()),
            Self::Strings(s) => MemberData::Strings(s.to_vec()),
            Self::Primitive(p) => MemberData::Array((*p).clone()),
            Self::Vlen(rows) => MemberData::Vlen(rows.to_vec()),
            Self::Records(r) => MemberData::Records((*r).clone()),
            Self::Structure(view) => MemberData::Records(view.to_storage()?),
        })
    }

    pub fn as_array(&self) -> Option<&PrimitiveArray> {
        match self {
            Self::Array(a) => Some(a),
            Self::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Self::Strings(s) => Some(*s),
            _ => None,
        }
    }
}

/// Records of one structure layout plus their heap.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureDataStorage {
    layout: Arc<StructureLayout>,
    buffer: Vec<u8>,
    nrecords: usize,
    heap: Vec<HeapValue>,
}

impl StructureDataStorage {
    /// Zeroed storage for `nrecords` records.
    pub fn new(layout: Arc<StructureLayout>, nrecords: usize) -> Self {
        let buffer = vec![0u8; layout.storage_size_bytes() * nrecords];
        debug!(
            layout = %layout.name(),
            nrecords,
            record_size = layout.storage_size_bytes(),
            "Created structure storage"
        );
        Self {
            layout,
            buffer,
            nrecords,
            heap: Vec::new(),
        }
    }

    /// Wrap raw record bytes, e.g. read from a file with [`DataType::Structure`].
    pub fn from_bytes(layout: Arc<StructureLayout>, buffer: Vec<u8>, nrecords: usize) -> Result<Self> {
        let expected = layout.storage_size_bytes() * nrecords;
        if buffer.len() < expected {
            return Err(ArrayIoError::MemberSize {
                member: layout.name().to_string(),
                expected,
                actual: buffer.len(),
            });
        }
        Ok(Self {
            layout,
            buffer,
            nrecords,
            heap: Vec::new(),
        })
    }

    /// Wrap an opaque array of records whose element size matches the layout.
    pub fn from_array(layout: Arc<StructureLayout>, array: PrimitiveArray) -> Result<Self> {
        match array {
            PrimitiveArray::Opaque { data, elem_size } if elem_size == layout.storage_size_bytes() => {
                let nrecords = data.len().checked_div(elem_size).unwrap_or(0);
                Self::from_bytes(layout, data, nrecords)
            }
            other => Err(ArrayIoError::type_mismatch(
                format!("{}-byte records", layout.storage_size_bytes()),
                format!("{:?}", other.kind()),
            )),
        }
    }

    pub fn layout(&self) -> &Arc<StructureLayout> {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.nrecords
    }

    pub fn is_empty(&self) -> bool {
        self.nrecords == 0
    }

    /// Bytes per record.
    pub fn structure_size(&self) -> usize {
        self.layout.storage_size_bytes()
    }

    pub fn heap_len(&self) -> usize {
        self.heap.len()
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Append a value to the heap and return its index.
    pub fn put_on_heap(&mut self, value: HeapValue) -> u32 {
        self.heap.push(value);
        (self.heap.len() - 1) as u32
    }

    pub fn heap_value(&self, index: u32) -> Option<&HeapValue> {
        self.heap.get(index as usize)
    }

    /// Write `data` into member `name` of record `recno`.
    pub fn set_member_data(&mut self, recno: usize, name: &str, data: MemberData) -> Result<()> {
        let layout = Arc::clone(&self.layout);
        let member = layout.find_member(name)?;
        self.check_recno(recno)?;
        let size = layout.storage_size_bytes();
        self.write_member(recno * size, member, data)
    }

    /// Write `data` into `member` of record `recno`.
    pub fn set_member(&mut self, recno: usize, member: &StructureMember, data: MemberData) -> Result<()> {
        self.set_member_data(recno, member.name(), data)
    }

    /// Read member `name` of record `recno`.
    pub fn member_data(&self, recno: usize, name: &str) -> Result<MemberValue<'_>> {
        self.record(recno)?.member_data(name)
    }

    pub fn view(&self) -> StructureView<'_> {
        StructureView {
            layout: &self.layout,
            buffer: &self.buffer,
            heap: &self.heap,
            base: 0,
            nrecords: self.nrecords,
        }
    }

    pub fn record(&self, recno: usize) -> Result<StructureRecord<'_>> {
        self.view().record(recno)
    }

    pub fn records(&self) -> impl Iterator<Item = StructureRecord<'_>> {
        self.view().records()
    }

    fn check_recno(&self, recno: usize) -> Result<()> {
        if recno >= self.nrecords {
            return Err(ArrayIoError::out_of_range(recno as i64, self.nrecords));
        }
        Ok(())
    }

    fn write_member(&mut self, record_pos: usize, member: &StructureMember, data: MemberData) -> Result<()> {
        let pos = record_pos + member.byte_offset();
        let end = pos + member.storage_size_bytes();
        if end > self.buffer.len() {
            return Err(ArrayIoError::out_of_range(end as i64, self.buffer.len()));
        }
        let encoded = encode_member(member, data)?;
        self.store(pos, member, encoded);
        Ok(())
    }

    fn store(&mut self, pos: usize, member: &StructureMember, encoded: EncodedMember) {
        match encoded {
            EncodedMember::Heap(value) => {
                let index = self.put_on_heap(value);
                let mut slot = &mut self.buffer[pos..pos + HEAP_INDEX_SIZE];
                match member.byte_order() {
                    ByteOrder::BigEndian => slot.put_u32(index),
                    ByteOrder::LittleEndian => slot.put_u32_le(index),
                }
            }
            EncodedMember::Fixed(array) => {
                let end = pos + member.storage_size_bytes();
                encode_array(&mut self.buffer[pos..end], &array, member.byte_order());
            }
            EncodedMember::Nested(rows) => {
                let Some(nested) = member.nested() else {
                    return;
                };
                let nested_size = nested.storage_size_bytes();
                for (recno, row) in rows.into_iter().enumerate() {
                    let record_pos = pos + recno * nested_size;
                    for (nested_member, value) in nested.members().iter().zip(row) {
                        self.store(record_pos + nested_member.byte_offset(), nested_member, value);
                    }
                }
            }
        }
    }
}

/// Member data checked against its member and ready to store.
#[derive(Debug)]
enum EncodedMember {
    Heap(HeapValue),
    Fixed(PrimitiveArray),
    /// One entry per nested record, in nested member order.
    Nested(Vec<Vec<EncodedMember>>),
}

/// Validate `data` for `member`, including every nested record, without writing.
fn encode_member(member: &StructureMember, data: MemberData) -> Result<EncodedMember> {
    if member.is_on_heap() {
        return heap_value_for(member, data).map(EncodedMember::Heap);
    }

    if let Some(nested) = member.nested() {
        let records = match data {
            MemberData::Records(records) => records,
            other => return Err(mismatch(member, &other)),
        };
        if records.len() != member.length() {
            return Err(ArrayIoError::MemberSize {
                member: member.name().to_string(),
                expected: member.length(),
                actual: records.len(),
            });
        }
        let rows = records
            .records()
            .map(|record| {
                nested
                    .members()
                    .iter()
                    .map(|nested_member| {
                        let value = record.member_data(nested_member.name())?.to_owned_data()?;
                        encode_member(nested_member, value)
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(EncodedMember::Nested(rows));
    }

    let array = match data {
        MemberData::Array(array) => array,
        other => return Err(mismatch(member, &other)),
    };
    if Some(array.kind()) != member.data_type().storage_kind() {
        return Err(mismatch(member, &MemberData::Array(array)));
    }
    if array.len() != member.length() {
        return Err(ArrayIoError::MemberSize {
            member: member.name().to_string(),
            expected: member.length(),
            actual: array.len(),
        });
    }
    Ok(EncodedMember::Fixed(array))
}

/// Records over a region of a buffer, resolving heap indices against `heap`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureView<'a> {
    layout: &'a Arc<StructureLayout>,
    buffer: &'a [u8],
    heap: &'a [HeapValue],
    base: usize,
    nrecords: usize,
}

impl<'a> StructureView<'a> {
    pub fn layout(&self) -> &'a Arc<StructureLayout> {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.nrecords
    }

    pub fn is_empty(&self) -> bool {
        self.nrecords == 0
    }

    pub fn record(&self, recno: usize) -> Result<StructureRecord<'a>> {
        if recno >= self.nrecords {
            return Err(ArrayIoError::out_of_range(recno as i64, self.nrecords));
        }
        Ok(StructureRecord { view: *self, recno })
    }

    pub fn records(&self) -> impl Iterator<Item = StructureRecord<'a>> {
        let view = *self;
        (0..view.nrecords).map(move |recno| StructureRecord { view, recno })
    }

    /// Copy these records, and the heap values they reference, into new storage.
    pub fn to_storage(&self) -> Result<StructureDataStorage> {
        let mut storage = StructureDataStorage::new(Arc::clone(self.layout), self.nrecords);
        for record in self.records() {
            for member in self.layout.members() {
                let value = record.member_value(member)?.to_owned_data()?;
                storage.set_member_data(record.recno(), member.name(), value)?;
            }
        }
        Ok(storage)
    }
}

/// One record of a [`StructureView`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureRecord<'a> {
    view: StructureView<'a>,
    recno: usize,
}

impl<'a> StructureRecord<'a> {
    pub fn recno(&self) -> usize {
        self.recno
    }

    pub fn layout(&self) -> &'a Arc<StructureLayout> {
        self.view.layout
    }

    /// Read member `name` of this record.
    pub fn member_data(&self, name: &str) -> Result<MemberValue<'a>> {
        let member = self.view.layout.find_member(name)?;
        self.member_value(member)
    }

    /// Read `member`, which must belong to this record's layout.
    pub fn member_value(&self, member: &'a StructureMember) -> Result<MemberValue<'a>> {
        let layout: &'a StructureLayout = self.view.layout;
        let member = match layout.member(member.name()) {
            Some(found)
                if std::ptr::eq(found, member)
                    || (found.byte_offset() == member.byte_offset()
                        && found.data_type() == member.data_type()
                        && found.storage_size_bytes() == member.storage_size_bytes()) =>
            {
                found
            }
            _ => return Err(ArrayIoError::UnknownMember(member.name().to_string())),
        };

        let pos = self.view.base
            + self.recno * self.view.layout.storage_size_bytes()
            + member.byte_offset();
        let end = pos + member.storage_size_bytes();
        let slot = self
            .view
            .buffer
            .get(pos..end)
            .ok_or_else(|| ArrayIoError::out_of_range(end as i64, self.view.buffer.len()))?;

        if member.is_on_heap() {
            let value = heap_entry(self.view.heap, slot, member.byte_order())?;
            return Ok(match value {
                HeapValue::Primitive(p) => MemberValue::Primitive(p),
                HeapValue::Strings(s) => MemberValue::Strings(s),
                HeapValue::Records(r) => MemberValue::Records(r),
                HeapValue::Vlen(rows) if rows.len() == 1 => MemberValue::Primitive(&rows[0]),
                HeapValue::Vlen(rows) => MemberValue::Vlen(rows),
            });
        }

        if let Some(nested) = member.nested() {
            return Ok(MemberValue::Structure(StructureView {
                layout: nested,
                buffer: self.view.buffer,
                heap: self.view.heap,
                base: pos,
                nrecords: member.length(),
            }));
        }

        decode_array(slot, member).map(MemberValue::Array)
    }
}

fn mismatch(member: &StructureMember, data: &MemberData) -> ArrayIoError {
    let actual = match data {
        MemberData::Array(a) => format!("{:?} array", a.kind()),
        MemberData::Strings(_) => "strings".to_string(),
        MemberData::Vlen(_) => "variable-length rows".to_string(),
        MemberData::Records(_) => "records".to_string(),
    };
    ArrayIoError::type_mismatch(
        format!("{} data for member {}", member.data_type(), member.name()),
        actual,
    )
}

fn heap_value_for(member: &StructureMember, data: MemberData) -> Result<HeapValue> {
    let kind = member.data_type().storage_kind();

    if member.is_variable_length() && member.nested().is_none() {
        let rows = match data {
            MemberData::Vlen(rows) => rows,
            MemberData::Array(array) => vec![array],
            other => return Err(mismatch(member, &other)),
        };
        if let Some(row) = rows.iter().find(|row| Some(row.kind()) != kind) {
            return Err(mismatch(member, &MemberData::Array(row.clone())));
        }
        return Ok(HeapValue::Vlen(rows));
    }

    match (member.data_type(), data) {
        (DataType::String, MemberData::Strings(values)) => {
            if values.len() != member.length() {
                return Err(ArrayIoError::MemberSize {
                    member: member.name().to_string(),
                    expected: member.length(),
                    actual: values.len(),
                });
            }
            Ok(HeapValue::Strings(values))
        }
        (DataType::Opaque, MemberData::Array(array))
            if matches!(array.kind(), StorageKind::Opaque | StorageKind::Byte) =>
        {
            Ok(HeapValue::Primitive(array))
        }
        (DataType::Sequence | DataType::Structure, MemberData::Records(records)) => {
            Ok(HeapValue::Records(records))
        }
        (_, other) => Err(mismatch(member, &other)),
    }
}

fn heap_entry<'a>(heap: &'a [HeapValue], slot: &[u8], order: ByteOrder) -> Result<&'a HeapValue> {
    let mut buf = &slot[..HEAP_INDEX_SIZE];
    let index = match order {
        ByteOrder::BigEndian => buf.get_u32(),
        ByteOrder::LittleEndian => buf.get_u32_le(),
    };
    heap.get(index as usize)
        .ok_or_else(|| ArrayIoError::out_of_range(index as i64, heap.len()))
}

macro_rules! put_values {
    ($slot:expr, $values:expr, $order:expr, $put_be:ident, $put_le:ident) => {
        for &v in $values {
            match $order {
                ByteOrder::BigEndian => $slot.$put_be(v),
                ByteOrder::LittleEndian => $slot.$put_le(v),
            }
        }
    };
}

fn encode_array(slot: &mut [u8], array: &PrimitiveArray, order: ByteOrder) {
    let mut slot = slot;
    match array {
        PrimitiveArray::Byte(v) => slot.put_slice(v),
        PrimitiveArray::Short(v) => put_values!(slot, v, order, put_i16, put_i16_le),
        PrimitiveArray::Int(v) => put_values!(slot, v, order, put_i32, put_i32_le),
        PrimitiveArray::Long(v) => put_values!(slot, v, order, put_i64, put_i64_le),
        PrimitiveArray::Float(v) => put_values!(slot, v, order, put_f32, put_f32_le),
        PrimitiveArray::Double(v) => put_values!(slot, v, order, put_f64, put_f64_le),
        // heap-stored kinds never reach the record buffer
        PrimitiveArray::Str(_) | PrimitiveArray::Opaque { .. } => {}
    }
}

macro_rules! get_values {
    ($buf:expr, $n:expr, $order:expr, $get_be:ident, $get_le:ident) => {
        (0..$n)
            .map(|_| match $order {
                ByteOrder::BigEndian => $buf.$get_be(),
                ByteOrder::LittleEndian => $buf.$get_le(),
            })
            .collect()
    };
}

fn decode_array(slot: &[u8], member: &StructureMember) -> Result<PrimitiveArray> {
    let mut buf = slot;
    let n = member.length();
    let order = member.byte_order();
    let kind = member
        .data_type()
        .storage_kind()
        .ok_or_else(|| ArrayIoError::unsupported(member.data_type(), "decode member"))?;
    Ok(match kind {
        StorageKind::Byte => PrimitiveArray::Byte(buf.to_vec()),
        StorageKind::Short => PrimitiveArray::Short(get_values!(buf, n, order, get_i16, get_i16_le)),
        StorageKind::Int => PrimitiveArray::Int(get_values!(buf, n, order, get_i32, get_i32_le)),
        StorageKind::Long => PrimitiveArray::Long(get_values!(buf, n, order, get_i64, get_i64_le)),
        StorageKind::Float => PrimitiveArray::Float(get_values!(buf, n, order, get_f32, get_f32_le)),
        StorageKind::Double => PrimitiveArray::Double(get_values!(buf, n, order, get_f64, get_f64_le)),
        StorageKind::String | StorageKind::Opaque => {
            return Err(ArrayIoError::unsupported(member.data_type(), "decode member"))
        }
    })
}
