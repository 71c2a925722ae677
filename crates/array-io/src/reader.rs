//! Typed bulk reads driven by a [`Layout`].
//!
//! For every chunk of the layout the reader sets the source byte order and
//! issues one positioned bulk read of `nelems` elements into the destination
//! array at `dest_elem`. Validation (element type against destination,
//! destination size, allocation limit) happens before the first read, so an
//! invalid request never touches the source.
//!
//! ```ignore
//! let layout = Layout::regular(var_start, 4, &var_shape, Some(&section))?;
//! let values = read_data_fill(&mut source, layout, DataType::Float, None, ByteOrder::BigEndian)?;
//! let floats = values.as_floats().unwrap();
//! ```

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace, warn};

use crate::config::ReaderConfig;
use crate::error::{ArrayIoError, Result};
use crate::layout::{Layout, LayoutChunk, SrcPosition};
use crate::source::PositionedSource;
use crate::types::{ByteOrder, DataType, StorageKind};

/// A flat array of decoded values, one variant per storage kind.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveArray {
    /// byte, ubyte, char, boolean, enum1
    Byte(Vec<u8>),
    /// short, ushort, enum2
    Short(Vec<i16>),
    /// int, uint, enum4
    Int(Vec<i32>),
    /// long, ulong
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    /// Fixed-length strings, trailing NULs removed.
    Str(Vec<String>),
    /// Opaque blobs or structure records, `elem_size` bytes each.
    Opaque { data: Vec<u8>, elem_size: usize },
}

/// Value used to pre-fill a destination array.
#[derive(Debug, Clone, PartialEq)]
pub enum FillValue {
    Int(i64),
    Float(f64),
    Str(String),
    /// Byte pattern repeated per opaque element or structure record.
    Bytes(Vec<u8>),
}

impl PrimitiveArray {
    /// An array of `len` zero values.
    pub fn zeroed(data_type: DataType, len: usize, elem_size: usize) -> Result<Self> {
        let kind = storage_kind(data_type, "allocate")?;
        Ok(match kind {
            StorageKind::Byte => Self::Byte(vec![0; len]),
            StorageKind::Short => Self::Short(vec![0; len]),
            StorageKind::Int => Self::Int(vec![0; len]),
            StorageKind::Long => Self::Long(vec![0; len]),
            StorageKind::Float => Self::Float(vec![0.0; len]),
            StorageKind::Double => Self::Double(vec![0.0; len]),
            StorageKind::String => Self::Str(vec![String::new(); len]),
            StorageKind::Opaque => Self::Opaque {
                data: vec![0; len * elem_size],
                elem_size,
            },
        })
    }

    /// An array of `len` copies of `fill`.
    pub fn filled(
        data_type: DataType,
        len: usize,
        elem_size: usize,
        fill: &FillValue,
    ) -> Result<Self> {
        let kind = storage_kind(data_type, "allocate")?;
        let mismatch = || ArrayIoError::type_mismatch(format!("fill for {}", data_type), format!("{:?}", fill));
        let array = match (kind, fill) {
            (StorageKind::Byte, FillValue::Int(v)) => Self::Byte(vec![*v as u8; len]),
            (StorageKind::Short, FillValue::Int(v)) => Self::Short(vec![*v as i16; len]),
            (StorageKind::Int, FillValue::Int(v)) => Self::Int(vec![*v as i32; len]),
            (StorageKind::Long, FillValue::Int(v)) => Self::Long(vec![*v; len]),
            (StorageKind::Float, FillValue::Int(v)) => Self::Float(vec![*v as f32; len]),
            (StorageKind::Float, FillValue::Float(v)) => Self::Float(vec![*v as f32; len]),
            (StorageKind::Double, FillValue::Int(v)) => Self::Double(vec![*v as f64; len]),
            (StorageKind::Double, FillValue::Float(v)) => Self::Double(vec![*v; len]),
            (StorageKind::String, FillValue::Str(s)) => Self::Str(vec![s.clone(); len]),
            (StorageKind::Opaque, FillValue::Bytes(pattern)) => {
                let mut data = vec![0u8; len * elem_size];
                if !pattern.is_empty() && elem_size > 0 {
                    for record in data.chunks_mut(elem_size) {
                        for (b, p) in record.iter_mut().zip(pattern.iter().cycle()) {
                            *b = *p;
                        }
                    }
                }
                Self::Opaque { data, elem_size }
            }
            _ => return Err(mismatch()),
        };
        Ok(array)
    }

    pub fn kind(&self) -> StorageKind {
        match self {
            Self::Byte(_) => StorageKind::Byte,
            Self::Short(_) => StorageKind::Short,
            Self::Int(_) => StorageKind::Int,
            Self::Long(_) => StorageKind::Long,
            Self::Float(_) => StorageKind::Float,
            Self::Double(_) => StorageKind::Double,
            Self::Str(_) => StorageKind::String,
            Self::Opaque { .. } => StorageKind::Opaque,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Byte(v) => v.len(),
            Self::Short(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Str(v) => v.len(),
            Self::Opaque { data, elem_size } => data.len().checked_div(*elem_size).unwrap_or(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Byte(v) => Some(v),
            Self::Opaque { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn as_shorts(&self) -> Option<&[i16]> {
        match self {
            Self::Short(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i32]> {
        match self {
            Self::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_longs(&self) -> Option<&[i64]> {
        match self {
            Self::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f32]> {
        match self {
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_doubles(&self) -> Option<&[f64]> {
        match self {
            Self::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Value `i` widened to f64, for numeric kinds.
    pub fn get_f64(&self, i: usize) -> Option<f64> {
        match self {
            Self::Byte(v) => v.get(i).map(|&x| x as f64),
            Self::Short(v) => v.get(i).map(|&x| x as f64),
            Self::Int(v) => v.get(i).map(|&x| x as f64),
            Self::Long(v) => v.get(i).map(|&x| x as f64),
            Self::Float(v) => v.get(i).map(|&x| x as f64),
            Self::Double(v) => v.get(i).copied(),
            Self::Str(_) | Self::Opaque { .. } => None,
        }
    }
}

fn storage_kind(data_type: DataType, operation: &'static str) -> Result<StorageKind> {
    data_type
        .storage_kind()
        .ok_or_else(|| ArrayIoError::unsupported(data_type, operation))
}

/// Cooperative cancellation, polled between chunks.
pub trait CancelTask {
    fn is_cancel(&self) -> bool;
}

impl CancelTask for AtomicBool {
    fn is_cancel(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<F: Fn() -> bool> CancelTask for F {
    fn is_cancel(&self) -> bool {
        self()
    }
}

/// Performs bulk reads under a [`ReaderConfig`].
#[derive(Debug, Clone, Default)]
pub struct BulkReader {
    config: ReaderConfig,
}

impl BulkReader {
    /// Create a reader, rejecting a config that fails [`ReaderConfig::validate`].
    pub fn new(config: ReaderConfig) -> Result<Self> {
        config.validate().map_err(ArrayIoError::Config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Read every chunk of `layout` from `source` into `dest`.
    ///
    /// `order` defaults to the configured byte order. On an I/O failure the
    /// remaining chunks are abandoned and `dest` holds partial data.
    pub fn read_into<S, P>(
        &self,
        source: &mut S,
        layout: Layout<P>,
        data_type: DataType,
        dest: &mut PrimitiveArray,
        order: Option<ByteOrder>,
    ) -> Result<()>
    where
        S: PositionedSource + ?Sized,
        P: SrcPosition,
    {
        self.read_chunks(source, layout, data_type, dest, order, None)
    }

    /// Like [`read_into`](Self::read_into), checking `cancel` before every chunk.
    pub fn read_into_cancellable<S, P>(
        &self,
        source: &mut S,
        layout: Layout<P>,
        data_type: DataType,
        dest: &mut PrimitiveArray,
        order: Option<ByteOrder>,
        cancel: &dyn CancelTask,
    ) -> Result<()>
    where
        S: PositionedSource + ?Sized,
        P: SrcPosition,
    {
        self.read_chunks(source, layout, data_type, dest, order, Some(cancel))
    }

    /// Allocate a destination for `layout`, pre-fill it, and read into it.
    pub fn read<S, P>(
        &self,
        source: &mut S,
        layout: Layout<P>,
        data_type: DataType,
        fill: Option<&FillValue>,
        order: Option<ByteOrder>,
    ) -> Result<PrimitiveArray>
    where
        S: PositionedSource + ?Sized,
        P: SrcPosition,
    {
        let total = layout.total_nelems();
        if total > self.config.max_request_elems {
            return Err(ArrayIoError::TooLarge {
                nelems: total,
                limit: self.config.max_request_elems,
            });
        }
        let len = total as usize;
        let mut dest = match fill {
            Some(fill) => PrimitiveArray::filled(data_type, len, layout.elem_size(), fill)?,
            None => PrimitiveArray::zeroed(data_type, len, layout.elem_size())?,
        };
        self.read_into(source, layout, data_type, &mut dest, order)?;
        Ok(dest)
    }

    fn read_chunks<S, P>(
        &self,
        source: &mut S,
        layout: Layout<P>,
        data_type: DataType,
        dest: &mut PrimitiveArray,
        order: Option<ByteOrder>,
        cancel: Option<&dyn CancelTask>,
    ) -> Result<()>
    where
        S: PositionedSource + ?Sized,
        P: SrcPosition,
    {
        check_destination(data_type, dest, layout.total_nelems(), layout.elem_size())?;

        let order = order.unwrap_or(self.config.byte_order);
        let section = layout.section().to_string();
        let total = layout.total_nelems();
        debug!(
            section = %section,
            data_type = %data_type,
            total,
            chunks = layout.len(),
            "Reading section"
        );

        let mut done = 0u64;
        for chunk in layout {
            if let Some(cancel) = cancel {
                if cancel.is_cancel() {
                    warn!(section = %section, done, total, "Read cancelled");
                    return Err(ArrayIoError::Cancelled {
                        section,
                        done,
                        total,
                    });
                }
            }
            trace!(
                src_elem = chunk.src_elem(),
                dest_elem = chunk.dest_elem(),
                nelems = chunk.nelems(),
                src_pos = chunk.src_pos,
                "Reading chunk"
            );
            source.order(order);
            read_chunk(source, &chunk, dest).map_err(|e| ArrayIoError::io_failure(&section, e))?;
            done += chunk.nelems() as u64;
        }
        Ok(())
    }
}

/// Read the chunks of `layout` into `dest` in the given byte order.
pub fn read_into<S, P>(
    source: &mut S,
    layout: Layout<P>,
    data_type: DataType,
    dest: &mut PrimitiveArray,
    byte_order: ByteOrder,
) -> Result<()>
where
    S: PositionedSource + ?Sized,
    P: SrcPosition,
{
    BulkReader::default().read_into(source, layout, data_type, dest, Some(byte_order))
}

/// Allocate, optionally pre-fill, and read the chunks of `layout`.
pub fn read_data_fill<S, P>(
    source: &mut S,
    layout: Layout<P>,
    data_type: DataType,
    fill: Option<&FillValue>,
    byte_order: ByteOrder,
) -> Result<PrimitiveArray>
where
    S: PositionedSource + ?Sized,
    P: SrcPosition,
{
    BulkReader::default().read(source, layout, data_type, fill, Some(byte_order))
}

fn check_destination(
    data_type: DataType,
    dest: &PrimitiveArray,
    total: u64,
    elem_size: usize,
) -> Result<()> {
    let kind = storage_kind(data_type, "bulk read")?;
    if dest.kind() != kind {
        return Err(ArrayIoError::type_mismatch(
            format!("{:?} destination for {}", kind, data_type),
            format!("{:?}", dest.kind()),
        ));
    }
    let width = data_type.size();
    if width > 0 && elem_size != width {
        return Err(ArrayIoError::type_mismatch(
            format!("{}-byte {} elements", width, data_type),
            format!("{}-byte layout elements", elem_size),
        ));
    }
    if let PrimitiveArray::Opaque {
        elem_size: dest_size,
        ..
    } = dest
    {
        if *dest_size != elem_size {
            return Err(ArrayIoError::type_mismatch(
                format!("{}-byte records", elem_size),
                format!("{}-byte records", dest_size),
            ));
        }
    }
    if (dest.len() as u64) < total {
        return Err(ArrayIoError::out_of_range(total as i64, dest.len()));
    }
    Ok(())
}

fn read_chunk<S>(source: &mut S, chunk: &LayoutChunk, dest: &mut PrimitiveArray) -> io::Result<()>
where
    S: PositionedSource + ?Sized,
{
    let start = chunk.dest_elem() as usize;
    let end = start + chunk.nelems() as usize;
    let pos = chunk.src_pos;
    match dest {
        PrimitiveArray::Byte(v) => source.read_bytes(pos, &mut v[start..end]),
        PrimitiveArray::Short(v) => source.read_i16s(pos, &mut v[start..end]),
        PrimitiveArray::Int(v) => source.read_i32s(pos, &mut v[start..end]),
        PrimitiveArray::Long(v) => source.read_i64s(pos, &mut v[start..end]),
        PrimitiveArray::Float(v) => source.read_f32s(pos, &mut v[start..end]),
        PrimitiveArray::Double(v) => source.read_f64s(pos, &mut v[start..end]),
        PrimitiveArray::Str(v) => {
            let width = chunk.elem_size;
            for (i, slot) in v[start..end].iter_mut().enumerate() {
                *slot = source.read_string(pos + (i * width) as u64, width)?;
            }
            Ok(())
        }
        PrimitiveArray::Opaque { data, elem_size } => {
            let size = *elem_size;
            source.read_bytes(pos, &mut data[start * size..end * size])
        }
    }
}
