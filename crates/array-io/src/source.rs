//! Physical sources offering positioned bulk reads.
//!
//! A source is anything that can copy bytes from an absolute position: an
//! in-memory buffer, a file, a network-backed stream. Typed reads decode
//! in the byte order last set with [`PositionedSource::order`].

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use bytes::{Buf, Bytes};

use crate::types::ByteOrder;

macro_rules! read_typed {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $be:ident, $le:ident) => {
        $(#[$doc])*
        fn $name(&mut self, pos: u64, dest: &mut [$ty]) -> io::Result<()> {
            let width = std::mem::size_of::<$ty>();
            let mut raw = vec![0u8; dest.len() * width];
            self.read_bytes(pos, &mut raw)?;
            let mut buf = &raw[..];
            match self.byte_order() {
                ByteOrder::BigEndian => dest.iter_mut().for_each(|v| *v = buf.$be()),
                ByteOrder::LittleEndian => dest.iter_mut().for_each(|v| *v = buf.$le()),
            }
            Ok(())
        }
    };
}

/// Positioned bulk reads at byte offsets.
///
/// Implementors supply [`read_bytes`](Self::read_bytes) and the byte order
/// accessors; the typed reads are provided on top of them.
pub trait PositionedSource {
    /// Set the byte order used by subsequent typed reads.
    fn order(&mut self, order: ByteOrder);

    /// Current byte order.
    fn byte_order(&self) -> ByteOrder;

    /// Fill `dest` with the bytes starting at `pos`.
    ///
    /// Fails with `UnexpectedEof` if the source ends first.
    fn read_bytes(&mut self, pos: u64, dest: &mut [u8]) -> io::Result<()>;

    read_typed!(
        /// Read `dest.len()` 16-bit integers starting at `pos`.
        read_i16s, i16, get_i16, get_i16_le
    );
    read_typed!(
        /// Read `dest.len()` 32-bit integers starting at `pos`.
        read_i32s, i32, get_i32, get_i32_le
    );
    read_typed!(
        /// Read `dest.len()` 64-bit integers starting at `pos`.
        read_i64s, i64, get_i64, get_i64_le
    );
    read_typed!(
        /// Read `dest.len()` 32-bit floats starting at `pos`.
        read_f32s, f32, get_f32, get_f32_le
    );
    read_typed!(
        /// Read `dest.len()` 64-bit floats starting at `pos`.
        read_f64s, f64, get_f64, get_f64_le
    );

    /// Read a fixed-length string of `len` bytes, dropping trailing NULs.
    fn read_string(&mut self, pos: u64, len: usize) -> io::Result<String> {
        let mut raw = vec![0u8; len];
        self.read_bytes(pos, &mut raw)?;
        let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        raw.truncate(end);
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

impl<S: PositionedSource + ?Sized> PositionedSource for &mut S {
    fn order(&mut self, order: ByteOrder) {
        (**self).order(order)
    }

    fn byte_order(&self) -> ByteOrder {
        (**self).byte_order()
    }

    fn read_bytes(&mut self, pos: u64, dest: &mut [u8]) -> io::Result<()> {
        (**self).read_bytes(pos, dest)
    }
}

/// A source over an in-memory buffer.
#[derive(Debug, Clone)]
pub struct BufferSource {
    data: Bytes,
    order: ByteOrder,
}

impl BufferSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            order: ByteOrder::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The underlying bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }
}

impl PositionedSource for BufferSource {
    fn order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    fn byte_order(&self) -> ByteOrder {
        self.order
    }

    fn read_bytes(&mut self, pos: u64, dest: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(pos).map_err(|_| eof(pos, dest.len()))?;
        let end = start
            .checked_add(dest.len())
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| eof(pos, dest.len()))?;
        dest.copy_from_slice(&self.data[start..end]);
        Ok(())
    }
}

/// A source over any seekable reader, e.g. a file.
#[derive(Debug)]
pub struct SeekSource<R> {
    inner: R,
    order: ByteOrder,
}

/// A source reading from a file on disk.
pub type FileSource = SeekSource<File>;

impl FileSource {
    /// Open a file for positioned reads.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read + Seek> SeekSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            order: ByteOrder::default(),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> PositionedSource for SeekSource<R> {
    fn order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    fn byte_order(&self) -> ByteOrder {
        self.order
    }

    fn read_bytes(&mut self, pos: u64, dest: &mut [u8]) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        self.inner.read_exact(dest)
    }
}

fn eof(pos: u64, len: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("read of {} bytes at {} past end of buffer", len, pos),
    )
}
