//! Decomposition of a section into contiguous runs.
//!
//! [`ChunkIterator`] turns a wanted [`Section`] of a source shape into the
//! sequence of [`Chunk`]s needed to copy it: each chunk is a run of elements
//! that is contiguous both in the source (row-major over the source shape)
//! and in the destination (row-major over the section shape).
//!
//! # Merging
//!
//! Dimensions are examined fastest first. A dimension that is selected in
//! full can be folded into the next slower one when that one has unit
//! stride, because the two then form one contiguous run. The slowest
//! (outermost) dimension never absorbs a fold, so outside the whole-array
//! case every chunk lies within a single outermost index:
//!
//! ```text
//! shape [4,5,6], section 1:2,:,:
//!   dims (fastest first)   6 full -> folded into 5   =>  run of 30
//!   outermost              rows 1,2                  =>  2 chunks
//!   chunks  {src 30, dest 0, n 30}  {src 60, dest 30, n 30}
//! ```
//!
//! Usage:
//!
//! ```ignore
//! let chunks = ChunkIterator::new(&shape, Some(&section))?;
//! for chunk in chunks {
//!     let src = &source[chunk.src_elem as usize..][..chunk.nelems as usize];
//!     dest[chunk.dest_elem as usize..][..chunk.nelems as usize].copy_from_slice(src);
//! }
//! ```

use std::iter::FusedIterator;

use crate::error::{ArrayIoError, Result};
use crate::index::Odometer;
use crate::section::{Range, Section};

/// A run of `nelems` elements contiguous in source and destination.
///
/// Positions are element counts, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    /// First element in the source.
    pub src_elem: u64,
    /// First element in the destination.
    pub dest_elem: u64,
    /// Number of contiguous elements.
    pub nelems: u32,
}

impl Chunk {
    pub fn new(src_elem: u64, dest_elem: u64, nelems: u32) -> Self {
        Self {
            src_elem,
            dest_elem,
            nelems,
        }
    }
}

/// Per-dimension state while planning, fastest dimension first.
#[derive(Debug, Clone)]
struct Dim {
    /// Elements between consecutive indices of this dimension in the source.
    stride: u64,
    /// Source extent, grows as faster dimensions fold in.
    max_size: u64,
    want: Range,
    /// Wanted element count, grows as faster dimensions fold in.
    want_size: u64,
}

/// Lazy, one-shot sequence of [`Chunk`]s covering a section.
///
/// `dest_elem` starts at 0 and increases by `nelems` every step with no
/// gaps; `src_elem` increases monotonically.
#[derive(Debug, Clone)]
pub struct ChunkIterator {
    odometer: Odometer,
    nelems: u32,
    start: u64,
    total: u64,
    done: u64,
    dest: u64,
    started: bool,
}

impl ChunkIterator {
    /// Plan the chunks of `want` within `src_shape`.
    ///
    /// `None` (or an empty section) means the whole shape. The section is
    /// filled and validated here; nothing is iterated if this fails.
    pub fn new(src_shape: &[usize], want: Option<&Section>) -> Result<Self> {
        let ranges = match want {
            Some(section) => section.filled_ranges(src_shape)?,
            None => src_shape.iter().map(|&extent| Range::full(extent)).collect(),
        };
        let total: u64 = ranges.iter().map(|r| r.length() as u64).product();

        if total == 0 {
            return Ok(Self::single(0, 0, 0));
        }

        let whole = ranges
            .iter()
            .zip(src_shape)
            .all(|(r, &extent)| r.is_full(extent));
        if whole {
            return Ok(Self::single(0, checked_run(total)?, total));
        }

        let mut dims = Vec::with_capacity(src_shape.len());
        let mut stride = 1u64;
        for (range, &extent) in ranges.iter().zip(src_shape).rev() {
            dims.push(Dim {
                stride,
                max_size: extent as u64,
                want: *range,
                want_size: range.length() as u64,
            });
            stride *= extent as u64;
        }

        // Fold fully selected inner dimensions outward; the outermost
        // dimension is never a fold target.
        let merge = (0..dims.len().saturating_sub(2))
            .take_while(|&i| {
                dims[i].max_size == dims[i].want_size && dims[i + 1].want.stride() == 1
            })
            .count();
        for i in 0..merge {
            let (inner_max, inner_want) = (dims[i].max_size, dims[i].want_size);
            dims[i + 1].max_size *= inner_max;
            dims[i + 1].want_size *= inner_want;
        }
        dims.drain(..merge);

        let nelems = if dims[0].want.stride() > 1 {
            1
        } else {
            let run = checked_run(dims[0].want_size)?;
            dims[0].want_size = 1;
            run
        };

        let start = dims
            .iter()
            .map(|dim| dim.stride * dim.want.start() as u64)
            .sum();

        // slowest first for the odometer
        let (shape, wstride): (Vec<usize>, Vec<u64>) = dims
            .iter()
            .rev()
            .map(|dim| {
                (
                    dim.want_size as usize,
                    dim.stride * dim.want.stride() as u64,
                )
            })
            .unzip();
        let odometer = Odometer::new(shape, wstride);
        debug_assert_eq!(odometer.size() * nelems as u64, total);

        tracing::trace!(
            src_shape = ?src_shape,
            merged = merge,
            nelems,
            start,
            total,
            "Planned chunk iteration"
        );

        Ok(Self {
            odometer,
            nelems,
            start,
            total,
            done: 0,
            dest: 0,
            started: false,
        })
    }

    fn single(start: u64, nelems: u32, total: u64) -> Self {
        Self {
            odometer: Odometer::scalar(),
            nelems,
            start,
            total,
            done: 0,
            dest: 0,
            started: false,
        }
    }

    /// Total number of elements in the wanted section.
    pub fn total_nelems(&self) -> u64 {
        self.total
    }

    /// Number of elements in every chunk.
    pub fn elems_per_chunk(&self) -> u32 {
        self.nelems
    }

    /// Check if more chunks remain.
    pub fn has_next(&self) -> bool {
        self.done < self.total
    }

    fn remaining_chunks(&self) -> usize {
        if self.nelems == 0 {
            0
        } else {
            ((self.total - self.done) / self.nelems as u64) as usize
        }
    }
}

impl Iterator for ChunkIterator {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if !self.has_next() {
            return None;
        }
        if self.started {
            self.odometer.incr();
            self.dest += self.nelems as u64;
        } else {
            self.started = true;
        }
        self.done += self.nelems as u64;
        Some(Chunk::new(
            self.start + self.odometer.offset(),
            self.dest,
            self.nelems,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining_chunks();
        (n, Some(n))
    }
}

impl ExactSizeIterator for ChunkIterator {}

impl FusedIterator for ChunkIterator {}

/// A single run must fit a caller-addressable slice.
fn checked_run(nelems: u64) -> Result<u32> {
    if nelems > i32::MAX as u64 {
        return Err(ArrayIoError::TooLarge {
            nelems,
            limit: i32::MAX as u64,
        });
    }
    Ok(nelems as u32)
}
