//! Chunks with physical byte positions.
//!
//! A [`Layout`] wraps a [`ChunkIterator`] and attaches to every chunk the
//! byte position where its first element lives in the physical source. The
//! position formula is the backend's extension point: the regular layout
//! uses `start_pos + src_elem * elem_size`, other encodings plug in their own
//! [`SrcPosition`].

use crate::chunker::{Chunk, ChunkIterator};
use crate::error::Result;
use crate::section::Section;

/// Maps a chunk to the byte position of its first element.
pub trait SrcPosition {
    fn src_pos(&self, chunk: &Chunk, elem_size: usize) -> u64;
}

impl<F> SrcPosition for F
where
    F: Fn(&Chunk, usize) -> u64,
{
    fn src_pos(&self, chunk: &Chunk, elem_size: usize) -> u64 {
        self(chunk, elem_size)
    }
}

/// Elements stored back to back from a base byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearPosition {
    pub start_pos: u64,
}

impl SrcPosition for LinearPosition {
    fn src_pos(&self, chunk: &Chunk, elem_size: usize) -> u64 {
        self.start_pos + chunk.src_elem * elem_size as u64
    }
}

/// A chunk paired with its physical position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutChunk {
    pub chunk: Chunk,
    /// Byte offset of the first element in the source.
    pub src_pos: u64,
    /// Size of one element in bytes.
    pub elem_size: usize,
}

impl LayoutChunk {
    pub fn src_elem(&self) -> u64 {
        self.chunk.src_elem
    }

    pub fn dest_elem(&self) -> u64 {
        self.chunk.dest_elem
    }

    pub fn nelems(&self) -> u32 {
        self.chunk.nelems
    }

    /// Number of bytes covered by this chunk.
    pub fn byte_len(&self) -> usize {
        self.chunk.nelems as usize * self.elem_size
    }
}

/// A lazy sequence of [`LayoutChunk`]s for one section of a variable.
#[derive(Debug, Clone)]
pub struct Layout<P = LinearPosition> {
    chunks: ChunkIterator,
    elem_size: usize,
    position: P,
    section: Section,
}

impl Layout<LinearPosition> {
    /// Layout of a variable stored contiguously at `start_pos`.
    pub fn regular(
        start_pos: u64,
        elem_size: usize,
        src_shape: &[usize],
        want: Option<&Section>,
    ) -> Result<Self> {
        Self::new(src_shape, want, elem_size, LinearPosition { start_pos })
    }
}

impl<P: SrcPosition> Layout<P> {
    /// Layout using a backend-specific position formula.
    pub fn new(
        src_shape: &[usize],
        want: Option<&Section>,
        elem_size: usize,
        position: P,
    ) -> Result<Self> {
        let section = match want {
            Some(section) => section.fill(src_shape)?,
            None => Section::full(src_shape),
        };
        let chunks = ChunkIterator::new(src_shape, Some(&section))?;
        Ok(Self {
            chunks,
            elem_size,
            position,
            section,
        })
    }

    /// Wrap an existing chunk iterator.
    pub fn with_position(chunks: ChunkIterator, elem_size: usize, position: P, section: Section) -> Self {
        Self {
            chunks,
            elem_size,
            position,
            section,
        }
    }

    pub fn total_nelems(&self) -> u64 {
        self.chunks.total_nelems()
    }

    pub fn elem_size(&self) -> usize {
        self.elem_size
    }

    /// The filled section this layout covers.
    pub fn section(&self) -> &Section {
        &self.section
    }

    pub fn has_next(&self) -> bool {
        self.chunks.has_next()
    }
}

impl<P: SrcPosition> Iterator for Layout<P> {
    type Item = LayoutChunk;

    fn next(&mut self) -> Option<LayoutChunk> {
        let chunk = self.chunks.next()?;
        Some(LayoutChunk {
            src_pos: self.position.src_pos(&chunk, self.elem_size),
            chunk,
            elem_size: self.elem_size,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl<P: SrcPosition> ExactSizeIterator for Layout<P> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_positions() {
        let section: Section = "0:1,1:1".parse().unwrap();
        let layout = Layout::regular(100, 4, &[2, 3], Some(&section)).unwrap();
        assert_eq!(layout.total_nelems(), 2);
        assert_eq!(layout.section().to_string(), "0:1,1:1");
        let positions: Vec<_> = layout.map(|c| c.src_pos).collect();
        assert_eq!(positions, vec![104, 116]);
    }

    #[test]
    fn test_custom_position_formula() {
        // each row of 3 elements is preceded by an 8-byte row header
        let row_header = |chunk: &Chunk, elem_size: usize| {
            let row = chunk.src_elem / 3;
            let col = chunk.src_elem % 3;
            row * (8 + 3 * elem_size as u64) + 8 + col * elem_size as u64
        };
        let section: Section = ":,1:2".parse().unwrap();
        let layout = Layout::new(&[2, 3], Some(&section), 2, row_header).unwrap();
        let got: Vec<_> = layout.map(|c| (c.src_pos, c.nelems())).collect();
        assert_eq!(got, vec![(10, 2), (24, 2)]);
    }

    #[test]
    fn test_whole_variable_layout() {
        let mut layout = Layout::regular(0, 8, &[4, 5], None).unwrap();
        assert!(layout.section().is_equivalent(&[4, 5]));
        let chunk = layout.next().unwrap();
        assert_eq!(chunk.byte_len(), 160);
        assert!(layout.next().is_none());
    }
}
