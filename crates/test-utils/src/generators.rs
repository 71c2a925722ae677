//! Test data generators for synthetic variables.
//!
//! These generators create predictable, verifiable data patterns so that a
//! read can be checked value by value against the element it came from.

use array_io::{ByteOrder, Range, Section};

/// Number of elements in `shape`.
pub fn shape_size(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Creates a volume whose value at each element is its row-major index.
///
/// # Example
///
/// ```
/// use test_utils::linear_volume;
///
/// let volume = linear_volume(&[2, 3]);
/// assert_eq!(volume, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
/// ```
pub fn linear_volume(shape: &[usize]) -> Vec<f32> {
    (0..shape_size(shape)).map(|i| i as f32).collect()
}

/// Creates 16-bit values `base + index`, wrapping on overflow.
pub fn linear_shorts(shape: &[usize], base: i16) -> Vec<i16> {
    (0..shape_size(shape))
        .map(|i| base.wrapping_add(i as i16))
        .collect()
}

/// Encodes floats in the given byte order.
pub fn encode_f32s(values: &[f32], order: ByteOrder) -> Vec<u8> {
    values
        .iter()
        .flat_map(|v| match order {
            ByteOrder::BigEndian => v.to_be_bytes(),
            ByteOrder::LittleEndian => v.to_le_bytes(),
        })
        .collect()
}

/// Encodes 16-bit integers in the given byte order.
pub fn encode_i16s(values: &[i16], order: ByteOrder) -> Vec<u8> {
    values
        .iter()
        .flat_map(|v| match order {
            ByteOrder::BigEndian => v.to_be_bytes(),
            ByteOrder::LittleEndian => v.to_le_bytes(),
        })
        .collect()
}

/// Enumerates the row-major source indices selected by `ranges`, in
/// destination order.
///
/// This is the naive reference for chunk plans: it visits every selected
/// element with a plain nested counter and no merging.
pub fn section_indices(shape: &[usize], ranges: &[Range]) -> Vec<u64> {
    assert_eq!(shape.len(), ranges.len(), "rank mismatch");
    if ranges.iter().any(|r| r.length() == 0) {
        return Vec::new();
    }

    let rank = shape.len();
    let mut strides = vec![1u64; rank];
    for i in (0..rank.saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1] as u64;
    }

    let mut out = Vec::new();
    let mut counter = vec![0usize; rank];
    loop {
        let index: u64 = (0..rank)
            .map(|d| {
                let r = &ranges[d];
                (r.start() + counter[d] * r.stride()) as u64 * strides[d]
            })
            .sum();
        out.push(index);

        // advance, fastest dimension last
        let mut d = rank;
        loop {
            if d == 0 {
                return out;
            }
            d -= 1;
            counter[d] += 1;
            if counter[d] < ranges[d].length() {
                break;
            }
            counter[d] = 0;
        }
    }
}

/// Every range of `extent` with stride up to `max_stride`, including empty ones.
pub fn all_ranges(extent: usize, max_stride: usize) -> Vec<Range> {
    let mut out = Vec::new();
    for start in 0..extent {
        for stride in 1..=max_stride.max(1) {
            let max_len = (extent - start).div_ceil(stride);
            for length in 0..=max_len {
                if let Ok(r) = Range::strided(start as i64, length as i64, stride as i64) {
                    out.push(r);
                }
            }
        }
    }
    out
}

/// Every section of `shape` built from [`all_ranges`] of each dimension.
pub fn all_sections(shape: &[usize], max_stride: usize) -> Vec<Section> {
    let per_dim: Vec<Vec<Range>> = shape.iter().map(|&n| all_ranges(n, max_stride)).collect();
    let mut out = vec![Vec::new()];
    for ranges in &per_dim {
        let mut next = Vec::with_capacity(out.len() * ranges.len());
        for prefix in &out {
            for r in ranges {
                let mut v: Vec<Range> = prefix.clone();
                v.push(*r);
                next.push(v);
            }
        }
        out = next;
    }
    out.into_iter().map(Section::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_volume() {
        let volume = linear_volume(&[2, 2, 2]);
        assert_eq!(volume.len(), 8);
        assert_eq!(volume[7], 7.0);
        assert_eq!(linear_volume(&[]), vec![0.0]);
    }

    #[test]
    fn test_encode_f32s() {
        assert_eq!(encode_f32s(&[1.0], ByteOrder::BigEndian), vec![0x3f, 0x80, 0, 0]);
        assert_eq!(encode_f32s(&[1.0], ByteOrder::LittleEndian), vec![0, 0, 0x80, 0x3f]);
        assert_eq!(encode_i16s(&[0x0102], ByteOrder::BigEndian), vec![1, 2]);
    }

    #[test]
    fn test_section_indices() {
        let ranges = vec![
            Range::new(1, 2).unwrap(),
            Range::strided(0, 2, 2).unwrap(),
        ];
        assert_eq!(section_indices(&[3, 4], &ranges), vec![4, 6, 8, 10]);
        assert!(section_indices(&[3, 4], &[Range::new(0, 0).unwrap(), Range::full(4)]).is_empty());
        assert_eq!(section_indices(&[], &[]), vec![0]);
    }

    #[test]
    fn test_all_ranges() {
        let ranges = all_ranges(3, 1);
        // start 0: len 0..=3, start 1: 0..=2, start 2: 0..=1
        assert_eq!(ranges.len(), 4 + 3 + 2);
        assert_eq!(all_sections(&[2, 2], 1).len(), 5 * 5);
    }
}
