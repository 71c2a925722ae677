//! Multidimensional cursor over a shape with per-dimension strides.

/// Row-major counter over `shape` that tracks a linear offset.
///
/// Each dimension advances the offset by its own stride, so the offset can
/// address a different (larger, strided) space than the one being counted.
/// Rank 0 is a single position at offset 0.
#[derive(Debug, Clone)]
pub struct Odometer {
    shape: Vec<usize>,
    stride: Vec<u64>,
    counter: Vec<usize>,
    offset: u64,
}

impl Odometer {
    /// Create a cursor at the origin. `shape` and `stride` are slowest first.
    pub fn new(shape: Vec<usize>, stride: Vec<u64>) -> Self {
        debug_assert_eq!(shape.len(), stride.len());
        let counter = vec![0; shape.len()];
        Self {
            shape,
            stride,
            counter,
            offset: 0,
        }
    }

    /// A rank-0 cursor.
    pub fn scalar() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of positions the cursor enumerates.
    pub fn size(&self) -> u64 {
        self.shape.iter().map(|&n| n as u64).product()
    }

    /// Current linear offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Current index per dimension.
    pub fn counter(&self) -> &[usize] {
        &self.counter
    }

    /// Advance one position, fastest dimension first, carrying outward.
    ///
    /// Stepping past the last position wraps to the origin.
    pub fn incr(&mut self) {
        for dim in (0..self.shape.len()).rev() {
            self.counter[dim] += 1;
            self.offset += self.stride[dim];
            if self.counter[dim] < self.shape[dim] {
                return;
            }
            self.offset -= self.stride[dim] * self.shape[dim] as u64;
            self.counter[dim] = 0;
        }
    }

    /// Move back to the origin.
    pub fn reset(&mut self) {
        self.counter.iter_mut().for_each(|c| *c = 0);
        self.offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_enumeration() {
        let mut odo = Odometer::new(vec![2, 3], vec![3, 1]);
        let mut offsets = vec![odo.offset()];
        for _ in 1..odo.size() {
            odo.incr();
            offsets.push(odo.offset());
        }
        assert_eq!(offsets, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(odo.counter(), &[1, 2]);
    }

    #[test]
    fn test_strided_offsets() {
        // every other row of a 4x10 array, columns 0 and 5
        let mut odo = Odometer::new(vec![2, 2], vec![20, 5]);
        let mut offsets = vec![odo.offset()];
        for _ in 1..odo.size() {
            odo.incr();
            offsets.push(odo.offset());
        }
        assert_eq!(offsets, vec![0, 5, 20, 25]);
    }

    #[test]
    fn test_wraps_to_origin() {
        let mut odo = Odometer::new(vec![2], vec![7]);
        odo.incr();
        odo.incr();
        assert_eq!(odo.offset(), 0);
        assert_eq!(odo.counter(), &[0]);
    }

    #[test]
    fn test_scalar() {
        let mut odo = Odometer::scalar();
        assert_eq!(odo.size(), 1);
        odo.incr();
        assert_eq!(odo.offset(), 0);
    }

    #[test]
    fn test_reset() {
        let mut odo = Odometer::new(vec![3, 3], vec![3, 1]);
        odo.incr();
        odo.incr();
        odo.incr();
        odo.reset();
        assert_eq!(odo.offset(), 0);
        assert_eq!(odo.counter(), &[0, 0]);
    }
}
