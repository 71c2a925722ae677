//! Ranges and sections: n-dimensional, possibly strided subset requests.
//!
//! A [`Range`] picks `length` indices along one dimension, starting at
//! `start` and stepping by `stride`. A [`Section`] holds one range per
//! dimension of a shape; a dimension may be left out (`None`), meaning
//! "all of it", until the section is [filled](Section::fill) against a shape.
//!
//! The text form follows the netCDF convention of inclusive bounds:
//!
//! ```text
//! "1:2,:,0:8:2"  ->  rows 1..=2, every column, levels 0,2,4,6,8
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{ArrayIoError, Result};

/// Indices `start, start + stride, ..` (`length` of them) along one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    start: usize,
    length: usize,
    stride: usize,
}

impl Range {
    /// Create a unit-stride range.
    pub fn new(start: i64, length: i64) -> Result<Self> {
        Self::strided(start, length, 1)
    }

    /// Create a strided range.
    pub fn strided(start: i64, length: i64, stride: i64) -> Result<Self> {
        if start < 0 {
            return Err(ArrayIoError::invalid_section(format!(
                "range start {} < 0",
                start
            )));
        }
        if length < 0 {
            return Err(ArrayIoError::invalid_section(format!(
                "range length {} < 0",
                length
            )));
        }
        if stride < 1 {
            return Err(ArrayIoError::invalid_section(format!(
                "range stride {} < 1",
                stride
            )));
        }
        Ok(Self {
            start: start as usize,
            length: length as usize,
            stride: stride as usize,
        })
    }

    /// Every index of a dimension of the given extent.
    pub fn full(extent: usize) -> Self {
        Self {
            start: 0,
            length: extent,
            stride: 1,
        }
    }

    /// Create from inclusive bounds, `first..=last` stepping by `stride`.
    pub fn from_bounds(first: i64, last: i64, stride: i64) -> Result<Self> {
        if last < first {
            return Err(ArrayIoError::invalid_section(format!(
                "range last {} < first {}",
                last, first
            )));
        }
        if stride < 1 {
            return Err(ArrayIoError::invalid_section(format!(
                "range stride {} < 1",
                stride
            )));
        }
        Self::strided(first, (last - first) / stride + 1, stride)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Last picked index, or `None` for an empty range.
    pub fn last(&self) -> Option<usize> {
        if self.length == 0 {
            None
        } else {
            Some(
                self.start
                    .saturating_add((self.length - 1).saturating_mul(self.stride)),
            )
        }
    }

    /// The index picked by the `i`-th element of this range.
    pub fn element(&self, i: usize) -> Result<usize> {
        if i >= self.length {
            return Err(ArrayIoError::out_of_range(i as i64, self.length));
        }
        Ok(self.start + i * self.stride)
    }

    /// Iterate over the picked indices.
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        let Range {
            start,
            length,
            stride,
        } = *self;
        (0..length).map(move |i| start + i * stride)
    }

    /// Check if this range picks every index of a dimension.
    pub fn is_full(&self, extent: usize) -> bool {
        self.start == 0 && self.stride == 1 && self.length == extent
    }

    /// Check that every picked index lies in `[0, extent)`.
    pub fn check_in_range(&self, extent: usize) -> Result<()> {
        match self.last() {
            None if self.start > extent => Err(ArrayIoError::invalid_section(format!(
                "empty range start {} > extent {}",
                self.start, extent
            ))),
            Some(last) if last >= extent => Err(ArrayIoError::invalid_section(format!(
                "range {} exceeds extent {}",
                self, extent
            ))),
            _ => Ok(()),
        }
    }

    /// Apply `inner`, whose indices address the elements picked by `self`.
    ///
    /// `Range(2, 5, stride 2)` picks 2,4,6,8,10; composing with
    /// `Range(1, 2)` gives 4,6.
    pub fn compose(&self, inner: &Range) -> Result<Range> {
        inner.check_in_range(self.length)?;
        Ok(Range {
            start: self.start + inner.start * self.stride,
            length: inner.length,
            stride: self.stride * inner.stride,
        })
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last() {
            // inclusive bounds one below the start select nothing
            None if self.stride == 1 => write!(f, "{}:{}", self.start, self.start as i64 - 1),
            None => write!(f, "{}:{}:{}", self.start, self.start as i64 - 1, self.stride),
            Some(last) if self.stride == 1 || self.length == 1 => {
                write!(f, "{}:{}", self.start, last)
            }
            Some(last) => write!(f, "{}:{}:{}", self.start, last, self.stride),
        }
    }
}

/// One range per dimension; `None` stands for the whole dimension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Section {
    ranges: Vec<Option<Range>>,
}

impl Section {
    /// Create a section with an explicit range for every dimension.
    pub fn new(ranges: Vec<Range>) -> Self {
        Self {
            ranges: ranges.into_iter().map(Some).collect(),
        }
    }

    /// Create a section where `None` leaves a dimension to be filled.
    pub fn with_omitted(ranges: Vec<Option<Range>>) -> Self {
        Self { ranges }
    }

    /// The section covering all of `shape`.
    pub fn full(shape: &[usize]) -> Self {
        Self::new(shape.iter().map(|&extent| Range::full(extent)).collect())
    }

    /// Create from a corner and a count per dimension (unit stride).
    pub fn from_origin_shape(origin: &[usize], shape: &[usize]) -> Result<Self> {
        if origin.len() != shape.len() {
            return Err(ArrayIoError::invalid_section(format!(
                "origin rank {} != shape rank {}",
                origin.len(),
                shape.len()
            )));
        }
        let ranges = origin
            .iter()
            .zip(shape)
            .map(|(&o, &n)| Range::new(o as i64, n as i64))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(ranges))
    }

    pub fn rank(&self) -> usize {
        self.ranges.len()
    }

    pub fn ranges(&self) -> &[Option<Range>] {
        &self.ranges
    }

    /// Range of dimension `i`; `None` if omitted or past the rank.
    pub fn range(&self, i: usize) -> Option<&Range> {
        self.ranges.get(i).and_then(|r| r.as_ref())
    }

    /// Check if no dimension is omitted.
    pub fn is_filled(&self) -> bool {
        self.ranges.iter().all(Option::is_some)
    }

    /// Replace omitted ranges with full ranges of `shape` and validate the rest.
    ///
    /// An empty section fills to the whole shape. Otherwise the ranks must
    /// agree and every explicit range must lie within its extent.
    pub fn fill(&self, shape: &[usize]) -> Result<Section> {
        Ok(Section::new(self.filled_ranges(shape)?))
    }

    /// Like [`fill`](Self::fill), returning the ranges directly.
    pub fn filled_ranges(&self, shape: &[usize]) -> Result<Vec<Range>> {
        if self.ranges.is_empty() {
            return Ok(shape.iter().map(|&extent| Range::full(extent)).collect());
        }
        if self.ranges.len() != shape.len() {
            return Err(ArrayIoError::invalid_section(format!(
                "section rank {} != shape rank {}",
                self.ranges.len(),
                shape.len()
            )));
        }
        self.ranges
            .iter()
            .zip(shape)
            .enumerate()
            .map(|(dim, (range, &extent))| match range {
                None => Ok(Range::full(extent)),
                Some(r) => {
                    r.check_in_range(extent).map_err(|e| {
                        ArrayIoError::invalid_section(format!("dimension {}: {}", dim, e))
                    })?;
                    Ok(*r)
                }
            })
            .collect()
    }

    /// Validate this section against `shape` without filling it.
    pub fn check_in_range(&self, shape: &[usize]) -> Result<()> {
        self.filled_ranges(shape).map(|_| ())
    }

    /// Number of elements selected, or `None` if any dimension is omitted.
    pub fn compute_size(&self) -> Option<u64> {
        self.ranges
            .iter()
            .map(|r| r.map(|r| r.length() as u64))
            .product()
    }

    /// Lengths of the ranges, or `None` if any dimension is omitted.
    pub fn shape(&self) -> Option<Vec<usize>> {
        self.ranges.iter().map(|r| r.map(|r| r.length())).collect()
    }

    /// Starting index of each range, or `None` if any dimension is omitted.
    pub fn origin(&self) -> Option<Vec<usize>> {
        self.ranges.iter().map(|r| r.map(|r| r.start())).collect()
    }

    /// Check if this section selects all of `shape` with unit stride.
    pub fn is_equivalent(&self, shape: &[usize]) -> bool {
        self.ranges.len() == shape.len()
            && self
                .ranges
                .iter()
                .zip(shape)
                .all(|(r, &extent)| r.map_or(true, |r| r.is_full(extent)))
    }

    /// Check if any explicit range has stride > 1.
    pub fn is_strided(&self) -> bool {
        self.ranges.iter().flatten().any(|r| r.stride() > 1)
    }

    /// Combine with `inner`, a section of the view this section selects.
    ///
    /// `self` must be filled. The result addresses the same elements in the
    /// coordinates of the original shape.
    pub fn compose(&self, inner: &Section) -> Result<Section> {
        let view_shape = self.shape().ok_or_else(|| {
            ArrayIoError::invalid_section(format!("cannot compose onto unfilled section {}", self))
        })?;
        let inner = inner.filled_ranges(&view_shape)?;
        let ranges = self
            .ranges
            .iter()
            .flatten()
            .zip(&inner)
            .map(|(outer, inner)| outer.compose(inner))
            .collect::<Result<Vec<_>>>()?;
        Ok(Section::new(ranges))
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            match range {
                Some(r) => write!(f, "{}", r)?,
                None => write!(f, ":")?,
            }
        }
        Ok(())
    }
}

impl FromStr for Section {
    type Err = ArrayIoError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Section::default());
        }
        let ranges = s
            .split(',')
            .map(|part| parse_range(part.trim()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Section::with_omitted(ranges))
    }
}

fn parse_range(text: &str) -> Result<Option<Range>> {
    if text == ":" || text == "*" {
        return Ok(None);
    }
    let fields = text
        .split(':')
        .map(|t| {
            t.trim()
                .parse::<i64>()
                .map_err(|_| ArrayIoError::invalid_section(format!("bad range '{}'", text)))
        })
        .collect::<Result<Vec<_>>>()?;
    let range = match fields.as_slice() {
        [index] => Range::new(*index, 1)?,
        [first, last] if *last == first - 1 => Range::new(*first, 0)?,
        [first, last] => Range::from_bounds(*first, *last, 1)?,
        [first, last, stride] if *last == first - 1 => Range::strided(*first, 0, *stride)?,
        [first, last, stride] => Range::from_bounds(*first, *last, *stride)?,
        _ => {
            return Err(ArrayIoError::invalid_section(format!(
                "bad range '{}'",
                text
            )))
        }
    };
    Ok(Some(range))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_rejects_bad_arguments() {
        assert!(Range::new(-1, 3).is_err());
        assert!(Range::new(0, -1).is_err());
        assert!(Range::strided(0, 3, 0).is_err());
        assert!(Range::from_bounds(4, 2, 1).is_err());
    }

    #[test]
    fn test_range_elements() {
        let r = Range::strided(2, 5, 2).unwrap();
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![2, 4, 6, 8, 10]);
        assert_eq!(r.last(), Some(10));
        assert_eq!(r.element(3).unwrap(), 8);
        assert!(r.element(5).is_err());
    }

    #[test]
    fn test_range_from_bounds_rounds_down() {
        let r = Range::from_bounds(0, 9, 4).unwrap();
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![0, 4, 8]);
    }

    #[test]
    fn test_range_in_range_checks() {
        assert!(Range::new(0, 4).unwrap().check_in_range(4).is_ok());
        assert!(Range::new(1, 4).unwrap().check_in_range(4).is_err());
        assert!(Range::strided(0, 3, 2).unwrap().check_in_range(5).is_ok());
        assert!(Range::strided(0, 3, 2).unwrap().check_in_range(4).is_err());
        // empty ranges may start at the extent
        assert!(Range::new(4, 0).unwrap().check_in_range(4).is_ok());
        assert!(Range::new(5, 0).unwrap().check_in_range(4).is_err());
    }

    #[test]
    fn test_range_compose() {
        let outer = Range::strided(2, 5, 2).unwrap();
        let inner = Range::new(1, 2).unwrap();
        let composed = outer.compose(&inner).unwrap();
        assert_eq!(composed.iter().collect::<Vec<_>>(), vec![4, 6]);

        let strided_inner = Range::strided(0, 3, 2).unwrap();
        let composed = outer.compose(&strided_inner).unwrap();
        assert_eq!(composed.iter().collect::<Vec<_>>(), vec![2, 6, 10]);

        assert!(outer.compose(&Range::new(4, 2).unwrap()).is_err());
    }

    #[test]
    fn test_fill_substitutes_omitted() {
        let section = Section::with_omitted(vec![Some(Range::new(1, 2).unwrap()), None]);
        let filled = section.fill(&[4, 5]).unwrap();
        assert!(filled.is_filled());
        assert_eq!(filled.range(1), Some(&Range::full(5)));
        assert_eq!(filled.compute_size(), Some(10));
        assert_eq!(filled.shape(), Some(vec![2, 5]));
    }

    #[test]
    fn test_fill_empty_section_is_whole_shape() {
        let filled = Section::default().fill(&[3, 4]).unwrap();
        assert!(filled.is_equivalent(&[3, 4]));
    }

    #[test]
    fn test_fill_rejects_out_of_bounds() {
        let section = Section::new(vec![Range::new(0, 2).unwrap(), Range::new(3, 3).unwrap()]);
        let err = section.fill(&[2, 5]).unwrap_err();
        assert!(matches!(err, ArrayIoError::InvalidSection(_)));

        let wrong_rank = Section::new(vec![Range::new(0, 1).unwrap()]);
        assert!(wrong_rank.fill(&[2, 5]).is_err());
    }

    #[test]
    fn test_is_equivalent() {
        assert!(Section::full(&[2, 3]).is_equivalent(&[2, 3]));
        let partial = Section::new(vec![Range::new(0, 2).unwrap(), Range::new(1, 1).unwrap()]);
        assert!(!partial.is_equivalent(&[2, 3]));
    }

    #[test]
    fn test_section_compose() {
        let outer = Section::from_str("2:9,0:9:3").unwrap().fill(&[10, 10]).unwrap();
        let inner = Section::from_str("1:2,1:2").unwrap();
        let composed = outer.compose(&inner).unwrap();
        assert_eq!(composed.to_string(), "3:4,3:6:3");

        // omitted inner ranges cover the whole view
        let all = outer.compose(&Section::default()).unwrap();
        assert_eq!(all, outer);

        let unfilled = Section::from_str(":,1").unwrap();
        assert!(unfilled.compose(&inner).is_err());
    }

    #[test]
    fn test_parse_and_display() {
        let section: Section = "1:2, :, 0:8:2, 7".parse().unwrap();
        assert_eq!(section.rank(), 4);
        assert_eq!(section.range(1), None);
        assert_eq!(section.range(2).unwrap().length(), 5);
        assert_eq!(section.range(3).unwrap().length(), 1);
        assert_eq!(section.to_string(), "1:2,:,0:8:2,7:7");
        assert!(section.is_strided());

        assert!("1:x".parse::<Section>().is_err());
        assert!("1:2:3:4".parse::<Section>().is_err());
        assert!("3:1".parse::<Section>().is_err());
    }

    #[test]
    fn test_empty_range_text_parses_back() {
        let section = Section::new(vec![
            Range::new(0, 0).unwrap(),
            Range::strided(2, 0, 3).unwrap(),
            Range::new(1, 2).unwrap(),
        ]);
        let text = section.to_string();
        assert_eq!(text, "0:-1,2:1:3,1:2");
        let back: Section = text.parse().unwrap();
        assert_eq!(back, section);
        assert_eq!(back.compute_size(), Some(0));
    }
}
