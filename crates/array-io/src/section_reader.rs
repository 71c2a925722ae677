//! Logical sections of a variable.
//!
//! A [`SectionReader`] presents a fixed section of an original variable as a
//! variable of its own. Requests against the logical view are composed into
//! sections of the original before any layout is planned.

use crate::error::{ArrayIoError, Result};
use crate::layout::Layout;
use crate::section::Section;

/// A view of `section` within a variable of shape `orig_shape`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionReader {
    orig_shape: Vec<usize>,
    section: Section,
    shape: Vec<usize>,
}

impl SectionReader {
    /// Fill and validate `section` against the original shape.
    pub fn new(orig_shape: &[usize], section: &Section) -> Result<Self> {
        let section = section.fill(orig_shape)?;
        let shape = section.shape().ok_or_else(|| {
            ArrayIoError::invalid_section(format!("section {} is not filled", section))
        })?;
        Ok(Self {
            orig_shape: orig_shape.to_vec(),
            section,
            shape,
        })
    }

    /// Shape of the logical view.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Shape of the original variable.
    pub fn orig_shape(&self) -> &[usize] {
        &self.orig_shape
    }

    /// The filled section of the original variable.
    pub fn section(&self) -> &Section {
        &self.section
    }

    /// Translate a request against the view into a section of the original.
    pub fn resolve(&self, want: Option<&Section>) -> Result<Section> {
        match want {
            Some(want) => self.section.compose(want),
            None => Ok(self.section.clone()),
        }
    }

    /// Regular layout over the original variable for a request against the view.
    pub fn layout(&self, start_pos: u64, elem_size: usize, want: Option<&Section>) -> Result<Layout> {
        let resolved = self.resolve(want)?;
        Layout::regular(start_pos, elem_size, &self.orig_shape, Some(&resolved))
    }
}
