//! Row-major iteration over a multidimensional selection.
//!
//! An [`Odometer`] walks every index tuple of a list of [`Slice`]s, last
//! dimension fastest, the way a car odometer rolls its digits.

use crate::error::{PointNestError, Result};

/// A strided selection along one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slice {
    /// First selected index.
    pub start: usize,
    /// Number of selected indices.
    pub count: usize,
    /// Step between selected indices, at least 1.
    pub stride: usize,
}

impl Slice {
    /// Create a slice. The stride must be at least 1.
    pub fn new(start: usize, count: usize, stride: usize) -> Result<Self> {
        if stride == 0 {
            return Err(PointNestError::InvalidSlice(format!(
                "stride must be at least 1 (start {}, count {})",
                start, count
            )));
        }
        Ok(Self {
            start,
            count,
            stride,
        })
    }

    /// A contiguous slice.
    pub fn range(start: usize, count: usize) -> Self {
        Self {
            start,
            count,
            stride: 1,
        }
    }

    /// Every index of a dimension of length `len`.
    pub fn full(len: usize) -> Self {
        Self::range(0, len)
    }

    /// A single index.
    pub fn point(index: usize) -> Self {
        Self::range(index, 1)
    }

    /// The `k`-th selected index, or `None` if it does not fit in a `usize`.
    pub fn index(&self, k: usize) -> Option<usize> {
        k.checked_mul(self.stride)?.checked_add(self.start)
    }

    /// The last selected index. `None` for an empty slice or one whose last
    /// index does not fit in a `usize`.
    pub fn last_index(&self) -> Option<usize> {
        self.count.checked_sub(1).and_then(|k| self.index(k))
    }

    /// Check that every selected index lies in `[0, len)`.
    pub fn check_bounds(&self, name: &str, len: usize) -> Result<()> {
        if self.count == 0 {
            return Ok(());
        }
        match self.last_index() {
            Some(last) if last < len => Ok(()),
            Some(last) => Err(PointNestError::out_of_bounds(name, last, len)),
            None => Err(self.overflow(name)),
        }
    }

    fn overflow(&self, name: &str) -> PointNestError {
        PointNestError::InvalidSlice(format!(
            "selection on '{}' overflows (start {}, count {}, stride {})",
            name, self.start, self.count, self.stride
        ))
    }
}

/// Iterator over the index tuples of a selection, in row-major order.
///
/// A selection of rank 0 yields exactly one empty tuple. A selection with any
/// zero count yields nothing.
#[derive(Debug, Clone)]
pub struct Odometer {
    slices: Vec<Slice>,
    counter: Vec<usize>,
    emitted: usize,
    total: usize,
}

impl Odometer {
    /// Create an odometer over `slices`.
    ///
    /// Fails if a selected index or the number of tuples does not fit in a
    /// `usize`.
    pub fn new(slices: Vec<Slice>) -> Result<Self> {
        if let Some(bad) = slices
            .iter()
            .find(|s| s.count > 0 && s.last_index().is_none())
        {
            return Err(bad.overflow("odometer"));
        }
        let total = slices
            .iter()
            .try_fold(1usize, |acc, s| acc.checked_mul(s.count))
            .ok_or_else(|| {
                PointNestError::InvalidSlice(format!(
                    "selection of {:?} has too many elements",
                    slices.iter().map(|s| s.count).collect::<Vec<_>>()
                ))
            })?;
        Ok(Self {
            counter: vec![0; slices.len()],
            slices,
            emitted: 0,
            total,
        })
    }

    /// Number of tuples produced over a full pass.
    pub fn total_size(&self) -> usize {
        self.total
    }

    /// The selection being walked.
    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    /// Start again from the first tuple.
    pub fn reset(&mut self) {
        self.counter.iter_mut().for_each(|c| *c = 0);
        self.emitted = 0;
    }

    /// Roll the counter forward one step, carrying into outer dimensions.
    fn advance(&mut self) {
        for dim in (0..self.counter.len()).rev() {
            self.counter[dim] += 1;
            if self.counter[dim] < self.slices[dim].count {
                return;
            }
            self.counter[dim] = 0;
        }
    }
}

impl Iterator for Odometer {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.emitted >= self.total {
            return None;
        }
        let tuple = self
            .slices
            .iter()
            .zip(&self.counter)
            .map(|(s, &k)| s.index(k))
            .collect::<Option<Vec<_>>>()?;
        self.emitted += 1;
        self.advance();
        Some(tuple)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total - self.emitted;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Odometer {}

/// Row-major offset of `index` within an array of `shape`.
pub fn flat_offset(index: &[usize], shape: &[usize]) -> usize {
    index
        .iter()
        .zip(shape)
        .fold(0, |acc, (&i, &len)| acc * len + i)
}
