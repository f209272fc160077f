//! Row-selection descriptors.
//!
//! A `RowIndex` describes which rows of a column a view selects, without
//! copying any data: either an arithmetic slice or an explicit array of row
//! positions. Index arrays are shared by reference; a negative entry marks
//! the output position as missing.

use std::sync::Arc;

use crate::error::{Error, Result};

/// Immutable, shareable description of a row selection.
#[derive(Debug, Clone)]
pub enum RowIndex {
    /// Selects every row unchanged.
    Identity,
    /// Arithmetic selection: output row `i` reads input row `start + i*step`.
    Slice {
        start: usize,
        count: usize,
        step: isize,
    },
    /// Explicit 32-bit row positions; negative marks missing.
    Arr32(Arc<[i32]>),
    /// Explicit 64-bit row positions; negative marks missing.
    Arr64(Arc<[i64]>),
}

impl RowIndex {
    pub fn identity() -> Self {
        RowIndex::Identity
    }

    /// An arithmetic slice. Validity against a concrete column length is
    /// checked when the index is applied.
    pub fn slice(start: usize, count: usize, step: isize) -> Self {
        RowIndex::Slice { start, count, step }
    }

    pub fn from_indices32(indices: Vec<i32>) -> Self {
        RowIndex::Arr32(indices.into())
    }

    pub fn from_indices64(indices: Vec<i64>) -> Self {
        RowIndex::Arr64(indices.into())
    }

    /// Number of selected rows; `None` for the identity selection, whose
    /// length is that of whatever it is applied to.
    pub fn len(&self) -> Option<usize> {
        match self {
            RowIndex::Identity => None,
            RowIndex::Slice { count, .. } => Some(*count),
            RowIndex::Arr32(a) => Some(a.len()),
            RowIndex::Arr64(a) => Some(a.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Source row selected for output position `i`; `None` marks missing.
    pub fn get(&self, i: usize) -> Option<usize> {
        match self {
            RowIndex::Identity => Some(i),
            RowIndex::Slice { start, count, step } => {
                debug_assert!(i < *count);
                let row = *start as isize + i as isize * step;
                (row >= 0).then_some(row as usize)
            }
            RowIndex::Arr32(a) => {
                let idx = a[i];
                (idx >= 0).then_some(idx as usize)
            }
            RowIndex::Arr64(a) => {
                let idx = a[i];
                (idx >= 0).then_some(idx as usize)
            }
        }
    }

    /// Check every selected position against a column of `nrows` rows.
    pub fn check_bounds(&self, nrows: usize) -> Result<()> {
        match self {
            RowIndex::Identity => Ok(()),
            RowIndex::Slice { start, count, step } => {
                if *count == 0 {
                    return Ok(());
                }
                let first = *start as isize;
                let last = first + (*count as isize - 1) * step;
                let lo = first.min(last);
                let hi = first.max(last);
                if lo < 0 || hi as usize >= nrows {
                    return Err(Error::IndexOutOfBounds {
                        index: hi.max(lo.abs()) as usize,
                        size: nrows,
                    });
                }
                Ok(())
            }
            RowIndex::Arr32(a) => check_array(a.iter().map(|&v| v as i64), nrows),
            RowIndex::Arr64(a) => check_array(a.iter().copied(), nrows),
        }
    }
}

fn check_array(indices: impl Iterator<Item = i64>, nrows: usize) -> Result<()> {
    for idx in indices {
        // Negative entries mean missing, not out-of-range.
        if idx >= 0 && idx as usize >= nrows {
            return Err(Error::IndexOutOfBounds {
                index: idx as usize,
                size: nrows,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_positions() {
        let ri = RowIndex::slice(2, 4, 3);
        assert_eq!(ri.len(), Some(4));
        let rows: Vec<_> = (0..4).map(|i| ri.get(i)).collect();
        assert_eq!(rows, vec![Some(2), Some(5), Some(8), Some(11)]);
        ri.check_bounds(12).unwrap();
        assert!(ri.check_bounds(11).is_err());
    }

    #[test]
    fn test_descending_slice() {
        let ri = RowIndex::slice(5, 3, -2);
        let rows: Vec<_> = (0..3).map(|i| ri.get(i)).collect();
        assert_eq!(rows, vec![Some(5), Some(3), Some(1)]);
        ri.check_bounds(6).unwrap();
    }

    #[test]
    fn test_array_with_missing() {
        let ri = RowIndex::from_indices32(vec![3, -1, 0]);
        assert_eq!(ri.get(0), Some(3));
        assert_eq!(ri.get(1), None);
        assert_eq!(ri.get(2), Some(0));
        ri.check_bounds(4).unwrap();
        assert!(ri.check_bounds(3).is_err());
    }

    #[test]
    fn test_identity() {
        let ri = RowIndex::identity();
        assert_eq!(ri.len(), None);
        assert_eq!(ri.get(17), Some(17));
        ri.check_bounds(1).unwrap();
    }
}
