//! Row-selection views over another column.

use std::any::Any;
use std::sync::Arc;

use crate::column::{Column, ColumnImpl};
use crate::error::{Error, Result};
use crate::types::Stype;
use crate::vcol::positional_accessors;

/// Arithmetic row selection: output row `i` reads source row
/// `start + i * step`.
#[derive(Debug)]
pub struct SliceViewColumn {
    source: Column,
    start: usize,
    count: usize,
    step: isize,
}

impl SliceViewColumn {
    pub fn new(source: Column, start: usize, count: usize, step: isize) -> Self {
        SliceViewColumn {
            source,
            start,
            count,
            step,
        }
    }

    /// Slice this view: the two arithmetic selections compose into one view
    /// straight over the original source.
    pub fn compose(&self, start: usize, count: usize, step: isize) -> Column {
        if count == 0 {
            return Column::new(SliceViewColumn::new(self.source.clone(), 0, 0, 1));
        }
        let new_start = self.start as isize + start as isize * self.step;
        debug_assert!(new_start >= 0);
        Column::new(SliceViewColumn::new(
            self.source.clone(),
            new_start as usize,
            count,
            step * self.step,
        ))
    }

    fn resolve(&self, row: usize) -> Option<(&Column, usize)> {
        debug_assert!(row < self.count);
        let src = self.start as isize + row as isize * self.step;
        debug_assert!(src >= 0);
        Some((&self.source, src as usize))
    }
}

impl ColumnImpl for SliceViewColumn {
    fn nrows(&self) -> usize {
        self.count
    }

    fn stype(&self) -> Stype {
        self.source.stype()
    }

    fn is_virtual(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn children(&self) -> Vec<Column> {
        vec![self.source.clone()]
    }

    fn verify_impl(&self) -> Result<()> {
        crate::rowindex::RowIndex::slice(self.start, self.count, self.step)
            .check_bounds(self.source.nrows())
            .map_err(|err| Error::Integrity(format!("slice view out of range: {}", err)))
    }

    positional_accessors!();
}

#[derive(Debug)]
enum Indices {
    Arr32(Arc<[i32]>),
    Arr64(Arc<[i64]>),
}

/// Explicit row selection through a shared index array; negative entries mark
/// the output row missing.
#[derive(Debug)]
pub struct ArrayViewColumn {
    source: Column,
    indices: Indices,
}

impl ArrayViewColumn {
    pub fn new32(source: Column, indices: Arc<[i32]>) -> Self {
        ArrayViewColumn {
            source,
            indices: Indices::Arr32(indices),
        }
    }

    pub fn new64(source: Column, indices: Arc<[i64]>) -> Self {
        ArrayViewColumn {
            source,
            indices: Indices::Arr64(indices),
        }
    }

    fn resolve(&self, row: usize) -> Option<(&Column, usize)> {
        let src = match &self.indices {
            Indices::Arr32(a) => a[row] as i64,
            Indices::Arr64(a) => a[row],
        };
        (src >= 0).then(|| (&self.source, src as usize))
    }
}

impl ColumnImpl for ArrayViewColumn {
    fn nrows(&self) -> usize {
        match &self.indices {
            Indices::Arr32(a) => a.len(),
            Indices::Arr64(a) => a.len(),
        }
    }

    fn stype(&self) -> Stype {
        self.source.stype()
    }

    fn is_virtual(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn children(&self) -> Vec<Column> {
        vec![self.source.clone()]
    }

    fn verify_impl(&self) -> Result<()> {
        let nrows = self.source.nrows();
        let check = |idx: i64| -> Result<()> {
            if idx >= 0 && idx as usize >= nrows {
                return Err(Error::Integrity(format!(
                    "array view index {} out of range for {} source rows",
                    idx, nrows
                )));
            }
            Ok(())
        };
        match &self.indices {
            Indices::Arr32(a) => a.iter().try_for_each(|&v| check(v as i64)),
            Indices::Arr64(a) => a.iter().try_for_each(|&v| check(v)),
        }
    }

    positional_accessors!();
}
