//! Missing-value replacement.

use std::any::Any;

use crate::column::{Column, ColumnImpl};
use crate::error::{Error, Result};
use crate::types::Stype;
use crate::vcol::positional_accessors;

/// Valid source rows pass through; missing rows read the replacement column
/// instead. The replacement's own validity decides the output: a missing
/// replacement value leaves the row missing.
#[derive(Debug)]
pub struct FillNaColumn {
    source: Column,
    replacement: Column,
}

/// A view of `source` with missing rows drawn from `replacement`, which must
/// have the same element type and be either full-length or a single broadcast
/// row.
pub fn fillna(source: &Column, replacement: &Column) -> Result<Column> {
    if replacement.stype() != source.stype() {
        return Err(Error::TypeMismatch {
            expected: source.stype(),
            found: replacement.stype(),
        });
    }
    if replacement.nrows() != source.nrows() && replacement.nrows() != 1 {
        return Err(Error::LengthMismatch {
            expected: source.nrows(),
            actual: replacement.nrows(),
        });
    }
    Ok(Column::new(FillNaColumn {
        source: source.clone(),
        replacement: replacement.clone(),
    }))
}

impl FillNaColumn {
    fn resolve(&self, row: usize) -> Option<(&Column, usize)> {
        if self.source.is_valid(row) {
            return Some((&self.source, row));
        }
        let src = if self.replacement.nrows() == 1 { 0 } else { row };
        Some((&self.replacement, src))
    }
}

impl ColumnImpl for FillNaColumn {
    fn nrows(&self) -> usize {
        self.source.nrows()
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
        vec![self.source.clone(), self.replacement.clone()]
    }

    positional_accessors!();
}
