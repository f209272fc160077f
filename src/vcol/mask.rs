//! Validity masking.

use std::any::Any;

use crate::column::{Column, ColumnImpl};
use crate::error::{Error, Result};
use crate::types::Stype;
use crate::vcol::positional_accessors;

/// Passes source values through where the mask is true; every other row is
/// missing (a missing mask entry masks the row out too).
#[derive(Debug)]
pub struct MaskColumn {
    source: Column,
    mask: Column,
}

/// A view of `source` keeping only rows whose `mask` entry is valid and
/// non-zero. The mask must be an int8 column of the same length.
pub fn mask_apply(source: &Column, mask: &Column) -> Result<Column> {
    if mask.stype() != Stype::Int8 {
        return Err(Error::TypeMismatch {
            expected: Stype::Int8,
            found: mask.stype(),
        });
    }
    if mask.nrows() != source.nrows() {
        return Err(Error::LengthMismatch {
            expected: source.nrows(),
            actual: mask.nrows(),
        });
    }
    Ok(Column::new(MaskColumn {
        source: source.clone(),
        mask: mask.clone(),
    }))
}

impl MaskColumn {
    fn resolve(&self, row: usize) -> Option<(&Column, usize)> {
        match self.mask.get_int8(row) {
            Some(flag) if flag != 0 => Some((&self.source, row)),
            _ => None,
        }
    }
}

impl ColumnImpl for MaskColumn {
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
        vec![self.source.clone(), self.mask.clone()]
    }

    positional_accessors!();
}
