//! Row shifting (lag and lead).

use std::any::Any;

use crate::column::{Column, ColumnImpl};
use crate::error::{Error, Result};
use crate::types::Stype;
use crate::vcol::positional_accessors;

/// Output row `i` reads source row `i - offset`; a positive offset lags, a
/// negative one leads. Vacated rows read row 0 of the fill column, or are
/// missing when no fill was given.
#[derive(Debug)]
pub struct ShiftColumn {
    source: Column,
    offset: isize,
    fill: Option<Column>,
}

/// A shifted view of `source`. `fill`, when present, must be a single-row
/// column of the same element type, broadcast into the vacated rows.
pub fn shift(source: &Column, offset: isize, fill: Option<&Column>) -> Result<Column> {
    if let Some(fill) = fill {
        if fill.stype() != source.stype() {
            return Err(Error::TypeMismatch {
                expected: source.stype(),
                found: fill.stype(),
            });
        }
        if fill.nrows() != 1 {
            return Err(Error::LengthMismatch {
                expected: 1,
                actual: fill.nrows(),
            });
        }
    }
    Ok(Column::new(ShiftColumn {
        source: source.clone(),
        offset,
        fill: fill.cloned(),
    }))
}

impl ShiftColumn {
    fn resolve(&self, row: usize) -> Option<(&Column, usize)> {
        let src = row as isize - self.offset;
        if src >= 0 && (src as usize) < self.source.nrows() {
            Some((&self.source, src as usize))
        } else {
            self.fill.as_ref().map(|f| (f, 0))
        }
    }
}

impl ColumnImpl for ShiftColumn {
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
        let mut children = vec![self.source.clone()];
        if let Some(fill) = &self.fill {
            children.push(fill.clone());
        }
        children
    }

    positional_accessors!();
}
