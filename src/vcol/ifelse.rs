//! Conditional row selection.

use std::any::Any;

use crate::column::{Column, ColumnImpl};
use crate::error::{Error, Result};
use crate::types::Stype;
use crate::vcol::positional_accessors;

/// Row `i` reads the true branch when the condition is valid and non-zero,
/// the false branch when it is valid and zero, and is missing when the
/// condition itself is missing.
#[derive(Debug)]
pub struct IfElseColumn {
    cond: Column,
    iftrue: Column,
    iffalse: Column,
}

/// A conditional merge of two same-typed columns. The condition must be int8;
/// each branch is either full-length or a single broadcast row.
pub fn ifelse(cond: &Column, iftrue: &Column, iffalse: &Column) -> Result<Column> {
    if cond.stype() != Stype::Int8 {
        return Err(Error::TypeMismatch {
            expected: Stype::Int8,
            found: cond.stype(),
        });
    }
    if iftrue.stype() != iffalse.stype() {
        return Err(Error::TypeMismatch {
            expected: iftrue.stype(),
            found: iffalse.stype(),
        });
    }
    let nrows = cond.nrows();
    for branch in [iftrue, iffalse] {
        if branch.nrows() != nrows && branch.nrows() != 1 {
            return Err(Error::LengthMismatch {
                expected: nrows,
                actual: branch.nrows(),
            });
        }
    }
    Ok(Column::new(IfElseColumn {
        cond: cond.clone(),
        iftrue: iftrue.clone(),
        iffalse: iffalse.clone(),
    }))
}

impl IfElseColumn {
    fn resolve(&self, row: usize) -> Option<(&Column, usize)> {
        let branch = if self.cond.get_int8(row)? != 0 {
            &self.iftrue
        } else {
            &self.iffalse
        };
        let src = if branch.nrows() == 1 { 0 } else { row };
        Some((branch, src))
    }
}

impl ColumnImpl for IfElseColumn {
    fn nrows(&self) -> usize {
        self.cond.nrows()
    }

    fn stype(&self) -> Stype {
        self.iftrue.stype()
    }

    fn is_virtual(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn children(&self) -> Vec<Column> {
        vec![self.cond.clone(), self.iftrue.clone(), self.iffalse.clone()]
    }

    positional_accessors!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ifelse() {
        let cond = Column::from_options(vec![Some(1i8), Some(0), None]).unwrap();
        let yes = Column::from_vec(vec![10i64, 11, 12]).unwrap();
        let no = Column::from_vec(vec![20i64, 21, 22]).unwrap();
        let merged = ifelse(&cond, &yes, &no).unwrap();
        assert_eq!(merged.get::<i64>(0), Some(10));
        assert_eq!(merged.get::<i64>(1), Some(21));
        assert_eq!(merged.get::<i64>(2), None);
    }

    #[test]
    fn test_broadcast_branch() {
        let cond = Column::from_vec(vec![1i8, 0, 1]).unwrap();
        let yes = Column::from_vec(vec![7i32]).unwrap();
        let no = Column::from_vec(vec![1i32, 2, 3]).unwrap();
        let merged = ifelse(&cond, &yes, &no).unwrap();
        assert_eq!(merged.get::<i32>(0), Some(7));
        assert_eq!(merged.get::<i32>(1), Some(2));
        assert_eq!(merged.get::<i32>(2), Some(7));
    }

    #[test]
    fn test_branch_types_must_match() {
        let cond = Column::from_vec(vec![1i8]).unwrap();
        let yes = Column::from_vec(vec![1i32]).unwrap();
        let no = Column::from_vec(vec![1i64]).unwrap();
        assert!(ifelse(&cond, &yes, &no).is_err());
    }
}
