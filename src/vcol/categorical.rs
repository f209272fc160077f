//! Dictionary-encoded columns.

use std::any::Any;

use crate::column::{Column, ColumnImpl};
use crate::error::{Error, Result};
use crate::types::Stype;
use crate::vcol::positional_accessors;

/// Row `i` reads `values[codes[i]]`; a missing code leaves the row missing.
/// The codes column is int8, int16 or int32 depending on the dictionary size.
#[derive(Debug)]
pub struct CategoricalColumn {
    codes: Column,
    values: Column,
}

/// A dictionary-encoded view: `codes` selects rows of the `values`
/// dictionary. Every valid code is range-checked here, once.
pub fn categorical(codes: &Column, values: &Column) -> Result<Column> {
    if !matches!(codes.stype(), Stype::Int8 | Stype::Int16 | Stype::Int32) {
        return Err(Error::TypeMismatch {
            expected: Stype::Int32,
            found: codes.stype(),
        });
    }
    let limit = values.nrows();
    for row in 0..codes.nrows() {
        if let Some(code) = read_code(codes, row) {
            if code < 0 || code as usize >= limit {
                return Err(Error::IndexOutOfBounds {
                    index: code.unsigned_abs() as usize,
                    size: limit,
                });
            }
        }
    }
    Ok(Column::new(CategoricalColumn {
        codes: codes.clone(),
        values: values.clone(),
    }))
}

fn read_code(codes: &Column, row: usize) -> Option<i64> {
    match codes.stype() {
        Stype::Int8 => codes.get_int8(row).map(i64::from),
        Stype::Int16 => codes.get_int16(row).map(i64::from),
        Stype::Int32 => codes.get_int32(row).map(i64::from),
        _ => None,
    }
}

impl CategoricalColumn {
    fn resolve(&self, row: usize) -> Option<(&Column, usize)> {
        let code = read_code(&self.codes, row)?;
        Some((&self.values, code as usize))
    }
}

impl ColumnImpl for CategoricalColumn {
    fn nrows(&self) -> usize {
        self.codes.nrows()
    }

    fn stype(&self) -> Stype {
        self.values.stype()
    }

    fn is_virtual(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn children(&self) -> Vec<Column> {
        vec![self.codes.clone(), self.values.clone()]
    }

    fn verify_impl(&self) -> Result<()> {
        let limit = self.values.nrows();
        for row in 0..self.codes.nrows() {
            if let Some(code) = read_code(&self.codes, row) {
                if code < 0 || code as usize >= limit {
                    return Err(Error::Integrity(format!(
                        "categorical code {} out of range for {} dictionary rows",
                        code, limit
                    )));
                }
            }
        }
        Ok(())
    }

    positional_accessors!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorical_str() {
        let codes = Column::from_options(vec![Some(1i8), Some(0), None, Some(1)]).unwrap();
        let values =
            Column::from_strings(vec![Some("low".to_string()), Some("high".to_string())]).unwrap();
        let cat = categorical(&codes, &values).unwrap();
        assert_eq!(cat.stype(), Stype::Str);
        assert_eq!(cat.get::<String>(0), Some("high".to_string()));
        assert_eq!(cat.get::<String>(1), Some("low".to_string()));
        assert_eq!(cat.get::<String>(2), None);
        assert_eq!(cat.get::<String>(3), Some("high".to_string()));
    }

    #[test]
    fn test_wide_codes() {
        let codes = Column::from_vec(vec![0i32, 1, 1]).unwrap();
        let values = Column::from_vec(vec![2.5f64, 7.5]).unwrap();
        let cat = categorical(&codes, &values).unwrap();
        assert_eq!(cat.get::<f64>(2), Some(7.5));
    }

    #[test]
    fn test_out_of_range_code_rejected() {
        let codes = Column::from_vec(vec![0i8, 2]).unwrap();
        let values = Column::from_vec(vec![1i64, 2]).unwrap();
        assert!(categorical(&codes, &values).is_err());
    }

    #[test]
    fn test_code_type_checked() {
        let codes = Column::from_vec(vec![0i64]).unwrap();
        let values = Column::from_vec(vec![1i64]).unwrap();
        assert!(categorical(&codes, &values).is_err());
    }
}
