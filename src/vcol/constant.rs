//! Constant columns: every row holds the same value (or is missing).

use std::any::Any;

use crate::column::{scalar_accessors, Column, ColumnImpl};
use crate::types::{same_element, Scalar, Stype};

/// `nrows` copies of one fixed-width value. Length changes are O(1) because no
/// per-row state exists.
#[derive(Debug)]
pub struct ConstColumn<T: Scalar> {
    value: Option<T>,
    nrows: usize,
}

/// A fixed-width constant column.
pub fn constant<T: Scalar>(value: Option<T>, nrows: usize) -> Column {
    Column::new(ConstColumn { value, nrows })
}

impl<T: Scalar> ConstColumn<T> {
    fn read_as<U: Scalar>(&self, row: usize) -> Option<U> {
        if U::STYPE != T::STYPE {
            self.element_type_error(U::STYPE.name(), row);
        }
        self.value.map(same_element::<T, U>)
    }
}

impl<T: Scalar> ColumnImpl for ConstColumn<T> {
    fn nrows(&self) -> usize {
        self.nrows
    }

    fn stype(&self) -> Stype {
        T::STYPE
    }

    fn is_virtual(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn repeated(&self, nrows: usize) -> Option<Column> {
        Some(constant(self.value, nrows))
    }

    scalar_accessors!();
}

/// `nrows` copies of one string value.
#[derive(Debug)]
pub struct ConstStrColumn {
    value: Option<String>,
    nrows: usize,
}

/// A string constant column.
pub fn constant_str(value: Option<String>, nrows: usize) -> Column {
    Column::new(ConstStrColumn { value, nrows })
}

impl ColumnImpl for ConstStrColumn {
    fn nrows(&self) -> usize {
        self.nrows
    }

    fn stype(&self) -> Stype {
        Stype::Str
    }

    fn is_virtual(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn repeated(&self, nrows: usize) -> Option<Column> {
        Some(constant_str(self.value.clone(), nrows))
    }

    fn get_str(&self, _row: usize, out: &mut String) -> bool {
        out.clear();
        match &self.value {
            Some(s) => {
                out.push_str(s);
                true
            }
            None => false,
        }
    }
}

/// All rows missing, for an arbitrary element type.
#[derive(Debug)]
pub struct NaColumn {
    stype: Stype,
    nrows: usize,
}

/// A column of `nrows` missing values of the given type.
pub fn na_column(stype: Stype, nrows: usize) -> Column {
    Column::new(NaColumn { stype, nrows })
}

impl NaColumn {
    fn check(&self, stype: Stype, requested: &str, row: usize) {
        if self.stype != stype {
            self.element_type_error(requested, row);
        }
    }
}

impl ColumnImpl for NaColumn {
    fn nrows(&self) -> usize {
        self.nrows
    }

    fn stype(&self) -> Stype {
        self.stype
    }

    fn is_virtual(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn repeated(&self, nrows: usize) -> Option<Column> {
        Some(na_column(self.stype, nrows))
    }

    fn get_int8(&self, row: usize) -> Option<i8> {
        self.check(Stype::Int8, "int8", row);
        None
    }

    fn get_int16(&self, row: usize) -> Option<i16> {
        self.check(Stype::Int16, "int16", row);
        None
    }

    fn get_int32(&self, row: usize) -> Option<i32> {
        self.check(Stype::Int32, "int32", row);
        None
    }

    fn get_int64(&self, row: usize) -> Option<i64> {
        self.check(Stype::Int64, "int64", row);
        None
    }

    fn get_float32(&self, row: usize) -> Option<f32> {
        self.check(Stype::Float32, "float32", row);
        None
    }

    fn get_float64(&self, row: usize) -> Option<f64> {
        self.check(Stype::Float64, "float64", row);
        None
    }

    fn get_str(&self, row: usize, out: &mut String) -> bool {
        self.check(Stype::Str, "str", row);
        out.clear();
        false
    }

    fn get_obj(&self, row: usize) -> Option<crate::types::Object> {
        self.check(Stype::Obj, "obj", row);
        None
    }
}
