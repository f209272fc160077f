//! Element-wise function application and type casts.

use std::any::Any;
use std::fmt;

use num_traits::NumCast;

use crate::column::{scalar_accessors, Column, ColumnImpl};
use crate::error::{Error, Result};
use crate::types::{same_element, Scalar, Stype};

fn check_stype(col: &Column, expected: Stype) -> Result<()> {
    if col.stype() != expected {
        return Err(Error::TypeMismatch {
            expected,
            found: col.stype(),
        });
    }
    Ok(())
}

/// Applies `f` to each valid input value; missing rows stay missing, and a
/// NaN result is normalized to missing.
pub struct Map1Column<T: Scalar, U: Scalar> {
    source: Column,
    f: Box<dyn Fn(T) -> U + Send + Sync>,
}

/// A virtual column computing `f` over each valid element of `source`.
pub fn map1<T: Scalar, U: Scalar>(
    source: &Column,
    f: impl Fn(T) -> U + Send + Sync + 'static,
) -> Result<Column> {
    check_stype(source, T::STYPE)?;
    Ok(Column::new(Map1Column::<T, U> {
        source: source.clone(),
        f: Box::new(f),
    }))
}

impl<T: Scalar, U: Scalar> Map1Column<T, U> {
    fn read_as<W: Scalar>(&self, row: usize) -> Option<W> {
        if W::STYPE != U::STYPE {
            self.element_type_error(W::STYPE.name(), row);
        }
        let value = self.source.get::<T>(row)?;
        let result = (self.f)(value);
        if result.is_nan() {
            return None;
        }
        Some(same_element::<U, W>(result))
    }
}

impl<T: Scalar, U: Scalar> fmt::Debug for Map1Column<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Map1Column")
            .field("source", &self.source)
            .field("stype", &U::STYPE)
            .finish_non_exhaustive()
    }
}

impl<T: Scalar, U: Scalar> ColumnImpl for Map1Column<T, U> {
    fn nrows(&self) -> usize {
        self.source.nrows()
    }

    fn stype(&self) -> Stype {
        U::STYPE
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

    scalar_accessors!();
}

/// Full-control mapping: `f` sees the input validity and decides the output
/// validity. A NaN result is still normalized to missing.
pub struct Map2Column<T: Scalar, U: Scalar> {
    source: Column,
    f: Box<dyn Fn(Option<T>) -> Option<U> + Send + Sync>,
}

/// A virtual column computing `f` over each element of `source`, missing rows
/// included.
pub fn map2<T: Scalar, U: Scalar>(
    source: &Column,
    f: impl Fn(Option<T>) -> Option<U> + Send + Sync + 'static,
) -> Result<Column> {
    check_stype(source, T::STYPE)?;
    Ok(Column::new(Map2Column::<T, U> {
        source: source.clone(),
        f: Box::new(f),
    }))
}

impl<T: Scalar, U: Scalar> Map2Column<T, U> {
    fn read_as<W: Scalar>(&self, row: usize) -> Option<W> {
        if W::STYPE != U::STYPE {
            self.element_type_error(W::STYPE.name(), row);
        }
        let result = (self.f)(self.source.get::<T>(row))?;
        if result.is_nan() {
            return None;
        }
        Some(same_element::<U, W>(result))
    }
}

impl<T: Scalar, U: Scalar> fmt::Debug for Map2Column<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Map2Column")
            .field("source", &self.source)
            .field("stype", &U::STYPE)
            .finish_non_exhaustive()
    }
}

impl<T: Scalar, U: Scalar> ColumnImpl for Map2Column<T, U> {
    fn nrows(&self) -> usize {
        self.source.nrows()
    }

    fn stype(&self) -> Stype {
        U::STYPE
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

    scalar_accessors!();
}

/// Row-wise combination of two equal-length columns.
pub struct BinaryMapColumn<T1: Scalar, T2: Scalar, U: Scalar> {
    lhs: Column,
    rhs: Column,
    f: Box<dyn Fn(Option<T1>, Option<T2>) -> Option<U> + Send + Sync>,
}

/// A virtual column combining `lhs` and `rhs` row by row.
pub fn binary_map<T1: Scalar, T2: Scalar, U: Scalar>(
    lhs: &Column,
    rhs: &Column,
    f: impl Fn(Option<T1>, Option<T2>) -> Option<U> + Send + Sync + 'static,
) -> Result<Column> {
    check_stype(lhs, T1::STYPE)?;
    check_stype(rhs, T2::STYPE)?;
    if lhs.nrows() != rhs.nrows() {
        return Err(Error::LengthMismatch {
            expected: lhs.nrows(),
            actual: rhs.nrows(),
        });
    }
    Ok(Column::new(BinaryMapColumn::<T1, T2, U> {
        lhs: lhs.clone(),
        rhs: rhs.clone(),
        f: Box::new(f),
    }))
}

impl<T1: Scalar, T2: Scalar, U: Scalar> BinaryMapColumn<T1, T2, U> {
    fn read_as<W: Scalar>(&self, row: usize) -> Option<W> {
        if W::STYPE != U::STYPE {
            self.element_type_error(W::STYPE.name(), row);
        }
        let result = (self.f)(self.lhs.get::<T1>(row), self.rhs.get::<T2>(row))?;
        if result.is_nan() {
            return None;
        }
        Some(same_element::<U, W>(result))
    }
}

impl<T1: Scalar, T2: Scalar, U: Scalar> fmt::Debug for BinaryMapColumn<T1, T2, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryMapColumn")
            .field("lhs", &self.lhs)
            .field("rhs", &self.rhs)
            .field("stype", &U::STYPE)
            .finish_non_exhaustive()
    }
}

impl<T1: Scalar, T2: Scalar, U: Scalar> ColumnImpl for BinaryMapColumn<T1, T2, U> {
    fn nrows(&self) -> usize {
        self.lhs.nrows()
    }

    fn stype(&self) -> Stype {
        U::STYPE
    }

    fn is_virtual(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn children(&self) -> Vec<Column> {
        vec![self.lhs.clone(), self.rhs.clone()]
    }

    scalar_accessors!();
}

/// Renders each valid fixed-width value as a string.
pub struct StrMapColumn<T: Scalar> {
    source: Column,
    f: Box<dyn Fn(T) -> String + Send + Sync>,
}

impl<T: Scalar> fmt::Debug for StrMapColumn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrMapColumn")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl<T: Scalar> ColumnImpl for StrMapColumn<T> {
    fn nrows(&self) -> usize {
        self.source.nrows()
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

    fn children(&self) -> Vec<Column> {
        vec![self.source.clone()]
    }

    fn get_str(&self, row: usize, out: &mut String) -> bool {
        out.clear();
        match self.source.get::<T>(row) {
            Some(v) => {
                out.push_str(&(self.f)(v));
                true
            }
            None => false,
        }
    }
}

fn cast_to<T: Scalar>(source: &Column, target: Stype) -> Result<Column> {
    match target {
        Stype::Int8 => map2::<T, i8>(source, |v| v.and_then(<i8 as NumCast>::from)),
        Stype::Int16 => map2::<T, i16>(source, |v| v.and_then(<i16 as NumCast>::from)),
        Stype::Int32 => map2::<T, i32>(source, |v| v.and_then(<i32 as NumCast>::from)),
        Stype::Int64 => map2::<T, i64>(source, |v| v.and_then(<i64 as NumCast>::from)),
        Stype::Float32 => map2::<T, f32>(source, |v| v.and_then(<f32 as NumCast>::from)),
        Stype::Float64 => map2::<T, f64>(source, |v| v.and_then(<f64 as NumCast>::from)),
        Stype::Str => Ok(Column::new(StrMapColumn::<T> {
            source: source.clone(),
            f: Box::new(|v| format!("{:?}", v)),
        })),
        Stype::Obj => Err(Error::NotSupported(
            "cast to object columns".to_string(),
        )),
    }
}

/// A virtual cast of a numeric column to another element type. Values that do
/// not fit the target type become missing; casting to the column's own type
/// returns the column unchanged.
pub fn cast(source: &Column, target: Stype) -> Result<Column> {
    if source.stype() == target {
        return Ok(source.clone());
    }
    match source.stype() {
        Stype::Int8 => cast_to::<i8>(source, target),
        Stype::Int16 => cast_to::<i16>(source, target),
        Stype::Int32 => cast_to::<i32>(source, target),
        Stype::Int64 => cast_to::<i64>(source, target),
        Stype::Float32 => cast_to::<f32>(source, target),
        Stype::Float64 => cast_to::<f64>(source, target),
        Stype::Str | Stype::Obj => Err(Error::NotSupported(format!(
            "cast from {} columns",
            source.stype().name()
        ))),
    }
}
