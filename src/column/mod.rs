//! Column handle and the polymorphic column representation.
//!
//! Every column answers "does row `i` hold a valid value, and if so what is
//! it" through one accessor per supported element type, returning
//! `Option<T>` (or writing into a caller buffer for strings). Materialized
//! columns read straight out of their data buffers; virtual columns compute
//! the answer from their input columns, recursing until a materialized leaf
//! is reached.
//!
//! Accessors are exact-type: which accessor a column supports is decided by
//! its `Stype`, asserted once when a virtual column is constructed, never per
//! read. Calling an accessor the column does not support is a programming
//! error and panics.

pub mod fixed_column;
pub mod object_column;
pub mod string_column;

use std::any::Any;
use std::sync::Arc;

use rayon::prelude::*;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::rowindex::RowIndex;
use crate::types::{Element, Object, Scalar, Stype};

pub use fixed_column::FixedColumn;
pub use object_column::ObjectColumn;
pub use string_column::StrColumn;

/// Row count above which generic materialization fans out across the rayon
/// pool (when the column graph permits parallel access).
pub(crate) const PARALLEL_MATERIALIZE_THRESHOLD: usize = 4096;

/// Polymorphic column representation.
pub trait ColumnImpl: Send + Sync + std::fmt::Debug {
    fn nrows(&self) -> usize;

    fn stype(&self) -> Stype;

    /// Virtual columns compute values on access; materialized columns own
    /// data buffers.
    fn is_virtual(&self) -> bool;

    fn as_any(&self) -> &dyn Any;

    /// Input columns of a virtual column (the DAG edges).
    fn children(&self) -> Vec<Column> {
        Vec::new()
    }

    /// Whether multiple worker threads may read this column concurrently.
    /// Composed as the AND over the column's children.
    fn allow_parallel_access(&self) -> bool {
        self.children().iter().all(|c| c.allow_parallel_access())
    }

    /// Bulk materialization strategy, for variants that can do better than
    /// the generic element-by-element loop (or that can only be evaluated in
    /// bulk, like group scans).
    fn materialize_override(&self) -> Option<Result<Column>> {
        None
    }

    /// O(1) length change, supported by constant columns.
    fn repeated(&self, _nrows: usize) -> Option<Column> {
        None
    }

    /// Per-variant consistency check for the diagnostic integrity pass.
    fn verify_impl(&self) -> Result<()> {
        Ok(())
    }

    /// The primary data buffer of a materialized column.
    fn data_buffer(&self) -> Option<&Buffer> {
        None
    }

    fn get_int8(&self, row: usize) -> Option<i8> {
        self.element_type_error("int8", row)
    }

    fn get_int16(&self, row: usize) -> Option<i16> {
        self.element_type_error("int16", row)
    }

    fn get_int32(&self, row: usize) -> Option<i32> {
        self.element_type_error("int32", row)
    }

    fn get_int64(&self, row: usize) -> Option<i64> {
        self.element_type_error("int64", row)
    }

    fn get_float32(&self, row: usize) -> Option<f32> {
        self.element_type_error("float32", row)
    }

    fn get_float64(&self, row: usize) -> Option<f64> {
        self.element_type_error("float64", row)
    }

    /// Write the row's string into `out`; returns the validity flag.
    fn get_str(&self, row: usize, _out: &mut String) -> bool {
        self.element_type_error("str", row)
    }

    fn get_obj(&self, row: usize) -> Option<Object> {
        self.element_type_error("obj", row)
    }

    #[doc(hidden)]
    fn element_type_error(&self, requested: &str, row: usize) -> ! {
        panic!(
            "element type contract violation: column of type {} read as {} (row {})",
            self.stype().name(),
            requested,
            row
        )
    }
}

/// Value-type handle over a `ColumnImpl`. Cloning shares the column graph by
/// reference count; the underlying node is dropped when the last handle goes,
/// cascading release of child columns and buffers.
#[derive(Clone, Debug)]
pub struct Column {
    inner: Arc<dyn ColumnImpl>,
}

impl std::ops::Deref for Column {
    type Target = dyn ColumnImpl;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl Column {
    pub fn new(body: impl ColumnImpl + 'static) -> Self {
        Column {
            inner: Arc::new(body),
        }
    }

    /// Materialized fixed-width column from plain values.
    pub fn from_vec<T: Scalar>(values: Vec<T>) -> Result<Self> {
        Ok(Column::new(FixedColumn::from_vec(values)?))
    }

    /// Materialized fixed-width column from values with missing entries.
    pub fn from_options<T: Scalar>(values: Vec<Option<T>>) -> Result<Self> {
        Ok(Column::new(FixedColumn::from_options(values)?))
    }

    /// Materialized string column.
    pub fn from_strings(values: Vec<Option<String>>) -> Result<Self> {
        Ok(Column::new(StrColumn::from_options(values)?))
    }

    /// Materialized host-object column.
    pub fn from_objects(values: Vec<Option<Object>>) -> Self {
        Column::new(ObjectColumn::from_options(values))
    }

    /// Read row `row` as element type `T`. `T::STYPE` must equal the column's
    /// stype; this is the typed-accessor contract, not a runtime conversion.
    pub fn get<T: Element>(&self, row: usize) -> Option<T> {
        T::read(&*self.inner, row)
    }

    /// Is row `row` valid, whatever the element type.
    pub fn is_valid(&self, row: usize) -> bool {
        match self.stype() {
            Stype::Int8 => self.get_int8(row).is_some(),
            Stype::Int16 => self.get_int16(row).is_some(),
            Stype::Int32 => self.get_int32(row).is_some(),
            Stype::Int64 => self.get_int64(row).is_some(),
            Stype::Float32 => self.get_float32(row).is_some(),
            Stype::Float64 => self.get_float64(row).is_some(),
            Stype::Str => {
                let mut scratch = String::new();
                self.get_str(row, &mut scratch)
            }
            Stype::Obj => self.get_obj(row).is_some(),
        }
    }

    /// Convert a virtual column into a buffer-backed one holding the same
    /// values. Idempotent: an already-materialized column returns a clone of
    /// itself (same logical values, same physical buffers).
    pub fn materialize(&self) -> Result<Column> {
        if !self.is_virtual() {
            return Ok(self.clone());
        }
        if let Some(result) = self.inner.materialize_override() {
            return result;
        }
        generic_materialize(self)
    }

    /// Replace this handle with a materialized equivalent.
    pub fn materialize_inplace(&mut self) -> Result<()> {
        *self = self.materialize()?;
        Ok(())
    }

    /// Build a view of this column selecting the rows named by `ri`, without
    /// copying data. Slicing a slice view composes arithmetically.
    pub fn apply_rowindex(&self, ri: &RowIndex) -> Result<Column> {
        ri.check_bounds(self.nrows())?;
        match ri {
            RowIndex::Identity => Ok(self.clone()),
            RowIndex::Slice { start, count, step } => {
                if let Some(view) = self
                    .inner
                    .as_any()
                    .downcast_ref::<crate::vcol::view::SliceViewColumn>()
                {
                    return Ok(view.compose(*start, *count, *step));
                }
                Ok(Column::new(crate::vcol::view::SliceViewColumn::new(
                    self.clone(),
                    *start,
                    *count,
                    *step,
                )))
            }
            RowIndex::Arr32(indices) => Ok(Column::new(
                crate::vcol::view::ArrayViewColumn::new32(self.clone(), Arc::clone(indices)),
            )),
            RowIndex::Arr64(indices) => Ok(Column::new(
                crate::vcol::view::ArrayViewColumn::new64(self.clone(), Arc::clone(indices)),
            )),
        }
    }

    /// O(1) repeat for constant columns.
    pub fn repeat(&self, nrows: usize) -> Result<Column> {
        self.inner.repeated(nrows).ok_or_else(|| {
            Error::InvalidOperation("only constant columns support O(1) repeat".to_string())
        })
    }

    /// Recursive opt-in diagnostic pass over the column graph.
    pub fn verify_integrity(&self) -> Result<()> {
        self.inner.verify_impl()?;
        if let Some(buffer) = self.inner.data_buffer() {
            buffer.verify_integrity()?;
        }
        for child in self.children() {
            child.verify_integrity()?;
        }
        Ok(())
    }

    /// Number of missing values, NA-aware for every element type.
    pub fn na_count(&self) -> usize {
        (0..self.nrows()).filter(|&i| !self.is_valid(i)).count()
    }

    fn value_as_f64(&self, row: usize) -> Option<f64> {
        match self.stype() {
            Stype::Int8 => self.get_int8(row).map(f64::from),
            Stype::Int16 => self.get_int16(row).map(f64::from),
            Stype::Int32 => self.get_int32(row).map(f64::from),
            Stype::Int64 => self.get_int64(row).map(|v| v as f64),
            Stype::Float32 => self.get_float32(row).map(f64::from),
            Stype::Float64 => self.get_float64(row),
            Stype::Str | Stype::Obj => None,
        }
    }

    fn check_numeric(&self) -> Result<()> {
        if !self.stype().is_numeric() {
            return Err(Error::TypeMismatch {
                expected: Stype::Float64,
                found: self.stype(),
            });
        }
        Ok(())
    }

    /// Sum of valid values as f64.
    pub fn sum_f64(&self) -> Result<f64> {
        self.check_numeric()?;
        Ok((0..self.nrows())
            .filter_map(|i| self.value_as_f64(i))
            .sum())
    }

    /// Minimum of valid values, `None` when all rows are missing.
    pub fn min_f64(&self) -> Result<Option<f64>> {
        self.check_numeric()?;
        Ok((0..self.nrows())
            .filter_map(|i| self.value_as_f64(i))
            .fold(None, |acc, v| match acc {
                None => Some(v),
                Some(a) => Some(if v < a { v } else { a }),
            }))
    }

    /// Maximum of valid values, `None` when all rows are missing.
    pub fn max_f64(&self) -> Result<Option<f64>> {
        self.check_numeric()?;
        Ok((0..self.nrows())
            .filter_map(|i| self.value_as_f64(i))
            .fold(None, |acc, v| match acc {
                None => Some(v),
                Some(a) => Some(if v > a { v } else { a }),
            }))
    }

    /// Mean of valid values, `None` when all rows are missing.
    pub fn mean_f64(&self) -> Result<Option<f64>> {
        self.check_numeric()?;
        let mut sum = 0.0;
        let mut count = 0usize;
        for i in 0..self.nrows() {
            if let Some(v) = self.value_as_f64(i) {
                sum += v;
                count += 1;
            }
        }
        Ok((count > 0).then(|| sum / count as f64))
    }
}

fn gather<T: Element>(col: &Column) -> Vec<Option<T>> {
    let nrows = col.nrows();
    if col.allow_parallel_access() && nrows >= PARALLEL_MATERIALIZE_THRESHOLD {
        (0..nrows).into_par_iter().map(|i| col.get::<T>(i)).collect()
    } else {
        (0..nrows).map(|i| col.get::<T>(i)).collect()
    }
}

/// Element-by-element materialization used when a variant has no bulk
/// strategy of its own.
pub(crate) fn generic_materialize(col: &Column) -> Result<Column> {
    match col.stype() {
        Stype::Int8 => Column::from_options(gather::<i8>(col)),
        Stype::Int16 => Column::from_options(gather::<i16>(col)),
        Stype::Int32 => Column::from_options(gather::<i32>(col)),
        Stype::Int64 => Column::from_options(gather::<i64>(col)),
        Stype::Float32 => Column::from_options(gather::<f32>(col)),
        Stype::Float64 => Column::from_options(gather::<f64>(col)),
        Stype::Str => {
            // Strings reuse one scratch buffer; sequential by construction.
            let nrows = col.nrows();
            let mut values = Vec::with_capacity(nrows);
            let mut scratch = String::new();
            for i in 0..nrows {
                if col.get_str(i, &mut scratch) {
                    values.push(Some(std::mem::take(&mut scratch)));
                } else {
                    values.push(None);
                }
            }
            Column::from_strings(values)
        }
        Stype::Obj => Ok(Column::from_objects(gather::<Object>(col))),
    }
}

/// Generate the six numeric accessors by delegating to an inherent
/// `read_as::<U: Scalar>` method on the implementing type.
macro_rules! scalar_accessors {
    () => {
        fn get_int8(&self, row: usize) -> Option<i8> {
            self.read_as::<i8>(row)
        }
        fn get_int16(&self, row: usize) -> Option<i16> {
            self.read_as::<i16>(row)
        }
        fn get_int32(&self, row: usize) -> Option<i32> {
            self.read_as::<i32>(row)
        }
        fn get_int64(&self, row: usize) -> Option<i64> {
            self.read_as::<i64>(row)
        }
        fn get_float32(&self, row: usize) -> Option<f32> {
            self.read_as::<f32>(row)
        }
        fn get_float64(&self, row: usize) -> Option<f64> {
            self.read_as::<f64>(row)
        }
    };
}
pub(crate) use scalar_accessors;
