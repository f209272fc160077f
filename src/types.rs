//! Element type system shared by buffers and columns.
//!
//! Columns advertise one storage type out of a closed set (`Stype`); element
//! access happens through one accessor per type. The `Element` and `Scalar`
//! traits route the generic `Column::get::<T>` surface onto those accessors,
//! so the type check happens once at virtual-column construction rather than
//! on every read.

use std::any::Any;
use std::fmt::Debug;
use std::mem::ManuallyDrop;
use std::sync::Arc;

use crate::column::ColumnImpl;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stype {
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Str,
    Obj,
}

impl Stype {
    /// Byte width of one element, for fixed-width types.
    pub fn elem_size(self) -> Option<usize> {
        match self {
            Stype::Int8 => Some(1),
            Stype::Int16 => Some(2),
            Stype::Int32 => Some(4),
            Stype::Int64 => Some(8),
            Stype::Float32 => Some(4),
            Stype::Float64 => Some(8),
            Stype::Str | Stype::Obj => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, Stype::Str | Stype::Obj)
    }

    pub fn name(self) -> &'static str {
        match self {
            Stype::Int8 => "int8",
            Stype::Int16 => "int16",
            Stype::Int32 => "int32",
            Stype::Int64 => "int64",
            Stype::Float32 => "float32",
            Stype::Float64 => "float64",
            Stype::Str => "str",
            Stype::Obj => "obj",
        }
    }
}

/// Opaque host-object handle stored in object columns. Cloning increments the
/// reference count, dropping decrements it, so an object slot can never be
/// left dangling.
pub type Object = Arc<dyn Any + Send + Sync>;

mod private {
    pub trait Sealed {}
    impl Sealed for i8 {}
    impl Sealed for i16 {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
    impl Sealed for String {}
    impl Sealed for super::Object {}
}

/// A value that can be read out of a column through the typed accessors.
pub trait Element: Clone + Send + Sync + 'static + private::Sealed {
    const STYPE: Stype;

    /// Read row `row` through the accessor matching `STYPE`.
    fn read(col: &dyn ColumnImpl, row: usize) -> Option<Self>;
}

/// Fixed-width, copyable element stored directly in a data buffer.
pub trait Scalar:
    Element + Copy + Default + PartialEq + PartialOrd + Debug + num_traits::NumCast
{
    /// Floating NaN probe; false for integers.
    fn is_nan(self) -> bool {
        false
    }
}

macro_rules! impl_scalar_element {
    ($($ty:ty => $stype:ident, $getter:ident);* $(;)?) => {$(
        impl Element for $ty {
            const STYPE: Stype = Stype::$stype;
            fn read(col: &dyn ColumnImpl, row: usize) -> Option<Self> {
                col.$getter(row)
            }
        }
    )*};
}

impl_scalar_element! {
    i8  => Int8,    get_int8;
    i16 => Int16,   get_int16;
    i32 => Int32,   get_int32;
    i64 => Int64,   get_int64;
    f32 => Float32, get_float32;
    f64 => Float64, get_float64;
}

impl Scalar for i8 {}
impl Scalar for i16 {}
impl Scalar for i32 {}
impl Scalar for i64 {}
impl Scalar for f32 {
    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }
}
impl Scalar for f64 {
    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }
}

impl Element for String {
    const STYPE: Stype = Stype::Str;
    fn read(col: &dyn ColumnImpl, row: usize) -> Option<Self> {
        let mut out = String::new();
        if col.get_str(row, &mut out) {
            Some(out)
        } else {
            None
        }
    }
}

impl Element for Object {
    const STYPE: Stype = Stype::Obj;
    fn read(col: &dyn ColumnImpl, row: usize) -> Option<Self> {
        col.get_obj(row)
    }
}

/// Reinterpret a value as another element type of the same `Stype`.
///
/// Used by generic virtual columns to implement the accessor whose type is
/// only known through `T::STYPE`. Panics if the types differ, which is a
/// programming error in the caller.
pub(crate) fn same_element<A: Element, B: Element>(value: A) -> B {
    assert_eq!(
        A::STYPE,
        B::STYPE,
        "same_element called across distinct element types"
    );
    let value = ManuallyDrop::new(value);
    // Safety: equal stypes imply A and B are the same concrete type (the
    // Element impls above map each type to a distinct Stype).
    unsafe { std::mem::transmute_copy(&value) }
}
