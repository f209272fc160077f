//! Materialized fixed-width columns.

use std::any::Any;
use std::marker::PhantomData;

use crate::bitmask;
use crate::buffer::Buffer;
use crate::column::{scalar_accessors, ColumnImpl};
use crate::error::{Error, Result};
use crate::types::{same_element, Scalar, Stype};

/// Buffer-backed column of fixed-width elements, with an optional validity
/// bitmask buffer (bit set = missing).
#[derive(Debug)]
pub struct FixedColumn<T: Scalar> {
    data: Buffer,
    validity: Option<Buffer>,
    nrows: usize,
    _marker: PhantomData<T>,
}

impl<T: Scalar> FixedColumn<T> {
    pub fn from_vec(values: Vec<T>) -> Result<Self> {
        Self::build(&values, None)
    }

    pub fn from_options(values: Vec<Option<T>>) -> Result<Self> {
        let plain: Vec<T> = values.iter().map(|v| v.unwrap_or_default()).collect();
        let missing: Vec<bool> = values.iter().map(|v| v.is_none()).collect();
        let validity = if missing.iter().any(|&m| m) {
            Some(missing)
        } else {
            None
        };
        Self::build(&plain, validity)
    }

    fn build(values: &[T], missing: Option<Vec<bool>>) -> Result<Self> {
        let nrows = values.len();
        let mut data = Buffer::new(nrows * std::mem::size_of::<T>())?;
        if nrows > 0 {
            let bytes = data.as_mut_slice()?;
            // Safety: the buffer is 8-byte aligned and exactly nrows elements.
            let slots =
                unsafe { std::slice::from_raw_parts_mut(bytes.as_mut_ptr() as *mut T, nrows) };
            slots.copy_from_slice(values);
        }
        let validity = match missing {
            Some(flags) => Some(Buffer::from_vec(bitmask::create_bitmask(&flags))?),
            None => None,
        };
        Ok(FixedColumn {
            data,
            validity,
            nrows,
            _marker: PhantomData,
        })
    }

    /// Assemble from existing buffers, e.g. a mapped file region.
    pub fn from_parts(data: Buffer, validity: Option<Buffer>, nrows: usize) -> Result<Self> {
        let needed = nrows * std::mem::size_of::<T>();
        if data.len() < needed {
            return Err(Error::LengthMismatch {
                expected: needed,
                actual: data.len(),
            });
        }
        if let Some(mask) = &validity {
            if mask.len() < (nrows + 7) / 8 {
                return Err(Error::LengthMismatch {
                    expected: (nrows + 7) / 8,
                    actual: mask.len(),
                });
            }
        }
        // Surface mapping failures at construction rather than on first read.
        data.data()?;
        Ok(FixedColumn {
            data,
            validity,
            nrows,
            _marker: PhantomData,
        })
    }

    fn values(&self) -> Option<&[T]> {
        if self.nrows == 0 {
            return Some(&[]);
        }
        match self.data.data() {
            Ok(ptr) => {
                // Safety: buffer length validated at construction; alignment
                // is guaranteed by the allocation/mapping granularity.
                Some(unsafe { std::slice::from_raw_parts(ptr as *const T, self.nrows) })
            }
            Err(err) => {
                log::error!("column data buffer became inaccessible: {}", err);
                None
            }
        }
    }

    fn is_missing(&self, row: usize) -> bool {
        match &self.validity {
            None => false,
            Some(mask) => match mask.as_slice() {
                Ok(bits) => bitmask::get_bit(bits, row),
                Err(err) => {
                    log::error!("validity buffer became inaccessible: {}", err);
                    true
                }
            },
        }
    }

    fn read_as<U: Scalar>(&self, row: usize) -> Option<U> {
        if U::STYPE != T::STYPE {
            self.element_type_error(U::STYPE.name(), row);
        }
        if row >= self.nrows {
            panic!("row {} out of bounds for column of {} rows", row, self.nrows);
        }
        if self.is_missing(row) {
            return None;
        }
        self.values().map(|vals| same_element::<T, U>(vals[row]))
    }
}

impl<T: Scalar> ColumnImpl for FixedColumn<T> {
    fn nrows(&self) -> usize {
        self.nrows
    }

    fn stype(&self) -> Stype {
        T::STYPE
    }

    fn is_virtual(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data_buffer(&self) -> Option<&Buffer> {
        Some(&self.data)
    }

    fn verify_impl(&self) -> Result<()> {
        let needed = self.nrows * std::mem::size_of::<T>();
        if self.data.len() < needed {
            return Err(Error::Integrity(format!(
                "fixed column data buffer holds {} bytes, needs {}",
                self.data.len(),
                needed
            )));
        }
        if let Some(mask) = &self.validity {
            mask.verify_integrity()?;
        }
        Ok(())
    }

    scalar_accessors!();
}

impl<T: Scalar> FixedColumn<T> {
    /// Sum of valid values, skipping missing entries.
    pub fn sum(&self) -> T
    where
        T: std::iter::Sum<T> + num_traits::Zero,
    {
        let Some(values) = self.values() else {
            return T::zero();
        };
        match &self.validity {
            None => values.iter().copied().sum(),
            Some(_) => (0..self.nrows)
                .filter(|&i| !self.is_missing(i))
                .map(|i| values[i])
                .sum(),
        }
    }
}
