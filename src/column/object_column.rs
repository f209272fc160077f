//! Materialized column of reference-counted host objects.

use std::any::Any;

use crate::buffer::Buffer;
use crate::column::ColumnImpl;
use crate::error::Result;
use crate::types::{Object, Stype};

/// Column whose elements are `Arc`-counted opaque objects, stored in an
/// object-aware buffer so that dropping the column releases each element's
/// reference.
#[derive(Debug)]
pub struct ObjectColumn {
    data: Buffer,
    nrows: usize,
}

impl ObjectColumn {
    pub fn from_options(values: Vec<Option<Object>>) -> Self {
        let nrows = values.len();
        ObjectColumn {
            data: Buffer::objects(values),
            nrows,
        }
    }
}

impl ColumnImpl for ObjectColumn {
    fn nrows(&self) -> usize {
        self.nrows
    }

    fn stype(&self) -> Stype {
        Stype::Obj
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
        self.data.verify_integrity()
    }

    fn get_obj(&self, row: usize) -> Option<Object> {
        if row >= self.nrows {
            panic!("row {} out of bounds for column of {} rows", row, self.nrows);
        }
        self.data.object_slots().and_then(|slots| slots[row].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_roundtrip() {
        let obj: Object = Arc::new(42i32);
        let col = ObjectColumn::from_options(vec![Some(Arc::clone(&obj)), None]);
        assert_eq!(col.nrows(), 2);
        let read = col.get_obj(0).unwrap();
        assert_eq!(read.downcast_ref::<i32>(), Some(&42));
        assert!(col.get_obj(1).is_none());
    }

    #[test]
    fn test_drop_releases_elements() {
        let obj: Object = Arc::new(String::from("payload"));
        let col = ObjectColumn::from_options(vec![Some(Arc::clone(&obj))]);
        assert_eq!(Arc::strong_count(&obj), 2);
        drop(col);
        assert_eq!(Arc::strong_count(&obj), 1);
    }
}
