//! Virtual column variants.
//!
//! Each variant is a `ColumnImpl` that computes row values on access from its
//! input columns instead of owning data buffers. Variants are created through
//! the factory functions re-exported here, which validate element types once
//! at construction so the per-row accessors stay check-free.

pub mod categorical;
pub mod constant;
pub mod cumulative;
pub mod fillna;
pub mod func;
pub mod ifelse;
pub mod latent;
pub mod mask;
pub mod shift;
pub mod strings;
pub mod view;

pub use categorical::categorical;
pub use constant::{constant, constant_str, na_column};
pub use cumulative::{cumcount, cummax, cummin, cumprod, cumsum, ngroup, nth};
pub use fillna::fillna;
pub use func::{binary_map, cast, map1, map2};
pub use ifelse::ifelse;
pub use latent::latent;
pub use mask::mask_apply;
pub use shift::shift;
pub use strings::{re_match, str_slice};

/// Generate all eight element accessors for a pure row-remapping variant by
/// delegating to an inherent `resolve(&self, row) -> Option<(&Column, usize)>`
/// method: `None` means the output row is missing, otherwise the value is read
/// from the resolved source position.
macro_rules! positional_accessors {
    () => {
        fn get_int8(&self, row: usize) -> Option<i8> {
            let (col, src) = self.resolve(row)?;
            col.get_int8(src)
        }
        fn get_int16(&self, row: usize) -> Option<i16> {
            let (col, src) = self.resolve(row)?;
            col.get_int16(src)
        }
        fn get_int32(&self, row: usize) -> Option<i32> {
            let (col, src) = self.resolve(row)?;
            col.get_int32(src)
        }
        fn get_int64(&self, row: usize) -> Option<i64> {
            let (col, src) = self.resolve(row)?;
            col.get_int64(src)
        }
        fn get_float32(&self, row: usize) -> Option<f32> {
            let (col, src) = self.resolve(row)?;
            col.get_float32(src)
        }
        fn get_float64(&self, row: usize) -> Option<f64> {
            let (col, src) = self.resolve(row)?;
            col.get_float64(src)
        }
        fn get_str(&self, row: usize, out: &mut String) -> bool {
            match self.resolve(row) {
                Some((col, src)) => col.get_str(src, out),
                None => {
                    out.clear();
                    false
                }
            }
        }
        fn get_obj(&self, row: usize) -> Option<crate::types::Object> {
            let (col, src) = self.resolve(row)?;
            col.get_obj(src)
        }
    };
}
pub(crate) use positional_accessors;
