//! Materialized variable-width string column.

use std::any::Any;

use crate::bitmask;
use crate::buffer::Buffer;
use crate::column::ColumnImpl;
use crate::error::{Error, Result};
use crate::types::Stype;

/// UTF-8 strings stored as one concatenated character buffer plus an offsets
/// buffer of `nrows + 1` entries. Row `i` spans bytes
/// `offsets[i]..offsets[i+1]` of the character buffer.
#[derive(Debug)]
pub struct StrColumn {
    offsets: Buffer,
    strdata: Buffer,
    validity: Option<Buffer>,
    nrows: usize,
}

impl StrColumn {
    pub fn from_options(values: Vec<Option<String>>) -> Result<Self> {
        let nrows = values.len();
        let mut offsets = Vec::with_capacity(nrows + 1);
        let mut strdata = Vec::new();
        let mut missing = Vec::with_capacity(nrows);
        offsets.push(0u64);
        for value in &values {
            match value {
                Some(s) => {
                    strdata.extend_from_slice(s.as_bytes());
                    missing.push(false);
                }
                None => missing.push(true),
            }
            offsets.push(strdata.len() as u64);
        }
        let validity = if missing.iter().any(|&m| m) {
            Some(Buffer::from_vec(bitmask::create_bitmask(&missing))?)
        } else {
            None
        };
        Ok(StrColumn {
            offsets: offsets_buffer(&offsets)?,
            strdata: Buffer::from_vec(strdata)?,
            validity,
            nrows,
        })
    }

    fn offsets(&self) -> Option<&[u64]> {
        match self.offsets.data() {
            Ok(ptr) => {
                // Safety: offsets buffer holds exactly nrows + 1 u64 values
                // and is 8-byte aligned.
                Some(unsafe { std::slice::from_raw_parts(ptr as *const u64, self.nrows + 1) })
            }
            Err(err) => {
                log::error!("string offsets buffer became inaccessible: {}", err);
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
}

fn offsets_buffer(offsets: &[u64]) -> Result<Buffer> {
    let mut buffer = Buffer::new(offsets.len() * 8)?;
    let bytes = buffer.as_mut_slice()?;
    // Safety: freshly allocated, 8-byte aligned, exactly offsets.len() slots.
    let slots =
        unsafe { std::slice::from_raw_parts_mut(bytes.as_mut_ptr() as *mut u64, offsets.len()) };
    slots.copy_from_slice(offsets);
    Ok(buffer)
}

impl ColumnImpl for StrColumn {
    fn nrows(&self) -> usize {
        self.nrows
    }

    fn stype(&self) -> Stype {
        Stype::Str
    }

    fn is_virtual(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data_buffer(&self) -> Option<&Buffer> {
        Some(&self.strdata)
    }

    fn verify_impl(&self) -> Result<()> {
        if self.offsets.len() < (self.nrows + 1) * 8 {
            return Err(Error::Integrity(format!(
                "string offsets buffer holds {} bytes, needs {}",
                self.offsets.len(),
                (self.nrows + 1) * 8
            )));
        }
        let Some(offsets) = self.offsets() else {
            return Err(Error::Integrity(
                "string offsets buffer is inaccessible".to_string(),
            ));
        };
        if offsets[0] != 0 {
            return Err(Error::Integrity(
                "string offsets must start at 0".to_string(),
            ));
        }
        for pair in offsets.windows(2) {
            if pair[1] < pair[0] {
                return Err(Error::Integrity(format!(
                    "string offsets must be non-decreasing, found {} after {}",
                    pair[1], pair[0]
                )));
            }
        }
        if offsets[self.nrows] as usize > self.strdata.len() {
            return Err(Error::Integrity(format!(
                "string offsets end at {} past character buffer of {} bytes",
                offsets[self.nrows],
                self.strdata.len()
            )));
        }
        if let Some(mask) = &self.validity {
            mask.verify_integrity()?;
        }
        Ok(())
    }

    fn get_str(&self, row: usize, out: &mut String) -> bool {
        if row >= self.nrows {
            panic!("row {} out of bounds for column of {} rows", row, self.nrows);
        }
        out.clear();
        if self.is_missing(row) {
            return false;
        }
        let Some(offsets) = self.offsets() else {
            return false;
        };
        let (lo, hi) = (offsets[row] as usize, offsets[row + 1] as usize);
        match self.strdata.as_slice() {
            Ok(bytes) => {
                // Safety: only valid UTF-8 enters the character buffer.
                out.push_str(unsafe { std::str::from_utf8_unchecked(&bytes[lo..hi]) });
                true
            }
            Err(err) => {
                log::error!("string data buffer became inaccessible: {}", err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let col = StrColumn::from_options(vec![
            Some("alpha".to_string()),
            None,
            Some(String::new()),
            Some("δ".to_string()),
        ])
        .unwrap();
        assert_eq!(col.nrows(), 4);
        let mut out = String::new();
        assert!(col.get_str(0, &mut out));
        assert_eq!(out, "alpha");
        assert!(!col.get_str(1, &mut out));
        assert!(col.get_str(2, &mut out));
        assert_eq!(out, "");
        assert!(col.get_str(3, &mut out));
        assert_eq!(out, "δ");
    }

    #[test]
    fn test_verify_integrity() {
        let col = StrColumn::from_options(vec![Some("ab".to_string()), Some("c".to_string())])
            .unwrap();
        col.verify_impl().unwrap();
    }

    #[test]
    fn test_empty_column() {
        let col = StrColumn::from_options(vec![]).unwrap();
        assert_eq!(col.nrows(), 0);
        col.verify_impl().unwrap();
    }
}
