//! Validity bitmask utilities.
//!
//! A bitmask packs one bit per row; a set bit marks the row as missing. The
//! same layout backs column validity masks and the mask virtual column.

/// Create a bitmask from per-row missing flags.
pub fn create_bitmask(missing: &[bool]) -> Vec<u8> {
    let bytes_needed = (missing.len() + 7) / 8;
    let mut data = vec![0u8; bytes_needed];

    for (i, &is_missing) in missing.iter().enumerate() {
        if is_missing {
            data[i / 8] |= 1 << (i % 8);
        }
    }

    data
}

/// Check one bit.
#[inline]
pub fn get_bit(mask: &[u8], index: usize) -> bool {
    let byte_idx = index / 8;
    byte_idx < mask.len() && (mask[byte_idx] & (1 << (index % 8))) != 0
}

/// Set or clear one bit. The mask must already cover `index`.
#[inline]
pub fn set_bit(mask: &mut [u8], index: usize, value: bool) {
    let byte_idx = index / 8;
    if value {
        mask[byte_idx] |= 1 << (index % 8);
    } else {
        mask[byte_idx] &= !(1 << (index % 8));
    }
}

/// Expand a bitmask back into per-row flags.
pub fn bitmask_to_bools(mask: &[u8], len: usize) -> Vec<bool> {
    (0..len).map(|i| get_bit(mask, i)).collect()
}
