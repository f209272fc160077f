//! Contiguous-group partitions for group-wise scans.

use std::sync::Arc;

use crate::error::{Error, Result};

/// A partition of `[0, nrows)` into contiguous, non-overlapping, ascending
/// groups, described by an offsets array of length `ngroups + 1`. Read-only
/// once constructed and shared by reference across the columns that scan
/// within its groups.
#[derive(Debug, Clone)]
pub struct Groupby {
    offsets: Arc<[usize]>,
}

impl Groupby {
    /// Build from an offsets array: `offsets[0] == 0`, non-decreasing, and
    /// `offsets[ngroups] == nrows`.
    pub fn from_offsets(offsets: Vec<usize>) -> Result<Self> {
        if offsets.is_empty() || offsets[0] != 0 {
            return Err(Error::InvalidOperation(
                "groupby offsets must start at 0".to_string(),
            ));
        }
        for pair in offsets.windows(2) {
            if pair[1] < pair[0] {
                return Err(Error::InvalidOperation(format!(
                    "groupby offsets must be non-decreasing, found {} after {}",
                    pair[1], pair[0]
                )));
            }
        }
        Ok(Groupby {
            offsets: offsets.into(),
        })
    }

    /// A single group covering all `nrows` rows.
    pub fn single_group(nrows: usize) -> Self {
        Groupby {
            offsets: vec![0, nrows].into(),
        }
    }

    pub fn ngroups(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn nrows(&self) -> usize {
        *self.offsets.last().unwrap_or(&0)
    }

    /// Half-open row range of group `g`.
    pub fn group(&self, g: usize) -> std::ops::Range<usize> {
        self.offsets[g]..self.offsets[g + 1]
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Group containing `row`. Empty groups are skipped over.
    pub fn group_of_row(&self, row: usize) -> usize {
        debug_assert!(row < self.nrows());
        // partition_point returns the first offset strictly above `row`; the
        // group index is one less.
        self.offsets.partition_point(|&off| off <= row) - 1
    }
}
