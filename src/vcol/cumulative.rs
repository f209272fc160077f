//! Group-wise scans: running aggregates, group indices, nth-row broadcast.
//!
//! Scans only make sense evaluated in bulk, one pass per group, so the scan
//! columns here implement `materialize_override` and nothing else; the
//! factory functions wrap them in a latent column, which turns the first
//! element access into one full evaluation.
//!
//! Missing-value handling: a missing input row never disturbs the running
//! state, it re-emits it. Sum and product start from their identity (so rows
//! before the first valid value read 0 resp. 1); min and max have no identity
//! and stay missing until the first valid value.

use std::any::Any;
use std::ops::Range;

use num_traits::{One, Zero};
use rayon::prelude::*;

use crate::column::{Column, ColumnImpl, PARALLEL_MATERIALIZE_THRESHOLD};
use crate::error::{Error, Result};
use crate::groupby::Groupby;
use crate::types::{Scalar, Stype};
use crate::vcol::latent::latent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanOp {
    Sum,
    Prod,
    Min,
    Max,
}

impl ScanOp {
    fn seed<T: Scalar + Zero + One>(self) -> Option<T> {
        match self {
            ScanOp::Sum => Some(T::zero()),
            ScanOp::Prod => Some(T::one()),
            ScanOp::Min | ScanOp::Max => None,
        }
    }

    fn fold<T: Scalar + Zero + One>(self, acc: Option<T>, value: T) -> T {
        match (self, acc) {
            (_, None) => value,
            (ScanOp::Sum, Some(a)) => a + value,
            (ScanOp::Prod, Some(a)) => a * value,
            (ScanOp::Min, Some(a)) => {
                if value < a {
                    value
                } else {
                    a
                }
            }
            (ScanOp::Max, Some(a)) => {
                if value > a {
                    value
                } else {
                    a
                }
            }
        }
    }
}

/// Running aggregate within each group, evaluated only through
/// `materialize_override`.
#[derive(Debug)]
struct ScanColumn {
    source: Column,
    groupby: Groupby,
    op: ScanOp,
    reverse: bool,
}

impl ScanColumn {
    fn scan_group<T: Scalar + Zero + One>(&self, range: Range<usize>) -> Vec<Option<T>> {
        let len = range.len();
        let mut out = vec![None; len];
        let mut acc = self.op.seed::<T>();
        for k in 0..len {
            let idx = if self.reverse { len - 1 - k } else { k };
            if let Some(value) = self.source.get::<T>(range.start + idx) {
                acc = Some(self.op.fold(acc, value));
            }
            out[idx] = acc;
        }
        out
    }

    fn compute_as<T: Scalar + Zero + One>(&self) -> Result<Column> {
        let ranges: Vec<Range<usize>> =
            (0..self.groupby.ngroups()).map(|g| self.groupby.group(g)).collect();
        let parts: Vec<Vec<Option<T>>> = if self.source.allow_parallel_access()
            && self.nrows() >= PARALLEL_MATERIALIZE_THRESHOLD
        {
            ranges.into_par_iter().map(|r| self.scan_group(r)).collect()
        } else {
            ranges.into_iter().map(|r| self.scan_group(r)).collect()
        };
        Column::from_options(parts.concat())
    }

    fn compute(&self) -> Result<Column> {
        match self.source.stype() {
            Stype::Int8 => self.compute_as::<i8>(),
            Stype::Int16 => self.compute_as::<i16>(),
            Stype::Int32 => self.compute_as::<i32>(),
            Stype::Int64 => self.compute_as::<i64>(),
            Stype::Float32 => self.compute_as::<f32>(),
            Stype::Float64 => self.compute_as::<f64>(),
            // Construction rejects non-numeric sources.
            Stype::Str | Stype::Obj => Err(Error::TypeMismatch {
                expected: Stype::Float64,
                found: self.source.stype(),
            }),
        }
    }
}

impl ColumnImpl for ScanColumn {
    fn nrows(&self) -> usize {
        self.source.nrows()
    }

    fn stype(&self) -> Stype {
        self.source.stype()
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

    fn materialize_override(&self) -> Option<Result<Column>> {
        Some(self.compute())
    }
}

fn scan(source: &Column, groupby: &Groupby, op: ScanOp, reverse: bool) -> Result<Column> {
    if !source.stype().is_numeric() {
        return Err(Error::TypeMismatch {
            expected: Stype::Float64,
            found: source.stype(),
        });
    }
    if source.nrows() != groupby.nrows() {
        return Err(Error::LengthMismatch {
            expected: groupby.nrows(),
            actual: source.nrows(),
        });
    }
    Ok(latent(&Column::new(ScanColumn {
        source: source.clone(),
        groupby: groupby.clone(),
        op,
        reverse,
    })))
}

/// Running sum within each group.
pub fn cumsum(source: &Column, groupby: &Groupby, reverse: bool) -> Result<Column> {
    scan(source, groupby, ScanOp::Sum, reverse)
}

/// Running product within each group.
pub fn cumprod(source: &Column, groupby: &Groupby, reverse: bool) -> Result<Column> {
    scan(source, groupby, ScanOp::Prod, reverse)
}

/// Running minimum within each group.
pub fn cummin(source: &Column, groupby: &Groupby, reverse: bool) -> Result<Column> {
    scan(source, groupby, ScanOp::Min, reverse)
}

/// Running maximum within each group.
pub fn cummax(source: &Column, groupby: &Groupby, reverse: bool) -> Result<Column> {
    scan(source, groupby, ScanOp::Max, reverse)
}

#[derive(Debug, Clone, Copy)]
enum GroupIndexKind {
    CumCount { reverse: bool },
    NGroup,
}

/// Row positions derived purely from the groupby offsets; cheap enough to
/// answer element accesses directly.
#[derive(Debug)]
struct GroupIndexColumn {
    groupby: Groupby,
    kind: GroupIndexKind,
}

impl ColumnImpl for GroupIndexColumn {
    fn nrows(&self) -> usize {
        self.groupby.nrows()
    }

    fn stype(&self) -> Stype {
        Stype::Int64
    }

    fn is_virtual(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_int64(&self, row: usize) -> Option<i64> {
        let g = self.groupby.group_of_row(row);
        match self.kind {
            GroupIndexKind::NGroup => Some(g as i64),
            GroupIndexKind::CumCount { reverse } => {
                let range = self.groupby.group(g);
                if reverse {
                    Some((range.end - 1 - row) as i64)
                } else {
                    Some((row - range.start) as i64)
                }
            }
        }
    }
}

/// 0-based position of each row within its group; `reverse` counts from the
/// group's end instead.
pub fn cumcount(groupby: &Groupby, reverse: bool) -> Column {
    Column::new(GroupIndexColumn {
        groupby: groupby.clone(),
        kind: GroupIndexKind::CumCount { reverse },
    })
}

/// Index of the group each row belongs to.
pub fn ngroup(groupby: &Groupby) -> Column {
    Column::new(GroupIndexColumn {
        groupby: groupby.clone(),
        kind: GroupIndexKind::NGroup,
    })
}

/// Broadcasts the n-th value of each group to every row of that group.
#[derive(Debug)]
struct NthColumn {
    source: Column,
    groupby: Groupby,
    n: i64,
    skip_na: bool,
}

impl NthColumn {
    fn pick_rows(&self) -> Vec<Option<usize>> {
        (0..self.groupby.ngroups())
            .map(|g| {
                let range = self.groupby.group(g);
                let rows: Vec<usize> = if self.skip_na {
                    range.filter(|&r| self.source.is_valid(r)).collect()
                } else {
                    range.collect()
                };
                let idx = if self.n >= 0 {
                    self.n as usize
                } else {
                    let back = (-self.n) as usize;
                    if back > rows.len() {
                        return None;
                    }
                    rows.len() - back
                };
                rows.get(idx).copied()
            })
            .collect()
    }

    fn broadcast<T: Scalar>(&self, picks: &[Option<usize>]) -> Result<Column> {
        let mut values = Vec::with_capacity(self.nrows());
        for (g, pick) in picks.iter().enumerate() {
            let value = pick.and_then(|row| self.source.get::<T>(row));
            values.extend(std::iter::repeat(value).take(self.groupby.group(g).len()));
        }
        Column::from_options(values)
    }

    fn compute(&self) -> Result<Column> {
        let picks = self.pick_rows();
        match self.source.stype() {
            Stype::Int8 => self.broadcast::<i8>(&picks),
            Stype::Int16 => self.broadcast::<i16>(&picks),
            Stype::Int32 => self.broadcast::<i32>(&picks),
            Stype::Int64 => self.broadcast::<i64>(&picks),
            Stype::Float32 => self.broadcast::<f32>(&picks),
            Stype::Float64 => self.broadcast::<f64>(&picks),
            Stype::Str => {
                let mut values = Vec::with_capacity(self.nrows());
                for (g, pick) in picks.iter().enumerate() {
                    let value = pick.and_then(|row| self.source.get::<String>(row));
                    values
                        .extend(std::iter::repeat(value).take(self.groupby.group(g).len()));
                }
                Column::from_strings(values)
            }
            Stype::Obj => Err(Error::NotSupported(
                "nth over object columns".to_string(),
            )),
        }
    }
}

impl ColumnImpl for NthColumn {
    fn nrows(&self) -> usize {
        self.source.nrows()
    }

    fn stype(&self) -> Stype {
        self.source.stype()
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

    fn materialize_override(&self) -> Option<Result<Column>> {
        Some(self.compute())
    }
}

/// The n-th row of each group (negative `n` counts from the group's end),
/// broadcast to every row of the group. With `skip_na`, positions count valid
/// rows only. Groups without such a row come out missing.
pub fn nth(source: &Column, groupby: &Groupby, n: i64, skip_na: bool) -> Result<Column> {
    if source.stype() == Stype::Obj {
        return Err(Error::NotSupported("nth over object columns".to_string()));
    }
    if source.nrows() != groupby.nrows() {
        return Err(Error::LengthMismatch {
            expected: groupby.nrows(),
            actual: source.nrows(),
        });
    }
    Ok(latent(&Column::new(NthColumn {
        source: source.clone(),
        groupby: groupby.clone(),
        n,
        skip_na,
    })))
}
