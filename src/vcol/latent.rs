//! Deferred evaluation with memoization.

use std::any::Any;
use std::sync::{Mutex, OnceLock};

use crate::buffer::lock_unpoisoned;
use crate::column::{Column, ColumnImpl};
use crate::error::{Error, Result};
use crate::types::Stype;
use crate::vcol::positional_accessors;

/// Wraps a column whose evaluation is only worthwhile in bulk. The first
/// element access (or materialization) evaluates the wrapped column once and
/// memoizes the result; later reads hit the memoized column directly.
#[derive(Debug)]
pub struct LatentColumn {
    pending: Mutex<Option<Column>>,
    cell: OnceLock<Column>,
    nrows: usize,
    stype: Stype,
}

/// Defer evaluation of `source` until its values are first needed.
pub fn latent(source: &Column) -> Column {
    Column::new(LatentColumn::new(source.clone()))
}

impl LatentColumn {
    pub fn new(source: Column) -> Self {
        LatentColumn {
            nrows: source.nrows(),
            stype: source.stype(),
            pending: Mutex::new(Some(source)),
            cell: OnceLock::new(),
        }
    }

    /// Evaluate the wrapped column if not done yet, returning the memoized
    /// materialized result. A failed evaluation leaves the column un-vivified
    /// so a later call can retry.
    pub fn vivify(&self) -> Result<&Column> {
        if let Some(col) = self.cell.get() {
            return Ok(col);
        }
        let mut pending = lock_unpoisoned(&self.pending);
        if let Some(col) = self.cell.get() {
            return Ok(col);
        }
        let source = match pending.take() {
            Some(source) => source,
            None => {
                return Err(Error::InvalidOperation(
                    "latent column lost its source".to_string(),
                ))
            }
        };
        match source.materialize() {
            Ok(result) => Ok(self.cell.get_or_init(|| result)),
            Err(err) => {
                *pending = Some(source);
                Err(err)
            }
        }
    }

    fn resolve(&self, row: usize) -> Option<(&Column, usize)> {
        match self.vivify() {
            Ok(col) => Some((col, row)),
            Err(err) => {
                log::error!("latent column evaluation failed: {}", err);
                None
            }
        }
    }
}

impl ColumnImpl for LatentColumn {
    fn nrows(&self) -> usize {
        self.nrows
    }

    fn stype(&self) -> Stype {
        self.stype
    }

    fn is_virtual(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn children(&self) -> Vec<Column> {
        if let Some(col) = self.cell.get() {
            return vec![col.clone()];
        }
        lock_unpoisoned(&self.pending).iter().cloned().collect()
    }

    // Concurrent first touches would contend on the evaluation lock; expose
    // parallel access only once the memoized column exists.
    fn allow_parallel_access(&self) -> bool {
        self.cell.get().is_some()
    }

    fn materialize_override(&self) -> Option<Result<Column>> {
        Some(self.vivify().map(Column::clone))
    }

    positional_accessors!();
}
