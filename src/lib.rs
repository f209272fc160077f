//! vircol: an in-process columnar data engine.
//!
//! The crate is organized in two layers. The buffer layer owns physical
//! memory: heap allocations, external memory, byte-range views, host-object
//! slots, and lazily memory-mapped files whose mappings a process-wide
//! registry can evict under memory pressure. The column layer sits on top:
//! materialized columns read from buffers, virtual columns compute their
//! values on access from other columns, forming an evaluation DAG that is
//! collapsed by [`Column::materialize`].
//!
//! # Example
//!
//! ```
//! use vircol::{vcol, Column};
//!
//! fn main() -> vircol::Result<()> {
//!     let prices = Column::from_options(vec![Some(9.99f64), None, Some(4.50)])?;
//!     let doubled = vcol::map1::<f64, f64>(&prices, |p| p * 2.0)?;
//!     assert_eq!(doubled.get::<f64>(0), Some(19.98));
//!     assert_eq!(doubled.get::<f64>(1), None);
//!
//!     let filled = vcol::fillna(&doubled, &Column::from_vec(vec![0.0f64])?)?;
//!     let result = filled.materialize()?;
//!     assert_eq!(result.get::<f64>(1), Some(0.0));
//!     Ok(())
//! }
//! ```

pub mod bitmask;
pub mod buffer;
pub mod column;
pub mod error;
pub mod groupby;
pub mod rowindex;
pub mod types;
pub mod vcol;

pub use buffer::{
    global_registry, AcquireMode, Buffer, BufferImpl, MappedRegion, MappingRegistry,
};
pub use column::{Column, ColumnImpl};
pub use error::{Error, Result};
pub use groupby::Groupby;
pub use rowindex::RowIndex;
pub use types::{Element, Object, Scalar, Stype};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
