//! Grouping and aggregation over [`crate::types::DataSet`] columns.
//!
//! Currently implemented:
//!
//! - [`crate::types::DataSet::group_by`]: partition a column into groups of equal values
//! - [`GroupBy::agg`] / [`GroupBy::agg_op`] / [`GroupBy::show`]: summarize every group
//! - [`reduce()`]: whole-column reductions (count/sum/min/max)
//!
//! ## Example: parallelize → dataset → group → summarize
//!
//! ```rust
//! use rust_rdd::context::Context;
//! use rust_rdd::processing::{reduce, ReduceOp};
//! use rust_rdd::rdd::Rdd;
//! use rust_rdd::types::Value;
//!
//! # fn main() -> rust_rdd::EngineResult<()> {
//! let ctx = Context::background();
//! let rdd = Rdd::new([1, 2, 2, 3, 3, 3].map(Value::from));
//! let ds = rdd.to_dataset()?;
//!
//! let summary = ds
//!     .group_by(&ctx, "value")?
//!     .agg_op(ReduceOp::Count)
//!     .agg_op(ReduceOp::Sum)
//!     .show(&ctx)?;
//! // three groups, two reducers each
//! assert_eq!(summary.row_count(), 6);
//!
//! assert_eq!(reduce(&ds, "value", ReduceOp::Sum), Some(Value::Int64(14)));
//! # Ok(())
//! # }
//! ```

pub mod group_by;
pub mod reduce;

pub use group_by::{GroupBy, Reducer, SUMMARY_COLUMN};
pub use reduce::{reduce, ReduceOp};
