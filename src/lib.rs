//! `rust-rdd` is a small in-memory engine for parallel collection transformations.
//!
//! An [`rdd::Rdd`] is an immutable, ordered collection. Its transformations
//! ([`rdd::Rdd::map`], [`rdd::Rdd::filter`], [`rdd::Rdd::flatten`], [`rdd::Rdd::flat_map`])
//! fan the work out over a per-call worker pool and fan the results back in on the calling
//! thread. Every transformation takes a [`context::Context`] and stops promptly once it is
//! canceled or its deadline passes; no partial output is ever returned.
//!
//! Tabular data lives in a column-major [`types::DataSet`], which can be grouped by a column
//! and summarized with reducers ([`processing::GroupBy`]).
//!
//! ## Ordering
//!
//! - [`rdd::Rdd::map`] preserves input order: `out[i] == f(&in[i])`.
//! - [`rdd::Rdd::filter`], [`rdd::Rdd::flatten`] and [`rdd::Rdd::flat_map`] return the right
//!   multiset of elements in an unspecified order.
//!
//! ## Quick example: transform, group, summarize
//!
//! ```rust
//! use rust_rdd::context::Context;
//! use rust_rdd::processing::ReduceOp;
//! use rust_rdd::session::Session;
//! use rust_rdd::types::Value;
//!
//! # fn main() -> rust_rdd::EngineResult<()> {
//! let session = Session::builder().app_name("letters").build()?;
//! let ctx = Context::background();
//!
//! let words = session.parallelize(vec!["a", "B", "a", "c", "b"]);
//! let letters = words.map(&ctx, |w| Value::from(w.to_uppercase()))?;
//!
//! let summary = letters
//!     .to_dataset()?
//!     .group_by(&ctx, "value")?
//!     .agg_op(ReduceOp::Count)
//!     .show(&ctx)?;
//! assert_eq!(summary.column_names(), vec!["value", "count"]);
//! assert_eq!(summary.row_count(), 3);
//! # Ok(())
//! # }
//! ```
//!
//! ## Cancellation
//!
//! ```rust
//! use rust_rdd::context::Context;
//! use rust_rdd::rdd::Rdd;
//! use rust_rdd::EngineError;
//!
//! let ctx = Context::new();
//! ctx.cancel();
//! let rdd = Rdd::new(0..10_000);
//! assert!(matches!(rdd.map(&ctx, |v| v * 2), Err(EngineError::Canceled)));
//! ```
//!
//! ## Modules
//!
//! - [`rdd`]: the collection type and its transformations
//! - [`execution`]: the scheduler, its options, observer events and metrics
//! - [`context`]: cancellation and deadlines
//! - [`types`]: values and the tabular [`types::DataSet`]
//! - [`processing`]: grouping and reductions
//! - [`ingestion`]: CSV loading
//! - [`session`]: named sessions and their configuration
//! - [`error`]: the error type shared by all of the above

pub mod context;
pub mod error;
pub mod execution;
pub mod ingestion;
pub mod processing;
pub mod rdd;
pub mod session;
pub mod types;

pub use error::{EngineError, EngineResult};
