//! Loaders that materialize external data into a [`crate::types::DataSet`].
//!
//! The engine itself accepts any pre-materialized sequence; loaders are a convenience for
//! getting tabular data in. Currently available:
//! - [`csv`]

pub mod csv;

pub use self::csv::{ingest_csv_from_path, ingest_csv_from_reader};
