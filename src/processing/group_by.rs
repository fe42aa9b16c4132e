//! Grouping a [`DataSet`] column by value and summarizing each group.
//!
//! ```rust
//! use rust_rdd::context::Context;
//! use rust_rdd::processing::ReduceOp;
//! use rust_rdd::types::{DataSet, Value};
//!
//! # fn main() -> rust_rdd::EngineResult<()> {
//! let ctx = Context::background();
//! let letters = ["A", "B", "A", "C", "B"].map(Value::from).to_vec();
//! let ds = DataSet::from_columns(vec![letters], vec!["letter".to_string()])?;
//!
//! let summary = ds.group_by(&ctx, "letter")?.agg_op(ReduceOp::Count).show(&ctx)?;
//! assert_eq!(summary.column_names(), vec!["letter", "count"]);
//! assert_eq!(summary.row_count(), 3);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::{EngineError, EngineResult};
use crate::types::{DataSet, Value};

use super::reduce::ReduceOp;

/// A group reducer: summarizes a group's members into an integer.
pub type Reducer = Arc<dyn Fn(&[Value]) -> i64 + Send + Sync>;

/// Name of the summary column produced by [`GroupBy::show`].
pub const SUMMARY_COLUMN: &str = "count";

/// Partition of one column's values into groups of equal values, plus the reducers to run.
///
/// Group iteration order is unspecified.
#[derive(Clone)]
pub struct GroupBy {
    column: String,
    groups: HashMap<Value, Vec<Value>>,
    reducers: Vec<Reducer>,
}

impl DataSet {
    /// Group the values of `column` by equality, in one sequential pass.
    ///
    /// The context is checked before the scan and for every value.
    pub fn group_by(&self, ctx: &Context, column: &str) -> EngineResult<GroupBy> {
        ctx.check()?;
        if column.trim().is_empty() {
            return Err(EngineError::InvalidColumnName {
                message: "group column name is empty".to_string(),
            });
        }
        let values = self.column_values(column)?;

        let mut groups: HashMap<Value, Vec<Value>> = HashMap::new();
        for v in values {
            ctx.check()?;
            groups.entry(v.clone()).or_default().push(v.clone());
        }

        Ok(GroupBy {
            column: column.to_string(),
            groups,
            reducers: Vec::new(),
        })
    }
}

impl GroupBy {
    /// Register a reducer. Reducers run in registration order.
    pub fn agg<F>(mut self, reducer: F) -> Self
    where
        F: Fn(&[Value]) -> i64 + Send + Sync + 'static,
    {
        self.reducers.push(Arc::new(reducer));
        self
    }

    /// Register a built-in reducer.
    pub fn agg_op(self, op: ReduceOp) -> Self {
        self.agg(move |values| op.apply(values))
    }

    /// Run every reducer over every group.
    ///
    /// The result has columns `[<group column>, "count"]` and one row per group per reducer.
    /// Fails with [`EngineError::InvalidPipeline`] when no reducer is registered.
    pub fn show(&self, ctx: &Context) -> EngineResult<DataSet> {
        if self.reducers.is_empty() {
            return Err(EngineError::InvalidPipeline {
                message: "no aggregation registered; call agg before show".to_string(),
            });
        }

        let rows = self.groups.len() * self.reducers.len();
        let mut keys = Vec::with_capacity(rows);
        let mut summaries = Vec::with_capacity(rows);
        for (key, members) in &self.groups {
            ctx.check()?;
            for reducer in &self.reducers {
                keys.push(key.clone());
                summaries.push(Value::Int64(reducer(members)));
            }
        }

        DataSet::from_columns(
            vec![keys, summaries],
            vec![self.column.clone(), SUMMARY_COLUMN.to_string()],
        )
    }

    pub fn column_name(&self) -> &str {
        &self.column
    }

    /// Number of distinct values seen.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn groups(&self) -> &HashMap<Value, Vec<Value>> {
        &self.groups
    }

    /// Members of the group keyed by `key`.
    pub fn group(&self, key: &Value) -> Option<&[Value]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    pub fn reducer_count(&self) -> usize {
        self.reducers.len()
    }
}

impl fmt::Debug for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupBy")
            .field("column", &self.column)
            .field("groups", &self.groups.len())
            .field("reducers", &self.reducers.len())
            .finish()
    }
}
