//! Built-in reductions, usable as group reducers or over a whole [`DataSet`] column.

use crate::types::{DataSet, Value};

/// Built-in reduction operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    /// Count all values (including nulls).
    Count,
    /// Sum numeric values, ignoring everything else.
    Sum,
    /// Minimum numeric value, ignoring everything else.
    Min,
    /// Maximum numeric value, ignoring everything else.
    Max,
}

impl ReduceOp {
    /// Apply the reduction to a group's members, producing an integer summary.
    pub fn apply(&self, values: &[Value]) -> i64 {
        match self {
            ReduceOp::Count => count(values),
            ReduceOp::Sum => sum(values),
            ReduceOp::Min => min(values),
            ReduceOp::Max => max(values),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReduceOp::Count => "count",
            ReduceOp::Sum => "sum",
            ReduceOp::Min => "min",
            ReduceOp::Max => "max",
        }
    }
}

/// Number of members.
pub fn count(values: &[Value]) -> i64 {
    i64::try_from(values.len()).unwrap_or(i64::MAX)
}

/// Sum of the numeric members.
///
/// `Int64` members are added exactly (wrapping on overflow). `Float64` members are accumulated
/// separately and the float total is truncated toward zero before being added in. Members of
/// any other type are skipped.
pub fn sum(values: &[Value]) -> i64 {
    let mut ints: i64 = 0;
    let mut floats: f64 = 0.0;
    for v in values {
        match v {
            Value::Int64(i) => ints = ints.wrapping_add(*i),
            Value::Float64(f) => floats += f,
            _ => {}
        }
    }
    ints.wrapping_add(floats as i64)
}

/// Smallest numeric member (floats truncated), or 0 when there is none.
pub fn min(values: &[Value]) -> i64 {
    numeric(values).min().unwrap_or(0)
}

/// Largest numeric member (floats truncated), or 0 when there is none.
pub fn max(values: &[Value]) -> i64 {
    numeric(values).max().unwrap_or(0)
}

fn numeric(values: &[Value]) -> impl Iterator<Item = i64> + '_ {
    values.iter().filter_map(|v| match v {
        Value::Int64(i) => Some(*i),
        Value::Float64(f) => Some(*f as i64),
        _ => None,
    })
}

/// Reduce a whole column using a built-in [`ReduceOp`].
///
/// - Returns `None` if `column` does not exist.
/// - For `Sum`/`Min`/`Max`, returns `Some(Value::Null)` if the column has no numeric values. The
///   result is `Int64` when every numeric value is an integer, `Float64` otherwise.
/// - For `Count`, always returns `Some(Value::Int64(row_count))`.
pub fn reduce(dataset: &DataSet, column: &str, op: ReduceOp) -> Option<Value> {
    let values = dataset.column_values(column).ok()?;

    if op == ReduceOp::Count {
        return Some(Value::Int64(count(values)));
    }

    let mut int_acc: Option<i64> = None;
    let mut float_acc: Option<f64> = None;
    for v in values {
        match v {
            Value::Int64(i) => int_acc = Some(fold_i64(op, int_acc, *i)),
            Value::Float64(f) => float_acc = Some(fold_f64(op, float_acc, *f)),
            _ => {}
        }
    }

    Some(match (int_acc, float_acc) {
        (None, None) => Value::Null,
        (Some(i), None) => Value::Int64(i),
        (None, Some(f)) => Value::Float64(f),
        (Some(i), Some(f)) => Value::Float64(fold_f64(op, Some(f), i as f64)),
    })
}

fn fold_i64(op: ReduceOp, acc: Option<i64>, v: i64) -> i64 {
    match (op, acc) {
        (_, None) => v,
        (ReduceOp::Min, Some(a)) => a.min(v),
        (ReduceOp::Max, Some(a)) => a.max(v),
        (_, Some(a)) => a.wrapping_add(v),
    }
}

fn fold_f64(op: ReduceOp, acc: Option<f64>, v: f64) -> f64 {
    match (op, acc) {
        (_, None) => v,
        (ReduceOp::Min, Some(a)) => a.min(v),
        (ReduceOp::Max, Some(a)) => a.max(v),
        (_, Some(a)) => a + v,
    }
}
