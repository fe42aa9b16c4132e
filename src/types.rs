//! Core data model types.
//!
//! Collections and datasets hold [`Value`]s, a small tagged variant that also serves as a group
//! key. A [`DataSet`] is a column-major, named-column container described by a [`Schema`]
//! (a list of [`Field`]s whose [`DataType`]s are inferred from the column contents).

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::context::Context;
use crate::error::{EngineError, EngineResult};

/// Logical data type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Every cell is null, or the column is empty.
    Null,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
    /// Nested list of values.
    List,
    /// Non-null cells disagree on their type.
    Mixed,
}

impl DataType {
    /// Infer the common type of the non-null `values`.
    pub fn infer(values: &[Value]) -> Self {
        let mut out = DataType::Null;
        for v in values {
            let t = v.data_type();
            if t == DataType::Null {
                continue;
            }
            if out == DataType::Null {
                out = t;
            } else if out != t {
                return DataType::Mixed;
            }
        }
        out
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered list of fields describing a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single dynamically typed value.
///
/// `Value` is `Eq + Hash` so it can act as its own group key. Floats compare by bit pattern
/// after folding `-0.0` into `0.0` and every NaN into one canonical NaN, which makes equal
/// floats group together and NaNs form a single group.
#[derive(Debug, Clone)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
    /// Nested sequence; the only variant [`crate::rdd::Rdd::flatten`] splices.
    List(Vec<Value>),
}

fn float_key(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => float_key(*a) == float_key(*b),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Utf8(a), Value::Utf8(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Int64(v) => v.hash(state),
            Value::Float64(v) => float_key(*v).hash(state),
            Value::Bool(v) => v.hash(state),
            Value::Utf8(v) => v.hash(state),
            Value::List(v) => v.hash(state),
        }
    }
}

impl Value {
    /// The [`DataType`] tag of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Int64(_) => DataType::Int64,
            Value::Float64(_) => DataType::Float64,
            Value::Bool(_) => DataType::Bool,
            Value::Utf8(_) => DataType::Utf8,
            Value::List(_) => DataType::List,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of the value: integers widen to `f64`, everything else is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Utf8(v) => f.write_str(v),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int64(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Utf8(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// In-memory named-column dataset.
///
/// Columns are stored column-major in the same order as the [`Schema`] fields and always have
/// equal length. A dataset is never mutated after construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSet {
    schema: Schema,
    columns: Vec<Vec<Value>>,
}

impl DataSet {
    /// A dataset with no columns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a dataset from column data and matching column names.
    ///
    /// - no columns and no names: an empty dataset
    /// - data without names, or a blank/duplicate name: [`EngineError::InvalidColumnName`]
    /// - count mismatch or unequal column lengths: [`EngineError::InvalidData`]
    pub fn from_columns(columns: Vec<Vec<Value>>, names: Vec<String>) -> EngineResult<Self> {
        if columns.is_empty() && names.is_empty() {
            return Ok(Self::empty());
        }
        if names.is_empty() {
            return Err(EngineError::InvalidColumnName {
                message: "must provide column names".to_string(),
            });
        }
        if columns.len() != names.len() {
            return Err(EngineError::InvalidData {
                message: format!(
                    "data columns ({}) don't match column names ({})",
                    columns.len(),
                    names.len()
                ),
            });
        }

        let mut seen = HashSet::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(EngineError::InvalidColumnName {
                    message: format!("column {i} has empty name"),
                });
            }
            if !seen.insert(name.as_str()) {
                return Err(EngineError::InvalidColumnName {
                    message: format!("duplicate column name '{name}'"),
                });
            }
        }

        let rows = columns[0].len();
        if let Some((i, col)) = columns.iter().enumerate().find(|(_, c)| c.len() != rows) {
            return Err(EngineError::InvalidData {
                message: format!(
                    "column {i} ({}) has {} values, expected {rows}",
                    names[i],
                    col.len()
                ),
            });
        }

        let fields = names
            .into_iter()
            .zip(columns.iter())
            .map(|(name, col)| Field::new(name, DataType::infer(col)))
            .collect();

        Ok(Self {
            schema: Schema::new(fields),
            columns,
        })
    }

    /// Schema describing the columns.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Column names in order (owned copy).
    pub fn column_names(&self) -> Vec<String> {
        self.schema.field_names().map(str::to_string).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.schema.index_of(name).is_some()
    }

    /// Borrow the values of a column.
    pub fn column_values(&self, name: &str) -> EngineResult<&[Value]> {
        self.schema
            .index_of(name)
            .map(|idx| self.columns[idx].as_slice())
            .ok_or_else(|| EngineError::ColumnNotFound {
                column: name.to_string(),
            })
    }

    /// Owned copy of a column's values.
    pub fn select(&self, name: &str) -> EngineResult<Vec<Value>> {
        if name.trim().is_empty() {
            return Err(EngineError::InvalidColumnName {
                message: "column name is empty".to_string(),
            });
        }
        self.column_values(name).map(<[Value]>::to_vec)
    }

    /// Number of rows (length of every column).
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Unique values of a column, in first-seen order.
    ///
    /// Returns [`EngineError::EmptyDataSet`] for an empty column. The context is checked for
    /// every scanned value.
    pub fn distinct(&self, ctx: &Context, name: &str) -> EngineResult<Vec<Value>> {
        ctx.check()?;
        let values = self.column_values(name)?;
        if values.is_empty() {
            return Err(EngineError::EmptyDataSet);
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for v in values {
            ctx.check()?;
            if seen.insert(v) {
                out.push(v.clone());
            }
        }
        Ok(out)
    }
}

impl fmt::Display for DataSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DataSet[rows={}, columns={}: {}]",
            self.row_count(),
            self.num_columns(),
            self.schema.field_names().collect::<Vec<_>>().join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{DataSet, DataType, Value};
    use crate::context::Context;
    use crate::error::EngineError;
    use std::collections::HashSet;

    fn names(ns: &[&str]) -> Vec<String> {
        ns.iter().map(|s| s.to_string()).collect()
    }

    fn sample_dataset() -> DataSet {
        DataSet::from_columns(
            vec![
                vec!["A".into(), "B".into(), "A".into()],
                vec![1.into(), 2.into(), 3.into()],
            ],
            names(&["category", "value"]),
        )
        .unwrap()
    }

    #[test]
    fn from_columns_infers_schema() {
        let ds = sample_dataset();
        assert_eq!(ds.row_count(), 3);
        assert_eq!(ds.num_columns(), 2);
        assert_eq!(ds.column_names(), names(&["category", "value"]));
        assert_eq!(ds.schema().fields[0].data_type, DataType::Utf8);
        assert_eq!(ds.schema().fields[1].data_type, DataType::Int64);
        assert_eq!(ds.schema().index_of("value"), Some(1));
        assert!(ds.has_column("category"));
        assert!(!ds.has_column("missing"));
    }

    #[test]
    fn from_columns_rejects_bad_shapes() {
        let err = DataSet::from_columns(vec![vec![1.into()]], vec![]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidColumnName { .. }));

        let err = DataSet::from_columns(vec![vec![1.into()]], names(&["a", "b"])).unwrap_err();
        assert!(matches!(err, EngineError::InvalidData { .. }));

        let err = DataSet::from_columns(vec![vec![1.into()], vec![]], names(&["a", "b"]))
            .unwrap_err();
        assert!(err.to_string().contains("expected 1"));

        let err = DataSet::from_columns(vec![vec![1.into()]], names(&["  "])).unwrap_err();
        assert!(matches!(err, EngineError::InvalidColumnName { .. }));

        let err = DataSet::from_columns(vec![vec![], vec![]], names(&["a", "a"])).unwrap_err();
        assert!(err.to_string().contains("duplicate column name"));
    }

    #[test]
    fn empty_dataset_has_no_rows() {
        let ds = DataSet::from_columns(vec![], vec![]).unwrap();
        assert_eq!(ds.row_count(), 0);
        assert_eq!(ds.num_columns(), 0);
        assert_eq!(ds.to_string(), "DataSet[rows=0, columns=0: ]");
    }

    #[test]
    fn select_returns_independent_copy() {
        let ds = sample_dataset();
        let mut col = ds.select("category").unwrap();
        col[0] = Value::Null;
        assert_eq!(ds.column_values("category").unwrap()[0], Value::from("A"));

        assert!(matches!(
            ds.select(""),
            Err(EngineError::InvalidColumnName { .. })
        ));
        assert!(matches!(
            ds.select("nope"),
            Err(EngineError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn distinct_keeps_first_seen_order() {
        let ds = sample_dataset();
        let ctx = Context::background();
        assert_eq!(
            ds.distinct(&ctx, "category").unwrap(),
            vec![Value::from("A"), Value::from("B")]
        );

        let empty = DataSet::from_columns(vec![vec![]], names(&["x"])).unwrap();
        assert!(matches!(
            empty.distinct(&ctx, "x"),
            Err(EngineError::EmptyDataSet)
        ));

        let canceled = Context::new();
        canceled.cancel();
        assert!(matches!(
            ds.distinct(&canceled, "category"),
            Err(EngineError::Canceled)
        ));
    }

    #[test]
    fn float_values_hash_consistently() {
        let mut set = HashSet::new();
        set.insert(Value::Float64(0.0));
        set.insert(Value::Float64(-0.0));
        set.insert(Value::Float64(f64::NAN));
        set.insert(Value::Float64(-f64::NAN));
        set.insert(Value::Int64(0));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn infer_reports_mixed_and_null_columns() {
        assert_eq!(DataType::infer(&[]), DataType::Null);
        assert_eq!(DataType::infer(&[Value::Null, 1.into()]), DataType::Int64);
        assert_eq!(DataType::infer(&[1.into(), "x".into()]), DataType::Mixed);
    }

    #[test]
    fn display_renders_values_and_datasets() {
        let v = Value::List(vec![1.into(), "a".into(), Value::Null]);
        assert_eq!(v.to_string(), "[1, a, null]");
        assert_eq!(
            sample_dataset().to_string(),
            "DataSet[rows=3, columns=2: category, value]"
        );
    }
}
