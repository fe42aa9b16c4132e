//! CSV ingestion implementation.

use std::path::Path;

use crate::error::{EngineError, EngineResult};
use crate::types::{DataSet, Value};

/// Ingest a CSV file into an in-memory [`DataSet`].
///
/// Rules:
///
/// - The first record is the header and names the columns.
/// - At least one data row is required.
/// - Every row must have as many fields as the header.
/// - Cell types are sniffed per value: empty is `Null`, then `Int64`, then `Float64`, else `Utf8`.
pub fn ingest_csv_from_path(path: impl AsRef<Path>) -> EngineResult<DataSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    ingest_csv_from_reader(&mut rdr)
}

/// Ingest CSV data from an existing CSV reader.
///
/// Build the reader with `flexible(true)` to get [`EngineError::InvalidData`] for ragged rows;
/// a strict reader reports them as [`EngineError::Csv`] instead.
pub fn ingest_csv_from_reader<R: std::io::Read>(rdr: &mut csv::Reader<R>) -> EngineResult<DataSet> {
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_owned()).collect();
    if headers.is_empty() {
        return Err(EngineError::InvalidData {
            message: "csv has no header".to_string(),
        });
    }

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for (row_idx0, result) in rdr.records().enumerate() {
        // 1-based row number, +1 again because the header is row 1.
        let user_row = row_idx0 + 2;
        let record = result?;
        if record.len() != headers.len() {
            return Err(EngineError::InvalidData {
                message: format!(
                    "row {user_row} has {} fields, expected {}",
                    record.len(),
                    headers.len()
                ),
            });
        }

        for (column, raw) in columns.iter_mut().zip(record.iter()) {
            column.push(sniff_value(raw));
        }
    }

    if columns[0].is_empty() {
        return Err(EngineError::InvalidData {
            message: "csv must contain a header and at least one data row".to_string(),
        });
    }

    DataSet::from_columns(columns, headers)
}

fn sniff_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Int64(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return Value::Float64(f);
    }
    Value::Utf8(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::{ingest_csv_from_reader, sniff_value};
    use crate::error::EngineError;
    use crate::types::Value;

    fn reader(data: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data.as_bytes())
    }

    #[test]
    fn sniffs_cell_types() {
        assert_eq!(sniff_value(" 42 "), Value::Int64(42));
        assert_eq!(sniff_value("2.5"), Value::Float64(2.5));
        assert_eq!(sniff_value(""), Value::Null);
        assert_eq!(sniff_value("  "), Value::Null);
        assert_eq!(sniff_value(" Ada "), Value::Utf8("Ada".to_string()));
    }

    #[test]
    fn reads_columns_in_header_order() {
        let ds = ingest_csv_from_reader(&mut reader("name,score\nA,1\nB,2.5\n")).unwrap();
        assert_eq!(ds.column_names(), vec!["name".to_string(), "score".to_string()]);
        assert_eq!(
            ds.column_values("score").unwrap(),
            &[Value::Int64(1), Value::Float64(2.5)]
        );
    }

    #[test]
    fn header_only_is_invalid_data() {
        let err = ingest_csv_from_reader(&mut reader("name,score\n")).unwrap_err();
        assert!(matches!(err, EngineError::InvalidData { .. }));
    }

    #[test]
    fn ragged_row_reports_row_number() {
        let err = ingest_csv_from_reader(&mut reader("a,b\n1,2\n3\n")).unwrap_err();
        match err {
            EngineError::InvalidData { message } => assert!(message.contains("row 3"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
