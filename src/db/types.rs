//! Query result types.
//!
//! A result is fully materialized: column metadata plus ordered rows, where
//! each row is addressable by column name through [`RowRef`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Represents the result of executing a SQL query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column metadata for the result set.
    pub columns: Vec<ColumnInfo>,

    /// Rows of data, in server order.
    pub rows: Vec<Row>,

    /// Time the driver spent executing the final attempt.
    pub execution_time: Duration,

    /// Number of rows in the result.
    pub row_count: usize,
}

impl QueryResult {
    /// Creates a new empty query result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query result with the given columns and rows.
    pub fn with_data(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            execution_time: Duration::ZERO,
            row_count,
        }
    }

    /// Sets the execution time.
    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }

    /// Returns true if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the position of a column, matching names case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Returns a name-addressable view of the row at `index`.
    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        self.rows.get(index).map(|values| RowRef {
            result: self,
            values,
        })
    }

    /// Iterates over all rows as name-addressable views.
    pub fn iter_rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(move |values| RowRef {
            result: self,
            values,
        })
    }
}

/// Borrowed view of one row that resolves values by column name.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    result: &'a QueryResult,
    values: &'a [Value],
}

impl<'a> RowRef<'a> {
    /// Returns the value for a column name.
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.result
            .column_index(column)
            .and_then(|i| self.values.get(i))
    }

    /// Iterates over `(column name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        let values = self.values;
        self.result
            .columns
            .iter()
            .zip(values.iter())
            .map(|(c, v)| (c.name.as_str(), v))
    }
}

/// Metadata about a column in a result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,

    /// Column data type.
    pub data_type: String,
}

impl ColumnInfo {
    /// Creates a new column info with the given name and type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A row of data from a query result.
pub type Row = Vec<Value>;

/// Represents a single value from a database query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    String(String),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns the string contents, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> QueryResult {
        QueryResult::with_data(
            vec![
                ColumnInfo::new("id", "int"),
                ColumnInfo::new("Name", "nvarchar"),
            ],
            vec![
                vec![Value::Int(1), Value::String("Alice".to_string())],
                vec![Value::Int(2), Value::Null],
            ],
        )
    }

    #[test]
    fn test_value_as_str() {
        assert_eq!(Value::String("dbo".to_string()).as_str(), Some("dbo"));
        assert_eq!(Value::Int(1).as_str(), None);
        assert_eq!(Value::Null.as_str(), None);
    }

    #[test]
    fn test_query_result_new_is_empty() {
        let result = QueryResult::new();
        assert!(result.is_empty());
        assert_eq!(result.row_count, 0);
    }

    #[test]
    fn test_row_lookup_by_column_name() {
        let result = sample();
        let row = result.row(0).unwrap();
        assert_eq!(row.get("id"), Some(&Value::Int(1)));
        assert_eq!(row.get("name").and_then(Value::as_str), Some("Alice"));
        assert_eq!(row.get("missing"), None);
        assert!(result.row(5).is_none());
    }

    #[test]
    fn test_row_iter_pairs_in_column_order() {
        let result = sample();
        let pairs: Vec<_> = result.row(1).unwrap().iter().collect();
        assert_eq!(pairs, vec![("id", &Value::Int(2)), ("Name", &Value::Null)]);
    }

    #[test]
    fn test_iter_rows_visits_every_row() {
        let ids: Vec<_> = sample()
            .iter_rows()
            .filter_map(|r| r.get("ID").cloned())
            .collect();
        assert_eq!(ids, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_query_result_serde_keeps_execution_time() {
        let result = sample().with_execution_time(Duration::from_millis(25));
        let json = serde_json::to_string(&result).unwrap();
        let back: QueryResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.execution_time, Duration::from_millis(25));
        assert_eq!(back.row_count, 2);
    }
}
