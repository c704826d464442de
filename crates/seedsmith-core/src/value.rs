use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;

/// Format used for datetime literals and timestamp columns.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A value bound for insertion, rendered as an SQL literal at flush time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Render the value as a literal for `dialect`.
    pub fn to_literal(&self, dialect: Dialect) -> String {
        let ops = dialect.ops();
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(value) => ops.bool_literal(*value).to_string(),
            SqlValue::Int(value) => value.to_string(),
            SqlValue::Float(value) if value.is_finite() => value.to_string(),
            SqlValue::Float(_) => "NULL".to_string(),
            SqlValue::Text(value) => format!("'{}'", ops.escape_string(value)),
            SqlValue::Date(value) => format!("'{}'", value.format("%Y-%m-%d")),
            SqlValue::DateTime(value) => format!("'{}'", value.format(DATETIME_FORMAT)),
            SqlValue::Time(value) => format!("'{}'", value.format("%H:%M:%S")),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::DateTime(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}
