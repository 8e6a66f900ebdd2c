/*!
 * Dynamically typed SQL values and result rows.
 *
 * The shape of a result set is only known once a statement has run, so rows
 * are ordered sequences of `SqlValue` rather than typed records.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Statements starting with SELECT (ignoring leading whitespace and case) are reads
static READ_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*select").expect("read statement pattern is valid")
});

/// A single column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// One result row, in column order
pub type Row = Vec<SqlValue>;

impl SqlValue {
    /// Numeric view of the value, used for charting
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Real(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Null | Self::Blob(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::Text(s) => write!(f, "{}", s),
            Self::Blob(b) => write!(f, "<BLOB: {} bytes>", b.len()),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Outcome of one statement on the active handle
#[derive(Debug, Clone, Default)]
pub struct Execution {
    /// Column names of a read statement, empty for writes
    pub columns: Vec<String>,
    /// Result rows of a read statement, empty for writes
    pub rows: Vec<Row>,
    /// Rows changed by a write statement
    pub rows_affected: u64,
    /// Wall-clock time spent in the backend
    pub elapsed: Duration,
}

/// Whether a statement is treated as a read.
///
/// The rule is lexical: the statement must begin with `SELECT`. Anything else
/// (including `WITH ... SELECT`) is executed as a write and committed.
pub fn is_read_statement(sql: &str) -> bool {
    READ_STATEMENT.is_match(sql)
}
