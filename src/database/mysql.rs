/*!
 * Networked handle on top of sqlx's MySQL driver.
 *
 * Only compiled with the `mysql` feature. MySQL runs in autocommit mode by
 * default, so write statements are durable when `execute` returns.
 */

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;
use sqlx::mysql::{MySqlArguments, MySqlColumn, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Connection, Executor, MySql, Row, Statement, TypeInfo};
use std::time::Instant;

use super::target::NetworkTarget;
use super::value::{is_read_statement, Execution, SqlValue};
use crate::errors::DatabaseError;

/// Open MySQL session
pub struct MySqlHandle {
    label: String,
    connection: MySqlConnection,
}

impl MySqlHandle {
    pub async fn connect(target: &NetworkTarget) -> Result<Self, DatabaseError> {
        target.validate()?;
        let url = target.connection_url()?;

        let connection = MySqlConnection::connect(&url)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        Ok(Self {
            label: target.to_string(),
            connection,
        })
    }

    pub async fn execute(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Execution, DatabaseError> {
        let started = Instant::now();
        let mut execution = Execution::default();

        if is_read_statement(sql) {
            let rows = bind_all(sqlx::query(sql), params)
                .fetch_all(&mut self.connection)
                .await
                .map_err(map_error)?;

            execution.columns = match rows.first() {
                Some(first) => column_names(first.columns()),
                None => {
                    let statement = (&mut self.connection).prepare(sql).await.map_err(map_error)?;
                    column_names(statement.columns())
                }
            };
            execution.rows = rows.iter().map(decode_row).collect::<Result<_, _>>()?;
        } else {
            let done = bind_all(sqlx::query(sql), params)
                .execute(&mut self.connection)
                .await
                .map_err(map_error)?;
            execution.rows_affected = done.rows_affected();
        }

        execution.elapsed = started.elapsed();
        Ok(execution)
    }

    pub async fn close(self) -> Result<(), DatabaseError> {
        debug!("Closing database connection to {}", self.label);
        self.connection
            .close()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))
    }
}

fn bind_all<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [SqlValue],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(Option::<String>::None),
            SqlValue::Integer(i) => query.bind(*i),
            SqlValue::Real(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Blob(b) => query.bind(b.as_slice()),
        };
    }
    query
}

fn column_names(columns: &[MySqlColumn]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

/// How a column's wire value is turned into a `SqlValue`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Signed,
    Unsigned,
    Float,
    Double,
    Date,
    DateTime,
    Time,
    Year,
    Bytes,
    Text,
    /// Values sent as text that the string decoder does not accept by type,
    /// such as DECIMAL and JSON
    RawText,
}

fn column_kind(type_name: &str) -> ColumnKind {
    if type_name.ends_with("UNSIGNED") {
        return ColumnKind::Unsigned;
    }
    match type_name {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "BOOLEAN" => ColumnKind::Signed,
        "FLOAT" => ColumnKind::Float,
        "DOUBLE" => ColumnKind::Double,
        "DATE" => ColumnKind::Date,
        "DATETIME" | "TIMESTAMP" => ColumnKind::DateTime,
        "TIME" => ColumnKind::Time,
        "YEAR" => ColumnKind::Year,
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" | "BIT"
        | "GEOMETRY" => ColumnKind::Bytes,
        "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET" => {
            ColumnKind::Text
        }
        _ => ColumnKind::RawText,
    }
}

fn decode_row(row: &MySqlRow) -> Result<Vec<SqlValue>, DatabaseError> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let type_name = column.type_info().name();
            decode_value(row, i, column_kind(type_name)).map_err(|e| {
                DatabaseError::Execution(format!(
                    "Failed to decode column '{}' ({}): {}",
                    column.name(),
                    type_name,
                    e
                ))
            })
        })
        .collect()
}

fn decode_value(row: &MySqlRow, index: usize, kind: ColumnKind) -> Result<SqlValue, sqlx::Error> {
    let value = match kind {
        ColumnKind::Unsigned => match row.try_get::<Option<u64>, _>(index)? {
            Some(v) => i64::try_from(v).map_or_else(|_| SqlValue::Text(v.to_string()), SqlValue::Integer),
            None => SqlValue::Null,
        },
        ColumnKind::Signed => row.try_get::<Option<i64>, _>(index)?.into(),
        ColumnKind::Year => row.try_get_unchecked::<Option<i64>, _>(index)?.into(),
        ColumnKind::Float => row.try_get::<Option<f32>, _>(index)?.map(f64::from).into(),
        ColumnKind::Double => row.try_get::<Option<f64>, _>(index)?.into(),
        ColumnKind::Date => text(row.try_get::<Option<NaiveDate>, _>(index)?),
        ColumnKind::DateTime => text(row.try_get::<Option<NaiveDateTime>, _>(index)?),
        ColumnKind::Time => text(row.try_get::<Option<NaiveTime>, _>(index)?),
        ColumnKind::Bytes => row.try_get::<Option<Vec<u8>>, _>(index)?.into(),
        ColumnKind::Text => row.try_get::<Option<String>, _>(index)?.into(),
        ColumnKind::RawText => row.try_get_unchecked::<Option<String>, _>(index)?.into(),
    };
    Ok(value)
}

fn text<T: ToString>(value: Option<T>) -> SqlValue {
    value.map_or(SqlValue::Null, |v| SqlValue::Text(v.to_string()))
}

fn map_error(error: sqlx::Error) -> DatabaseError {
    match &error {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => DatabaseError::Connection(error.to_string()),
        sqlx::Error::Database(db) if db.code().as_deref() == Some("HY000") && db.message().contains("Lock wait") => {
            DatabaseError::Busy(error.to_string())
        }
        _ => DatabaseError::Execution(error.to_string()),
    }
}
