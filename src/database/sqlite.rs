/*!
 * File-backed handle on top of rusqlite.
 *
 * The connection lives behind a mutex and every statement runs on tokio's
 * blocking pool, so the async runtime never waits on SQLite I/O.
 */

use log::debug;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ErrorCode, InterruptHandle, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::target::FileTarget;
use super::value::{is_read_statement, Execution, SqlValue};
use crate::errors::DatabaseError;

/// Open SQLite database file
pub struct SqliteHandle {
    /// Path to the database file
    path: PathBuf,
    /// Thread-safe connection wrapped in Arc<Mutex>
    connection: Arc<Mutex<Connection>>,
    /// Lets an abandoned execution stop the statement it started
    interrupt: Arc<InterruptHandle>,
}

impl SqliteHandle {
    /// Open an existing database file; never creates one
    pub fn open(target: &FileTarget) -> Result<Self, DatabaseError> {
        if !target.path.exists() {
            return Err(DatabaseError::NotFound(target.path.clone()));
        }

        let access = if target.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        let flags = access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&target.path, flags)
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        // Contention on the file fails immediately instead of waiting
        conn.busy_timeout(Duration::ZERO)
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        let interrupt = Arc::new(conn.get_interrupt_handle());

        Ok(Self {
            path: target.path.clone(),
            connection: Arc::new(Mutex::new(conn)),
            interrupt,
        })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run one statement on the blocking pool.
    ///
    /// If this future is dropped before completion the running statement is
    /// interrupted, so a timed-out query does not keep the file locked.
    pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<Execution, DatabaseError> {
        let connection = self.connection.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        let guard = InterruptOnDrop::arm(self.interrupt.clone());
        let result = tokio::task::spawn_blocking(move || {
            let conn = connection
                .lock()
                .map_err(|e| DatabaseError::Execution(format!("Connection poisoned by a panicked task: {}", e)))?;

            run_statement(&conn, &sql, &params)
        })
        .await
        .map_err(|e| DatabaseError::Execution(format!("Database task panicked: {}", e)));
        guard.disarm();

        result?
    }

    /// Close the underlying connection
    pub fn close(self) -> Result<(), DatabaseError> {
        debug!("Closing database connection to {}", self.path.display());

        match Arc::try_unwrap(self.connection) {
            Ok(mutex) => {
                let conn = mutex
                    .into_inner()
                    .map_err(|e| DatabaseError::Connection(format!("Poisoned connection: {}", e)))?;
                conn.close()
                    .map_err(|(_, e)| DatabaseError::Connection(e.to_string()))
            }
            // An interrupted statement still owns a reference; the connection
            // closes when that blocking task finishes.
            Err(_) => {
                self.interrupt.interrupt();
                Ok(())
            }
        }
    }
}

/// Interrupts the connection unless disarmed
struct InterruptOnDrop {
    handle: Option<Arc<InterruptHandle>>,
}

impl InterruptOnDrop {
    fn arm(handle: Arc<InterruptHandle>) -> Self {
        Self { handle: Some(handle) }
    }

    fn disarm(mut self) {
        self.handle = None;
    }
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("Interrupting abandoned SQLite statement");
            handle.interrupt();
        }
    }
}

fn run_statement(
    conn: &Connection,
    sql: &str,
    params: &[SqlValue],
) -> Result<Execution, DatabaseError> {
    let started = Instant::now();
    let mut stmt = conn.prepare(sql).map_err(map_error)?;
    let mut execution = Execution::default();

    if is_read_statement(sql) {
        execution.columns = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = stmt.column_count();

        let mut rows = stmt.query(params_from_iter(params.iter())).map_err(map_error)?;
        while let Some(row) = rows.next().map_err(map_error)? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(value_from_ref(row.get_ref(i).map_err(map_error)?));
            }
            execution.rows.push(values);
        }
    } else if stmt.column_count() > 0 {
        // Not a read by the lexical rule but still yields rows (WITH, PRAGMA):
        // step it to completion and discard the rows
        let mut rows = stmt.query(params_from_iter(params.iter())).map_err(map_error)?;
        while rows.next().map_err(map_error)?.is_some() {}
        execution.rows_affected = conn.changes();
    } else {
        // Autocommit mode: the change is durable once this returns
        let changed = stmt.execute(params_from_iter(params.iter())).map_err(map_error)?;
        execution.rows_affected = changed as u64;
    }

    execution.elapsed = started.elapsed();
    Ok(execution)
}

fn value_from_ref(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(s) => SqlValue::Text(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
    }
}

fn map_error(error: rusqlite::Error) -> DatabaseError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &error {
        if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) {
            return DatabaseError::Busy(error.to_string());
        }
    }
    DatabaseError::Execution(error.to_string())
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}
