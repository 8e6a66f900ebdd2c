/*!
 * Connection manager: owns the single active database handle.
 *
 * Exactly one handle is active at a time. Statements are serialized through
 * an async mutex around the handle, so concurrent pipeline runs never
 * interleave on one connection.
 */

use log::{debug, info};
use tokio::sync::Mutex;

use super::sqlite::SqliteHandle;
use super::target::ConnectionTarget;
use super::value::{Execution, SqlValue};
use crate::errors::DatabaseError;

#[cfg(feature = "mysql")]
use super::mysql::MySqlHandle;

/// Backend-specific open handle
enum Handle {
    Sqlite(SqliteHandle),
    #[cfg(feature = "mysql")]
    MySql(MySqlHandle),
}

impl Handle {
    async fn open(target: &ConnectionTarget) -> Result<Self, DatabaseError> {
        match target {
            ConnectionTarget::File(file) => Ok(Self::Sqlite(SqliteHandle::open(file)?)),
            #[cfg(feature = "mysql")]
            ConnectionTarget::Network(network) => Ok(Self::MySql(MySqlHandle::connect(network).await?)),
            #[cfg(not(feature = "mysql"))]
            ConnectionTarget::Network(_) => Err(DatabaseError::Connection(
                "MySQL support not enabled. Rebuild with the 'mysql' feature.".to_string(),
            )),
        }
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<Execution, DatabaseError> {
        match self {
            Self::Sqlite(handle) => handle.execute(sql, params).await,
            #[cfg(feature = "mysql")]
            Self::MySql(handle) => handle.execute(sql, params).await,
        }
    }

    async fn close(self) -> Result<(), DatabaseError> {
        match self {
            Self::Sqlite(handle) => handle.close(),
            #[cfg(feature = "mysql")]
            Self::MySql(handle) => handle.close().await,
        }
    }
}

struct ActiveHandle {
    target: ConnectionTarget,
    handle: Handle,
}

/// Manages the one active connection and runs statements against it
pub struct ConnectionManager {
    active: Mutex<Option<ActiveHandle>>,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    /// Create a manager with no open handle
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
        }
    }

    /// Create a manager and connect it to `target`
    pub async fn connected(target: ConnectionTarget) -> Result<Self, DatabaseError> {
        let manager = Self::new();
        manager.connect(target).await?;
        Ok(manager)
    }

    /// Open a handle to `target`.
    ///
    /// The current handle is replaced only once the new one has opened; if
    /// validation or opening fails the current handle stays active.
    pub async fn connect(&self, target: ConnectionTarget) -> Result<(), DatabaseError> {
        target.validate()?;

        let mut active = self.active.lock().await;
        let handle = Handle::open(&target).await?;
        Self::close_locked(&mut active).await?;

        info!("Connected to database: {}", target);
        *active = Some(ActiveHandle { target, handle });
        Ok(())
    }

    /// Close the current handle, then connect to `target`.
    ///
    /// Unlike `connect`, the old handle is closed even if the new target
    /// turns out to be unusable.
    pub async fn switch_to(&self, target: ConnectionTarget) -> Result<(), DatabaseError> {
        let mut active = self.active.lock().await;
        Self::close_locked(&mut active).await?;

        target.validate()?;
        Self::open_locked(&mut active, target).await?;

        if let Some(current) = active.as_ref() {
            info!("Switched to database: {}", current.target);
        }
        Ok(())
    }

    /// Run a statement against the active handle.
    ///
    /// Reads (statements starting with `SELECT`) return their rows; every
    /// other statement is committed before this returns and yields no rows.
    pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<Execution, DatabaseError> {
        let mut active = self.active.lock().await;
        let current = active.as_mut().ok_or(DatabaseError::NoConnection)?;

        debug!("Executing SQL: {}", sql);
        let execution = current.handle.execute(sql, params).await?;
        debug!("Query executed in {:.2} seconds", execution.elapsed.as_secs_f64());

        Ok(execution)
    }

    /// Like `execute`, but fails with `Busy` instead of waiting when another
    /// caller is using the handle
    pub async fn try_execute(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Execution, DatabaseError> {
        let mut active = self
            .active
            .try_lock()
            .map_err(|_| DatabaseError::Busy("connection is in use".to_string()))?;
        let current = active.as_mut().ok_or(DatabaseError::NoConnection)?;

        current.handle.execute(sql, params).await
    }

    /// Release the active handle. Closing twice is a no-op.
    pub async fn close(&self) -> Result<(), DatabaseError> {
        let mut active = self.active.lock().await;
        Self::close_locked(&mut active).await
    }

    /// Whether a handle is currently open
    pub async fn is_connected(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Target of the active handle, if any
    pub async fn active_target(&self) -> Option<ConnectionTarget> {
        self.active.lock().await.as_ref().map(|a| a.target.clone())
    }

    async fn open_locked(
        active: &mut Option<ActiveHandle>,
        target: ConnectionTarget,
    ) -> Result<(), DatabaseError> {
        let handle = Handle::open(&target).await?;
        info!("Connected to database: {}", target);
        *active = Some(ActiveHandle { target, handle });
        Ok(())
    }

    async fn close_locked(active: &mut Option<ActiveHandle>) -> Result<(), DatabaseError> {
        if let Some(previous) = active.take() {
            previous.handle.close().await?;
            info!("Database connection closed: {}", previous.target);
        }
        Ok(())
    }
}
