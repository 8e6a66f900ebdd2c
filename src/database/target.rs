/*!
 * Connection targets: a local database file or a networked MySQL server.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

use crate::errors::DatabaseError;

/// Default MySQL port
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Kind of backend a target refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Single-file embedded database (SQLite)
    File,
    /// Networked server (MySQL)
    Network,
}

/// A local database file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    /// Path to the database file
    pub path: PathBuf,
    /// Open without write access
    pub read_only: bool,
}

/// A networked database server
#[derive(Clone, PartialEq, Eq)]
pub struct NetworkTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// Where the connection manager should point its active handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    File(FileTarget),
    Network(NetworkTarget),
}

impl FileTarget {
    pub fn read_only(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            read_only: true,
        }
    }

    pub fn read_write(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            read_only: false,
        }
    }
}

impl NetworkTarget {
    /// Build a target from raw user input.
    ///
    /// `port` is textual because it usually comes from a prompt or a flag; an
    /// empty port falls back to 3306.
    pub fn new(
        host: &str,
        port: &str,
        user: &str,
        password: &str,
        database: &str,
    ) -> Result<Self, DatabaseError> {
        let target = Self {
            host: host.trim().to_string(),
            port: parse_port(port)?,
            user: user.trim().to_string(),
            password: password.to_string(),
            database: database.trim().to_string(),
        };
        target.validate()?;
        Ok(target)
    }

    /// Check the target before any connection attempt
    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.host.contains('@') {
            return Err(DatabaseError::InvalidTarget(
                "host must not contain '@'".to_string(),
            ));
        }
        if self.host.is_empty()
            || self.user.is_empty()
            || self.password.is_empty()
            || self.database.is_empty()
        {
            return Err(DatabaseError::InvalidTarget(
                "host, user, password and database are all required".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(DatabaseError::InvalidTarget("port must be non-zero".to_string()));
        }
        Ok(())
    }

    /// `mysql://` URL with user and password percent-encoded
    pub fn connection_url(&self) -> Result<String, DatabaseError> {
        let mut url = Url::parse(&format!("mysql://{}:{}", self.host, self.port))
            .map_err(|e| DatabaseError::InvalidTarget(format!("invalid host: {}", e)))?;
        url.set_username(&self.user)
            .map_err(|_| DatabaseError::InvalidTarget("invalid user".to_string()))?;
        url.set_password(Some(&self.password))
            .map_err(|_| DatabaseError::InvalidTarget("invalid password".to_string()))?;
        url.set_path(&self.database);
        Ok(url.to_string())
    }
}

// Password stays out of logs and debug output
impl fmt::Debug for NetworkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

impl fmt::Display for NetworkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

impl ConnectionTarget {
    /// Read-only local file
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::File(FileTarget::read_only(path))
    }

    /// Writable local file
    pub fn file_rw(path: impl AsRef<Path>) -> Self {
        Self::File(FileTarget::read_write(path))
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::File(_) => BackendKind::File,
            Self::Network(_) => BackendKind::Network,
        }
    }

    /// Checks that need no I/O beyond a file metadata probe
    pub fn validate(&self) -> Result<(), DatabaseError> {
        match self {
            Self::File(file) => {
                if !file.path.is_file() {
                    return Err(DatabaseError::NotFound(file.path.clone()));
                }
                Ok(())
            }
            Self::Network(network) => network.validate(),
        }
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(file) => write!(
                f,
                "{} ({})",
                file.path.display(),
                if file.read_only { "read-only" } else { "read-write" }
            ),
            Self::Network(network) => write!(f, "mysql://{}", network),
        }
    }
}

/// Parse a textual port, defaulting to 3306 when empty
pub fn parse_port(port: &str) -> Result<u16, DatabaseError> {
    let port = port.trim();
    if port.is_empty() {
        return Ok(DEFAULT_MYSQL_PORT);
    }
    port.parse::<u16>()
        .map_err(|_| DatabaseError::InvalidTarget(format!("port must be numeric, got '{}'", port)))
}
