/*!
 * Database access for natural-language queries.
 *
 * This module provides:
 * - Connection targets (local SQLite file or networked MySQL server)
 * - The connection manager owning the single active handle
 * - Dynamically typed values and result rows
 * - The demo `STUDENT` database
 */

pub mod connection;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod seed;
pub mod sqlite;
pub mod target;
pub mod value;

// Re-export main types
pub use connection::ConnectionManager;
pub use target::{BackendKind, ConnectionTarget, FileTarget, NetworkTarget};
pub use value::{is_read_statement, Execution, Row, SqlValue};
