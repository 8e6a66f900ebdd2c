/*!
 * Error types for the sqlchat application.
 *
 * Each layer owns its error enum (provider, database, translation, pipeline),
 * using the thiserror crate for ergonomic error definitions. `ErrorKind` is the
 * flat taxonomy callers match on; `user_message()` is what may cross the
 * external boundary, while the `Display` text is kept for logs.
 */

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Map a non-success HTTP status and body to the matching variant
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised by the connection manager and its handles
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The local database file does not exist
    #[error("Database file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The target could not be opened or reached
    #[error("Could not connect to database: {0}")]
    Connection(String),

    /// A statement was issued while no handle is open
    #[error("No database connection established")]
    NoConnection,

    /// The connection target was rejected before use
    #[error("Invalid connection target: {0}")]
    InvalidTarget(String),

    /// The statement failed, including malformed SQL
    #[error("Statement execution failed: {0}")]
    Execution(String),

    /// The database (or the active handle) is locked by someone else
    #[error("Database is busy: {0}")]
    Busy(String),
}

impl DatabaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Connection(_) => ErrorKind::Connection,
            Self::NoConnection => ErrorKind::NoConnection,
            Self::InvalidTarget(_) => ErrorKind::InvalidTarget,
            Self::Execution(_) => ErrorKind::Execution,
            Self::Busy(_) => ErrorKind::Busy,
        }
    }

    /// Message safe to show to an end user
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(path) => format!("The database file {} does not exist.", path.display()),
            Self::Connection(_) => "Could not connect to the database.".to_string(),
            Self::NoConnection => "No database is connected.".to_string(),
            Self::InvalidTarget(reason) => format!("Invalid database settings: {}.", reason),
            Self::Execution(_) => "The generated query could not be executed.".to_string(),
            Self::Busy(_) => "The database is busy, try again shortly.".to_string(),
        }
    }
}

/// Errors that can occur during natural-language to SQL translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The provider answered, but with no usable text
    #[error("Provider returned an empty reply")]
    EmptyResponse,
}

/// Pipeline stage an error originated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Translating,
    Executing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Translating => write!(f, "translating"),
            Self::Executing => write!(f, "executing"),
        }
    }
}

/// Flat error taxonomy shared by every layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NotFound,
    Connection,
    NoConnection,
    InvalidTarget,
    Translation,
    Execution,
    Timeout,
    Busy,
}

/// Failure of one pipeline run, tagged with the stage it happened in
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Translation failed: {0}")]
    Translation(#[source] TranslationError),

    #[error("Execution failed: {0}")]
    Execution(#[source] DatabaseError),

    #[error("Timed out while {stage} after {after:?}")]
    Timeout {
        /// Stage that did not finish in time
        stage: Stage,
        /// Configured limit that expired
        after: Duration,
    },
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Translation(_) => Stage::Translating,
            Self::Execution(_) => Stage::Executing,
            Self::Timeout { stage, .. } => *stage,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Translation(_) => ErrorKind::Translation,
            Self::Execution(e) => e.kind(),
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Message safe to show to an end user
    pub fn user_message(&self) -> String {
        match self {
            Self::Translation(TranslationError::EmptyResponse) => {
                "The language model returned no SQL for this question.".to_string()
            }
            Self::Translation(_) => "The language model could not be reached.".to_string(),
            Self::Execution(e) => e.user_message(),
            Self::Timeout { stage, .. } => format!("The request timed out while {}.", stage),
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the database layer
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Error from a pipeline run
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
