//! Error types for store operations

use std::fmt;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations
#[derive(Debug)]
pub enum StoreError {
    /// Unknown server_id or sample id
    NotFound(String),

    /// Unique constraint violated with conflicting fields
    Conflict(String),

    /// Database connection failed (transient, safe to retry)
    ConnectionFailed(String),

    /// Database query failed
    QueryFailed(String),

    /// Migration failed
    MigrationFailed(String),

    /// Row serialization/deserialization error
    Serialization(String),

    /// I/O error (file access, etc.)
    Io(std::io::Error),
}

impl StoreError {
    /// Whether a caller may retry the failed operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::ConnectionFailed(_) | StoreError::Io(_))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(msg) => write!(f, "not found: {}", msg),
            StoreError::Conflict(msg) => write!(f, "conflict: {}", msg),
            StoreError::ConnectionFailed(msg) => {
                write!(f, "failed to connect to store: {}", msg)
            }
            StoreError::QueryFailed(msg) => write!(f, "store query failed: {}", msg),
            StoreError::MigrationFailed(msg) => write!(f, "database migration failed: {}", msg),
            StoreError::Serialization(msg) => write!(f, "row serialization error: {}", msg),
            StoreError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(io_err) => StoreError::Io(io_err),
            sqlx::Error::RowNotFound => StoreError::NotFound("no rows found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::ConnectionFailed(err.to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.to_string())
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}
