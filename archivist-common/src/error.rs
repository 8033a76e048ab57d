//! Common error types for archivist

use thiserror::Error;

/// Common result type for archivist operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the ingest and reconcile tools
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the underlying SQLite error is transient lock contention
    pub fn is_lock_error(&self) -> bool {
        match self {
            Error::Database(db_err) => db_err.to_string().contains("database is locked"),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_error_detection() {
        let locked = Error::Database(sqlx::Error::Protocol("database is locked".to_string()));
        assert!(locked.is_lock_error());

        let other = Error::Database(sqlx::Error::RowNotFound);
        assert!(!other.is_lock_error());

        let internal = Error::Internal("database is locked".to_string());
        assert!(!internal.is_lock_error(), "only sqlx errors count as lock contention");
    }
}
