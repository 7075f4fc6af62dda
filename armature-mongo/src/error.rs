//! MongoDB error types.

use mongodb::error::ErrorKind;
use thiserror::Error;

/// Result type for MongoDB operations.
pub type Result<T> = std::result::Result<T, MongoError>;

/// MongoDB errors.
#[derive(Debug, Error)]
pub enum MongoError {
    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Command error.
    #[error("Command error: {0}")]
    Command(String),

    /// Timeout error.
    #[error("Operation timed out")]
    Timeout,

    /// The client was shut down.
    #[error("Client is shut down")]
    Closed,

    /// Underlying driver error.
    #[error("MongoDB error: {0}")]
    Driver(#[from] mongodb::error::Error),
}

impl MongoError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout => true,
            Self::Driver(e) => matches!(
                *e.kind,
                ErrorKind::Io(_)
                    | ErrorKind::ServerSelection { .. }
                    | ErrorKind::ConnectionPoolCleared { .. }
            ),
            _ => false,
        }
    }

    /// Check if this error indicates connection loss.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Closed => true,
            Self::Driver(e) => matches!(*e.kind, ErrorKind::Io(_)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(MongoError::Connection("refused".into()).is_retryable());
        assert!(MongoError::Timeout.is_retryable());
        assert!(!MongoError::Config("bad".into()).is_retryable());

        assert!(MongoError::Closed.is_connection_error());
        assert!(!MongoError::Command("ping".into()).is_connection_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            MongoError::Config("missing database".into()).to_string(),
            "Configuration error: missing database"
        );
        assert_eq!(MongoError::Timeout.to_string(), "Operation timed out");
    }
}
