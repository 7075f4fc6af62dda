//! Error types for session operations.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// MongoDB driver error
    #[cfg(feature = "mongodb")]
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// CouchDB-specific error
    #[cfg(feature = "couchdb")]
    #[error("CouchDB error: {0}")]
    CouchDb(String),

    /// HTTP request error (CouchDB)
    #[cfg(feature = "couchdb")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Any other storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored session values could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Session not found
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Operation timeout
    #[error("Operation timeout")]
    Timeout,

    /// Operation cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid session ID
    #[error("Invalid session ID: {0}")]
    InvalidSessionId(String),
}

impl SessionError {
    /// Whether no record matched the session ID.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the stored payload was malformed.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    /// Whether the backend could not be reached at startup.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Whether this is a failure reported by the underlying database.
    pub fn is_storage(&self) -> bool {
        match self {
            Self::Storage(_) => true,
            #[cfg(feature = "mongodb")]
            Self::Mongo(_) => true,
            #[cfg(feature = "couchdb")]
            Self::CouchDb(_) | Self::Http(_) => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "mongodb")]
impl From<armature_mongo::MongoError> for SessionError {
    fn from(err: armature_mongo::MongoError) -> Self {
        use armature_mongo::MongoError;

        match err {
            MongoError::Config(msg) => Self::Config(msg),
            MongoError::Timeout => Self::Timeout,
            MongoError::Command(msg) => Self::Storage(msg),
            MongoError::Driver(e) => Self::Mongo(e),
            other => Self::Connection(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(SessionError::NotFound("abc".into()).is_not_found());
        assert!(SessionError::Decode("eof".into()).is_decode());
        assert!(SessionError::Connection("refused".into()).is_connection());
        assert!(SessionError::Storage("duplicate".into()).is_storage());
        assert!(!SessionError::Timeout.is_storage());
    }

    #[test]
    fn test_serde_json_error_maps_to_serialization() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(SessionError::from(err), SessionError::Serialization(_)));
    }

    #[cfg(feature = "mongodb")]
    #[test]
    fn test_mongo_error_mapping() {
        use armature_mongo::MongoError;

        assert!(SessionError::from(MongoError::Connection("down".into())).is_connection());
        assert!(SessionError::from(MongoError::Closed).is_connection());
        assert!(matches!(
            SessionError::from(MongoError::Config("no db".into())),
            SessionError::Config(_)
        ));

        let err = SessionError::from(MongoError::Command("ping failed".into()));
        assert!(err.is_storage());
        assert!(!err.is_connection());
    }
}
