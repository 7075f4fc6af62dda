//! Session configuration.

use crate::error::{SessionError, SessionResult};

/// Default collection (or CouchDB database) holding session records.
pub const DEFAULT_COLLECTION: &str = "sessions";

/// Session backend type.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionBackend {
    /// MongoDB backend
    MongoDb,
    /// CouchDB backend
    CouchDb,
    /// In-process backend
    Memory,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Backend type
    pub backend: SessionBackend,
    /// Connection URL
    pub url: String,
    /// Database name (MongoDB: falls back to the URL's default database)
    pub database: Option<String>,
    /// Collection holding the session records
    pub collection: String,
    /// Username
    pub username: Option<String>,
    /// Password
    pub password: Option<String>,
    /// Create the unique `sid` index on startup (MongoDB only)
    pub create_indexes: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::MongoDb,
            url: "mongodb://localhost:27017".to_string(),
            database: None,
            collection: DEFAULT_COLLECTION.to_string(),
            username: None,
            password: None,
            create_indexes: true,
        }
    }
}

impl SessionConfig {
    /// Create a MongoDB session configuration.
    ///
    /// # Arguments
    ///
    /// * `url` - MongoDB connection string (e.g., "mongodb://localhost:27017/myapp")
    ///
    /// # Examples
    ///
    /// ```
    /// use armature_session::SessionConfig;
    ///
    /// let config = SessionConfig::mongodb("mongodb://localhost:27017/myapp").unwrap();
    /// assert_eq!(config.collection, "sessions");
    /// ```
    pub fn mongodb(url: &str) -> SessionResult<Self> {
        if !url.starts_with("mongodb://") && !url.starts_with("mongodb+srv://") {
            return Err(SessionError::InvalidUrl(
                "MongoDB URL must start with mongodb:// or mongodb+srv://".to_string(),
            ));
        }

        Ok(Self {
            backend: SessionBackend::MongoDb,
            url: url.to_string(),
            ..Default::default()
        })
    }

    /// Create a CouchDB session configuration.
    ///
    /// # Arguments
    ///
    /// * `url` - CouchDB connection URL (e.g., "http://localhost:5984")
    /// * `database` - Database name for sessions
    ///
    /// # Examples
    ///
    /// ```
    /// use armature_session::SessionConfig;
    ///
    /// let config = SessionConfig::couchdb("http://localhost:5984", "sessions").unwrap();
    /// ```
    pub fn couchdb(url: &str, database: &str) -> SessionResult<Self> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(SessionError::InvalidUrl(
                "CouchDB URL must start with http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            backend: SessionBackend::CouchDb,
            url: url.to_string(),
            database: Some(database.to_string()),
            ..Default::default()
        })
    }

    /// Create an in-process configuration (tests, single-node development).
    pub fn memory() -> Self {
        Self {
            backend: SessionBackend::Memory,
            url: "memory://".to_string(),
            ..Default::default()
        }
    }

    /// Set the database name.
    pub fn with_database(mut self, database: &str) -> Self {
        self.database = Some(database.to_string());
        self
    }

    /// Set the collection holding session records.
    pub fn with_collection(mut self, collection: &str) -> Self {
        self.collection = collection.to_string();
        self
    }

    /// Set authentication credentials.
    ///
    /// # Arguments
    ///
    /// * `username` - Database username
    /// * `password` - Database password
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    /// Enable or disable index creation on startup.
    pub fn with_index_creation(mut self, enabled: bool) -> Self {
        self.create_indexes = enabled;
        self
    }

    /// Check that the configuration is usable by its backend.
    pub fn validate(&self) -> SessionResult<()> {
        if self.collection.is_empty() {
            return Err(SessionError::Config(
                "collection name must not be empty".to_string(),
            ));
        }

        if self.collection.contains('$') || self.collection.contains('\0') {
            return Err(SessionError::Config(format!(
                "invalid collection name '{}'",
                self.collection
            )));
        }

        if self.backend == SessionBackend::CouchDb
            && self.database.as_deref().is_none_or(str::is_empty)
        {
            return Err(SessionError::Config(
                "CouchDB database name is required".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the MongoDB client configuration for this session configuration.
    #[cfg(feature = "mongodb")]
    pub fn mongo_config(&self) -> armature_mongo::MongoConfig {
        let mut builder = armature_mongo::MongoConfig::builder()
            .url(self.url.as_str())
            .app_name("armature-session");

        if let Some(database) = &self.database {
            builder = builder.database(database.as_str());
        }

        if let Some(username) = &self.username {
            builder = builder.username(username.as_str());
        }

        if let Some(password) = &self.password {
            builder = builder.password(password.as_str());
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mongodb_config() {
        let config = SessionConfig::mongodb("mongodb://localhost:27017/app").unwrap();
        assert_eq!(config.backend, SessionBackend::MongoDb);
        assert_eq!(config.collection, DEFAULT_COLLECTION);
        assert!(config.create_indexes);
        assert!(config.validate().is_ok());

        let srv = SessionConfig::mongodb("mongodb+srv://cluster0.example.net/app");
        assert!(srv.is_ok());
    }

    #[test]
    fn test_invalid_urls() {
        assert!(matches!(
            SessionConfig::mongodb("redis://localhost:6379"),
            Err(SessionError::InvalidUrl(_))
        ));
        assert!(matches!(
            SessionConfig::couchdb("localhost:5984", "sessions"),
            Err(SessionError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_builder_methods() {
        let config = SessionConfig::mongodb("mongodb://localhost:27017")
            .unwrap()
            .with_database("app")
            .with_collection("web_sessions")
            .with_auth("svc", "secret")
            .with_index_creation(false);

        assert_eq!(config.database.as_deref(), Some("app"));
        assert_eq!(config.collection, "web_sessions");
        assert_eq!(config.username.as_deref(), Some("svc"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert!(!config.create_indexes);
    }

    #[test]
    fn test_validate_collection_name() {
        let config = SessionConfig::memory().with_collection("");
        assert!(matches!(config.validate(), Err(SessionError::Config(_))));

        let config = SessionConfig::memory().with_collection("sessions$tmp");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_couchdb_requires_database() {
        let mut config = SessionConfig::couchdb("http://localhost:5984", "sessions").unwrap();
        assert!(config.validate().is_ok());

        config.database = None;
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "mongodb")]
    #[test]
    fn test_mongo_config_conversion() {
        let config = SessionConfig::mongodb("mongodb://db:27017")
            .unwrap()
            .with_database("app")
            .with_auth("svc", "secret");

        let mongo = config.mongo_config();
        assert_eq!(mongo.url, "mongodb://db:27017");
        assert_eq!(mongo.database.as_deref(), Some("app"));
        assert_eq!(mongo.username.as_deref(), Some("svc"));
        assert_eq!(mongo.app_name.as_deref(), Some("armature-session"));
    }
}
