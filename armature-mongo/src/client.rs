//! MongoDB client service.

use mongodb::bson::doc;
use mongodb::{Client, Collection, Database};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use crate::{MongoConfig, MongoError, Result};

/// MongoDB client bound to one database.
///
/// Cloning is cheap; clones share the driver's connection pool and the
/// shutdown state.
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    database: Database,
    config: Arc<MongoConfig>,
    closed: Arc<AtomicBool>,
}

impl MongoClient {
    /// Connect and verify the deployment answers a `ping`.
    pub async fn connect(config: MongoConfig) -> Result<Self> {
        let options = config.client_options().await?;
        let database_name = config.resolve_database(&options)?;

        let client = Client::with_options(options)
            .map_err(|e| MongoError::Connection(e.to_string()))?;
        let database = client.database(&database_name);

        let service = Self {
            client,
            database,
            config: Arc::new(config),
            closed: Arc::new(AtomicBool::new(false)),
        };

        service
            .ping()
            .await
            .map_err(|e| MongoError::Connection(format!("ping failed: {}", e)))?;

        info!(
            database = %database_name,
            max_pool_size = service.config.max_pool_size,
            tls = service.config.tls.enabled,
            "MongoDB client connected"
        );

        Ok(service)
    }

    /// Get the configuration.
    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    /// Get the underlying driver client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database handle.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Get the database name.
    pub fn database_name(&self) -> &str {
        self.database.name()
    }

    /// Get a typed collection handle.
    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.database.collection::<T>(name)
    }

    /// Check if the deployment is reachable.
    pub async fn ping(&self) -> Result<()> {
        if self.is_closed() {
            return Err(MongoError::Closed);
        }

        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| MongoError::Command(e.to_string()))?;

        debug!(database = %self.database_name(), "MongoDB ping ok");
        Ok(())
    }

    /// Whether [`shutdown`](Self::shutdown) has been called on this client or a clone.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close all pooled connections.
    ///
    /// Calling this more than once is a no-op.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.client.clone().shutdown().await;
        info!(database = %self.database_name(), "MongoDB client shut down");
    }
}

impl std::fmt::Debug for MongoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoClient")
            .field("database", &self.database_name())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let config = MongoConfig::new("http://localhost:27017");
        let err = MongoClient::connect(config).await.unwrap_err();
        assert!(matches!(err, MongoError::Config(_)));
    }

    #[tokio::test]
    async fn test_connect_requires_database() {
        let config = MongoConfig::new("mongodb://localhost:27017");
        let err = MongoClient::connect(config).await.unwrap_err();
        assert!(matches!(err, MongoError::Config(_)));
    }

    #[tokio::test]
    async fn test_connect_unreachable_server() {
        let config = MongoConfig::builder()
            .url("mongodb://127.0.0.1:1/sessions")
            .server_selection_timeout(Duration::from_millis(200))
            .connect_timeout(Duration::from_millis(200))
            .build();

        let err = MongoClient::connect(config).await.unwrap_err();
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    #[ignore = "requires a running MongoDB (set MONGODB_URL)"]
    async fn test_connect_and_shutdown() {
        let config = MongoConfig::from_env().database("armature_test").build();
        let client = MongoClient::connect(config).await.unwrap();

        assert_eq!(client.database_name(), "armature_test");
        client.ping().await.unwrap();

        client.shutdown().await;
        client.shutdown().await;
        assert!(client.is_closed());
        assert!(matches!(client.ping().await, Err(MongoError::Closed)));
    }
}
