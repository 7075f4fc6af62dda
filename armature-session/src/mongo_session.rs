//! MongoDB session storage implementation.

use crate::collection::SessionCollection;
use crate::config::{SessionBackend, SessionConfig};
use crate::error::{SessionError, SessionResult};
use crate::manager::DocumentSessionManager;
use crate::record::{NewSessionRecord, RecordId, SessionRecord};
use armature_mongo::MongoClient;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use mongodb::bson::{self, doc, oid::ObjectId};
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Session manager backed by MongoDB.
pub type MongoSessionManager = DocumentSessionManager<MongoSessionCollection>;

/// Name of the unique index on `sid`.
pub const SID_INDEX_NAME: &str = "sid_unique";

/// Session document as stored in MongoDB.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoSessionDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    sid: String,
    time: bson::DateTime,
    values: String,
}

impl MongoSessionDocument {
    fn into_record(self) -> SessionResult<SessionRecord> {
        let id = self
            .id
            .ok_or_else(|| SessionError::Storage("session document without _id".to_string()))?;

        Ok(SessionRecord {
            id: RecordId::new(id.to_hex()),
            sid: self.sid,
            time: from_bson_time(self.time),
            values: self.values,
        })
    }
}

fn to_bson_time(time: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(time.timestamp_millis())
}

fn from_bson_time(time: bson::DateTime) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(time.timestamp_millis())
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn object_id(id: &RecordId) -> SessionResult<ObjectId> {
    ObjectId::parse_str(id.as_str())
        .map_err(|e| SessionError::Storage(format!("invalid record id '{}': {}", id, e)))
}

/// MongoDB-backed [`SessionCollection`].
///
/// # Examples
///
/// ```no_run
/// use armature_session::{MongoSessionManager, SessionConfig, SessionContext, SessionManager};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = SessionConfig::mongodb("mongodb://localhost:27017/myapp")?
///         .with_collection("sessions");
///
///     let manager = MongoSessionManager::connect(config).await?;
///
///     let ctx = SessionContext::background();
///     let store = manager.create(ctx, "abc123", Duration::from_secs(3600)).await?;
///
///     manager.close().await?;
///     Ok(())
/// }
/// ```
pub struct MongoSessionCollection {
    client: MongoClient,
    collection: Collection<MongoSessionDocument>,
}

impl MongoSessionCollection {
    /// Bind to a collection of an already connected client.
    pub fn new(client: MongoClient, collection: &str) -> Self {
        let collection = client.collection::<MongoSessionDocument>(collection);
        Self { client, collection }
    }

    /// Get the client.
    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    /// Create the unique index on `sid`.
    ///
    /// Creating an index that already exists with the same options is a no-op
    /// on the server.
    pub async fn ensure_indexes(&self) -> SessionResult<()> {
        let options = IndexOptions::builder()
            .unique(true)
            .name(SID_INDEX_NAME.to_string())
            .build();
        let index = IndexModel::builder()
            .keys(doc! { "sid": 1 })
            .options(options)
            .build();

        self.collection.create_index(index).await?;
        debug!(collection = %self.collection.name(), "Session indexes ensured");
        Ok(())
    }
}

impl MongoSessionManager {
    /// Connect to MongoDB and build a session manager.
    ///
    /// Fails with [`SessionError::Connection`] if the deployment cannot be
    /// reached.
    pub async fn connect(config: SessionConfig) -> SessionResult<Self> {
        if config.backend != SessionBackend::MongoDb {
            return Err(SessionError::Config(format!(
                "expected a MongoDB configuration, got {:?}",
                config.backend
            )));
        }
        config.validate()?;

        let client = MongoClient::connect(config.mongo_config()).await?;
        Self::from_client(client, config).await
    }

    /// Build a session manager on a connected client.
    ///
    /// Use this to share one client (with its pool and TLS settings) between
    /// sessions and the rest of the application.
    pub async fn from_client(client: MongoClient, config: SessionConfig) -> SessionResult<Self> {
        config.validate()?;

        let collection = MongoSessionCollection::new(client, &config.collection);
        if config.create_indexes {
            collection.ensure_indexes().await?;
        }

        info!(
            database = %collection.client().database_name(),
            collection = %config.collection,
            "MongoDB session store ready"
        );

        Ok(Self::new(collection))
    }
}

#[async_trait]
impl SessionCollection for MongoSessionCollection {
    fn name(&self) -> &str {
        self.collection.name()
    }

    async fn ping(&self) -> SessionResult<()> {
        self.client.ping().await.map_err(SessionError::from)
    }

    async fn find_by_sid(&self, sid: &str) -> SessionResult<Option<SessionRecord>> {
        self.collection
            .find_one(doc! { "sid": sid })
            .await?
            .map(MongoSessionDocument::into_record)
            .transpose()
    }

    async fn insert(&self, record: NewSessionRecord) -> SessionResult<SessionRecord> {
        let document = MongoSessionDocument {
            id: None,
            sid: record.sid.clone(),
            time: to_bson_time(record.time),
            values: record.values.clone(),
        };

        let result = self.collection.insert_one(document).await?;
        let id = result.inserted_id.as_object_id().ok_or_else(|| {
            SessionError::Storage(format!(
                "unexpected inserted id type: {:?}",
                result.inserted_id
            ))
        })?;

        Ok(record.into_record(RecordId::new(id.to_hex())))
    }

    async fn update_by_id(&self, record: &SessionRecord) -> SessionResult<()> {
        let id = object_id(&record.id)?;
        let update = doc! {
            "$set": {
                "sid": record.sid.as_str(),
                "time": to_bson_time(record.time),
                "values": record.values.as_str(),
            }
        };

        let result = self.collection.update_one(doc! { "_id": id }, update).await?;
        if result.matched_count == 0 {
            return Err(SessionError::NotFound(record.sid.clone()));
        }
        Ok(())
    }

    async fn delete_by_sid(&self, sid: &str) -> SessionResult<u64> {
        let result = self.collection.delete_many(doc! { "sid": sid }).await?;
        Ok(result.deleted_count)
    }

    async fn close(&self) -> SessionResult<()> {
        self.client.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_shape() {
        let document = MongoSessionDocument {
            id: None,
            sid: "abc123".to_string(),
            time: bson::DateTime::from_millis(1_700_000_000_000),
            values: r#"{"theme":"dark"}"#.to_string(),
        };

        let bson = bson::to_document(&document).unwrap();
        assert!(!bson.contains_key("_id"));
        assert_eq!(bson.get_str("sid").unwrap(), "abc123");
        assert_eq!(bson.get_str("values").unwrap(), r#"{"theme":"dark"}"#);
        assert!(bson.get_datetime("time").is_ok());
    }

    #[test]
    fn test_into_record() {
        let oid = ObjectId::new();
        let document = MongoSessionDocument {
            id: Some(oid),
            sid: "abc123".to_string(),
            time: bson::DateTime::from_millis(1_700_000_000_000),
            values: String::new(),
        };

        let record = document.into_record().unwrap();
        assert_eq!(record.id.as_str(), oid.to_hex());
        assert_eq!(record.time.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(object_id(&record.id).unwrap(), oid);
    }

    #[test]
    fn test_time_conversion_truncates_to_millis() {
        let time = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(from_bson_time(to_bson_time(time)), time);
    }

    #[test]
    fn test_invalid_record_id() {
        let err = object_id(&RecordId::new("not-an-object-id")).unwrap_err();
        assert!(err.is_storage());
    }

    #[tokio::test]
    async fn test_connect_rejects_other_backends() {
        let config = SessionConfig::memory();
        let err = MongoSessionManager::connect(config).await.err().unwrap();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[tokio::test]
    async fn test_connect_unreachable_is_connection_error() {
        let config = SessionConfig::mongodb("mongodb://127.0.0.1:1/sessions").unwrap();
        let mut mongo = config.mongo_config();
        mongo.server_selection_timeout = std::time::Duration::from_millis(200);

        let err = MongoClient::connect(mongo).await.map_err(SessionError::from).unwrap_err();
        assert!(err.is_connection());
    }
}
