//! CouchDB session storage implementation.
//!
//! This module requires the `couchdb` feature flag.

use crate::collection::SessionCollection;
use crate::config::{SessionBackend, SessionConfig};
use crate::error::{SessionError, SessionResult};
use crate::manager::DocumentSessionManager;
use crate::record::{NewSessionRecord, RecordId, SessionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

/// Session manager backed by CouchDB.
pub type CouchDbSessionManager = DocumentSessionManager<CouchDbSessionCollection>;

/// Maximum number of documents removed by one `delete_by_sid` call.
const DELETE_BATCH: usize = 100;

/// CouchDB document wrapper for sessions.
#[derive(Debug, Serialize, Deserialize)]
struct CouchDbSessionDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    rev: Option<String>,
    sid: String,
    time: DateTime<Utc>,
    values: String,
}

impl CouchDbSessionDocument {
    fn into_record(self) -> SessionResult<SessionRecord> {
        let id = self
            .id
            .ok_or_else(|| SessionError::CouchDb("session document without _id".to_string()))?;

        Ok(SessionRecord {
            id: RecordId::new(id),
            sid: self.sid,
            time: self.time,
            values: self.values,
        })
    }
}

fn malformed_response(err: reqwest::Error) -> SessionError {
    SessionError::CouchDb(format!("malformed CouchDB response: {}", err))
}

#[derive(Deserialize)]
struct FindResponse {
    docs: Vec<CouchDbSessionDocument>,
}

#[derive(Deserialize)]
struct WriteResponse {
    id: String,
}

/// CouchDB-backed [`SessionCollection`].
///
/// # Feature Flag
///
/// This requires the `couchdb` feature:
///
/// ```toml
/// [dependencies]
/// armature-session = { version = "0.1", features = ["couchdb"] }
/// ```
///
/// # Database Setup
///
/// Create the database and an index on `sid` so lookups do not scan:
///
/// ```bash
/// curl -X PUT http://localhost:5984/sessions
///
/// curl -X POST http://localhost:5984/sessions/_index \
///   -H "Content-Type: application/json" \
///   -d '{"index": {"fields": ["sid"]}, "name": "sid-index", "type": "json"}'
/// ```
///
/// # Examples
///
/// ```ignore
/// use armature_session::{CouchDbSessionManager, SessionConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = SessionConfig::couchdb("http://localhost:5984", "sessions")?
///         .with_auth("admin", "password");
///
///     let manager = CouchDbSessionManager::connect(config).await?;
///     Ok(())
/// }
/// ```
pub struct CouchDbSessionCollection {
    client: Client,
    config: SessionConfig,
    base_url: String,
}

impl CouchDbSessionCollection {
    /// Connect to a CouchDB database.
    ///
    /// Fails with [`SessionError::Connection`] if the database does not answer.
    pub async fn new(config: SessionConfig) -> SessionResult<Self> {
        config.validate()?;

        let database = config.database.as_ref().ok_or_else(|| {
            SessionError::Config("CouchDB database name is required".to_string())
        })?;

        let base_url = format!("{}/{}", config.url.trim_end_matches('/'), database);

        let client = Client::builder()
            .build()
            .map_err(|e| SessionError::Connection(e.to_string()))?;

        let collection = Self {
            client,
            config,
            base_url,
        };

        collection
            .ping()
            .await
            .map_err(|e| SessionError::Connection(e.to_string()))?;

        Ok(collection)
    }

    /// Build an authenticated request.
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method, url);

        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            request = request.basic_auth(username, Some(password));
        }

        request
    }

    async fn find(&self, sid: &str, limit: usize) -> SessionResult<Vec<CouchDbSessionDocument>> {
        let url = format!("{}/_find", self.base_url);
        let query = json!({
            "selector": { "sid": sid },
            "limit": limit,
        });

        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SessionError::CouchDb(format!(
                "Failed to query sessions: {}",
                response.status()
            )));
        }

        let found: FindResponse = response
            .json()
            .await
            .map_err(malformed_response)?;

        Ok(found.docs)
    }
}

impl CouchDbSessionManager {
    /// Connect to CouchDB and build a session manager.
    pub async fn connect(config: SessionConfig) -> SessionResult<Self> {
        if config.backend != SessionBackend::CouchDb {
            return Err(SessionError::Config(format!(
                "expected a CouchDB configuration, got {:?}",
                config.backend
            )));
        }

        let collection = CouchDbSessionCollection::new(config).await?;
        info!(url = %collection.base_url, "CouchDB session store ready");
        Ok(Self::new(collection))
    }
}

#[async_trait]
impl SessionCollection for CouchDbSessionCollection {
    fn name(&self) -> &str {
        self.config.database.as_deref().unwrap_or_default()
    }

    async fn ping(&self) -> SessionResult<()> {
        let response = self
            .request(reqwest::Method::HEAD, &self.base_url)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SessionError::CouchDb(format!(
                "Failed to reach CouchDB database '{}': {}",
                self.name(),
                response.status()
            )));
        }

        Ok(())
    }

    async fn find_by_sid(&self, sid: &str) -> SessionResult<Option<SessionRecord>> {
        self.find(sid, 1)
            .await?
            .into_iter()
            .next()
            .map(CouchDbSessionDocument::into_record)
            .transpose()
    }

    async fn insert(&self, record: NewSessionRecord) -> SessionResult<SessionRecord> {
        let doc = CouchDbSessionDocument {
            id: None,
            rev: None,
            sid: record.sid.clone(),
            time: record.time,
            values: record.values.clone(),
        };

        let response = self
            .request(reqwest::Method::POST, &self.base_url)
            .json(&doc)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SessionError::CouchDb(format!(
                "Failed to create session: {}",
                error_text
            )));
        }

        let created: WriteResponse = response
            .json()
            .await
            .map_err(malformed_response)?;

        Ok(record.into_record(RecordId::new(created.id)))
    }

    async fn update_by_id(&self, record: &SessionRecord) -> SessionResult<()> {
        let url = format!("{}/{}", self.base_url, record.id);

        // Get current revision
        let response = self.request(reqwest::Method::GET, &url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SessionError::NotFound(record.sid.clone()));
        }

        if !response.status().is_success() {
            return Err(SessionError::CouchDb(format!(
                "Failed to load session: {}",
                response.status()
            )));
        }

        let current: CouchDbSessionDocument = response
            .json()
            .await
            .map_err(malformed_response)?;

        let doc = CouchDbSessionDocument {
            id: Some(record.id.to_string()),
            rev: current.rev,
            sid: record.sid.clone(),
            time: record.time,
            values: record.values.clone(),
        };

        let response = self
            .request(reqwest::Method::PUT, &url)
            .json(&doc)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SessionError::CouchDb(format!(
                "Failed to save session: {}",
                error_text
            )));
        }

        Ok(())
    }

    async fn delete_by_sid(&self, sid: &str) -> SessionResult<u64> {
        let mut deleted = 0;

        for doc in self.find(sid, DELETE_BATCH).await? {
            let (Some(id), Some(rev)) = (doc.id, doc.rev) else {
                continue;
            };

            let delete_url = format!("{}/{}?rev={}", self.base_url, id, rev);
            let response = self
                .request(reqwest::Method::DELETE, &delete_url)
                .send()
                .await?;

            if response.status().is_success() {
                deleted += 1;
            } else if response.status() != reqwest::StatusCode::NOT_FOUND {
                return Err(SessionError::CouchDb(format!(
                    "Failed to delete session: {}",
                    response.status()
                )));
            }
        }

        Ok(deleted)
    }

    async fn close(&self) -> SessionResult<()> {
        // Connections are pooled per request by reqwest; nothing to release.
        Ok(())
    }
}
