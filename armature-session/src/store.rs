//! Store bound to a single document-backed session.

use crate::codec::{SessionValues, ValueCodec};
use crate::collection::SessionCollection;
use crate::context::SessionContext;
use crate::error::{SessionError, SessionResult};
use crate::traits::SessionStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Session values held in memory and persisted to a [`SessionCollection`].
///
/// Every accessor takes the store's reader/writer lock for the duration of a
/// single map operation; the lock is never held across a database call.
pub struct DocumentSessionStore<C: SessionCollection> {
    ctx: SessionContext,
    sid: String,
    collection: Arc<C>,
    codec: Arc<dyn ValueCodec>,
    expiry: Duration,
    deferred_expiry: Option<DateTime<Utc>>,
    values: RwLock<SessionValues>,
}

impl<C: SessionCollection> DocumentSessionStore<C> {
    pub(crate) fn new(
        ctx: SessionContext,
        sid: impl Into<String>,
        collection: Arc<C>,
        codec: Arc<dyn ValueCodec>,
        expiry: Duration,
        values: SessionValues,
    ) -> Self {
        Self {
            ctx,
            sid: sid.into(),
            collection,
            codec,
            expiry,
            deferred_expiry: None,
            values: RwLock::new(values),
        }
    }

    pub(crate) fn with_deferred_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.deferred_expiry = Some(expires_at);
        self
    }

    /// Session lifetime this store was opened with.
    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Expiry timestamp that the next save will write, if a refresh deferred one.
    pub fn deferred_expiry(&self) -> Option<DateTime<Utc>> {
        self.deferred_expiry
    }

    /// Keys currently held in memory.
    pub fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    /// Number of values held in memory.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Whether no values are held in memory.
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

#[async_trait]
impl<C: SessionCollection + 'static> SessionStore for DocumentSessionStore<C> {
    fn context(&self) -> &SessionContext {
        &self.ctx
    }

    fn session_id(&self) -> &str {
        &self.sid
    }

    fn set(&self, key: &str, value: Value) {
        self.values.write().insert(key.to_string(), value);
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn delete(&self, key: &str) -> Option<Value> {
        self.values.write().remove(key)
    }

    async fn flush(&self) -> SessionResult<()> {
        self.values.write().clear();
        self.save().await
    }

    async fn save(&self) -> SessionResult<()> {
        let payload = {
            let values = self.values.read();
            self.codec.encode(&values)?
        };

        let mut record = self
            .ctx
            .run(self.collection.find_by_sid(&self.sid))
            .await?
            .ok_or_else(|| SessionError::NotFound(self.sid.clone()))?;

        record.values = payload;
        if let Some(expires_at) = self.deferred_expiry {
            record.time = expires_at;
        }

        self.ctx.run(self.collection.update_by_id(&record)).await?;

        debug!(
            sid = %self.sid,
            collection = self.collection.name(),
            bytes = record.values.len(),
            "Session saved"
        );
        Ok(())
    }
}

impl<C: SessionCollection> std::fmt::Debug for DocumentSessionStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSessionStore")
            .field("sid", &self.sid)
            .field("collection", &self.collection.name())
            .field("expiry", &self.expiry)
            .field("values", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::memory_session::MemorySessionCollection;
    use crate::record::NewSessionRecord;
    use serde_json::json;

    async fn store_for(
        sid: &str,
    ) -> (
        Arc<MemorySessionCollection>,
        DocumentSessionStore<MemorySessionCollection>,
    ) {
        let collection = Arc::new(MemorySessionCollection::new("sessions"));
        collection.insert(NewSessionRecord::empty(sid)).await.unwrap();

        let store = DocumentSessionStore::new(
            SessionContext::background(),
            sid,
            collection.clone(),
            Arc::new(JsonCodec),
            Duration::from_secs(60),
            SessionValues::new(),
        );
        (collection, store)
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let (_, store) = store_for("abc").await;

        assert!(store.get("theme").is_none());
        store.set("theme", json!("dark"));
        assert_eq!(store.get("theme"), Some(json!("dark")));

        store.set("theme", json!("light"));
        assert_eq!(store.delete("theme"), Some(json!("light")));
        assert!(store.delete("theme").is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_typed_helpers() {
        let (_, store) = store_for("abc").await;

        store.set_value("user_id", 42_u64).unwrap();
        store.set_value("roles", vec!["admin", "editor"]).unwrap();

        assert_eq!(store.get_value::<u64>("user_id").unwrap(), Some(42));
        assert_eq!(
            store.get_value::<Vec<String>>("roles").unwrap(),
            Some(vec!["admin".to_string(), "editor".to_string()])
        );
        assert_eq!(store.get_value::<u64>("missing").unwrap(), None);
        assert!(store.get_value::<u64>("roles").unwrap_err().is_decode());
    }

    #[tokio::test]
    async fn test_save_writes_encoded_values() {
        let (collection, store) = store_for("abc").await;

        store.set("theme", json!("dark"));
        store.save().await.unwrap();

        let record = collection.find_by_sid("abc").await.unwrap().unwrap();
        assert_eq!(record.values, r#"{"theme":"dark"}"#);
    }

    #[tokio::test]
    async fn test_save_empty_map_writes_empty_string() {
        let (collection, store) = store_for("abc").await;

        store.save().await.unwrap();

        let record = collection.find_by_sid("abc").await.unwrap().unwrap();
        assert_eq!(record.values, "");
    }

    #[tokio::test]
    async fn test_save_without_record_is_not_found() {
        let (collection, store) = store_for("abc").await;
        collection.delete_by_sid("abc").await.unwrap();

        store.set("theme", json!("dark"));
        assert!(store.save().await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_flush_clears_and_persists() {
        let (collection, store) = store_for("abc").await;

        store.set("theme", json!("dark"));
        store.save().await.unwrap();

        store.flush().await.unwrap();
        assert!(store.is_empty());

        let record = collection.find_by_sid("abc").await.unwrap().unwrap();
        assert_eq!(record.values, "");

        store.flush().await.unwrap();
        let again = collection.find_by_sid("abc").await.unwrap().unwrap();
        assert_eq!(again, record);
    }

    #[tokio::test]
    async fn test_save_writes_deferred_expiry() {
        let (collection, store) = store_for("abc").await;
        let expires_at = Utc::now() + chrono::Duration::seconds(600);
        let store = store.with_deferred_expiry(expires_at);

        store.save().await.unwrap();

        let record = collection.find_by_sid("abc").await.unwrap().unwrap();
        assert_eq!(record.time, expires_at);
    }

    #[tokio::test]
    async fn test_save_honours_cancelled_context() {
        let (_, store) = store_for("abc").await;
        let token = tokio_util::sync::CancellationToken::new();
        token.cancel();

        let store = DocumentSessionStore {
            ctx: SessionContext::background().with_cancellation(token),
            ..store
        };

        assert!(matches!(store.save().await, Err(SessionError::Cancelled)));
    }
}
