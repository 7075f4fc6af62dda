//! Session manager over a document collection.

use crate::codec::{JsonCodec, ValueCodec};
use crate::collection::SessionCollection;
use crate::context::SessionContext;
use crate::error::{SessionError, SessionResult};
use crate::record::NewSessionRecord;
use crate::store::DocumentSessionStore;
use crate::traits::SessionManager;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Document-backed [`SessionManager`].
///
/// One record per session ID, shaped `{ _id, sid, time, values }` where
/// `values` holds the encoded session map.
///
/// # Examples
///
/// ```
/// use armature_session::{
///     MemorySessionManager, SessionContext, SessionManager, SessionStore,
/// };
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), armature_session::SessionError> {
/// let manager = MemorySessionManager::in_memory();
/// let ctx = SessionContext::background();
///
/// let store = manager.create(ctx.clone(), "abc123", Duration::from_secs(3600)).await?;
/// store.set_value("theme", "dark")?;
/// store.save().await?;
///
/// let store = manager.update(ctx, "abc123", Duration::from_secs(3600)).await?;
/// assert_eq!(store.get_value::<String>("theme")?, Some("dark".to_string()));
/// # Ok(())
/// # }
/// ```
pub struct DocumentSessionManager<C: SessionCollection> {
    collection: Arc<C>,
    codec: Arc<dyn ValueCodec>,
}

impl<C: SessionCollection> DocumentSessionManager<C> {
    /// Create a manager over an existing collection.
    pub fn new(collection: C) -> Self {
        Self {
            collection: Arc::new(collection),
            codec: Arc::new(JsonCodec),
        }
    }

    /// Use a different codec for the stored values.
    pub fn with_codec(mut self, codec: impl ValueCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Get the underlying collection.
    pub fn collection(&self) -> &C {
        &self.collection
    }

    fn validate_sid(sid: &str) -> SessionResult<()> {
        if sid.is_empty() {
            return Err(SessionError::InvalidSessionId(
                "session ID must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn expires_at(expiry: Duration) -> DateTime<Utc> {
        chrono::Duration::from_std(expiry)
            .ok()
            .and_then(|expiry| Utc::now().checked_add_signed(expiry))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn store(
        &self,
        ctx: SessionContext,
        sid: &str,
        expiry: Duration,
        values: crate::codec::SessionValues,
    ) -> DocumentSessionStore<C> {
        DocumentSessionStore::new(
            ctx,
            sid,
            self.collection.clone(),
            self.codec.clone(),
            expiry,
            values,
        )
    }
}

#[async_trait]
impl<C: SessionCollection + 'static> SessionManager for DocumentSessionManager<C> {
    type Store = DocumentSessionStore<C>;

    async fn create(
        &self,
        ctx: SessionContext,
        sid: &str,
        expiry: Duration,
    ) -> SessionResult<Self::Store> {
        Self::validate_sid(sid)?;

        if let Err(e) = ctx.run(self.collection.insert(NewSessionRecord::empty(sid))).await {
            error!(
                sid = %sid,
                collection = self.collection.name(),
                error = %e,
                "Session create failed"
            );
            return Err(e);
        }

        debug!(sid = %sid, collection = self.collection.name(), "Session created");
        Ok(self.store(ctx, sid, expiry, Default::default()))
    }

    async fn update(
        &self,
        ctx: SessionContext,
        sid: &str,
        expiry: Duration,
    ) -> SessionResult<Self::Store> {
        Self::validate_sid(sid)?;

        let mut record = ctx
            .run(self.collection.find_by_sid(sid))
            .await?
            .ok_or_else(|| SessionError::NotFound(sid.to_string()))?;

        let values = self.codec.decode(&record.values)?;
        record.time = Self::expires_at(expiry);

        if let Err(e) = ctx.run(self.collection.update_by_id(&record)).await {
            error!(
                sid = %sid,
                collection = self.collection.name(),
                error = %e,
                "Session update failed"
            );
            return Err(e);
        }

        debug!(sid = %sid, expires_at = %record.time, "Session updated");
        Ok(self.store(ctx, sid, expiry, values))
    }

    async fn refresh(
        &self,
        ctx: SessionContext,
        old_sid: &str,
        sid: &str,
        expiry: Duration,
    ) -> SessionResult<Self::Store> {
        Self::validate_sid(sid)?;

        let values = match ctx.run(self.collection.find_by_sid(sid)).await? {
            Some(record) => self.codec.decode(&record.values)?,
            None if !old_sid.is_empty() && old_sid != sid => {
                let mut record = ctx
                    .run(self.collection.find_by_sid(old_sid))
                    .await?
                    .ok_or_else(|| SessionError::NotFound(old_sid.to_string()))?;

                // A record that cannot be loaded stays under its old key.
                let values = self.codec.decode(&record.values)?;

                // Only the key moves; the new expiry still waits for the next save.
                record.sid = sid.to_string();
                ctx.run(self.collection.update_by_id(&record)).await?;

                debug!(old_sid = %old_sid, sid = %sid, "Session re-keyed");
                values
            }
            None => return Err(SessionError::NotFound(sid.to_string())),
        };

        let expires_at = Self::expires_at(expiry);

        debug!(sid = %sid, expires_at = %expires_at, "Session refreshed");
        Ok(self
            .store(ctx, sid, expiry, values)
            .with_deferred_expiry(expires_at))
    }

    async fn delete(&self, ctx: &SessionContext, sid: &str) -> SessionResult<()> {
        let deleted = ctx.run(self.collection.delete_by_sid(sid)).await?;
        debug!(sid = %sid, deleted, "Session deleted");
        Ok(())
    }

    async fn check(&self, ctx: &SessionContext, sid: &str) -> bool {
        match ctx.run(self.collection.find_by_sid(sid)).await {
            Ok(record) => record.is_some(),
            Err(e) => {
                warn!(
                    sid = %sid,
                    collection = self.collection.name(),
                    error = %e,
                    "Session check failed"
                );
                false
            }
        }
    }

    async fn close(&self) -> SessionResult<()> {
        self.collection.close().await?;
        info!(collection = self.collection.name(), "Session manager closed");
        Ok(())
    }
}
