//! Session manager and store contracts.

use crate::context::SessionContext;
use crate::error::{SessionError, SessionResult};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Lifecycle of session records.
///
/// The session framework owns session IDs and cookies; a manager only maps
/// an ID to a persisted record and hands out a [`SessionStore`] bound to it.
///
/// # Examples
///
/// ```ignore
/// use armature_session::{SessionContext, SessionManager, SessionStore, SessionResult};
/// use std::time::Duration;
///
/// async fn login<M: SessionManager>(manager: &M, sid: &str) -> SessionResult<()> {
///     let ctx = SessionContext::background().with_timeout(Duration::from_secs(2));
///
///     let store = manager.create(ctx, sid, Duration::from_secs(3600)).await?;
///     store.set_value("user_id", 123)?;
///     store.save().await?;
///
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Store type bound to a single session.
    type Store: SessionStore;

    /// Insert a new, empty record for `sid`.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Context for this and later database calls of the store
    /// * `sid` - Session ID chosen by the framework
    /// * `expiry` - Session lifetime
    async fn create(
        &self,
        ctx: SessionContext,
        sid: &str,
        expiry: Duration,
    ) -> SessionResult<Self::Store>;

    /// Load the record for `sid`, push its expiry to `now + expiry` and persist it.
    ///
    /// Fails with [`SessionError::NotFound`] if no record exists, and with
    /// [`SessionError::Decode`] if the stored values are malformed.
    async fn update(
        &self,
        ctx: SessionContext,
        sid: &str,
        expiry: Duration,
    ) -> SessionResult<Self::Store>;

    /// Like [`update`](Self::update), but the new expiry is written by the
    /// next [`SessionStore::save`] instead of immediately.
    ///
    /// If no record exists for `sid`, the record of `old_sid` is moved to `sid`.
    async fn refresh(
        &self,
        ctx: SessionContext,
        old_sid: &str,
        sid: &str,
        expiry: Duration,
    ) -> SessionResult<Self::Store>;

    /// Remove the record for `sid`. Deleting a missing session is not an error.
    async fn delete(&self, ctx: &SessionContext, sid: &str) -> SessionResult<()>;

    /// Check if a record exists for `sid`.
    ///
    /// Lookup failures are reported as `false`.
    async fn check(&self, ctx: &SessionContext, sid: &str) -> bool;

    /// Release the database connection.
    async fn close(&self) -> SessionResult<()>;
}

/// In-memory values of one session plus their persistence.
///
/// `set`, `get` and `delete` only touch memory; nothing reaches the database
/// until [`save`](Self::save) or [`flush`](Self::flush).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Context the store was created with.
    fn context(&self) -> &SessionContext;

    /// Session ID this store is bound to.
    fn session_id(&self) -> &str;

    /// Insert or overwrite a value.
    fn set(&self, key: &str, value: Value);

    /// Get a value.
    fn get(&self, key: &str) -> Option<Value>;

    /// Remove a value and return it.
    fn delete(&self, key: &str) -> Option<Value>;

    /// Remove all values and persist the now empty session.
    async fn flush(&self) -> SessionResult<()>;

    /// Persist the current values to the session's record.
    ///
    /// Fails with [`SessionError::NotFound`] if the record was deleted in
    /// the meantime.
    async fn save(&self) -> SessionResult<()>;

    /// Serialize and set a value.
    fn set_value<T: Serialize>(&self, key: &str, value: T) -> SessionResult<()>
    where
        Self: Sized,
    {
        let value =
            serde_json::to_value(value).map_err(|e| SessionError::Serialization(e.to_string()))?;
        self.set(key, value);
        Ok(())
    }

    /// Get and deserialize a value.
    ///
    /// Returns `Ok(None)` if the key is absent and a decode error if the
    /// stored value has a different shape than `T`.
    fn get_value<T: DeserializeOwned>(&self, key: &str) -> SessionResult<Option<T>>
    where
        Self: Sized,
    {
        self.get(key)
            .map(|value| {
                serde_json::from_value(value).map_err(|e| SessionError::Decode(e.to_string()))
            })
            .transpose()
    }
}
