//! Storage seam between the session manager and a document database.

use crate::error::SessionResult;
use crate::record::{NewSessionRecord, SessionRecord};
use async_trait::async_trait;

/// A collection of session records in some document database.
///
/// Implementations translate each call into a single database operation;
/// they do not retry and do not apply deadlines (see
/// [`SessionContext`](crate::SessionContext)).
#[async_trait]
pub trait SessionCollection: Send + Sync {
    /// Collection name, for logging.
    fn name(&self) -> &str;

    /// Check that the database answers.
    async fn ping(&self) -> SessionResult<()>;

    /// Find the record for a session ID.
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if no record matches.
    async fn find_by_sid(&self, sid: &str) -> SessionResult<Option<SessionRecord>>;

    /// Insert a record and return it with its assigned key.
    async fn insert(&self, record: NewSessionRecord) -> SessionResult<SessionRecord>;

    /// Overwrite `sid`, `time` and `values` of the record with `record.id`.
    ///
    /// Fails with [`SessionError::NotFound`](crate::SessionError::NotFound)
    /// if the record no longer exists.
    async fn update_by_id(&self, record: &SessionRecord) -> SessionResult<()>;

    /// Delete every record for a session ID and return how many were removed.
    async fn delete_by_sid(&self, sid: &str) -> SessionResult<u64>;

    /// Release the connection. Calling this more than once is a no-op.
    async fn close(&self) -> SessionResult<()>;
}
