//! In-process session collection.
//!
//! Records live in a map owned by the process, so sessions do not survive a
//! restart and are not shared between instances. Useful for tests and
//! single-node development.

use crate::collection::SessionCollection;
use crate::config::{SessionBackend, SessionConfig};
use crate::error::{SessionError, SessionResult};
use crate::manager::DocumentSessionManager;
use crate::record::{NewSessionRecord, RecordId, SessionRecord};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Session manager over an in-process collection.
pub type MemorySessionManager = DocumentSessionManager<MemorySessionCollection>;

impl MemorySessionManager {
    /// Create a manager with an empty in-process collection named `sessions`.
    pub fn in_memory() -> Self {
        Self::new(MemorySessionCollection::new(crate::config::DEFAULT_COLLECTION))
    }

    /// Create a manager from an in-process configuration.
    ///
    /// The collection is named after `config.collection`.
    pub fn from_config(config: SessionConfig) -> SessionResult<Self> {
        if config.backend != SessionBackend::Memory {
            return Err(SessionError::Config(format!(
                "expected an in-process configuration, got {:?}",
                config.backend
            )));
        }
        config.validate()?;

        Ok(Self::new(MemorySessionCollection::new(config.collection)))
    }
}

/// In-process [`SessionCollection`].
///
/// Enforces one record per session ID, like the unique index of the
/// MongoDB backend.
#[derive(Debug)]
pub struct MemorySessionCollection {
    name: String,
    records: RwLock<HashMap<RecordId, SessionRecord>>,
    closed: AtomicBool,
}

impl MemorySessionCollection {
    /// Create an empty collection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the collection holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::Storage(format!(
                "collection '{}' is closed",
                self.name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionCollection for MemorySessionCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> SessionResult<()> {
        self.ensure_open()
    }

    async fn find_by_sid(&self, sid: &str) -> SessionResult<Option<SessionRecord>> {
        self.ensure_open()?;
        Ok(self
            .records
            .read()
            .values()
            .find(|record| record.sid == sid)
            .cloned())
    }

    async fn insert(&self, record: NewSessionRecord) -> SessionResult<SessionRecord> {
        self.ensure_open()?;

        let mut records = self.records.write();
        if records.values().any(|existing| existing.sid == record.sid) {
            return Err(SessionError::Storage(format!(
                "duplicate session ID '{}'",
                record.sid
            )));
        }

        let record = record.into_record(RecordId::new(uuid::Uuid::new_v4().to_string()));
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update_by_id(&self, record: &SessionRecord) -> SessionResult<()> {
        self.ensure_open()?;

        let mut records = self.records.write();
        if records
            .values()
            .any(|existing| existing.sid == record.sid && existing.id != record.id)
        {
            return Err(SessionError::Storage(format!(
                "duplicate session ID '{}'",
                record.sid
            )));
        }

        match records.get_mut(&record.id) {
            Some(existing) => {
                existing.sid = record.sid.clone();
                existing.time = record.time;
                existing.values = record.values.clone();
                Ok(())
            }
            None => Err(SessionError::NotFound(record.sid.clone())),
        }
    }

    async fn delete_by_sid(&self, sid: &str) -> SessionResult<u64> {
        self.ensure_open()?;

        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, record| record.sid != sid);
        Ok((before - records.len()) as u64)
    }

    async fn close(&self) -> SessionResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
