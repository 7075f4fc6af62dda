//! The persisted session record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque document key assigned by the database.
///
/// Distinct from the session ID and never changes once the record exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap a backend-specific document key.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The key as the backend formats it.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Document key
    pub id: RecordId,
    /// Session ID, the lookup key
    pub sid: String,
    /// Creation time, then the expiry time once the session is renewed
    pub time: DateTime<Utc>,
    /// Encoded session values; empty when the session holds no data
    pub values: String,
}

/// A record that has not been inserted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSessionRecord {
    /// Session ID
    pub sid: String,
    /// Initial timestamp
    pub time: DateTime<Utc>,
    /// Encoded session values
    pub values: String,
}

impl NewSessionRecord {
    /// A record with no values, stamped with the current time.
    pub fn empty(sid: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            time: Utc::now(),
            values: String::new(),
        }
    }

    /// Attach the key the database assigned.
    pub fn into_record(self, id: RecordId) -> SessionRecord {
        SessionRecord {
            id,
            sid: self.sid,
            time: self.time,
            values: self.values,
        }
    }
}
