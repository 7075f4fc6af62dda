//! Session persistence for Armature framework.
//!
//! Stores HTTP-session key/value state in a document database. The session
//! framework owns session IDs and cookies; this crate provides the two
//! contracts it plugs into:
//!
//! - [`SessionManager`] creates, renews, checks and deletes session records;
//! - [`SessionStore`] holds one session's values in memory and writes them
//!   back on [`save`](SessionStore::save) or [`flush`](SessionStore::flush).
//!
//! Each session is one document `{ _id, sid, time, values }`, where `values`
//! is the session map encoded as a JSON string so that any serializable
//! value can be stored without a fixed schema.
//!
//! # Features
//!
//! - `mongodb` - MongoDB session storage (enabled by default)
//! - `couchdb` - CouchDB session storage
//!
//! The in-process [`MemorySessionManager`] is always available.
//!
//! # Examples
//!
//! ## MongoDB Session Store (Default)
//!
//! ```no_run
//! use armature_session::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SessionError> {
//!     let config = SessionConfig::mongodb("mongodb://localhost:27017/myapp")?
//!         .with_collection("sessions");
//!
//!     let manager = MongoSessionManager::connect(config).await?;
//!     let ctx = SessionContext::background().with_timeout(Duration::from_secs(2));
//!
//!     // New session
//!     let store = manager.create(ctx.clone(), "abc123", Duration::from_secs(3600)).await?;
//!     store.set_value("user_id", 123)?;
//!     store.set_value("theme", "dark")?;
//!     store.save().await?;
//!
//!     // Next request: renew and read
//!     let store = manager.update(ctx.clone(), "abc123", Duration::from_secs(3600)).await?;
//!     let user_id: Option<i32> = store.get_value("user_id")?;
//!     println!("User ID: {:?}", user_id);
//!
//!     // Logout
//!     manager.delete(&ctx, "abc123").await?;
//!     manager.close().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Sharing a Tuned MongoDB Client
//!
//! ```ignore
//! use armature_mongo::{MongoClient, MongoConfig};
//! use armature_session::*;
//!
//! let mongo = MongoClient::connect(
//!     MongoConfig::from_env()
//!         .tls(true)
//!         .tls_ca_file("/etc/ssl/mongo-ca.pem")
//!         .max_pool_size(50)
//!         .build(),
//! )
//! .await?;
//!
//! let config = SessionConfig::mongodb("mongodb://localhost:27017")?
//!     .with_collection("web_sessions");
//! let manager = MongoSessionManager::from_client(mongo.clone(), config).await?;
//! ```
//!
//! ## CouchDB Session Store (requires `couchdb` feature)
//!
//! ```ignore
//! use armature_session::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SessionError> {
//!     let config = SessionConfig::couchdb("http://localhost:5984", "sessions")?
//!         .with_auth("admin", "password");
//!     let manager = CouchDbSessionManager::connect(config).await?;
//!
//!     // Use same API as MongoDB
//!     let ctx = SessionContext::background();
//!     let store = manager.create(ctx, "abc123", std::time::Duration::from_secs(60)).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod collection;
pub mod config;
pub mod context;
pub mod error;
pub mod manager;
pub mod memory_session;
pub mod record;
pub mod store;
pub mod traits;

#[cfg(feature = "mongodb")]
pub mod mongo_session;

#[cfg(feature = "couchdb")]
pub mod couchdb_session;

pub use codec::{JsonCodec, SessionValues, ValueCodec};
pub use collection::SessionCollection;
pub use config::{DEFAULT_COLLECTION, SessionBackend, SessionConfig};
pub use context::SessionContext;
pub use error::{SessionError, SessionResult};
pub use manager::DocumentSessionManager;
pub use memory_session::{MemorySessionCollection, MemorySessionManager};
pub use record::{NewSessionRecord, RecordId, SessionRecord};
pub use store::DocumentSessionStore;
pub use traits::{SessionManager, SessionStore};

#[cfg(feature = "mongodb")]
pub use mongo_session::{MongoSessionCollection, MongoSessionManager};

#[cfg(feature = "couchdb")]
pub use couchdb_session::{CouchDbSessionCollection, CouchDbSessionManager};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{SessionBackend, SessionConfig};
    pub use crate::context::SessionContext;
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::memory_session::MemorySessionManager;
    pub use crate::traits::{SessionManager, SessionStore};

    #[cfg(feature = "mongodb")]
    pub use crate::mongo_session::MongoSessionManager;

    #[cfg(feature = "couchdb")]
    pub use crate::couchdb_session::CouchDbSessionManager;
}
