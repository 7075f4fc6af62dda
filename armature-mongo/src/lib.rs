//! # Armature MongoDB
//!
//! MongoDB client integration for Armature applications.
//!
//! ## Features
//!
//! - **Typed configuration**: builder, environment loading and serde support
//! - **TLS and pooling**: settings forwarded to the official driver
//! - **Health checks**: the client pings the deployment on connect
//! - **DI-ready**: [`MongoClient`] is cheap to clone and share
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use armature_mongo::{MongoClient, MongoConfig};
//! use mongodb::bson::Document;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MongoConfig::builder()
//!         .url("mongodb://localhost:27017")
//!         .database("myapp")
//!         .max_pool_size(20)
//!         .tls(true)
//!         .tls_ca_file("/etc/ssl/mongo-ca.pem")
//!         .build();
//!
//!     let client = MongoClient::connect(config).await?;
//!     let users = client.collection::<Document>("users");
//!
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;

pub use client::MongoClient;
pub use config::{MongoConfig, MongoConfigBuilder, MongoTlsConfig};
pub use error::{MongoError, Result};

// Re-export the driver for convenience
pub use mongodb;
pub use mongodb::bson;

/// Prelude for common imports.
///
/// ```
/// use armature_mongo::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::MongoClient;
    pub use crate::config::{MongoConfig, MongoConfigBuilder, MongoTlsConfig};
    pub use crate::error::{MongoError, Result};
}
