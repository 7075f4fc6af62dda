//! MongoDB configuration.

use crate::error::{MongoError, Result};
use mongodb::options::{ClientOptions, Credential, Tls, TlsOptions};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// MongoDB configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    /// Connection string (mongodb://host:port/db or mongodb+srv://host/db).
    pub url: String,
    /// Database name. Falls back to the default database of the URL.
    #[serde(default)]
    pub database: Option<String>,
    /// Application name reported to the server.
    #[serde(default)]
    pub app_name: Option<String>,
    /// Username.
    #[serde(default)]
    pub username: Option<String>,
    /// Password.
    #[serde(default)]
    pub password: Option<String>,
    /// Database the credentials are defined in (defaults to `admin` on the server side).
    #[serde(default)]
    pub auth_source: Option<String>,
    /// Maximum number of pooled connections per server.
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
    /// Minimum number of pooled connections per server.
    #[serde(default)]
    pub min_pool_size: u32,
    /// Timeout for establishing a connection.
    #[serde(with = "duration_secs", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    /// How long an operation waits for a suitable server.
    #[serde(with = "duration_secs", default = "default_server_selection_timeout")]
    pub server_selection_timeout: Duration,
    /// Idle time after which pooled connections are closed.
    #[serde(with = "duration_secs", default = "default_max_idle_time")]
    pub max_idle_time: Duration,
    /// TLS settings.
    #[serde(default)]
    pub tls: MongoTlsConfig,
}

/// TLS settings forwarded to the driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MongoTlsConfig {
    /// Negotiate TLS with the server.
    pub enabled: bool,
    /// CA bundle used to verify the server certificate.
    #[serde(default)]
    pub ca_file: Option<PathBuf>,
    /// PEM file holding the client certificate and private key.
    #[serde(default)]
    pub cert_key_file: Option<PathBuf>,
    /// Accept invalid server certificates. Testing only.
    #[serde(default)]
    pub allow_invalid_certificates: bool,
}

impl MongoTlsConfig {
    fn to_driver(&self) -> Tls {
        if !self.enabled {
            return Tls::Disabled;
        }

        let mut options = TlsOptions::default();
        options.ca_file_path = self.ca_file.clone();
        options.cert_key_file_path = self.cert_key_file.clone();
        if self.allow_invalid_certificates {
            options.allow_invalid_certificates = Some(true);
        }
        Tls::Enabled(options)
    }
}

fn default_max_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_server_selection_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_idle_time() -> Duration {
    Duration::from_secs(300)
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            url: "mongodb://localhost:27017".to_string(),
            database: None,
            app_name: None,
            username: None,
            password: None,
            auth_source: None,
            max_pool_size: default_max_pool_size(),
            min_pool_size: 0,
            connect_timeout: default_connect_timeout(),
            server_selection_timeout: default_server_selection_timeout(),
            max_idle_time: default_max_idle_time(),
            tls: MongoTlsConfig::default(),
        }
    }
}

impl MongoConfig {
    /// Create a new configuration.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Create a builder.
    pub fn builder() -> MongoConfigBuilder {
        MongoConfigBuilder::new()
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `MONGODB_URL`, `MONGODB_DATABASE`, `MONGODB_USERNAME`,
    /// `MONGODB_PASSWORD`, `MONGODB_AUTH_SOURCE`, `MONGODB_MAX_POOL_SIZE`,
    /// `MONGODB_TLS`, `MONGODB_TLS_CA_FILE` and `MONGODB_TLS_CERT_KEY_FILE`.
    pub fn from_env() -> MongoConfigBuilder {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> MongoConfigBuilder
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = MongoConfigBuilder::new();

        if let Some(url) = lookup("MONGODB_URL") {
            builder = builder.url(url);
        }

        if let Some(database) = lookup("MONGODB_DATABASE") {
            builder = builder.database(database);
        }

        if let Some(username) = lookup("MONGODB_USERNAME") {
            builder = builder.username(username);
        }

        if let Some(password) = lookup("MONGODB_PASSWORD") {
            builder = builder.password(password);
        }

        if let Some(source) = lookup("MONGODB_AUTH_SOURCE") {
            builder = builder.auth_source(source);
        }

        if let Some(size) = lookup("MONGODB_MAX_POOL_SIZE")
            && let Ok(size) = size.parse()
        {
            builder = builder.max_pool_size(size);
        }

        if lookup("MONGODB_TLS").is_some() {
            builder = builder.tls(true);
        }

        if let Some(path) = lookup("MONGODB_TLS_CA_FILE") {
            builder = builder.tls(true).tls_ca_file(path);
        }

        if let Some(path) = lookup("MONGODB_TLS_CERT_KEY_FILE") {
            builder = builder.tls(true).tls_cert_key_file(path);
        }

        builder
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.url.starts_with("mongodb://") && !self.url.starts_with("mongodb+srv://") {
            return Err(MongoError::Config(
                "MongoDB URL must start with mongodb:// or mongodb+srv://".to_string(),
            ));
        }

        if self.max_pool_size == 0 {
            return Err(MongoError::Config(
                "max_pool_size must be greater than zero".to_string(),
            ));
        }

        if self.min_pool_size > self.max_pool_size {
            return Err(MongoError::Config(format!(
                "min_pool_size ({}) exceeds max_pool_size ({})",
                self.min_pool_size, self.max_pool_size
            )));
        }

        if !self.tls.enabled && (self.tls.ca_file.is_some() || self.tls.cert_key_file.is_some()) {
            return Err(MongoError::Config(
                "TLS certificate files are set but TLS is disabled".to_string(),
            ));
        }

        if self.password.is_some() && self.username.is_none() {
            return Err(MongoError::Config(
                "a password was given without a username".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve driver options from the connection string and this configuration.
    ///
    /// Explicit settings override whatever the connection string carries.
    pub async fn client_options(&self) -> Result<ClientOptions> {
        self.validate()?;

        let mut options = ClientOptions::parse(&self.url)
            .await
            .map_err(|e| MongoError::Config(format!("invalid connection string: {}", e)))?;

        self.apply(&mut options);
        Ok(options)
    }

    fn apply(&self, options: &mut ClientOptions) {
        if let Some(name) = &self.app_name {
            options.app_name = Some(name.clone());
        }

        if let Some(username) = &self.username {
            let mut credential = options.credential.take().unwrap_or_else(Credential::default);
            credential.username = Some(username.clone());
            credential.password = self.password.clone();
            if let Some(source) = &self.auth_source {
                credential.source = Some(source.clone());
            }
            options.credential = Some(credential);
        }

        options.max_pool_size = Some(self.max_pool_size);
        options.min_pool_size = Some(self.min_pool_size);
        options.connect_timeout = Some(self.connect_timeout);
        options.server_selection_timeout = Some(self.server_selection_timeout);
        options.max_idle_time = Some(self.max_idle_time);

        // Keep TLS from the connection string (e.g. `tls=true`) unless configured here.
        if self.tls.enabled {
            options.tls = Some(self.tls.to_driver());
        }
    }

    /// Resolve the database name: explicit setting first, then the URL's default database.
    pub fn resolve_database(&self, options: &ClientOptions) -> Result<String> {
        self.database
            .clone()
            .or_else(|| options.default_database.clone())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                MongoError::Config(
                    "no database name given in the configuration or the connection URL".to_string(),
                )
            })
    }
}

/// Builder for MongoDB configuration.
#[derive(Default)]
pub struct MongoConfigBuilder {
    config: MongoConfig,
}

impl MongoConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: MongoConfig::default(),
        }
    }

    /// Set the connection string.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Set the database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.config.database = Some(database.into());
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config.app_name = Some(name.into());
        self
    }

    /// Set the username.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Set the authentication database.
    pub fn auth_source(mut self, source: impl Into<String>) -> Self {
        self.config.auth_source = Some(source.into());
        self
    }

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.config.max_pool_size = size;
        self
    }

    /// Set the minimum pool size.
    pub fn min_pool_size(mut self, size: u32) -> Self {
        self.config.min_pool_size = size;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the server selection timeout.
    pub fn server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.config.server_selection_timeout = timeout;
        self
    }

    /// Set the idle timeout for pooled connections.
    pub fn max_idle_time(mut self, idle: Duration) -> Self {
        self.config.max_idle_time = idle;
        self
    }

    /// Enable TLS.
    pub fn tls(mut self, enabled: bool) -> Self {
        self.config.tls.enabled = enabled;
        self
    }

    /// Set the CA bundle.
    pub fn tls_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tls.ca_file = Some(path.into());
        self
    }

    /// Set the client certificate/key file.
    pub fn tls_cert_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tls.cert_key_file = Some(path.into());
        self
    }

    /// Accept invalid server certificates.
    pub fn tls_allow_invalid_certificates(mut self, allow: bool) -> Self {
        self.config.tls.allow_invalid_certificates = allow;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> MongoConfig {
        self.config
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = MongoConfig::default();
        assert_eq!(config.url, "mongodb://localhost:27017");
        assert_eq!(config.max_pool_size, 10);
        assert_eq!(config.min_pool_size, 0);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.max_idle_time, Duration::from_secs(300));
        assert!(!config.tls.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        let config = MongoConfig::new("redis://localhost:6379");
        assert!(matches!(config.validate(), Err(MongoError::Config(_))));

        let config = MongoConfig::new("mongodb+srv://cluster.example.com/app");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_pool_bounds() {
        let config = MongoConfig::builder().max_pool_size(0).build();
        assert!(config.validate().is_err());

        let config = MongoConfig::builder().max_pool_size(4).min_pool_size(5).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_tls_files_require_tls() {
        let mut config = MongoConfig::builder().tls_ca_file("/etc/ssl/ca.pem").build();
        assert!(config.validate().is_err());

        config.tls.enabled = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("MONGODB_URL", "mongodb://db.internal:27017"),
            ("MONGODB_DATABASE", "app"),
            ("MONGODB_USERNAME", "svc"),
            ("MONGODB_PASSWORD", "secret"),
            ("MONGODB_MAX_POOL_SIZE", "25"),
            ("MONGODB_TLS_CA_FILE", "/etc/ssl/ca.pem"),
        ]);

        let config = MongoConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).build();

        assert_eq!(config.url, "mongodb://db.internal:27017");
        assert_eq!(config.database.as_deref(), Some("app"));
        assert_eq!(config.username.as_deref(), Some("svc"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.max_pool_size, 25);
        assert!(config.tls.enabled);
        assert_eq!(config.tls.ca_file, Some(PathBuf::from("/etc/ssl/ca.pem")));
    }

    #[test]
    fn test_from_lookup_ignores_unparsable_pool_size() {
        let config = MongoConfig::from_lookup(|key| {
            (key == "MONGODB_MAX_POOL_SIZE").then(|| "lots".to_string())
        })
        .build();
        assert_eq!(config.max_pool_size, 10);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: MongoConfig = serde_json::from_str(
            r#"{"url": "mongodb://localhost:27017/sessions", "connect_timeout": 2}"#,
        )
        .unwrap();

        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.server_selection_timeout, Duration::from_secs(30));
        assert_eq!(config.max_pool_size, 10);
        assert_eq!(config.tls, MongoTlsConfig::default());
    }

    #[tokio::test]
    async fn test_client_options_apply_overrides() {
        let config = MongoConfig::builder()
            .url("mongodb://localhost:27017/fromurl")
            .app_name("armature-tests")
            .username("svc")
            .password("secret")
            .auth_source("admin")
            .max_pool_size(3)
            .build();

        let options = config.client_options().await.unwrap();
        assert_eq!(options.app_name.as_deref(), Some("armature-tests"));
        assert_eq!(options.max_pool_size, Some(3));
        assert_eq!(options.connect_timeout, Some(Duration::from_secs(5)));

        let credential = options.credential.clone().unwrap();
        assert_eq!(credential.username.as_deref(), Some("svc"));
        assert_eq!(credential.source.as_deref(), Some("admin"));

        assert_eq!(config.resolve_database(&options).unwrap(), "fromurl");
    }

    #[tokio::test]
    async fn test_explicit_database_wins_over_url() {
        let config = MongoConfig::builder()
            .url("mongodb://localhost:27017/fromurl")
            .database("explicit")
            .build();

        let options = config.client_options().await.unwrap();
        assert_eq!(config.resolve_database(&options).unwrap(), "explicit");
    }

    #[tokio::test]
    async fn test_missing_database_is_config_error() {
        let config = MongoConfig::new("mongodb://localhost:27017");
        let options = config.client_options().await.unwrap();
        assert!(matches!(
            config.resolve_database(&options),
            Err(MongoError::Config(_))
        ));
    }
}
