//! MongoDB connection configuration.

use std::env;
use std::time::Duration;

use docquery_core::DEFAULT_IDENTITY_FIELD;
use mongodb::options::ClientOptions;

use crate::error::{MongoError, MongoResult};

/// Default connection URI.
pub const DEFAULT_URI: &str = "mongodb://localhost:27017";

/// Connection URI variable.
pub const URI_VAR: &str = "DOCQUERY_MONGO_URI";
/// Database name variable.
pub const DATABASE_VAR: &str = "DOCQUERY_MONGO_DATABASE";
/// Application name variable.
pub const APP_NAME_VAR: &str = "DOCQUERY_MONGO_APP_NAME";
/// Maximum pool size variable.
pub const MAX_POOL_SIZE_VAR: &str = "DOCQUERY_MONGO_MAX_POOL_SIZE";
/// Identity field variable.
pub const ID_FIELD_VAR: &str = "DOCQUERY_ID_FIELD";

/// MongoDB connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoConfig {
    /// MongoDB connection URI.
    pub uri: String,
    /// Database queries are bound to by default.
    pub database: String,
    /// Application name (shown in server logs).
    pub app_name: Option<String>,
    /// Minimum connection pool size.
    pub min_pool_size: Option<u32>,
    /// Maximum connection pool size.
    pub max_pool_size: Option<u32>,
    /// Connection timeout.
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout.
    pub server_selection_timeout: Option<Duration>,
    /// Retry writes.
    pub retry_writes: Option<bool>,
    /// Retry reads.
    pub retry_reads: Option<bool>,
    /// Direct connection (bypass replica set discovery).
    pub direct_connection: Option<bool>,
    /// Identity field used by query builders.
    pub identity_field: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            database: String::new(),
            app_name: Some("docquery".to_string()),
            min_pool_size: None,
            max_pool_size: Some(10),
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(30)),
            retry_writes: Some(true),
            retry_reads: Some(true),
            direct_connection: None,
            identity_field: DEFAULT_IDENTITY_FIELD.to_string(),
        }
    }
}

impl MongoConfig {
    /// Create a new configuration from a MongoDB URI.
    pub fn from_uri(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Create a builder for configuration.
    pub fn builder() -> MongoConfigBuilder {
        MongoConfigBuilder::new()
    }

    /// Load configuration from `DOCQUERY_*` environment variables.
    ///
    /// `DOCQUERY_MONGO_DATABASE` is required; everything else has a default.
    pub fn from_env() -> MongoResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> MongoResult<Self> {
        let mut builder = Self::builder();

        if let Some(uri) = lookup(URI_VAR) {
            builder = builder.uri(uri);
        }
        if let Some(database) = lookup(DATABASE_VAR) {
            builder = builder.database(database);
        }
        if let Some(app_name) = lookup(APP_NAME_VAR) {
            builder = builder.app_name(app_name);
        }
        if let Some(size) = lookup(MAX_POOL_SIZE_VAR) {
            let size = size.trim().parse().map_err(|_| {
                MongoError::config(format!(
                    "{} must be a positive integer, got '{}'",
                    MAX_POOL_SIZE_VAR, size
                ))
            })?;
            builder = builder.max_pool_size(size);
        }
        if let Some(field) = lookup(ID_FIELD_VAR) {
            builder = builder.identity_field(field);
        }

        builder.build()
    }

    /// Convert to MongoDB ClientOptions.
    pub async fn to_client_options(&self) -> MongoResult<ClientOptions> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| MongoError::config(format!("failed to parse URI: {}", e)))?;

        if let Some(ref app_name) = self.app_name {
            options.app_name = Some(app_name.clone());
        }

        if let Some(min_pool) = self.min_pool_size {
            options.min_pool_size = Some(min_pool);
        }

        if let Some(max_pool) = self.max_pool_size {
            options.max_pool_size = Some(max_pool);
        }

        if let Some(connect_timeout) = self.connect_timeout {
            options.connect_timeout = Some(connect_timeout);
        }

        if let Some(selection_timeout) = self.server_selection_timeout {
            options.server_selection_timeout = Some(selection_timeout);
        }

        if let Some(retry_writes) = self.retry_writes {
            options.retry_writes = Some(retry_writes);
        }

        if let Some(retry_reads) = self.retry_reads {
            options.retry_reads = Some(retry_reads);
        }

        if let Some(direct) = self.direct_connection {
            options.direct_connection = Some(direct);
        }

        Ok(options)
    }
}

/// Builder for MongoDB configuration.
#[derive(Debug, Default)]
pub struct MongoConfigBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    min_pool_size: Option<u32>,
    max_pool_size: Option<u32>,
    connect_timeout: Option<Duration>,
    server_selection_timeout: Option<Duration>,
    retry_writes: Option<bool>,
    retry_reads: Option<bool>,
    direct_connection: Option<bool>,
    identity_field: Option<String>,
}

impl MongoConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the MongoDB URI.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set the minimum pool size.
    pub fn min_pool_size(mut self, size: u32) -> Self {
        self.min_pool_size = Some(size);
        self
    }

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Set the server selection timeout.
    pub fn server_selection_timeout(mut self, duration: Duration) -> Self {
        self.server_selection_timeout = Some(duration);
        self
    }

    /// Enable or disable retry writes.
    pub fn retry_writes(mut self, enabled: bool) -> Self {
        self.retry_writes = Some(enabled);
        self
    }

    /// Enable or disable retry reads.
    pub fn retry_reads(mut self, enabled: bool) -> Self {
        self.retry_reads = Some(enabled);
        self
    }

    /// Enable direct connection (bypass replica set discovery).
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.direct_connection = Some(enabled);
        self
    }

    /// Set the identity field used by query builders.
    pub fn identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = Some(field.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> MongoResult<MongoConfig> {
        let database = self
            .database
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| MongoError::config("database name is required"))?;

        let identity_field = self
            .identity_field
            .unwrap_or_else(|| DEFAULT_IDENTITY_FIELD.to_string());
        if identity_field.is_empty() {
            return Err(MongoError::config("identity field must not be empty"));
        }

        let defaults = MongoConfig::default();
        Ok(MongoConfig {
            uri: self.uri.unwrap_or(defaults.uri),
            database,
            app_name: self.app_name.or(defaults.app_name),
            min_pool_size: self.min_pool_size,
            max_pool_size: self.max_pool_size.or(defaults.max_pool_size),
            connect_timeout: self.connect_timeout.or(defaults.connect_timeout),
            server_selection_timeout: self
                .server_selection_timeout
                .or(defaults.server_selection_timeout),
            retry_writes: self.retry_writes.or(defaults.retry_writes),
            retry_reads: self.retry_reads.or(defaults.retry_reads),
            direct_connection: self.direct_connection,
            identity_field,
        })
    }
}
