//! MongoDB client wrapper implementing the collection capability.

use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use docquery_core::{
    ClientResult, CollectionHandle, DeleteOutcome, DocumentClient, InsertOutcome, QueryBuilder,
    QueryOptions, UpdateOutcome,
};
use futures::TryStreamExt;
use mongodb::options::{CountOptions, FindOptions, ReplaceOptions, UpdateOptions};
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

use crate::config::MongoConfig;
use crate::error::{MongoError, MongoResult, boxed};

/// A MongoDB client with connection pooling.
///
/// The driver pools connections internally, so clones are cheap and share
/// the pool.
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    database: Database,
    config: Arc<MongoConfig>,
}

impl MongoClient {
    /// Create a new client from configuration.
    ///
    /// The driver connects lazily; use [`is_healthy`](Self::is_healthy) to
    /// check the server is reachable.
    pub async fn new(config: MongoConfig) -> MongoResult<Self> {
        let options = config.to_client_options().await?;

        let client = Client::with_options(options)
            .map_err(|e| MongoError::connection(format!("failed to create client: {}", e)))?;

        let database = client.database(&config.database);

        info!(
            uri = %config.uri,
            database = %config.database,
            identity_field = %config.identity_field,
            "MongoDB client created"
        );

        Ok(Self {
            client,
            database,
            config: Arc::new(config),
        })
    }

    /// Create a builder for the client.
    pub fn builder() -> MongoClientBuilder {
        MongoClientBuilder::new()
    }

    /// Start a query against the configured database.
    pub fn query(&self) -> QueryBuilder<MongoClient> {
        self.query_database(self.config.database.clone())
    }

    /// Start a query against another database on the same server.
    pub fn query_database(&self, name: impl Into<String>) -> QueryBuilder<MongoClient> {
        QueryBuilder::new(self.clone(), name)
            .with_identity_field(self.config.identity_field.clone())
    }

    /// Get the configured database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Get the underlying MongoDB client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the configuration.
    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    /// Check if the client is healthy by pinging the server.
    pub async fn is_healthy(&self) -> bool {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .is_ok()
    }
}

impl DocumentClient for MongoClient {
    type Handle = MongoCollection;

    fn collection_handle(&self, database: &str, collection: &str) -> ClientResult<Self::Handle> {
        if database.is_empty() {
            return Err(Box::new(MongoError::config("database name must not be empty")));
        }
        if collection.is_empty() {
            return Err(Box::new(MongoError::config("collection name must not be empty")));
        }
        Ok(MongoCollection {
            inner: self.client.database(database).collection(collection),
        })
    }
}

/// A single MongoDB collection of BSON documents.
#[derive(Clone)]
pub struct MongoCollection {
    inner: Collection<Document>,
}

impl MongoCollection {
    /// Get the driver collection.
    pub fn inner(&self) -> &Collection<Document> {
        &self.inner
    }
}

fn driver_limit(limit: Option<u64>) -> Option<i64> {
    limit.map(|n| i64::try_from(n).unwrap_or(i64::MAX))
}

fn find_options(options: QueryOptions) -> FindOptions {
    let mut find = FindOptions::default();
    find.limit = driver_limit(options.limit);
    find.projection = options.projection;
    find.sort = options.sort;
    find.skip = options.skip;
    find
}

fn count_options(options: &QueryOptions) -> CountOptions {
    let mut count = CountOptions::default();
    count.skip = options.skip;
    // The server rejects `$limit: 0`; zero means no limit.
    count.limit = options.limit.filter(|&n| n > 0);
    count
}

fn update_options(upsert: bool) -> UpdateOptions {
    let mut update = UpdateOptions::default();
    update.upsert = Some(upsert);
    update
}

fn replace_options(upsert: bool) -> ReplaceOptions {
    let mut replace = ReplaceOptions::default();
    replace.upsert = Some(upsert);
    replace
}

fn update_outcome(result: mongodb::results::UpdateResult) -> UpdateOutcome {
    UpdateOutcome {
        matched_count: result.matched_count,
        modified_count: result.modified_count,
        upserted_id: result.upserted_id,
    }
}

#[async_trait]
impl CollectionHandle for MongoCollection {
    async fn count(&self, filter: Document, options: QueryOptions) -> ClientResult<u64> {
        self.inner
            .count_documents(filter, count_options(&options))
            .await
            .map_err(boxed)
    }

    async fn find(&self, filter: Document, options: QueryOptions) -> ClientResult<Vec<Document>> {
        let cursor = self
            .inner
            .find(filter, find_options(options))
            .await
            .map_err(boxed)?;
        cursor.try_collect().await.map_err(boxed)
    }

    async fn insert_one(&self, document: Document) -> ClientResult<InsertOutcome> {
        let result = self.inner.insert_one(document, None).await.map_err(boxed)?;
        Ok(InsertOutcome {
            inserted_ids: vec![result.inserted_id],
        })
    }

    async fn insert_many(&self, documents: Vec<Document>) -> ClientResult<InsertOutcome> {
        let result = self.inner.insert_many(documents, None).await.map_err(boxed)?;

        // The driver keys ids by input position.
        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);
        debug!(count = ids.len(), "Inserted documents");

        Ok(InsertOutcome {
            inserted_ids: ids.into_iter().map(|(_, id)| id).collect(),
        })
    }

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> ClientResult<UpdateOutcome> {
        self.inner
            .update_one(filter, update, update_options(upsert))
            .await
            .map(update_outcome)
            .map_err(boxed)
    }

    async fn update_many(&self, filter: Document, update: Document) -> ClientResult<UpdateOutcome> {
        self.inner
            .update_many(filter, update, None)
            .await
            .map(update_outcome)
            .map_err(boxed)
    }

    async fn replace_one(
        &self,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> ClientResult<UpdateOutcome> {
        self.inner
            .replace_one(filter, replacement, replace_options(upsert))
            .await
            .map(update_outcome)
            .map_err(boxed)
    }

    async fn delete_one(&self, filter: Document) -> ClientResult<DeleteOutcome> {
        let result = self.inner.delete_one(filter, None).await.map_err(boxed)?;
        Ok(DeleteOutcome {
            deleted_count: result.deleted_count,
        })
    }

    async fn delete_many(&self, filter: Document) -> ClientResult<DeleteOutcome> {
        let result = self.inner.delete_many(filter, None).await.map_err(boxed)?;
        Ok(DeleteOutcome {
            deleted_count: result.deleted_count,
        })
    }
}

/// Builder for MongoClient.
#[derive(Debug, Default)]
pub struct MongoClientBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    max_pool_size: Option<u32>,
    min_pool_size: Option<u32>,
    connect_timeout: Option<std::time::Duration>,
    direct_connection: Option<bool>,
    identity_field: Option<String>,
}

impl MongoClientBuilder {
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

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Set the minimum pool size.
    pub fn min_pool_size(mut self, size: u32) -> Self {
        self.min_pool_size = Some(size);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: std::time::Duration) -> Self {
        self.connect_timeout = Some(duration);
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

    /// Build the client.
    pub async fn build(self) -> MongoResult<MongoClient> {
        let mut config_builder = MongoConfig::builder();

        if let Some(uri) = self.uri {
            config_builder = config_builder.uri(uri);
        }

        if let Some(database) = self.database {
            config_builder = config_builder.database(database);
        }

        if let Some(app_name) = self.app_name {
            config_builder = config_builder.app_name(app_name);
        }

        if let Some(max_pool) = self.max_pool_size {
            config_builder = config_builder.max_pool_size(max_pool);
        }

        if let Some(min_pool) = self.min_pool_size {
            config_builder = config_builder.min_pool_size(min_pool);
        }

        if let Some(timeout) = self.connect_timeout {
            config_builder = config_builder.connect_timeout(timeout);
        }

        if let Some(direct) = self.direct_connection {
            config_builder = config_builder.direct_connection(direct);
        }

        if let Some(field) = self.identity_field {
            config_builder = config_builder.identity_field(field);
        }

        let config = config_builder.build()?;
        MongoClient::new(config).await
    }
}
