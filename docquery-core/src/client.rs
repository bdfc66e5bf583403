//! The database-client capability a [`QueryBuilder`](crate::QueryBuilder) executes against.
//!
//! Connection handling, pooling and wire protocol belong to the implementor.
//! The builder only asks for a collection handle and calls one method on it
//! per terminal operation.

use async_trait::async_trait;
use bson::{Bson, Document};

use crate::compile::QueryOptions;
use crate::error::BoxError;

/// Result type returned by client implementations.
pub type ClientResult<T> = Result<T, BoxError>;

/// Ids reported by an insert, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertOutcome {
    /// Native ids of the inserted documents.
    pub inserted_ids: Vec<Bson>,
}

/// Counts reported by an update or replace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    /// Number of documents matched by the filter.
    pub matched_count: u64,
    /// Number of documents actually changed.
    pub modified_count: u64,
    /// Id of the document inserted by an upsert, if any.
    pub upserted_id: Option<Bson>,
}

/// Count reported by a delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteOutcome {
    /// Number of documents removed.
    pub deleted_count: u64,
}

/// A client able to resolve collection handles.
pub trait DocumentClient: Send + Sync {
    /// Handle type for a single collection.
    type Handle: CollectionHandle;

    /// Resolve the handle for `collection` in `database`.
    fn collection_handle(&self, database: &str, collection: &str) -> ClientResult<Self::Handle>;
}

/// Operations available on a single collection.
///
/// Filters and options are produced by [`compile`](crate::compile).
#[async_trait]
pub trait CollectionHandle: Send + Sync {
    /// Count documents matching `filter`, honoring `skip`/`limit`.
    async fn count(&self, filter: Document, options: QueryOptions) -> ClientResult<u64>;

    /// Fetch every document matching `filter`.
    async fn find(&self, filter: Document, options: QueryOptions) -> ClientResult<Vec<Document>>;

    /// Insert one document.
    async fn insert_one(&self, document: Document) -> ClientResult<InsertOutcome>;

    /// Insert several documents.
    async fn insert_many(&self, documents: Vec<Document>) -> ClientResult<InsertOutcome>;

    /// Apply `update` to the first matching document.
    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> ClientResult<UpdateOutcome>;

    /// Apply `update` to every matching document.
    async fn update_many(&self, filter: Document, update: Document) -> ClientResult<UpdateOutcome>;

    /// Replace the first matching document.
    async fn replace_one(
        &self,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> ClientResult<UpdateOutcome>;

    /// Delete the first matching document.
    async fn delete_one(&self, filter: Document) -> ClientResult<DeleteOutcome>;

    /// Delete every matching document.
    async fn delete_many(&self, filter: Document) -> ClientResult<DeleteOutcome>;
}
