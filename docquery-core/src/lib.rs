//! # docquery-core
//!
//! Fluent query builder for document databases.
//!
//! A [`QueryBuilder`] accumulates a collection name, field filters, a
//! projection, a single sort key and pagination, then executes the whole query
//! with one terminal call:
//!
//! - `count` - number of matching documents
//! - `get` - matching documents with identity values flattened to strings
//! - `insert` - one document or many
//! - `update` / `upsert` / `replace` - modify the first or every match
//! - `delete` - remove the first or every match
//!
//! The builder never talks to a server itself. It compiles its state into a
//! BSON filter plus [`QueryOptions`] and hands them to a [`DocumentClient`].
//! `docquery-mongodb` provides the MongoDB implementation; [`MemoryClient`]
//! runs everything in process memory.
//!
//! ## Filters
//!
//! ```rust
//! use bson::doc;
//! use docquery_core::{Comparator, MemoryClient, QueryBuilder};
//!
//! let mut db = QueryBuilder::new(MemoryClient::new(), "shop");
//! db.collection("products")
//!     .filter("title", Comparator::Starts, "Wid")
//!     .filter("category", "eq", "tools")
//!     .sort("title", 1)
//!     .limit(5);
//!
//! let query = db.compile().unwrap();
//! assert_eq!(
//!     query.filter,
//!     doc! {
//!         "title": { "$regex": "^Wid", "$options": "i" },
//!         "category": "tools"
//!     }
//! );
//! ```
//!
//! ## Errors
//!
//! Every terminal operation fails with a [`QueryError`]: a configuration error
//! when no collection was selected, a conversion error when an identity value
//! is not a valid ObjectId, or an execution error wrapping whatever the client
//! reported.

pub mod builder;
pub mod client;
pub mod compile;
pub mod document;
pub mod error;
pub mod filter;
pub mod logging;
pub mod memory;
pub mod results;
pub mod state;

pub use builder::QueryBuilder;
pub use client::{
    ClientResult, CollectionHandle, DeleteOutcome, DocumentClient, InsertOutcome, UpdateOutcome,
};
pub use compile::{CompiledQuery, QueryOptions, compile};
pub use document::{DEFAULT_IDENTITY_FIELD, identity_to_string, normalize_identity};
pub use error::{BoxError, ErrorKind, Operation, QueryError, QueryResult};
pub use filter::{Comparator, Predicate};
pub use memory::{MemoryClient, MemoryCollection};
pub use results::{
    DeleteSummary, InsertData, InsertSummary, InsertedIds, UpdateSummary, UpsertSummary,
};
pub use state::{QueryState, SortKey};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::builder::QueryBuilder;
    pub use crate::client::{CollectionHandle, DocumentClient};
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::filter::Comparator;
    pub use crate::memory::MemoryClient;
    pub use crate::results::{
        DeleteSummary, InsertData, InsertSummary, InsertedIds, UpdateSummary, UpsertSummary,
    };
}
