//! The fluent query builder.

use bson::{Document, doc};
use tracing::debug;

use crate::client::{CollectionHandle, DocumentClient};
use crate::compile::{CompiledQuery, compile};
use crate::document::{DEFAULT_IDENTITY_FIELD, normalize_identity};
use crate::error::{BoxError, Operation, QueryError, QueryResult};
use crate::filter::{Comparator, Predicate};
use crate::results::{
    DeleteSummary, InsertData, InsertSummary, InsertedIds, UpdateSummary, UpsertSummary,
};
use crate::state::{QueryState, SortKey};

/// Builds a query through chained calls and executes it with one terminal call.
///
/// Configuration methods record their input and return the builder. Terminal
/// methods (`count`, `get`, `insert`, `update`, `upsert`, `replace`,
/// `delete`) compile the recorded state, run it against the client and
/// return a normalized result. The state is cleared before the client is
/// contacted, so the builder is ready for the next query whatever the outcome.
///
/// Every method takes `&mut self`: one builder runs one logical query at a
/// time. Use one builder per concurrent task.
///
/// # Example
///
/// ```rust
/// use bson::doc;
/// use docquery_core::{Comparator, MemoryClient, QueryBuilder};
///
/// # tokio_test_block(async {
/// let mut db = QueryBuilder::new(MemoryClient::new(), "shop");
///
/// db.collection("products")
///     .insert(vec![doc! { "title": "Widget" }, doc! { "title": "Gadget" }])
///     .await?;
///
/// let widgets = db
///     .collection("products")
///     .filter("title", Comparator::Starts, "wid")
///     .get()
///     .await?;
/// assert_eq!(widgets.len(), 1);
/// # Ok::<_, docquery_core::QueryError>(())
/// # }).unwrap();
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub struct QueryBuilder<C: DocumentClient> {
    client: C,
    database: String,
    identity_field: String,
    state: QueryState,
}

/// Everything a terminal operation needs once the state has been consumed.
struct Prepared<H> {
    handle: H,
    collection: String,
    query: CompiledQuery,
}

impl<C: DocumentClient> QueryBuilder<C> {
    /// Create a builder bound to `database`.
    pub fn new(client: C, database: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
            identity_field: DEFAULT_IDENTITY_FIELD.to_string(),
            state: QueryState::new(),
        }
    }

    /// Use a different identity field than `_id`.
    pub fn with_identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = field.into();
        self
    }

    /// Get the database this builder is bound to.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Get the identity field name.
    pub fn identity_field(&self) -> &str {
        &self.identity_field
    }

    /// Get the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Get the state recorded so far.
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Discard the state recorded so far.
    pub fn reset(&mut self) -> &mut Self {
        self.state.reset();
        self
    }

    /// Compile the recorded state without executing or clearing it.
    pub fn compile(&self) -> QueryResult<CompiledQuery> {
        compile(&self.state, &self.identity_field)
    }

    // ==================== Configuration ====================

    /// Set the target collection.
    pub fn collection(&mut self, name: impl Into<String>) -> &mut Self {
        self.state.collection = Some(name.into());
        self
    }

    /// Replace the projection with `fields`.
    pub fn projection<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.set_projection(fields);
        self
    }

    /// Set the predicate for `field`, replacing any earlier one.
    ///
    /// Accepts a [`Comparator`] or its name; unknown names mean equality.
    pub fn filter(
        &mut self,
        field: &str,
        comparator: impl Into<Comparator>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.state
            .set_filter(field, Predicate::new(comparator.into(), value));
        self
    }

    /// Sort by `field`; `direction` is passed to the database as given.
    pub fn sort(&mut self, field: impl Into<String>, direction: i32) -> &mut Self {
        self.state.sort = Some(SortKey {
            field: field.into(),
            direction,
        });
        self
    }

    /// Skip the first `n` matching documents.
    pub fn skip(&mut self, n: u64) -> &mut Self {
        self.state.skip = Some(n);
        self
    }

    /// Return at most `n` documents.
    pub fn limit(&mut self, n: u64) -> &mut Self {
        self.state.limit = Some(n);
        self
    }

    // ==================== Terminal operations ====================

    /// Count matching documents.
    pub async fn count(&mut self) -> QueryResult<u64> {
        let operation = Operation::Count;
        let Prepared {
            handle,
            collection,
            query,
        } = self.prepare(operation)?;

        handle
            .count(query.filter, query.options)
            .await
            .map_err(|e| execution_failed(operation, &collection, e))
    }

    /// Fetch matching documents with their identity fields as plain strings.
    pub async fn get(&mut self) -> QueryResult<Vec<Document>> {
        let operation = Operation::Get;
        let Prepared {
            handle,
            collection,
            query,
        } = self.prepare(operation)?;

        let docs = handle
            .find(query.filter, query.options)
            .await
            .map_err(|e| execution_failed(operation, &collection, e))?;

        debug!(collection = %collection, count = docs.len(), "Fetched documents");

        Ok(docs
            .into_iter()
            .map(|doc| normalize_identity(doc, &self.identity_field))
            .collect())
    }

    /// Insert one document or a list of documents.
    ///
    /// A [`Document`] yields a single id, a `Vec<Document>` a list of ids.
    pub async fn insert(&mut self, data: impl Into<InsertData>) -> QueryResult<InsertSummary> {
        let operation = Operation::Insert;
        let Prepared {
            handle, collection, ..
        } = self.prepare(operation)?;

        let data = data.into();
        let many = data.is_many();
        let outcome = match data {
            InsertData::One(doc) => handle.insert_one(doc).await,
            InsertData::Many(docs) if docs.is_empty() => {
                return Ok(InsertSummary {
                    inserted_count: 0,
                    inserted_ids: InsertedIds::Many(Vec::new()),
                });
            }
            InsertData::Many(docs) => handle.insert_many(docs).await,
        };

        outcome
            .map(|o| InsertSummary::from_outcome(o, many))
            .map_err(|e| execution_failed(operation, &collection, e))
    }

    /// Set the fields of `data` on matching documents.
    ///
    /// Fields not named in `data` are kept. With `many` false only the first
    /// match is updated.
    pub async fn update(&mut self, data: Document, many: bool) -> QueryResult<UpdateSummary> {
        let operation = Operation::Update;
        let Prepared {
            handle,
            collection,
            query,
        } = self.prepare(operation)?;

        let update = doc! { "$set": data };
        let outcome = if many {
            handle.update_many(query.filter, update).await
        } else {
            handle.update_one(query.filter, update, false).await
        };

        outcome
            .map(UpdateSummary::from)
            .map_err(|e| execution_failed(operation, &collection, e))
    }

    /// Set the fields of `data` on the first match, inserting when nothing matches.
    pub async fn upsert(&mut self, data: Document) -> QueryResult<UpsertSummary> {
        let operation = Operation::Upsert;
        let Prepared {
            handle,
            collection,
            query,
        } = self.prepare(operation)?;

        handle
            .update_one(query.filter, doc! { "$set": data }, true)
            .await
            .map(UpsertSummary::from)
            .map_err(|e| execution_failed(operation, &collection, e))
    }

    /// Replace the first matching document with `data`.
    pub async fn replace(&mut self, data: Document, upsert: bool) -> QueryResult<UpdateSummary> {
        let operation = Operation::Replace;
        let Prepared {
            handle,
            collection,
            query,
        } = self.prepare(operation)?;

        handle
            .replace_one(query.filter, data, upsert)
            .await
            .map(UpdateSummary::from)
            .map_err(|e| execution_failed(operation, &collection, e))
    }

    /// Delete matching documents; with `many` false only the first match.
    pub async fn delete(&mut self, many: bool) -> QueryResult<DeleteSummary> {
        let operation = Operation::Delete;
        let Prepared {
            handle,
            collection,
            query,
        } = self.prepare(operation)?;

        let outcome = if many {
            handle.delete_many(query.filter).await
        } else {
            handle.delete_one(query.filter).await
        };

        outcome
            .map(DeleteSummary::from)
            .map_err(|e| execution_failed(operation, &collection, e))
    }

    /// Consume the recorded state and resolve what the operation needs.
    ///
    /// The state is cleared first, so every early return below leaves the
    /// builder empty. Inserts ignore filters, so they are not compiled.
    fn prepare(&mut self, operation: Operation) -> QueryResult<Prepared<C::Handle>> {
        let state = self.state.take();

        let Some(collection) = state.collection.clone() else {
            debug!(operation = %operation, "No collection selected");
            return Err(QueryError::missing_collection(operation));
        };

        let handle = self
            .client
            .collection_handle(&self.database, &collection)
            .map_err(|e| execution_failed(operation, &collection, e))?;

        let query = if operation == Operation::Insert {
            CompiledQuery::default()
        } else {
            compile(&state, &self.identity_field)?
        };

        debug!(
            database = %self.database,
            collection = %collection,
            operation = %operation,
            filter = %query.filter,
            options = %query.options.to_document(),
            "Executing query"
        );

        Ok(Prepared {
            handle,
            collection,
            query,
        })
    }
}

fn execution_failed(operation: Operation, collection: &str, source: BoxError) -> QueryError {
    debug!(operation = %operation, collection = %collection, error = %source, "Query failed");
    QueryError::execution(operation, collection, source)
}
