//! Compilation of a [`QueryState`] into a driver filter and options.

use bson::{Bson, Document};

use crate::error::QueryResult;
use crate::state::QueryState;

/// Driver options derived from a query state.
///
/// Absent fields are `None` and are left out of [`QueryOptions::to_document`],
/// so "not set" stays distinguishable from an explicit zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Inclusion projection, `{ field: 1, .. }`.
    pub projection: Option<Document>,
    /// Single-key ordering, `{ field: direction }`.
    pub sort: Option<Document>,
    /// Number of documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents to return.
    pub limit: Option<u64>,
}

impl QueryOptions {
    /// Check whether no option is set.
    pub fn is_empty(&self) -> bool {
        self.projection.is_none() && self.sort.is_none() && self.skip.is_none() && self.limit.is_none()
    }

    /// Render the options as a document containing only the present keys.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        if let Some(ref projection) = self.projection {
            doc.insert("projection", projection.clone());
        }
        if let Some(ref sort) = self.sort {
            doc.insert("sort", sort.clone());
        }
        if let Some(skip) = self.skip {
            doc.insert("skip", to_bson_count(skip));
        }
        if let Some(limit) = self.limit {
            doc.insert("limit", to_bson_count(limit));
        }
        doc
    }
}

fn to_bson_count(n: u64) -> Bson {
    Bson::Int64(i64::try_from(n).unwrap_or(i64::MAX))
}

/// The filter and options a terminal operation sends to the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledQuery {
    /// Filter document; every entry is combined with implicit AND.
    pub filter: Document,
    /// Find/count options.
    pub options: QueryOptions,
}

/// Compile a query state.
///
/// Fails with a conversion error when an equality filter on `identity_field`
/// holds a value that is not a valid ObjectId literal.
///
/// ```rust
/// use docquery_core::{Predicate, QueryState, compile};
///
/// let mut state = QueryState::new();
/// state.set_filter("title", Predicate::StartsWith("Wid".into()));
/// state.limit = Some(5);
///
/// let compiled = compile(&state, "_id").unwrap();
/// assert!(compiled.filter.contains_key("title"));
/// assert_eq!(compiled.options.limit, Some(5));
/// assert!(compiled.options.sort.is_none());
/// ```
pub fn compile(state: &QueryState, identity_field: &str) -> QueryResult<CompiledQuery> {
    let mut filter = Document::new();
    for (field, predicate) in &state.filters {
        filter.insert(field.as_str(), predicate.to_bson(field, identity_field)?);
    }

    let projection = (!state.projection.is_empty()).then(|| {
        state
            .projection
            .iter()
            .map(|field| (field.clone(), Bson::Int32(1)))
            .collect::<Document>()
    });

    let sort = state.sort.as_ref().map(|key| {
        let mut doc = Document::new();
        doc.insert(key.field.clone(), Bson::Int32(key.direction));
        doc
    });

    Ok(CompiledQuery {
        filter,
        options: QueryOptions {
            projection,
            sort,
            skip: state.skip,
            limit: state.limit,
        },
    })
}
