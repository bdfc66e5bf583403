//! Accumulated builder inputs for a single logical query.

use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;

use crate::filter::Predicate;

/// A single sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Field to sort by.
    pub field: String,
    /// Native sort direction, `1` ascending and `-1` descending by convention.
    pub direction: i32,
}

/// Query parameters collected by the chainable builder methods.
///
/// A state starts empty and is returned to empty after every terminal
/// operation, successful or not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    /// Target collection.
    pub collection: Option<String>,
    /// Per-field predicates, combined with implicit AND.
    pub filters: IndexMap<SmolStr, Predicate>,
    /// Fields to include in returned documents; empty includes everything.
    pub projection: IndexSet<String>,
    /// Sort key.
    pub sort: Option<SortKey>,
    /// Number of documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents to return.
    pub limit: Option<u64>,
}

impl QueryState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore every field to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Move the current state out, leaving an empty state behind.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Check whether no builder input has been recorded.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Set or overwrite the predicate for `field`.
    pub fn set_filter(&mut self, field: impl Into<SmolStr>, predicate: Predicate) {
        self.filters.insert(field.into(), predicate);
    }

    /// Replace the projection with the given fields.
    pub fn set_projection<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = fields.into_iter().map(Into::into).collect();
    }
}
