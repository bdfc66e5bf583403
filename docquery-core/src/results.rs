//! Normalized results returned by terminal operations.

use bson::Document;
use serde::{Deserialize, Serialize};

use crate::client::{DeleteOutcome, InsertOutcome, UpdateOutcome};
use crate::document::identity_to_string;

/// Documents passed to [`QueryBuilder::insert`](crate::QueryBuilder::insert).
#[derive(Debug, Clone, PartialEq)]
pub enum InsertData {
    /// Insert a single document.
    One(Document),
    /// Insert every document in order.
    Many(Vec<Document>),
}

impl InsertData {
    /// Check whether this is a multi-document insert.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }
}

impl From<Document> for InsertData {
    fn from(doc: Document) -> Self {
        Self::One(doc)
    }
}

impl From<Vec<Document>> for InsertData {
    fn from(docs: Vec<Document>) -> Self {
        Self::Many(docs)
    }
}

/// Stringified ids of inserted documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InsertedIds {
    /// Id of a single inserted document.
    One(String),
    /// Ids of several inserted documents, in insertion order.
    Many(Vec<String>),
}

impl InsertedIds {
    /// Get the ids as a list regardless of shape.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(id) => vec![id.clone()],
            Self::Many(ids) => ids.clone(),
        }
    }
}

/// Result of an insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertSummary {
    /// Number of documents inserted.
    pub inserted_count: u64,
    /// Ids of the inserted documents.
    pub inserted_ids: InsertedIds,
}

impl InsertSummary {
    /// Normalize a client outcome; `many` selects the id shape.
    pub fn from_outcome(outcome: InsertOutcome, many: bool) -> Self {
        let mut ids: Vec<String> = outcome.inserted_ids.iter().map(identity_to_string).collect();
        let inserted_count = ids.len() as u64;
        let inserted_ids = if many {
            InsertedIds::Many(ids)
        } else {
            InsertedIds::One(ids.pop().unwrap_or_default())
        };
        Self {
            inserted_count,
            inserted_ids,
        }
    }
}

/// Result of an update or replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    /// Number of documents matched by the filter.
    pub matched_count: u64,
    /// Number of documents changed.
    pub modified_count: u64,
}

impl From<UpdateOutcome> for UpdateSummary {
    fn from(outcome: UpdateOutcome) -> Self {
        Self {
            matched_count: outcome.matched_count,
            modified_count: outcome.modified_count,
        }
    }
}

/// Result of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertSummary {
    /// Number of documents matched by the filter.
    pub matched_count: u64,
    /// Number of documents changed.
    pub modified_count: u64,
    /// Number of documents inserted, 0 or 1.
    pub upserted_count: u64,
}

impl From<UpdateOutcome> for UpsertSummary {
    fn from(outcome: UpdateOutcome) -> Self {
        Self {
            matched_count: outcome.matched_count,
            modified_count: outcome.modified_count,
            upserted_count: u64::from(outcome.upserted_id.is_some()),
        }
    }
}

/// Result of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    /// Number of documents matched; drivers only report removals, so this
    /// equals `deleted_count`.
    pub matched_count: u64,
    /// Number of documents removed.
    pub deleted_count: u64,
}

impl From<DeleteOutcome> for DeleteSummary {
    fn from(outcome: DeleteOutcome) -> Self {
        Self {
            matched_count: outcome.deleted_count,
            deleted_count: outcome.deleted_count,
        }
    }
}
