//! Error types for query execution.
//!
//! Every terminal operation on a [`QueryBuilder`](crate::QueryBuilder) returns a
//! [`QueryResult`]. Failures fall into three kinds:
//!
//! - [`ErrorKind::Configuration`]: the query was not fully described (no collection).
//! - [`ErrorKind::Conversion`]: an identity-field value is not a valid ObjectId literal.
//! - [`ErrorKind::Execution`]: the client failed while running the operation.
//!
//! ```rust
//! use docquery_core::{ErrorKind, Operation, QueryError};
//!
//! let err = QueryError::missing_collection(Operation::Count);
//! assert_eq!(err.kind(), ErrorKind::Configuration);
//! assert_eq!(err.to_string(), "configuration error: no collection selected for count");
//! ```

use std::fmt;

use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Boxed error produced by an injected client.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The terminal operation a query was executed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `count()`
    Count,
    /// `get()`
    Get,
    /// `insert()`
    Insert,
    /// `update()`
    Update,
    /// `upsert()`
    Upsert,
    /// `replace()`
    Replace,
    /// `delete()`
    Delete,
}

impl Operation {
    /// Get the lowercase name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Get => "get",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Upsert => "upsert",
            Self::Replace => "replace",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of a [`QueryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The query is missing required configuration.
    Configuration,
    /// A filter value could not be converted to its native type.
    Conversion,
    /// The client failed to execute the operation.
    Execution,
}

/// Errors that can occur while executing a query.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Terminal operation invoked with no collection set.
    #[error("configuration error: no collection selected for {operation}")]
    Configuration {
        /// Operation that was attempted.
        operation: Operation,
    },

    /// Identity-field value is not a valid native identifier.
    #[error("conversion error: '{value}' is not a valid identifier for field '{field}'")]
    Conversion {
        /// Identity field the value was supplied for.
        field: String,
        /// Offending literal.
        value: String,
        /// Parser error.
        #[source]
        source: bson::oid::Error,
    },

    /// The client failed while running the operation.
    #[error("execution error: {operation} on '{collection}' failed: {source}")]
    Execution {
        /// Operation that was attempted.
        operation: Operation,
        /// Target collection.
        collection: String,
        /// Error reported by the client.
        #[source]
        source: BoxError,
    },
}

impl QueryError {
    /// Create a configuration error for a missing collection.
    pub fn missing_collection(operation: Operation) -> Self {
        Self::Configuration { operation }
    }

    /// Create a conversion error for an identity-field literal.
    pub fn conversion(
        field: impl Into<String>,
        value: impl Into<String>,
        source: bson::oid::Error,
    ) -> Self {
        Self::Conversion {
            field: field.into(),
            value: value.into(),
            source,
        }
    }

    /// Create an execution error wrapping a client failure.
    pub fn execution(
        operation: Operation,
        collection: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Execution {
            operation,
            collection: collection.into(),
            source: source.into(),
        }
    }

    /// Get the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Conversion { .. } => ErrorKind::Conversion,
            Self::Execution { .. } => ErrorKind::Execution,
        }
    }

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Check if this is a conversion error.
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion { .. })
    }

    /// Check if this is an execution error.
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = QueryError::missing_collection(Operation::Get);
        assert!(err.is_configuration());
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let source = bson::oid::ObjectId::parse_str("nope").unwrap_err();
        let err = QueryError::conversion("_id", "nope", source);
        assert!(err.is_conversion());

        let err = QueryError::execution(Operation::Delete, "users", "connection reset");
        assert!(err.is_execution());
        assert_eq!(err.kind(), ErrorKind::Execution);
    }

    #[test]
    fn test_error_display() {
        let err = QueryError::missing_collection(Operation::Insert);
        assert_eq!(
            err.to_string(),
            "configuration error: no collection selected for insert"
        );

        let err = QueryError::execution(Operation::Count, "orders", "not authorized");
        assert_eq!(
            err.to_string(),
            "execution error: count on 'orders' failed: not authorized"
        );
    }

    #[test]
    fn test_execution_error_keeps_source() {
        use std::error::Error as _;

        let err = QueryError::execution(Operation::Update, "users", "duplicate key");
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("duplicate key"));
    }
}
