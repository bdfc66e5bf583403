//! Error types for the MongoDB client.

use docquery_core::{BoxError, Operation, QueryError};
use thiserror::Error;

/// Result type for MongoDB client operations.
pub type MongoResult<T> = Result<T, MongoError>;

/// Errors raised by the MongoDB client.
#[derive(Error, Debug)]
pub enum MongoError {
    /// MongoDB driver error.
    #[error("mongodb error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),
}

impl MongoError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Check if this is a configuration error.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Check if the driver reported a duplicate key.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            Self::Driver(e) => e.to_string().contains("duplicate key"),
            _ => false,
        }
    }

    /// Wrap this error as the failure of a terminal operation.
    pub fn into_query_error(self, operation: Operation, collection: &str) -> QueryError {
        QueryError::execution(operation, collection, self)
    }
}

/// Box a driver error for the collection capability.
pub(crate) fn boxed(err: mongodb::error::Error) -> BoxError {
    Box::new(MongoError::Driver(err))
}
