//! # docquery-mongodb
//!
//! MongoDB backend for the docquery builder, on top of the official driver.
//!
//! This crate provides:
//! - Connection configuration from code or `DOCQUERY_*` environment variables
//! - A [`MongoClient`] that hands out [`QueryBuilder`](docquery_core::QueryBuilder)s
//! - The collection capability mapping compiled queries onto driver calls
//!
//! ## Example
//!
//! ```rust,no_run
//! use bson::doc;
//! use docquery_core::Comparator;
//! use docquery_mongodb::MongoClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MongoClient::builder()
//!     .uri("mongodb://localhost:27017")
//!     .database("shop")
//!     .build()
//!     .await?;
//!
//! let mut db = client.query();
//! let widgets = db
//!     .collection("products")
//!     .filter("title", Comparator::Starts, "Wid")
//!     .sort("title", 1)
//!     .limit(5)
//!     .get()
//!     .await?;
//!
//! let removed = db
//!     .collection("products")
//!     .filter("title", "eq", "Widget 1")
//!     .delete(false)
//!     .await?;
//! # let _ = (widgets, removed);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::{MongoClient, MongoClientBuilder, MongoCollection};
pub use config::{MongoConfig, MongoConfigBuilder};
pub use error::{MongoError, MongoResult};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::{MongoClient, MongoClientBuilder};
    pub use crate::config::{MongoConfig, MongoConfigBuilder};
    pub use crate::error::{MongoError, MongoResult};
}
