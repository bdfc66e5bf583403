//! # docquery
//!
//! A fluent query builder and executor for document databases.
//!
//! docquery provides:
//! - A chainable builder for collection, filters, projection, sort and pagination
//! - One-call terminal operations: count, get, insert, update, upsert, replace, delete
//! - Identity values flattened to plain strings in results
//! - A MongoDB backend (feature `mongodb`, on by default) and an in-memory backend
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docquery::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MongoClient::builder()
//!         .uri("mongodb://localhost:27017")
//!         .database("shop")
//!         .build()
//!         .await?;
//!
//!     let mut db = client.query();
//!     let total = db
//!         .collection("products")
//!         .filter("title", Comparator::Contains, "gadget")
//!         .count()
//!         .await?;
//!
//!     println!("{total} gadgets");
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use docquery_core::*;

/// MongoDB backend.
#[cfg(feature = "mongodb")]
#[cfg_attr(docsrs, doc(cfg(feature = "mongodb")))]
pub mod mongodb {
    pub use docquery_mongodb::*;
}

#[cfg(feature = "mongodb")]
pub use docquery_mongodb::{MongoClient, MongoConfig, MongoError};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use docquery_core::prelude::*;

    #[cfg(feature = "mongodb")]
    pub use docquery_mongodb::prelude::*;
}
