//! SQLite backend for the Lore knowledge base.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each write runs in one transaction.

mod attachments;
mod catalog;
mod encode;
mod history;
mod lifecycle;
mod schema;
mod store;
mod users;
mod versioning;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
