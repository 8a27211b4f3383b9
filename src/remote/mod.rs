//! The remote document database and its SQLite implementation.

mod document;
mod document_store;
mod sqlite;

pub use document::{Change, Collection, Document, Fields, Filter, new_document_id};
pub use document_store::DocumentStore;
pub use sqlite::SqliteDocumentStore;
