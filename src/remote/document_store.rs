//! The interface of the remote document database.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{Change, Collection, Document, Error, Fields, Filter};

/// A schemaless store of JSON documents grouped into collections.
///
/// Every write is announced on the [change feed](DocumentStore::changes) after it has been
/// committed.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Get a document by ID, returning `None` if it does not exist.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, Error>;

    /// Get the documents in `collection` that match every filter, ordered by ID.
    async fn query(&self, collection: Collection, filters: &[Filter])
    -> Result<Vec<Document>, Error>;

    /// Create a document with a generated ID, returning the ID.
    async fn add(&self, collection: Collection, fields: Fields) -> Result<String, Error>;

    /// Create or overwrite the document `id`.
    async fn set(&self, collection: Collection, id: &str, fields: Fields) -> Result<(), Error>;

    /// Overwrite the given top-level fields of the document `id`, keeping the others.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if the document does not exist.
    async fn update(&self, collection: Collection, id: &str, fields: Fields) -> Result<(), Error>;

    /// Delete the document `id`.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if the document does not exist.
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), Error>;

    /// Listen for changes made after this call.
    fn changes(&self) -> broadcast::Receiver<Change>;
}
