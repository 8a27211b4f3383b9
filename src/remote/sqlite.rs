//! A [DocumentStore] backed by a SQLite database.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Row, params_from_iter};
use tokio::sync::broadcast;

use crate::{
    Change, Collection, Document, DocumentStore, Error, Fields, Filter, remote::new_document_id,
};

/// How many unread changes a slow watcher may fall behind by before it misses some.
const CHANGE_FEED_CAPACITY: usize = 256;

/// Stores each document as a JSON object in a single `document` table.
#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    connection: Arc<Mutex<Connection>>,
    changes: broadcast::Sender<Change>,
}

impl SqliteDocumentStore {
    /// Wrap `connection`, creating the document table if needed.
    ///
    /// # Errors
    /// Returns [Error::SqlError] if the table could not be created.
    pub fn new(connection: Connection) -> Result<Self, Error> {
        create_document_table(&connection)?;
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            changes,
        })
    }

    fn with_connection<T>(
        &self,
        operation: impl FnOnce(&Connection) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        operation(&connection)
    }

    fn announce(&self, collection: Collection, id: &str) {
        // Sending only fails when nobody is listening.
        let _ = self.changes.send(Change {
            collection,
            id: id.to_owned(),
        });
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, Error> {
        self.with_connection(|connection| get_document(collection, id, connection))
    }

    async fn query(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Document>, Error> {
        self.with_connection(|connection| query_documents(collection, filters, connection))
    }

    async fn add(&self, collection: Collection, fields: Fields) -> Result<String, Error> {
        let id = new_document_id();
        self.with_connection(|connection| set_document(collection, &id, &fields, connection))?;
        self.announce(collection, &id);

        Ok(id)
    }

    async fn set(&self, collection: Collection, id: &str, fields: Fields) -> Result<(), Error> {
        self.with_connection(|connection| set_document(collection, id, &fields, connection))?;
        self.announce(collection, id);

        Ok(())
    }

    async fn update(&self, collection: Collection, id: &str, fields: Fields) -> Result<(), Error> {
        self.with_connection(|connection| {
            let Some(mut document) = get_document(collection, id, connection)? else {
                return Err(Error::NotFound);
            };

            document.fields.extend(fields);
            set_document(collection, id, &document.fields, connection)
        })?;
        self.announce(collection, id);

        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), Error> {
        self.with_connection(|connection| delete_document(collection, id, connection))?;
        self.announce(collection, id);

        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }
}

/// Initialize the document table.
pub fn create_document_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS document (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            fields TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        );",
    )?;

    Ok(())
}

fn get_document(
    collection: Collection,
    id: &str,
    connection: &Connection,
) -> Result<Option<Document>, Error> {
    connection
        .prepare("SELECT id, fields FROM document WHERE collection = ?1 AND id = ?2;")?
        .query_row((collection.as_str(), id), map_row)
        .optional()?
        .map(parse_document)
        .transpose()
}

/// Filters compare the extracted JSON values, so `"1"` does not match `1`. A `null` filter value
/// matches nothing.
fn query_documents(
    collection: Collection,
    filters: &[Filter],
    connection: &Connection,
) -> Result<Vec<Document>, Error> {
    let mut sql = String::from("SELECT id, fields FROM document WHERE collection = ?1");
    let mut params = vec![collection.as_str().to_owned()];

    for filter in filters {
        sql.push_str(&format!(
            " AND json_extract(fields, ?{}) = json_extract(?{}, '$')",
            params.len() + 1,
            params.len() + 2
        ));
        params.push(format!("$.{}", filter.field));
        params.push(serde_json::to_string(&filter.value)?);
    }

    sql.push_str(" ORDER BY id ASC;");

    connection
        .prepare(&sql)?
        .query_map(params_from_iter(params), map_row)?
        .map(|maybe_row| {
            maybe_row
                .map_err(Error::from)
                .and_then(parse_document)
        })
        .collect()
}

fn set_document(
    collection: Collection,
    id: &str,
    fields: &Fields,
    connection: &Connection,
) -> Result<(), Error> {
    let json = serde_json::to_string(fields)?;

    connection.execute(
        "INSERT INTO document (collection, id, fields) VALUES (?1, ?2, ?3)
        ON CONFLICT (collection, id) DO UPDATE SET fields = excluded.fields;",
        (collection.as_str(), id, json),
    )?;

    Ok(())
}

fn delete_document(collection: Collection, id: &str, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM document WHERE collection = ?1 AND id = ?2;",
        (collection.as_str(), id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<(String, String), rusqlite::Error> {
    Ok((row.get(0)?, row.get(1)?))
}

fn parse_document((id, json): (String, String)) -> Result<Document, Error> {
    let fields = serde_json::from_str(&json)?;

    Ok(Document { id, fields })
}
