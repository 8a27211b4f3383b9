//! Implements a struct that holds the state of the mail companion server.

use std::sync::Arc;

use crate::{DocumentStore, MailProvider};

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// Where OAuth tokens are persisted, keyed by user ID.
    pub documents: Arc<dyn DocumentStore>,

    /// The mailbox the server reads unread messages from.
    pub mail: Arc<dyn MailProvider>,
}

impl AppState {
    /// Create a new [AppState].
    pub fn new(documents: Arc<dyn DocumentStore>, mail: Arc<dyn MailProvider>) -> Self {
        Self { documents, mail }
    }
}
