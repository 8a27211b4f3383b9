//! Family Ledger is the core of a family expense tracker.
//!
//! Users sign in, create or join a family, record expenses and view reports
//! that summarize spending by category, member and time period. This library
//! provides:
//! - a reducer-driven local [store](Store) of the signed-in user's data,
//! - a [sync adapter](SyncAdapter) between that store and a remote
//!   [document store](DocumentStore), including live subscriptions,
//! - pure aggregation [views] over expense lists,
//! - the HTTP glue for the Gmail OAuth companion server.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod config;
mod currency;
mod endpoints;
mod expense;
mod family;
mod logging;
mod mail;
mod mail_api;
mod remote;
mod routing;
mod session;
mod store;
mod sync;
mod timestamp;
mod timezone;
mod user;
mod validation;
pub mod views;

pub use app_state::AppState;
pub use config::{GoogleOAuthConfig, ServerConfig};
pub use currency::{Currency, format_currency};
pub use expense::{
    Expense, ExpenseCategory, ExpenseDraft, ExpenseFilter, ExpenseForm, ExpenseId,
    group_by_date, recent_expenses,
};
pub use family::{Family, FamilyDraft, FamilyId, JoinCode, MemberForm, check_member_removal};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use mail::{GoogleMailClient, MailProvider, MessageRef, OAuthTokens};
pub use remote::{
    Change, Collection, Document, DocumentStore, Fields, Filter, SqliteDocumentStore,
    new_document_id,
};
pub use routing::build_router;
pub use session::Session;
pub use store::{Action, AppSnapshot, Store, reduce};
pub use sync::{FamilyUpdate, NewMember, Subscription, SyncAdapter, UserUpdate};
pub use timestamp::Timestamp;
pub use timezone::{get_local_offset, local_today};
pub use user::{User, UserId};
pub use validation::FieldErrors;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// User input failed validation.
    ///
    /// No remote call has been made when this error is returned.
    #[error("invalid input: {0}")]
    InvalidForm(FieldErrors),

    /// The requested resource was not found.
    #[error("the requested resource could not be found")]
    NotFound,

    /// No family uses the given join code.
    #[error("Family not found with this code.")]
    JoinCodeNotFound,

    /// A family document was read without the ID it is stored under.
    #[error("family document is missing an id")]
    MissingFamilyId,

    /// A user document cannot be written without an email address.
    #[error("User email is required")]
    EmailRequired,

    /// The acting user must be a family admin to manage members.
    #[error("only family admins can manage members")]
    NotAdmin,

    /// Removing the member would leave the family empty.
    #[error("You can't remove the last member of a family.")]
    CannotRemoveLastMember,

    /// Members leave a family via the "leave family" path, not by removing themselves.
    #[error("You can't remove yourself.")]
    CannotRemoveSelf,

    /// The owner of a family cannot be removed from it.
    #[error("You can't remove the family owner.")]
    CannotRemoveOwner,

    /// The user is not a member of the family.
    #[error("the user is not a member of this family")]
    NotAMember,

    /// The owner of a family cannot leave it.
    #[error("the family owner cannot leave the family")]
    OwnerCannotLeave,

    /// Tried to update an expense that does not exist.
    #[error("tried to update an expense that is not in the database")]
    UpdateMissingExpense,

    /// Tried to delete an expense that does not exist.
    #[error("tried to delete an expense that is not in the database")]
    DeleteMissingExpense,

    /// A remote document did not match its collection's schema.
    #[error("document {collection}/{id} is invalid: {reason}")]
    InvalidDocument {
        /// The name of the collection the document was read from.
        collection: String,
        /// The document ID.
        id: String,
        /// Why the document could not be converted.
        reason: String,
    },

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while serializing or deserializing JSON.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The document store's change feed was closed while a subscription was listening.
    #[error("the document store stopped sending changes")]
    ChangeFeedClosed,

    /// The mail provider returned an error or could not be reached.
    #[error("mail provider error: {0}")]
    MailProviderError(String),

    /// A mail operation was attempted before OAuth credentials were set.
    #[error("no mail credentials have been set")]
    MissingCredentials,

    /// A request did not identify the user it is for.
    #[error("userId query param required")]
    MissingUserId,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JSONSerializationError(value.to_string())
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidForm(_) | Error::MissingUserId => StatusCode::BAD_REQUEST,
            Error::MissingCredentials => StatusCode::UNAUTHORIZED,
            Error::NotFound | Error::JoinCodeNotFound => StatusCode::NOT_FOUND,
            Error::NotAdmin
            | Error::CannotRemoveLastMember
            | Error::CannotRemoveSelf
            | Error::CannotRemoveOwner
            | Error::OwnerCannotLeave => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("An unexpected error occurred: {}", self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
