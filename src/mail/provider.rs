//! The interface to an OAuth-protected mailbox.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Error;

/// The OAuth credentials for a mailbox, in the shape the token endpoint returns them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// The short lived token sent with API requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// The long lived token used to obtain new access tokens. Only sent for offline access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// The space separated scopes that were granted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// When the access token expires, in milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    /// Usually "Bearer".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// The OpenID Connect ID token, if one was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

/// A reference to a message in a mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    /// The message ID.
    pub id: String,
    /// The ID of the thread the message belongs to.
    #[serde(rename = "threadId")]
    pub thread_id: String,
}

/// A mailbox that is accessed with OAuth credentials.
///
/// A provider holds one set of credentials at a time, set either by
/// [MailProvider::exchange_code] or [MailProvider::set_credentials].
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// The URL of the consent page. `state` is passed back to the redirect URI unchanged.
    ///
    /// # Errors
    /// Returns [Error::MailProviderError] if the URL cannot be built.
    fn generate_auth_url(&self, state: &str) -> Result<String, Error>;

    /// Exchange an authorization code for tokens and use them as the current credentials.
    async fn exchange_code(&self, code: &str) -> Result<OAuthTokens, Error>;

    /// Use `tokens` for subsequent requests.
    async fn set_credentials(&self, tokens: OAuthTokens);

    /// Up to 50 unread messages, or an empty list if there are none.
    ///
    /// # Errors
    /// Returns [Error::MissingCredentials] if no credentials have been set.
    async fn list_unread(&self, user_id: &str) -> Result<Vec<MessageRef>, Error>;

    /// Remove the unread label from a message.
    ///
    /// # Errors
    /// Returns [Error::MissingCredentials] if no credentials have been set.
    async fn mark_read(&self, user_id: &str, message_id: &str) -> Result<(), Error>;
}
