//! A [MailProvider] backed by the Gmail REST API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use url::Url;

use crate::{
    Error, GoogleOAuthConfig,
    mail::{MailProvider, MessageRef, OAuthTokens},
};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GMAIL_API_URL: &str = "https://gmail.googleapis.com/gmail/v1";

/// The scopes needed to list messages and mark them as read.
pub const GMAIL_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.modify",
];

const UNREAD_QUERY: &str = "is:unread";
const MAX_UNREAD_RESULTS: u32 = 50;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

impl TokenResponse {
    fn into_tokens(self, now: OffsetDateTime) -> OAuthTokens {
        let now_millis = (now.unix_timestamp_nanos() / 1_000_000) as i64;

        OAuthTokens {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            scope: self.scope,
            expiry_date: self
                .expires_in
                .map(|seconds| now_millis + seconds * 1000),
            token_type: self.token_type,
            id_token: self.id_token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListMessagesResponse {
    #[serde(default)]
    messages: Option<Vec<MessageRef>>,
}

/// Talks to Google's OAuth and Gmail endpoints with one set of credentials at a time.
#[derive(Debug)]
pub struct GoogleMailClient {
    http: Client,
    config: GoogleOAuthConfig,
    credentials: RwLock<Option<OAuthTokens>>,
}

impl GoogleMailClient {
    /// Create a client for the OAuth app described by `config`.
    pub fn new(config: GoogleOAuthConfig) -> Self {
        Self {
            http: Client::new(),
            config,
            credentials: RwLock::new(None),
        }
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, Error> {
        let credentials = self.credentials.read().await;
        let access_token = credentials
            .as_ref()
            .and_then(|tokens| tokens.access_token.as_deref())
            .ok_or(Error::MissingCredentials)?;

        Ok(request.bearer_auth(access_token))
    }

    fn messages_url(&self, user_id: &str) -> String {
        format!("{GMAIL_API_URL}/users/{user_id}/messages")
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, Error> {
    let response = request
        .send()
        .await
        .map_err(|error| Error::MailProviderError(error.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!("mail provider responded with {status}: {body}");
        return Err(Error::MailProviderError(format!(
            "request failed with status {status}"
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|error| Error::MailProviderError(error.to_string()))
}

#[async_trait]
impl MailProvider for GoogleMailClient {
    fn generate_auth_url(&self, state: &str) -> Result<String, Error> {
        let scope = GMAIL_SCOPES.join(" ");
        let url = Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("access_type", "offline"),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|error| Error::MailProviderError(error.to_string()))?;

        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthTokens, Error> {
        let request = self.http.post(TOKEN_URL).form(&[
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ]);

        let response: TokenResponse = send(request).await?;
        let tokens = response.into_tokens(OffsetDateTime::now_utc());
        tracing::debug!("exchanged authorization code for mail credentials");

        self.set_credentials(tokens.clone()).await;

        Ok(tokens)
    }

    async fn set_credentials(&self, tokens: OAuthTokens) {
        *self.credentials.write().await = Some(tokens);
    }

    async fn list_unread(&self, user_id: &str) -> Result<Vec<MessageRef>, Error> {
        let max_results = MAX_UNREAD_RESULTS.to_string();
        let request = self.http.get(self.messages_url(user_id)).query(&[
            ("q", UNREAD_QUERY),
            ("maxResults", max_results.as_str()),
        ]);
        let request = self.authorized(request).await?;

        let response: ListMessagesResponse = send(request).await?;

        Ok(response.messages.unwrap_or_default())
    }

    async fn mark_read(&self, user_id: &str, message_id: &str) -> Result<(), Error> {
        let url = format!("{}/{message_id}/modify", self.messages_url(user_id));
        let request = self
            .http
            .post(url)
            .json(&json!({ "removeLabelIds": ["UNREAD"] }));
        let request = self.authorized(request).await?;

        // The modified message is returned, but only success matters here.
        send::<serde_json::Value>(request).await?;

        Ok(())
    }
}
