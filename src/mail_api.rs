//! The HTTP handlers for connecting a user's Gmail account and reading their unread mail.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState, Collection, Error, FieldErrors, MessageRef, OAuthTokens,
    sync::{parse, to_fields},
};

/// The Gmail user ID that refers to the owner of the current credentials.
const AUTHENTICATED_GMAIL_USER: &str = "me";

/// The query string for [get_unread_messages].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadQuery {
    /// The ID of the family ledger user whose stored tokens should be used.
    pub user_id: Option<String>,
}

/// List the user's unread messages.
///
/// Tokens previously stored for the user are loaded as the provider's credentials first. A user
/// without stored tokens gets [Error::MissingCredentials], never another user's mail.
pub async fn get_unread_messages(
    State(state): State<AppState>,
    Query(query): Query<UnreadQuery>,
) -> Result<Json<Vec<MessageRef>>, Error> {
    let user_id = query
        .user_id
        .filter(|user_id| !user_id.trim().is_empty())
        .ok_or(Error::MissingUserId)?;

    let Some(document) = state.documents.get(Collection::GmailTokens, &user_id).await? else {
        tracing::debug!("no stored mail tokens for user {user_id}");
        return Err(Error::MissingCredentials);
    };
    let tokens: OAuthTokens = parse(Collection::GmailTokens, &document)?;
    state.mail.set_credentials(tokens).await;

    let messages = state.mail.list_unread(AUTHENTICATED_GMAIL_USER).await?;

    Ok(Json(messages))
}

/// Create the consent URL for the user in the request body.
///
/// The body is either `{"user": {...}}` or the user object itself, and the user is identified
/// by its `uid` or `id` field. The user ID is passed through the OAuth flow as the state.
pub async fn post_email_auth(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, Error> {
    let user_id = user_id_from_body(&body).ok_or_else(|| {
        let mut errors = FieldErrors::new();
        errors.insert("user", "A user ID is required");
        Error::InvalidForm(errors)
    })?;

    let auth_url = state.mail.generate_auth_url(user_id)?;

    Ok(Json(json!({ "authUrl": auth_url })))
}

fn user_id_from_body(body: &Value) -> Option<&str> {
    let user = body.get("user").unwrap_or(body);

    ["uid", "id"]
        .into_iter()
        .find_map(|key| user.get(key).and_then(Value::as_str))
        .filter(|user_id| !user_id.trim().is_empty())
}

/// The body sent to [post_email_callback] once the user has given consent.
#[derive(Debug, Deserialize)]
pub struct CallbackBody {
    /// The authorization code.
    pub code: Option<String>,
    /// The state given to the consent page, i.e., the user ID.
    pub state: Option<String>,
}

/// Exchange the authorization code for tokens and store them under the user's ID.
pub async fn post_email_callback(
    State(state): State<AppState>,
    Json(body): Json<CallbackBody>,
) -> Result<Response, Error> {
    let mut errors = FieldErrors::new();
    let code = body.code.filter(|code| !code.is_empty());
    let user_id = body.state.filter(|user_id| !user_id.trim().is_empty());
    if code.is_none() {
        errors.insert("code", "An authorization code is required");
    }
    if user_id.is_none() {
        errors.insert("state", "The state must be the user ID");
    }
    let (Some(code), Some(user_id)) = (code, user_id) else {
        return Err(Error::InvalidForm(errors));
    };

    let tokens = state.mail.exchange_code(&code).await?;
    state
        .documents
        .set(Collection::GmailTokens, &user_id, to_fields(&tokens)?)
        .await?;
    tracing::info!("stored mail tokens for user {user_id}");

    Ok(StatusCode::NO_CONTENT.into_response())
}
