//! The API endpoints URIs.

/// Lists the unread messages in a user's mailbox.
pub const GMAIL_UNREAD: &str = "/api/gmail/unread";
/// Starts the OAuth flow for a user's mailbox.
pub const EMAIL_AUTH: &str = "/api/email/auth";
/// Receives the authorization code at the end of the OAuth flow.
pub const EMAIL_CALLBACK: &str = "/api/email/callback";
