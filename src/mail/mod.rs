//! Reading a user's unread mail through OAuth.

mod google;
mod provider;

pub use google::GoogleMailClient;
pub use provider::{MailProvider, MessageRef, OAuthTokens};
