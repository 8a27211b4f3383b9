//! Application router configuration.

use axum::{
    Router,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    middleware,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{
    AppState, endpoints,
    logging::logging_middleware,
    mail_api::{get_unread_messages, post_email_auth, post_email_callback},
};

/// Return a router with all the app's routes.
///
/// Browsers may call the API with credentials from `allowed_origins`. Origins that are not
/// valid header values are skipped.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route(endpoints::GMAIL_UNREAD, get(get_unread_messages))
        .route(endpoints::EMAIL_AUTH, post(post_email_auth))
        .route(endpoints::EMAIL_CALLBACK, post(post_email_callback))
        .layer(middleware::from_fn(logging_middleware))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(origin) => Some(origin),
            Err(error) => {
                tracing::warn!("ignoring invalid allowed origin {origin:?}: {error}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
}

#[cfg(test)]
mod routing_tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{
        AppState, Error, MailProvider, MessageRef, OAuthTokens, SqliteDocumentStore,
        build_router, endpoints,
    };

    struct NoMail;

    #[async_trait]
    impl MailProvider for NoMail {
        fn generate_auth_url(&self, state: &str) -> Result<String, Error> {
            Ok(format!("https://auth.example/?state={state}"))
        }

        async fn exchange_code(&self, _code: &str) -> Result<OAuthTokens, Error> {
            Err(Error::MissingCredentials)
        }

        async fn set_credentials(&self, _tokens: OAuthTokens) {}

        async fn list_unread(&self, _user_id: &str) -> Result<Vec<MessageRef>, Error> {
            Ok(Vec::new())
        }

        async fn mark_read(&self, _user_id: &str, _message_id: &str) -> Result<(), Error> {
            Ok(())
        }
    }

    fn get_test_server() -> TestServer {
        let documents = SqliteDocumentStore::new(Connection::open_in_memory().unwrap())
            .expect("Could not create document store");
        let state = AppState::new(Arc::new(documents), Arc::new(NoMail));
        let app = build_router(state, &["http://localhost:5173".to_owned()]);

        TestServer::new(app)
    }

    #[tokio::test]
    async fn allowed_origin_gets_credentialed_cors_headers() {
        let server = get_test_server();

        let response = server
            .get(endpoints::GMAIL_UNREAD)
            .add_query_param("userId", "user-1")
            .add_header("Origin", "http://localhost:5173")
            .await;

        assert_eq!(
            response.header("access-control-allow-origin"),
            "http://localhost:5173"
        );
        assert_eq!(
            response.header("access-control-allow-credentials"),
            "true"
        );
    }

    #[tokio::test]
    async fn other_origins_get_no_cors_headers() {
        let server = get_test_server();

        let response = server
            .get(endpoints::GMAIL_UNREAD)
            .add_query_param("userId", "user-1")
            .add_header("Origin", "https://evil.example")
            .await;

        assert!(
            response
                .headers()
                .get("access-control-allow-origin")
                .is_none()
        );
    }
}
