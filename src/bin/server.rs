use std::{fs::OpenOptions, net::SocketAddr, path::Path, process::exit, sync::Arc};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use family_ledger::{
    AppState, GoogleMailClient, ServerConfig, SqliteDocumentStore, build_router, graceful_shutdown,
};

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    if let Err(error) = setup_logging(&config.log_path) {
        eprintln!("Could not open the log file {:?}: {error}", config.log_path);
        exit(1);
    }

    let connection = match Connection::open(&config.db_path) {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not open the database at {}: {error}", config.db_path);
            exit(1);
        }
    };

    let documents = match SqliteDocumentStore::new(connection) {
        Ok(documents) => documents,
        Err(error) => {
            tracing::error!("Could not initialize the database: {error}");
            exit(1);
        }
    };

    let mail = GoogleMailClient::new(config.google_oauth());
    let state = AppState::new(Arc::new(documents), Arc::new(mail));

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(state, &config.allowed_origins));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("HTTP server listening on {}", addr);
    if let Err(error) = axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        tracing::error!("Server error: {error}");
        exit(1);
    }
}

fn setup_logging(log_path: &Path) -> std::io::Result<()> {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();

    Ok(())
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are logged by `Error::into_response`.
        .on_failure(());

    router.layer(tracing_layer)
}
