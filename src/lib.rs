//! Flashcard decks, subscriptions and spaced review progress.
//!
//! Components work against a borrowed SQLite connection and hold no state of
//! their own; [`api`] exposes them over HTTP.

pub mod accounts;
pub mod api;
pub mod cards;
pub mod config;
pub mod decks;
pub mod error;
pub mod progress;
pub mod storage;
pub mod subscriptions;

pub use config::Config;
pub use error::{Result, ServiceError};
pub use storage::Database;

/// Bind the configured address and serve the HTTP API until shutdown
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let db = config.open_database()?;
    log::info!("Using database {:?}", db.path());

    let address = config.listen_address();
    let app = api::router(api::AppState::new(db, config));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutting down");
        })
        .await?;
    Ok(())
}
