//! HTTP adapter over the core components
//!
//! Handlers resolve the bearer credential, then run one core operation on the
//! blocking pool against a fresh connection, bounded by the request timeout.

mod accounts;
mod auth;
mod cards;
mod decks;
mod error;
mod extract;
mod progress;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{routing::get, Router};
use rusqlite::Connection;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;

pub use auth::Credential;

use crate::config::Config;
use crate::error::{Result, ServiceError};
use crate::storage::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Run `op` on a fresh connection in the blocking pool.
    ///
    /// When the request deadline passes, the in-flight SQLite call is
    /// interrupted and the caller gets `Cancelled`. From then on every commit
    /// on that connection is rolled back.
    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let cancelled = Arc::new(AtomicBool::new(false));
        let (handle_tx, handle_rx) = oneshot::channel();

        let flag = Arc::clone(&cancelled);
        let task = tokio::task::spawn_blocking(move || {
            let conn = db.connect()?;
            // returning true turns the commit into a rollback
            conn.commit_hook(Some(move || flag.load(Ordering::SeqCst)));
            let _ = handle_tx.send(conn.get_interrupt_handle());
            op(&conn)
        });

        match tokio::time::timeout(self.config.request_timeout(), task).await {
            Ok(joined) => joined.map_err(|e| ServiceError::Internal(format!("worker failed: {}", e)))?,
            Err(_) => {
                cancelled.store(true, Ordering::SeqCst);
                if let Ok(handle) = handle_rx.await {
                    handle.interrupt();
                }
                log::warn!(
                    "Request exceeded {}ms deadline, interrupted",
                    self.config.request_timeout_ms
                );
                Err(ServiceError::Cancelled)
            }
        }
    }

    pub(crate) fn token_ttl(&self) -> chrono::Duration {
        self.config.token_ttl()
    }
}

async fn ping() -> &'static str {
    "pong"
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .merge(accounts::routes())
        .merge(decks::routes())
        .merge(cards::routes())
        .merge(progress::routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
