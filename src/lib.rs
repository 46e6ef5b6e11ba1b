//! Club document-approval tracker with in-app, live and Web Push notifications.

pub mod adapters;
pub mod app;
mod assets;
pub mod auth;
pub mod config;
pub mod db;
pub mod documents;
pub mod error;
mod fanout;
pub mod inbox;
pub mod notifications;
pub mod ports;
pub mod push;
pub mod realtime;
pub mod seed;
pub mod state;
mod templates;
pub mod types;
mod uploads;

pub use push::vapid::{VapidCredentials, generate_vapid_credentials};

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal::ctrl_c;

/// How long open connections (live streams included) may linger after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Db(#[from] db::DbError),
    #[error(transparent)]
    Seed(#[from] seed::SeedError),
    #[error("invalid auth configuration: {0}")]
    Auth(#[from] auth::AuthError),
}

pub async fn serve(addr: SocketAddr, config: config::AppConfig) -> Result<(), ServeError> {
    let store = db::Store::open(&config.root)?;
    if let Some(path) = config.seed.as_deref() {
        let seed = seed::load_seed(path)?;
        let created = seed::apply_seed(&store, &seed)?;
        tracing::info!(created, path = %path.display(), "applied seed file");
    }

    let (queue, dispatcher) = push::start_dispatcher(&config, store.clone());
    let state = state::AppState::new(config, store, queue)?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{addr}");

    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = async move {
        axum::serve(listener, app::app(state))
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                let _ = signalled_tx.send(());
            })
            .await
    };
    let grace = async move {
        if signalled_rx.await.is_ok() {
            tokio::time::sleep(SHUTDOWN_GRACE).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = server => result?,
        _ = grace => tracing::warn!("connections still open after shutdown grace period"),
    }

    if let Some(handle) = dispatcher {
        handle.abort();
    }
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
        tracing::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(err) => {
                tracing::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
