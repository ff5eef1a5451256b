//! Cashflow is a web app for tracking personal income and expenses.
//!
//! The core of the application is the dashboard: the raw transaction ledger
//! is reduced into period totals, monthly series, category breakdowns and
//! running-balance series, memoized in a per-user TTL cache that every
//! ledger write invalidates.
//!
//! This library provides a REST API that serves the dashboard page and JSON
//! endpoints for the ledger and chart data.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod auth;
pub mod category;
pub mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod error;
mod html;
mod routing;
mod state;
mod timezone;
pub mod transaction;
mod user;

pub use database_id::{CategoryId, DatabaseId, TransactionId, UserId};
pub use db::initialize;
pub use error::Error;
pub use routing::build_router;
pub use state::AppState;
pub use user::{User, create_user, get_user};

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down
/// gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
