use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;

use asksbot_core::{inbound::InboundHandler, reconcile::Reconciler};
use asksbot_slack::events::EventsEndpoint;

use crate::handlers;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
    pub inbound: Arc<InboundHandler>,
    pub events: Arc<EventsEndpoint>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/comment_opportunities",
            post(handlers::comment_opportunities),
        )
        .route("/slack/events", post(handlers::slack_events))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "http server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutdown requested");
        })
        .await?;
    Ok(())
}
