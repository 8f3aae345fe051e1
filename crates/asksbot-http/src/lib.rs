//! HTTP command surface (axum).
//!
//! Exposes the reconciliation engine as `POST /comment_opportunities` and
//! feeds Slack Events API deliveries into the inbound handler.

pub mod handlers;
pub mod router;

pub use router::{router, serve, AppState};
