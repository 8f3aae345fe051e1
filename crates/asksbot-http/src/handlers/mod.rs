//! Route handlers.
//!
//! Each handler is a thin adapter that:
//! - decodes and validates the request
//! - calls into `asksbot-core` (reconciler or inbound handler)
//! - maps the outcome to a status code + JSON body

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

mod events;
mod opportunities;

pub use events::slack_events;
pub use opportunities::{
    comment_opportunities, CommentOpportunitiesRequest, CommentOpportunitiesResponse, ResultEntry,
};

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// `{"detail": ...}` error body, the shape every failing route returns.
pub(crate) fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}
