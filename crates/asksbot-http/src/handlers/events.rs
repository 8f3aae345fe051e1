use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use asksbot_slack::events::{EventAck, EventHeaders, EventRejection};

use crate::handlers::detail;
use crate::router::AppState;

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Slack Events API endpoint.
///
/// Slack expects an answer within 3 seconds, so messages are handed to the
/// inbound handler on a background task and acknowledged immediately.
pub async fn slack_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let event_headers = EventHeaders {
        timestamp: header_str(&headers, "x-slack-request-timestamp"),
        signature: header_str(&headers, "x-slack-signature"),
        retry_num: header_str(&headers, "x-slack-retry-num"),
    };

    match state
        .events
        .accept(&event_headers, &body, chrono::Utc::now().timestamp())
    {
        Ok(EventAck::Challenge(challenge)) => {
            Json(json!({ "challenge": challenge })).into_response()
        }
        Ok(EventAck::Dispatch(msg)) => {
            let inbound = state.inbound.clone();
            tokio::spawn(async move {
                inbound.handle(msg).await;
            });
            StatusCode::OK.into_response()
        }
        Ok(EventAck::Ignored(reason)) => {
            tracing::debug!(reason, "slack event ignored");
            StatusCode::OK.into_response()
        }
        Err(EventRejection::Unauthorized(e)) => {
            tracing::warn!(error = %e, "rejected slack event request");
            StatusCode::UNAUTHORIZED.into_response()
        }
        Err(e @ EventRejection::Malformed(_)) => {
            tracing::warn!(error = %e, "malformed slack event request");
            detail(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}
