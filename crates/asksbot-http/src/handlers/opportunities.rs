use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use asksbot_core::{
    domain::ReportId,
    reconcile::{ReconcileEntry, ReconcileRequest},
};

use crate::handlers::detail;
use crate::router::AppState;

#[derive(Clone, Debug, Deserialize)]
pub struct CommentOpportunitiesRequest {
    pub report_ids: Vec<i64>,
    pub opportunity: String,
}

/// Response body of `POST /comment_opportunities`.
///
/// `results` holds one entry per thread that announced a requested report id.
/// Requested ids that were never announced are simply absent; callers must
/// diff `report_id`s against their request to find them.
#[derive(Clone, Debug, Serialize)]
pub struct CommentOpportunitiesResponse {
    pub results: Vec<ResultEntry>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ResultEntry {
    pub report_id: i64,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_ts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ReconcileEntry> for ResultEntry {
    fn from(e: ReconcileEntry) -> Self {
        Self {
            report_id: e.report_id.0,
            status: e.status.as_str(),
            comment_id: e.comment_id.map(|c| c.0),
            channel: e.channel.map(|c| c.0),
            slack_ts: e.thread_ts.map(|t| t.0),
            error: e.error,
        }
    }
}

pub async fn comment_opportunities(
    State(state): State<AppState>,
    payload: Result<Json<CommentOpportunitiesRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            return detail(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text());
        }
    };
    if req.report_ids.is_empty() {
        return detail(
            StatusCode::UNPROCESSABLE_ENTITY,
            "report_ids must contain at least one id",
        );
    }

    let request = ReconcileRequest::new(req.report_ids.into_iter().map(ReportId), req.opportunity);
    tracing::info!(
        report_ids = request.targets.len(),
        "comment_opportunities requested"
    );

    // Run on its own task so a panic inside the batch becomes a 500 instead of
    // tearing down the connection.
    let reconciler = state.reconciler.clone();
    let outcome = tokio::spawn(async move { reconciler.reconcile(&request).await }).await;

    match outcome {
        Ok(entries) => Json(CommentOpportunitiesResponse {
            results: entries.into_iter().map(ResultEntry::from).collect(),
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "reconciliation task failed");
            detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
