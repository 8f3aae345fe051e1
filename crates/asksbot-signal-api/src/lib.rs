//! Signal-tracking API adapter (reqwest).
//!
//! Implements the `asksbot-core` SignalApi port over the REST API. Every
//! request carries the `access_token` header; failures are returned as values.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use asksbot_core::{
    config::Config,
    domain::{ApiUserId, ChatUserId, CommentId, OrgId, ReportId, TeamId},
    errors::Error,
    signal::{NewComment, NewSignal, SignalApi, SignalApiError},
    Result,
};

const API_KEY_HEADER: &str = "access_token";

type ApiResult<T> = std::result::Result<T, SignalApiError>;

#[derive(Clone, Debug)]
pub struct SignalApiClient {
    base_url: String,
    api_key: String,
    source: String,
    http: reqwest::Client,
}

impl SignalApiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        source: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("signal api client build failed: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            source: source.into(),
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            cfg.api_base_url.clone(),
            cfg.api_key.clone(),
            cfg.signal_source.clone(),
            cfg.api_timeout,
        )
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    async fn get_json(&self, endpoint: &str, query: &[(&str, &str)]) -> ApiResult<Value> {
        let resp = self
            .http
            .get(self.url(endpoint))
            .header(API_KEY_HEADER, &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| SignalApiError::Transport(format!("GET {endpoint}: {e}")))?;
        read_json(endpoint, resp).await
    }

    async fn post_json<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> ApiResult<Value> {
        let resp = self
            .http
            .post(self.url(endpoint))
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| SignalApiError::Transport(format!("POST {endpoint}: {e}")))?;
        read_json(endpoint, resp).await
    }

    /// Shared lookup path: any failure is logged and reads as "not registered".
    async fn lookup_id(&self, endpoint: &str, param: &str, value: &str, field: &str) -> Option<i64> {
        match self.get_json(endpoint, &[(param, value)]).await {
            Ok(v) => {
                let id = int_field(&v, field);
                if id.is_none() {
                    tracing::info!(endpoint, value, "no {field} in lookup response");
                }
                id
            }
            Err(e) => {
                tracing::warn!(error = %e, endpoint, value, "signal api lookup failed");
                None
            }
        }
    }
}

#[async_trait]
impl SignalApi for SignalApiClient {
    async fn resolve_org(&self, team: &TeamId) -> Option<OrgId> {
        self.lookup_id(
            "/customerorganization/chat",
            "chat_team_id",
            &team.0,
            "customer_organization_id",
        )
        .await
        .map(OrgId)
    }

    async fn resolve_user(&self, user: &ChatUserId) -> Option<ApiUserId> {
        self.lookup_id("/user/chat", "chat_user_id", &user.0, "user_id")
            .await
            .map(ApiUserId)
    }

    async fn create_signal(&self, text: &str, user: ApiUserId) -> ApiResult<ReportId> {
        let body = NewSignal::ask(text, user, &self.source);
        let v = self.post_json("/signal/create", &body).await?;
        int_field(&v, "report_id")
            .map(ReportId)
            .ok_or_else(|| SignalApiError::Malformed {
                body: v.to_string(),
                reason: "missing report_id".to_string(),
            })
    }

    async fn create_comment(
        &self,
        report_id: ReportId,
        comment: &str,
        user: ApiUserId,
    ) -> ApiResult<CommentId> {
        let body = NewComment::new(report_id, comment, user);
        let v = self.post_json("/signal/comment", &body).await?;
        comment_id(&v).ok_or_else(|| SignalApiError::Malformed {
            body: v.to_string(),
            reason: "missing comment identifier".to_string(),
        })
    }
}

async fn read_json(endpoint: &str, resp: reqwest::Response) -> ApiResult<Value> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| SignalApiError::Transport(format!("{endpoint}: reading body: {e}")))?;

    if !status.is_success() {
        return Err(SignalApiError::Status {
            status: status.as_u16(),
            body: body.chars().take(500).collect(),
        });
    }

    serde_json::from_str(&body).map_err(|e| SignalApiError::Malformed {
        body: body.chars().take(500).collect(),
        reason: e.to_string(),
    })
}

/// Integer field that the API may encode as a number or a numeric string.
fn int_field(v: &Value, key: &str) -> Option<i64> {
    match v.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Comment identifier: `comment_id`, then `id`, then a bare scalar body.
fn comment_id(v: &Value) -> Option<CommentId> {
    let scalar = |v: &Value| match v {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    };

    match v {
        Value::Object(map) => map
            .get("comment_id")
            .and_then(scalar)
            .or_else(|| map.get("id").and_then(scalar)),
        other => scalar(other),
    }
    .map(CommentId)
}
