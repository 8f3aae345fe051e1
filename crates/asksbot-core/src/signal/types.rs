use serde::Serialize;

use crate::domain::{ApiUserId, ReportId};

/// Signal type sent for every chat-originated signal.
pub const SIGNAL_TYPE_ASK: &str = "Ask";

/// Body of `POST /signal/create`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewSignal {
    pub signal: String,
    pub user_id: i64,
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl NewSignal {
    pub fn ask(text: &str, user: ApiUserId, source: &str) -> Self {
        Self {
            signal: text.to_string(),
            user_id: user.0,
            source: source.to_string(),
            kind: SIGNAL_TYPE_ASK.to_string(),
        }
    }
}

/// Body of `POST /signal/comment`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewComment {
    pub report_id: i64,
    pub comment: String,
    pub user_id: i64,
}

impl NewComment {
    pub fn new(report_id: ReportId, comment: &str, user: ApiUserId) -> Self {
        Self {
            report_id: report_id.0,
            comment: comment.to_string(),
            user_id: user.0,
        }
    }
}

/// A failed call against the signal API, as data.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignalApiError {
    #[error("signal api request failed: {0}")]
    Transport(String),

    #[error("signal api returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("signal api response malformed ({reason}): {body}")]
    Malformed { body: String, reason: String },
}

impl SignalApiError {
    /// Raw response body, when the API produced one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            SignalApiError::Transport(_) => None,
            SignalApiError::Status { body, .. } | SignalApiError::Malformed { body, .. } => {
                Some(body.as_str())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_signal_serializes_with_type_field() {
        let body = serde_json::to_value(NewSignal::ask("Need help", ApiUserId(5), "chat")).unwrap();
        assert_eq!(
            body,
            json!({"signal": "Need help", "user_id": 5, "source": "chat", "type": "Ask"})
        );
    }

    #[test]
    fn raw_response_only_for_answered_calls() {
        assert_eq!(SignalApiError::Transport("timeout".into()).raw_response(), None);
        let e = SignalApiError::Status {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(e.raw_response(), Some("boom"));
    }
}
