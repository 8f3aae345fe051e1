//! Slack Events API deliveries.
//!
//! Turns a raw `/slack/events` request into either a URL-verification answer,
//! an inbound message for the core handler, or an acknowledged no-op.

use serde_json::Value;

use asksbot_core::{
    domain::{ChannelId, ChatUserId, MessageTs, TeamId},
    messaging::types::InboundMessage,
};

use crate::signature::{self, SignatureError};

/// Header values the endpoint cares about.
#[derive(Clone, Debug, Default)]
pub struct EventHeaders {
    pub timestamp: Option<String>,
    pub signature: Option<String>,
    /// Present when Slack is redelivering an event it considers unacknowledged.
    pub retry_num: Option<String>,
}

/// What the HTTP layer should do with a delivery.
#[derive(Clone, Debug)]
pub enum EventAck {
    /// Answer `{"challenge": ...}`.
    Challenge(String),
    /// Acknowledge and hand the message to the inbound handler.
    Dispatch(InboundMessage),
    /// Acknowledge without doing anything.
    Ignored(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum EventRejection {
    #[error("signature check failed: {0}")]
    Unauthorized(#[from] SignatureError),
    #[error("malformed event payload: {0}")]
    Malformed(String),
}

/// Events API endpoint logic, independent of the HTTP framework.
#[derive(Clone, Debug)]
pub struct EventsEndpoint {
    signing_secret: Option<String>,
    bot_user: ChatUserId,
}

impl EventsEndpoint {
    /// `signing_secret: None` disables request verification.
    pub fn new(signing_secret: Option<String>, bot_user: ChatUserId) -> Self {
        Self {
            signing_secret,
            bot_user,
        }
    }

    pub fn accept(
        &self,
        headers: &EventHeaders,
        body: &[u8],
        now_unix: i64,
    ) -> Result<EventAck, EventRejection> {
        if let Some(secret) = &self.signing_secret {
            signature::verify(
                secret,
                headers.timestamp.as_deref().unwrap_or(""),
                body,
                headers.signature.as_deref().unwrap_or(""),
                now_unix,
            )?;
        }

        let payload: Value = serde_json::from_slice(body)
            .map_err(|e| EventRejection::Malformed(e.to_string()))?;

        match payload.get("type").and_then(|t| t.as_str()) {
            Some("url_verification") => {
                let challenge = payload
                    .get("challenge")
                    .and_then(|c| c.as_str())
                    .ok_or_else(|| EventRejection::Malformed("missing challenge".to_string()))?;
                Ok(EventAck::Challenge(challenge.to_string()))
            }
            Some("event_callback") => {
                // The first delivery already created the signal.
                if headers.retry_num.is_some() {
                    return Ok(EventAck::Ignored("retry"));
                }
                Ok(self.classify(&payload))
            }
            _ => Ok(EventAck::Ignored("unsupported payload type")),
        }
    }

    fn classify(&self, payload: &Value) -> EventAck {
        let Some(event) = payload.get("event") else {
            return EventAck::Ignored("no event");
        };
        if event.get("type").and_then(|t| t.as_str()) != Some("message") {
            return EventAck::Ignored("not a message event");
        }
        // message_changed, message_deleted, bot_message, channel_join, ...
        if event.get("subtype").is_some() {
            return EventAck::Ignored("message subtype");
        }
        if event.get("bot_id").is_some() {
            return EventAck::Ignored("bot message");
        }

        let str_field = |v: &Value, key: &str| {
            v.get(key)
                .and_then(|s| s.as_str())
                .map(str::to_string)
        };

        let author = str_field(event, "user");
        if author.as_deref() == Some(self.bot_user.0.as_str()) {
            return EventAck::Ignored("own message");
        }

        let ts = str_field(event, "ts").unwrap_or_default();
        if let Some(thread_ts) = str_field(event, "thread_ts") {
            if thread_ts != ts {
                return EventAck::Ignored("thread reply");
            }
        }

        let team = str_field(event, "team").or_else(|| str_field(payload, "team_id"));

        EventAck::Dispatch(InboundMessage {
            author: author.map(ChatUserId),
            channel: str_field(event, "channel").map(ChannelId),
            text: str_field(event, "text"),
            team: team.map(TeamId),
            ts: MessageTs(ts),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn endpoint() -> EventsEndpoint {
        EventsEndpoint::new(None, ChatUserId("UBOT".to_string()))
    }

    fn callback(event: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "type": "event_callback",
            "team_id": "T-OUTER",
            "event": event
        }))
        .unwrap()
    }

    fn accept(body: &[u8]) -> EventAck {
        endpoint()
            .accept(&EventHeaders::default(), body, 0)
            .unwrap()
    }

    #[test]
    fn answers_url_verification() {
        let body = br#"{"type":"url_verification","challenge":"abc123"}"#;
        assert!(matches!(accept(body), EventAck::Challenge(c) if c == "abc123"));
    }

    #[test]
    fn dispatches_user_message() {
        let body = callback(json!({
            "type": "message",
            "user": "U1",
            "channel": "C1",
            "text": "Need help",
            "team": "T1",
            "ts": "1.0"
        }));
        let EventAck::Dispatch(msg) = accept(&body) else {
            panic!("expected dispatch");
        };
        assert_eq!(msg.author, Some(ChatUserId("U1".into())));
        assert_eq!(msg.channel, Some(ChannelId("C1".into())));
        assert_eq!(msg.text.as_deref(), Some("Need help"));
        assert_eq!(msg.team, Some(TeamId("T1".into())));
        assert_eq!(msg.ts, MessageTs("1.0".into()));
    }

    #[test]
    fn team_falls_back_to_envelope() {
        let body = callback(json!({"type": "message", "user": "U1", "channel": "C1", "text": "x", "ts": "1.0"}));
        let EventAck::Dispatch(msg) = accept(&body) else {
            panic!("expected dispatch");
        };
        assert_eq!(msg.team, Some(TeamId("T-OUTER".into())));
    }

    #[test]
    fn missing_fields_still_dispatch_for_validation() {
        let body = callback(json!({"type": "message", "channel": "C1", "ts": "1.0"}));
        let EventAck::Dispatch(msg) = accept(&body) else {
            panic!("expected dispatch");
        };
        assert!(msg.author.is_none());
        assert!(msg.text.is_none());
    }

    #[test]
    fn ignores_bot_own_subtype_and_thread_messages() {
        for event in [
            json!({"type": "message", "bot_id": "B1", "channel": "C1", "text": "Signal reported with ID: 1", "ts": "2.0"}),
            json!({"type": "message", "user": "UBOT", "channel": "C1", "text": "hi", "ts": "2.0"}),
            json!({"type": "message", "subtype": "message_changed", "channel": "C1", "ts": "2.0"}),
            json!({"type": "message", "user": "U1", "channel": "C1", "text": "hi", "ts": "2.1", "thread_ts": "2.0"}),
            json!({"type": "reaction_added", "user": "U1"}),
        ] {
            assert!(matches!(accept(&callback(event)), EventAck::Ignored(_)));
        }
    }

    #[test]
    fn retries_are_acknowledged_without_dispatch() {
        let body = callback(json!({"type": "message", "user": "U1", "channel": "C1", "text": "x", "team": "T1", "ts": "1.0"}));
        let headers = EventHeaders {
            retry_num: Some("1".to_string()),
            ..Default::default()
        };
        let ack = endpoint().accept(&headers, &body, 0).unwrap();
        assert!(matches!(ack, EventAck::Ignored("retry")));
    }

    #[test]
    fn enforces_signature_when_secret_configured() {
        let secret = "s3cret";
        let ep = EventsEndpoint::new(Some(secret.to_string()), ChatUserId("UBOT".into()));
        let body = br#"{"type":"url_verification","challenge":"c"}"#;

        let good = EventHeaders {
            timestamp: Some("1000".to_string()),
            signature: Some(signature::sign(secret, "1000", body)),
            retry_num: None,
        };
        assert!(matches!(ep.accept(&good, body, 1000), Ok(EventAck::Challenge(_))));

        let bad = EventHeaders {
            signature: Some("v0=00".to_string()),
            ..good.clone()
        };
        assert!(matches!(
            ep.accept(&bad, body, 1000),
            Err(EventRejection::Unauthorized(SignatureError::Mismatch))
        ));
    }

    #[test]
    fn rejects_non_json_body() {
        let err = endpoint()
            .accept(&EventHeaders::default(), b"not json", 0)
            .unwrap_err();
        assert!(matches!(err, EventRejection::Malformed(_)));
    }
}
