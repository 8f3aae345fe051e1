//! Slack adapter (Web API over reqwest).
//!
//! This crate implements the `asksbot-core` ChatTransport port and parses
//! Events API deliveries into core inbound messages.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

pub mod events;
pub mod signature;

use asksbot_core::{
    config::Config,
    domain::{ChannelId, MessageTs, ThreadRef},
    errors::Error,
    messaging::{
        port::ChatTransport,
        types::{ChatMessage, PostedMessage, RootMessage},
    },
    Result,
};

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Page size requested from every cursor-paginated listing.
const PAGE_LIMIT: &str = "200";
/// Maximum pages fetched from users.conversations (50 × 200 = 10,000 channels).
const MAX_CHANNEL_PAGES: usize = 50;
/// Maximum pages fetched from conversations.history per channel.
const MAX_HISTORY_PAGES: usize = 25;
/// Maximum pages fetched from conversations.replies per thread.
const MAX_REPLY_PAGES: usize = 10;

/// A message object as returned by conversations.history / conversations.replies.
#[derive(Clone, Debug, Deserialize)]
struct SlackMessage {
    ts: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    thread_ts: Option<String>,
    #[serde(default)]
    reply_count: u32,
}

impl SlackMessage {
    /// Top-level messages either have no thread_ts or start their own thread.
    fn is_root(&self) -> bool {
        self.thread_ts.as_deref().map_or(true, |t| t == self.ts)
    }

    fn into_chat_message(self) -> ChatMessage {
        ChatMessage {
            ts: MessageTs(self.ts),
            user: self.user,
            bot_id: self.bot_id,
            text: self.text,
        }
    }
}

#[derive(Clone)]
pub struct SlackTransport {
    bot_token: String,
    api_base: String,
    http: reqwest::Client,
}

impl SlackTransport {
    pub fn new(bot_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::with_api_base(bot_token, SLACK_API_BASE, timeout)
    }

    /// Point the transport at a different Web API root (used by tests).
    pub fn with_api_base(
        bot_token: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("slack client build failed: {e}")))?;
        Ok(Self {
            bot_token: bot_token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.slack_bot_token.clone(), cfg.slack_timeout)
    }

    fn map_err(method: &str, e: impl std::fmt::Display) -> Error {
        Error::Chat(format!("slack {method} failed: {e}"))
    }

    /// Slack answers HTTP 200 with `{"ok": false, "error": ...}` on API errors.
    async fn read(method: &str, resp: reqwest::Response) -> Result<Value> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Self::map_err(method, e))?;
        if !status.is_success() {
            return Err(Self::map_err(method, format!("{status}: {body}")));
        }

        let data: Value = serde_json::from_str(&body)
            .map_err(|e| Self::map_err(method, format!("response is not valid JSON: {e}")))?;
        if data.get("ok") != Some(&Value::Bool(true)) {
            let err = data
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("unknown");
            return Err(Self::map_err(method, err));
        }
        Ok(data)
    }

    async fn get(&self, method: &str, query: &[(&str, String)]) -> Result<Value> {
        let resp = self
            .http
            .get(format!("{}/{method}", self.api_base))
            .bearer_auth(&self.bot_token)
            .query(query)
            .send()
            .await
            .map_err(|e| Self::map_err(method, e))?;
        Self::read(method, resp).await
    }

    async fn post(&self, method: &str, body: &Value) -> Result<Value> {
        let resp = self
            .http
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(&self.bot_token)
            .json(body)
            .send()
            .await
            .map_err(|e| Self::map_err(method, e))?;
        Self::read(method, resp).await
    }

    /// Follow `response_metadata.next_cursor` and collect `items_key` from each page.
    async fn paginate(
        &self,
        method: &str,
        base_query: &[(&str, String)],
        items_key: &str,
        max_pages: usize,
    ) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 1..=max_pages {
            let mut query = base_query.to_vec();
            query.push(("limit", PAGE_LIMIT.to_string()));
            if let Some(next) = &cursor {
                query.push(("cursor", next.clone()));
            }

            let data = self.get(method, &query).await?;
            if let Some(arr) = data.get(items_key).and_then(|v| v.as_array()) {
                items.extend(arr.iter().cloned());
            }

            cursor = next_cursor(&data);
            if cursor.is_none() {
                return Ok(items);
            }
            if page == max_pages {
                tracing::warn!(
                    method,
                    pages = max_pages,
                    "slack listing reached page limit; results may be incomplete"
                );
            }
        }
        Ok(items)
    }

    async fn thread_replies(&self, channel: &ChannelId, root_ts: &str) -> Result<Vec<ChatMessage>> {
        let raw = self
            .paginate(
                "conversations.replies",
                &[("channel", channel.0.clone()), ("ts", root_ts.to_string())],
                "messages",
                MAX_REPLY_PAGES,
            )
            .await?;

        Ok(parse_messages(raw)
            .into_iter()
            .filter(|m| m.ts != root_ts)
            .map(SlackMessage::into_chat_message)
            .collect())
    }
}

#[async_trait]
impl ChatTransport for SlackTransport {
    async fn post_thread_reply(&self, thread: &ThreadRef, text: &str) -> Result<PostedMessage> {
        let body = json!({
            "channel": thread.channel.0,
            "thread_ts": thread.thread_ts.0,
            "text": text,
        });
        let data = self.post("chat.postMessage", &body).await?;

        let ts = data
            .get("ts")
            .and_then(|t| t.as_str())
            .ok_or_else(|| Self::map_err("chat.postMessage", "response has no ts"))?;
        let channel = data
            .get("channel")
            .and_then(|c| c.as_str())
            .map(|c| ChannelId(c.to_string()))
            .unwrap_or_else(|| thread.channel.clone());

        Ok(PostedMessage {
            channel,
            ts: MessageTs(ts.to_string()),
        })
    }

    async fn list_joined_channels(&self) -> Result<Vec<ChannelId>> {
        let raw = self
            .paginate(
                "users.conversations",
                &[
                    ("types", "public_channel,private_channel".to_string()),
                    ("exclude_archived", "true".to_string()),
                ],
                "channels",
                MAX_CHANNEL_PAGES,
            )
            .await?;

        let mut ids: Vec<ChannelId> = Vec::with_capacity(raw.len());
        for id in raw
            .iter()
            .filter_map(|c| c.get("id").and_then(|id| id.as_str()))
        {
            let id = ChannelId(id.to_string());
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    async fn channel_history(&self, channel: &ChannelId) -> Result<Vec<RootMessage>> {
        let raw = self
            .paginate(
                "conversations.history",
                &[("channel", channel.0.clone())],
                "messages",
                MAX_HISTORY_PAGES,
            )
            .await?;

        let mut roots = Vec::new();
        for msg in parse_messages(raw).into_iter().filter(SlackMessage::is_root) {
            let replies = if msg.reply_count > 0 {
                match self.thread_replies(channel, &msg.ts).await {
                    Ok(replies) => replies,
                    Err(e) => {
                        // One unreadable thread must not hide the rest of the channel.
                        tracing::warn!(
                            error = %e,
                            %channel,
                            ts = %msg.ts,
                            "failed to fetch thread replies"
                        );
                        Vec::new()
                    }
                }
            } else {
                Vec::new()
            };
            roots.push(RootMessage {
                message: msg.into_chat_message(),
                replies,
            });
        }
        Ok(roots)
    }
}

fn next_cursor(data: &Value) -> Option<String> {
    data.get("response_metadata")
        .and_then(|rm| rm.get("next_cursor"))
        .and_then(|c| c.as_str())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(ToOwned::to_owned)
}

/// Decode message objects, skipping ones that do not fit the expected shape.
fn parse_messages(raw: Vec<Value>) -> Vec<SlackMessage> {
    raw.into_iter()
        .filter_map(|v| match serde_json::from_value::<SlackMessage>(v) {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::debug!(error = %e, "skipping undecodable slack message");
                None
            }
        })
        .collect()
}
