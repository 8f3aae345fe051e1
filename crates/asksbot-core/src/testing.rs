//! In-memory fakes for the ports, shared by the unit tests in this crate.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    domain::{
        ApiUserId, ChannelId, ChatUserId, CommentId, MessageTs, OrgId, ReportId, TeamId, ThreadRef,
    },
    errors::Error,
    messaging::{
        port::ChatTransport,
        types::{ChatMessage, PostedMessage, RootMessage},
    },
    signal::{SignalApi, SignalApiError},
    Result,
};

/// Chat transport backed by a fixed set of channels.
#[derive(Default)]
pub struct FakeChat {
    channels: Mutex<Vec<(ChannelId, Vec<RootMessage>)>>,
    broken_history: Mutex<HashSet<ChannelId>>,
    fail_listing: Mutex<bool>,
    fail_posts: Mutex<bool>,
    posts: Mutex<Vec<(ThreadRef, String)>>,
    next_ts: Mutex<u64>,
}

impl FakeChat {
    pub fn add_channel(&self, id: &str, roots: Vec<RootMessage>) {
        self.channels
            .lock()
            .unwrap()
            .push((ChannelId(id.to_string()), roots));
    }

    pub fn break_history(&self, id: &str) {
        self.broken_history
            .lock()
            .unwrap()
            .insert(ChannelId(id.to_string()));
    }

    pub fn fail_listing(&self) {
        *self.fail_listing.lock().unwrap() = true;
    }

    pub fn fail_posts(&self) {
        *self.fail_posts.lock().unwrap() = true;
    }

    pub fn posts(&self) -> Vec<(ThreadRef, String)> {
        self.posts.lock().unwrap().clone()
    }

    pub fn post_texts(&self) -> Vec<String> {
        self.posts().into_iter().map(|(_, t)| t).collect()
    }
}

#[async_trait]
impl ChatTransport for FakeChat {
    async fn post_thread_reply(&self, thread: &ThreadRef, text: &str) -> Result<PostedMessage> {
        if *self.fail_posts.lock().unwrap() {
            return Err(Error::Chat("channel_not_found".to_string()));
        }
        self.posts
            .lock()
            .unwrap()
            .push((thread.clone(), text.to_string()));
        let mut next = self.next_ts.lock().unwrap();
        *next += 1;
        Ok(PostedMessage {
            channel: thread.channel.clone(),
            ts: MessageTs(format!("9000.{:06}", *next)),
        })
    }

    async fn list_joined_channels(&self) -> Result<Vec<ChannelId>> {
        if *self.fail_listing.lock().unwrap() {
            return Err(Error::Chat("invalid_auth".to_string()));
        }
        Ok(self
            .channels
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn channel_history(&self, channel: &ChannelId) -> Result<Vec<RootMessage>> {
        if self.broken_history.lock().unwrap().contains(channel) {
            return Err(Error::Chat("not_in_channel".to_string()));
        }
        Ok(self
            .channels
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| id == channel)
            .map(|(_, roots)| roots.clone())
            .unwrap_or_default())
    }
}

/// Signal API with configurable identities and scripted write outcomes.
#[derive(Default)]
pub struct FakeSignals {
    pub orgs: Mutex<HashMap<String, i64>>,
    pub users: Mutex<HashMap<String, i64>>,
    pub next_report_id: Mutex<i64>,
    pub signal_failure: Mutex<Option<SignalApiError>>,
    pub failing_comments: Mutex<HashSet<i64>>,
    pub signals: Mutex<Vec<(String, ApiUserId)>>,
    pub comments: Mutex<Vec<(ReportId, String, ApiUserId)>>,
    pub user_lookups: Mutex<usize>,
}

impl FakeSignals {
    pub fn registered(team: &str, user: &str, api_user: i64) -> Self {
        let s = Self::default();
        s.orgs.lock().unwrap().insert(team.to_string(), 1);
        s.users.lock().unwrap().insert(user.to_string(), api_user);
        s
    }

    pub fn with_user(self, user: &str, api_user: i64) -> Self {
        self.users.lock().unwrap().insert(user.to_string(), api_user);
        self
    }

    pub fn next_report(&self, id: i64) {
        *self.next_report_id.lock().unwrap() = id;
    }

    pub fn fail_signals(&self, err: SignalApiError) {
        *self.signal_failure.lock().unwrap() = Some(err);
    }

    pub fn fail_comments_for(&self, report_id: i64) {
        self.failing_comments.lock().unwrap().insert(report_id);
    }

    pub fn signal_calls(&self) -> Vec<(String, ApiUserId)> {
        self.signals.lock().unwrap().clone()
    }

    pub fn comment_calls(&self) -> Vec<(ReportId, String, ApiUserId)> {
        self.comments.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignalApi for FakeSignals {
    async fn resolve_org(&self, team: &TeamId) -> Option<OrgId> {
        self.orgs.lock().unwrap().get(&team.0).copied().map(OrgId)
    }

    async fn resolve_user(&self, user: &ChatUserId) -> Option<ApiUserId> {
        *self.user_lookups.lock().unwrap() += 1;
        self.users.lock().unwrap().get(&user.0).copied().map(ApiUserId)
    }

    async fn create_signal(
        &self,
        text: &str,
        user: ApiUserId,
    ) -> std::result::Result<ReportId, SignalApiError> {
        self.signals.lock().unwrap().push((text.to_string(), user));
        if let Some(err) = self.signal_failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(ReportId(*self.next_report_id.lock().unwrap()))
    }

    async fn create_comment(
        &self,
        report_id: ReportId,
        comment: &str,
        user: ApiUserId,
    ) -> std::result::Result<CommentId, SignalApiError> {
        if self.failing_comments.lock().unwrap().contains(&report_id.0) {
            return Err(SignalApiError::Status {
                status: 404,
                body: "{\"detail\":\"report not found\"}".to_string(),
            });
        }
        let mut comments = self.comments.lock().unwrap();
        comments.push((report_id, comment.to_string(), user));
        Ok(CommentId(format!("c{}", comments.len())))
    }
}

/// Root message announced by the bot with `report_id`.
pub fn announced_root(ts: &str, report_id: i64) -> RootMessage {
    RootMessage {
        message: ChatMessage {
            ts: MessageTs(ts.to_string()),
            user: Some("U1".to_string()),
            bot_id: None,
            text: "Need help".to_string(),
        },
        replies: vec![ChatMessage {
            ts: MessageTs(format!("{ts}1")),
            user: Some("UBOT".to_string()),
            bot_id: Some("B1".to_string()),
            text: crate::extractor::announcement(ReportId(report_id)),
        }],
    }
}

/// Root message with no announcement.
pub fn plain_root(ts: &str, text: &str) -> RootMessage {
    RootMessage {
        message: ChatMessage {
            ts: MessageTs(ts.to_string()),
            user: Some("U2".to_string()),
            bot_id: None,
            text: text.to_string(),
        },
        replies: vec![],
    }
}
