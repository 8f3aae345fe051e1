use crate::domain::{ChannelId, ChatUserId, MessageTs, TeamId, ThreadRef};

/// A new top-level message delivered by the chat platform.
///
/// Fields are optional because the platform does not guarantee them; the
/// inbound handler validates presence.
#[derive(Clone, Debug, Default)]
pub struct InboundMessage {
    pub author: Option<ChatUserId>,
    pub channel: Option<ChannelId>,
    pub text: Option<String>,
    pub team: Option<TeamId>,
    pub ts: MessageTs,
}

impl InboundMessage {
    /// Thread the bot should answer in, when the channel is known.
    pub fn reply_thread(&self) -> Option<ThreadRef> {
        self.channel.as_ref().map(|channel| ThreadRef {
            channel: channel.clone(),
            thread_ts: self.ts.clone(),
        })
    }
}

/// A single message as listed from channel history.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatMessage {
    pub ts: MessageTs,
    pub user: Option<String>,
    pub bot_id: Option<String>,
    pub text: String,
}

/// A root (top-level) message with its thread replies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RootMessage {
    pub message: ChatMessage,
    pub replies: Vec<ChatMessage>,
}

impl RootMessage {
    pub fn thread_in(&self, channel: &ChannelId) -> ThreadRef {
        ThreadRef {
            channel: channel.clone(),
            thread_ts: self.message.ts.clone(),
        }
    }
}

/// Acknowledgment returned by the platform after posting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: ChannelId,
    pub ts: MessageTs,
}
