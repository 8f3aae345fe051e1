use async_trait::async_trait;

use crate::{
    domain::{ChannelId, ThreadRef},
    messaging::types::{PostedMessage, RootMessage},
    Result,
};

/// Chat transport port.
///
/// Listing calls return complete results; adapters follow any pagination
/// cursors themselves.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post `text` as a reply inside an existing thread.
    async fn post_thread_reply(&self, thread: &ThreadRef, text: &str) -> Result<PostedMessage>;

    /// Channels (public and private) the bot is a member of.
    async fn list_joined_channels(&self) -> Result<Vec<ChannelId>>;

    /// Root messages of a channel, newest first, each with its thread replies
    /// inlined in thread order. A thread whose replies cannot be read comes
    /// back with no replies instead of failing the channel.
    async fn channel_history(&self, channel: &ChannelId) -> Result<Vec<RootMessage>>;
}
