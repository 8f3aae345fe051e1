//! Channel reconciliation: attach an opportunity to the threads that announced
//! a set of report ids.
//!
//! The chat history is the only index from report id to thread, so every run
//! walks all joined channels and their root messages. Channels and messages are
//! processed one at a time; nothing is retried.
//!
//! Report ids that are not announced in any thread produce no entry at all.
//! Callers detect misses by diffing the returned ids against their request.

use std::{collections::HashSet, sync::Arc};

use crate::{
    domain::{ChannelId, ChatUserId, CommentId, MessageTs, ReportId, ThreadRef},
    extractor::extract_report_id,
    messaging::port::ChatTransport,
    signal::SignalApi,
};

/// Text of the thread reply posted for an opportunity.
pub fn opportunity_reply(opportunity: &str) -> String {
    format!("New opportunity: {opportunity}")
}

#[derive(Clone, Debug)]
pub struct ReconcileRequest {
    pub targets: HashSet<ReportId>,
    pub opportunity: String,
}

impl ReconcileRequest {
    pub fn new(
        report_ids: impl IntoIterator<Item = ReportId>,
        opportunity: impl Into<String>,
    ) -> Self {
        Self {
            targets: report_ids.into_iter().collect(),
            opportunity: opportunity.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileStatus {
    Success,
    Failed,
}

impl ReconcileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReconcileStatus::Success => "success",
            ReconcileStatus::Failed => "failed",
        }
    }
}

/// Outcome for one matched thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileEntry {
    pub report_id: ReportId,
    pub status: ReconcileStatus,
    pub comment_id: Option<CommentId>,
    pub channel: Option<ChannelId>,
    /// Ts of the posted thread reply, as acknowledged by the chat platform.
    pub thread_ts: Option<MessageTs>,
    pub error: Option<String>,
}

impl ReconcileEntry {
    fn failed(report_id: ReportId, channel: &ChannelId, error: String) -> Self {
        Self {
            report_id,
            status: ReconcileStatus::Failed,
            comment_id: None,
            channel: Some(channel.clone()),
            thread_ts: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ReconcileStatus::Success
    }
}

pub struct Reconciler {
    signals: Arc<dyn SignalApi>,
    chat: Arc<dyn ChatTransport>,
    /// Chat identity the bot comments as; resolved on every match.
    bot_user: ChatUserId,
}

impl Reconciler {
    pub fn new(
        signals: Arc<dyn SignalApi>,
        chat: Arc<dyn ChatTransport>,
        bot_user: ChatUserId,
    ) -> Self {
        Self {
            signals,
            chat,
            bot_user,
        }
    }

    /// Run one reconciliation batch to completion.
    ///
    /// Entries come in channel-enumeration order, then channel-history order.
    /// A report id announced in several threads yields one entry per thread.
    pub async fn reconcile(&self, req: &ReconcileRequest) -> Vec<ReconcileEntry> {
        let channels = match self.chat.list_joined_channels().await {
            Ok(channels) => channels,
            Err(e) => {
                tracing::error!(error = %e, "failed to list joined channels");
                Vec::new()
            }
        };

        let mut entries = Vec::new();
        for channel in &channels {
            entries.extend(self.reconcile_channel(channel, req).await);
        }

        let succeeded = entries.iter().filter(|e| e.is_success()).count();
        tracing::info!(
            requested = req.targets.len(),
            channels = channels.len(),
            matched = entries.len(),
            succeeded,
            failed = entries.len() - succeeded,
            "reconciliation finished"
        );
        entries
    }

    async fn reconcile_channel(
        &self,
        channel: &ChannelId,
        req: &ReconcileRequest,
    ) -> Vec<ReconcileEntry> {
        let roots = match self.chat.channel_history(channel).await {
            Ok(roots) => roots,
            Err(e) => {
                tracing::warn!(error = %e, %channel, "failed to fetch channel history");
                return Vec::new();
            }
        };

        let mut entries = Vec::new();
        for root in &roots {
            let Some(report_id) = extract_report_id(root) else {
                continue;
            };
            if !req.targets.contains(&report_id) {
                continue;
            }
            let thread = root.thread_in(channel);
            entries.push(self.apply(report_id, &thread, &req.opportunity).await);
        }
        entries
    }

    async fn apply(
        &self,
        report_id: ReportId,
        thread: &ThreadRef,
        opportunity: &str,
    ) -> ReconcileEntry {
        let channel = &thread.channel;

        let Some(bot) = self.signals.resolve_user(&self.bot_user).await else {
            tracing::warn!(%report_id, bot_user = %self.bot_user, "bot user is not registered");
            return ReconcileEntry::failed(
                report_id,
                channel,
                format!(
                    "bot user {} is not registered with the signal api",
                    self.bot_user
                ),
            );
        };

        let comment_id = match self
            .signals
            .create_comment(report_id, opportunity, bot)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, %report_id, %channel, "comment creation failed");
                return ReconcileEntry::failed(report_id, channel, e.to_string());
            }
        };

        match self
            .chat
            .post_thread_reply(thread, &opportunity_reply(opportunity))
            .await
        {
            Ok(posted) => ReconcileEntry {
                report_id,
                status: ReconcileStatus::Success,
                comment_id: Some(comment_id),
                channel: Some(posted.channel),
                thread_ts: Some(posted.ts),
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, %report_id, %channel, "thread reply failed after comment");
                ReconcileEntry {
                    comment_id: Some(comment_id.clone()),
                    ..ReconcileEntry::failed(
                        report_id,
                        channel,
                        format!("comment {} created but thread reply failed: {e}", comment_id.0),
                    )
                }
            }
        }
    }
}
