//! Inbound message handling: every new chat message becomes a signal.
//!
//! The flow is terminal on the first failure and every failure is answered
//! in the message's thread, so users never see a silent drop.

use std::sync::Arc;

use crate::{
    domain::{ApiUserId, ChatUserId, ReportId, TeamId, ThreadRef},
    extractor::announcement,
    messaging::{port::ChatTransport, types::InboundMessage},
    signal::{SignalApi, SignalApiError},
    Result,
};

pub const INCOMPLETE_DATA_REPLY: &str = "Error: Incomplete message data.";
pub const UNEXPECTED_ERROR_REPLY: &str =
    "Error: An unexpected error occurred while processing the message. Please try again later.";

fn org_not_registered_reply(team: &TeamId) -> String {
    format!(
        "Error: No customer organization found for team ID: {team}. Please use the /register_organization command."
    )
}

fn user_not_registered_reply(user: &ChatUserId) -> String {
    format!("Error: No user found for Slack ID: {user}. Please use the /register_user command.")
}

fn signal_failed_reply(err: &SignalApiError, text: &str, user: ApiUserId) -> String {
    let response = err.raw_response().unwrap_or("none");
    format!(
        "Error: Failed to create signal. Response: {response} ({err}). Signal: {text}, User ID: {}",
        user.0
    )
}

/// Terminal state reached for one inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundOutcome {
    Incomplete,
    OrgNotRegistered,
    UserNotRegistered,
    Reported(ReportId),
    SignalFailed,
    /// An unexpected error escaped the flow; a generic reply was attempted.
    Aborted,
}

/// Message fields after presence validation.
struct ValidMessage<'a> {
    author: &'a ChatUserId,
    text: &'a str,
    team: &'a TeamId,
    thread: ThreadRef,
}

impl<'a> ValidMessage<'a> {
    fn from_inbound(msg: &'a InboundMessage) -> Option<Self> {
        let author = msg.author.as_ref().filter(|a| !a.0.is_empty())?;
        let text = msg.text.as_deref().filter(|t| !t.is_empty())?;
        let team = msg.team.as_ref().filter(|t| !t.0.is_empty())?;
        let thread = msg.reply_thread().filter(|t| !t.channel.0.is_empty())?;
        Some(Self {
            author,
            text,
            team,
            thread,
        })
    }
}

pub struct InboundHandler {
    signals: Arc<dyn SignalApi>,
    chat: Arc<dyn ChatTransport>,
}

impl InboundHandler {
    pub fn new(signals: Arc<dyn SignalApi>, chat: Arc<dyn ChatTransport>) -> Self {
        Self { signals, chat }
    }

    /// Handle one message. Never fails: errors are logged and answered with a
    /// generic threaded reply.
    pub async fn handle(&self, msg: InboundMessage) -> InboundOutcome {
        match self.process(&msg).await {
            Ok(outcome) => {
                tracing::info!(ts = %msg.ts, ?outcome, "inbound message handled");
                outcome
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    ts = %msg.ts,
                    channel = ?msg.channel,
                    author = ?msg.author,
                    "error processing message"
                );
                if let Err(e) = self.reply(&msg, UNEXPECTED_ERROR_REPLY).await {
                    tracing::error!(error = %e, ts = %msg.ts, "failed to send error reply");
                }
                InboundOutcome::Aborted
            }
        }
    }

    async fn process(&self, msg: &InboundMessage) -> Result<InboundOutcome> {
        let Some(valid) = ValidMessage::from_inbound(msg) else {
            self.reply(msg, INCOMPLETE_DATA_REPLY).await?;
            return Ok(InboundOutcome::Incomplete);
        };

        if self.signals.resolve_org(valid.team).await.is_none() {
            tracing::warn!(team = %valid.team, "no customer organization for team");
            self.say(&valid.thread, &org_not_registered_reply(valid.team))
                .await?;
            return Ok(InboundOutcome::OrgNotRegistered);
        }

        let Some(api_user) = self.signals.resolve_user(valid.author).await else {
            tracing::warn!(user = %valid.author, "no api user for chat user");
            self.say(&valid.thread, &user_not_registered_reply(valid.author))
                .await?;
            return Ok(InboundOutcome::UserNotRegistered);
        };

        match self.signals.create_signal(valid.text, api_user).await {
            Ok(report_id) => {
                self.say(&valid.thread, &announcement(report_id)).await?;
                Ok(InboundOutcome::Reported(report_id))
            }
            Err(err) => {
                tracing::warn!(error = %err, user = api_user.0, "signal creation failed");
                self.say(
                    &valid.thread,
                    &signal_failed_reply(&err, valid.text, api_user),
                )
                .await?;
                Ok(InboundOutcome::SignalFailed)
            }
        }
    }

    async fn say(&self, thread: &ThreadRef, text: &str) -> Result<()> {
        self.chat.post_thread_reply(thread, text).await?;
        Ok(())
    }

    /// Reply in the message's thread; messages without a channel cannot be
    /// answered and are only logged.
    async fn reply(&self, msg: &InboundMessage, text: &str) -> Result<()> {
        let Some(thread) = msg.reply_thread().filter(|t| !t.channel.0.is_empty()) else {
            tracing::warn!(ts = %msg.ts, "message has no channel; reply dropped: {text}");
            return Ok(());
        };
        self.say(&thread, text).await
    }
}
