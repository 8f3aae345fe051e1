//! Report-id extraction from thread replies.
//!
//! The bot's announcement reply is the only link between a report id and the
//! thread it came from, so extraction is a plain linear scan of the replies.

use std::sync::OnceLock;

use regex::Regex;

use crate::{
    domain::ReportId,
    messaging::types::{ChatMessage, RootMessage},
};

/// Marker the bot writes in front of every report id it announces.
pub const ANNOUNCEMENT_MARKER: &str = "Signal reported with ID:";

/// Text of the announcement reply for a freshly created signal.
pub fn announcement(report_id: ReportId) -> String {
    format!("{ANNOUNCEMENT_MARKER} {report_id}")
}

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"{}\s*(\S*)\s*$", regex::escape(ANNOUNCEMENT_MARKER)))
            .expect("valid regex")
    })
}

/// Parse the report id announced in a single message, if any.
///
/// The id must be the trailing token after the marker; anything after it
/// makes the announcement unparseable.
pub fn report_id_in(text: &str) -> Option<ReportId> {
    let token = marker_re().captures(text)?.get(1)?.as_str();
    token.parse::<i64>().ok().map(ReportId)
}

/// First report id announced in `root`'s replies, scanning in thread order.
///
/// Replies carrying the marker with an unparseable id are skipped.
pub fn extract_report_id(root: &RootMessage) -> Option<ReportId> {
    first_report_id(&root.replies)
}

fn first_report_id(replies: &[ChatMessage]) -> Option<ReportId> {
    replies
        .iter()
        .filter(|reply| reply.text.contains(ANNOUNCEMENT_MARKER))
        .find_map(|reply| report_id_in(&reply.text))
}
