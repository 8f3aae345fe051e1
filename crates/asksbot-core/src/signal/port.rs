use async_trait::async_trait;

use crate::{
    domain::{ApiUserId, ChatUserId, CommentId, OrgId, ReportId, TeamId},
    signal::types::SignalApiError,
};

/// Port for the remote signal-tracking API.
///
/// Implementations never fail loudly: transport errors become `None` for
/// lookups and `SignalApiError` values for writes. Nothing is cached; every
/// call goes to the API.
#[async_trait]
pub trait SignalApi: Send + Sync {
    async fn resolve_org(&self, team: &TeamId) -> Option<OrgId>;

    async fn resolve_user(&self, user: &ChatUserId) -> Option<ApiUserId>;

    async fn create_signal(
        &self,
        text: &str,
        user: ApiUserId,
    ) -> std::result::Result<ReportId, SignalApiError>;

    async fn create_comment(
        &self,
        report_id: ReportId,
        comment: &str,
        user: ApiUserId,
    ) -> std::result::Result<CommentId, SignalApiError>;
}
