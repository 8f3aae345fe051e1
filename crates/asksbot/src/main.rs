use std::sync::Arc;

use asksbot_core::{
    config::Config,
    inbound::InboundHandler,
    messaging::port::ChatTransport,
    reconcile::Reconciler,
    signal::SignalApi,
};
use asksbot_http::AppState;
use asksbot_signal_api::SignalApiClient;
use asksbot_slack::{events::EventsEndpoint, SlackTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    asksbot_core::logging::init("asksbot")?;

    let cfg = Config::load()?;
    if cfg.slack_signing_secret.is_none() {
        tracing::warn!("SLACK_SIGNING_SECRET not set; slack event requests are not verified");
    }

    let signals: Arc<dyn SignalApi> = Arc::new(SignalApiClient::from_config(&cfg)?);
    let chat: Arc<dyn ChatTransport> = Arc::new(SlackTransport::from_config(&cfg)?);

    let state = AppState {
        reconciler: Arc::new(Reconciler::new(
            signals.clone(),
            chat.clone(),
            cfg.slack_bot_user_id.clone(),
        )),
        inbound: Arc::new(InboundHandler::new(signals, chat)),
        events: Arc::new(EventsEndpoint::new(
            cfg.slack_signing_secret.clone(),
            cfg.slack_bot_user_id.clone(),
        )),
    };

    asksbot_http::serve(cfg.http_bind, state).await
}
