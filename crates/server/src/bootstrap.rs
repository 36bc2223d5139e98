use std::sync::Arc;

use swarmbot_core::config::AppConfig;
use swarmbot_slack::compose::ViewComposer;
use swarmbot_slack::events::interaction_dispatcher;
use swarmbot_slack::socket::{NoopSocketTransport, ReconnectPolicy, SocketModeRunner};
use thiserror::Error;
use tracing::info;

use crate::health::HealthState;
use crate::slack_web::SlackWebClient;
use crate::swarm_client::SwarmClient;

pub struct Application {
    pub config: AppConfig,
    pub slack_runner: SocketModeRunner,
    pub health_state: HealthState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("swarm http client could not be built: {0}")]
    SwarmClient(#[source] reqwest::Error),
    #[error("slack web api client could not be built: {0}")]
    SlackClient(#[source] reqwest::Error),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let swarm = Arc::new(SwarmClient::new(&config.swarm).map_err(BootstrapError::SwarmClient)?);
    let slack = Arc::new(SlackWebClient::new(&config.slack).map_err(BootstrapError::SlackClient)?);
    info!(
        event_name = "system.bootstrap.clients_ready",
        correlation_id = "bootstrap",
        swarm_api_url = %config.swarm.api_url(),
        swarm_username = %config.swarm.username,
        "swarm and slack clients initialized"
    );

    let dispatcher = interaction_dispatcher(
        swarm,
        slack,
        ViewComposer::new(config.swarm.review_web_url()),
        config.swarm.username.clone(),
    );
    // The websocket wire protocol is not bundled; a real transport plugs in here.
    let slack_runner = SocketModeRunner::new(
        Arc::new(NoopSocketTransport),
        dispatcher,
        ReconnectPolicy::default(),
    );

    let health_state =
        HealthState { swarm_api_url: config.swarm.api_url(), slack_transport: "noop" };

    Ok(Application { config, slack_runner, health_state })
}
