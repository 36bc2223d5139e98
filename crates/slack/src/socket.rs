use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use swarmbot_core::ReviewId;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::action_id;
use crate::events::{EventContext, EventDispatcher, SlackEnvelope, SlackEvent};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Socket Mode connection. Implementations decode frames with
/// [`crate::envelope::decode_frame`] and skip control frames.
#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    /// `None` once the stream is closed.
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError>;
    async fn acknowledge(
        &self,
        envelope_id: &str,
        payload: Option<&Value>,
    ) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopSocketTransport;

#[async_trait]
impl SocketTransport for NoopSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(
        &self,
        _envelope_id: &str,
        _payload: Option<&Value>,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: Arc<EventDispatcher>,
    reconnect_policy: ReconnectPolicy,
}

impl Default for SocketModeRunner {
    fn default() -> Self {
        Self {
            transport: Arc::new(NoopSocketTransport),
            dispatcher: Arc::new(EventDispatcher::new()),
            reconnect_policy: ReconnectPolicy::default(),
        }
    }
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher: Arc::new(dispatcher), reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "socket mode transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "socket mode retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening socket mode transport connection");
        self.transport.connect().await?;
        info!(attempt, "socket mode transport connected");

        // One task per envelope; a slow dispatch must not delay later acks.
        let mut in_flight = JoinSet::new();
        loop {
            let next = self.transport.next_envelope().await;
            while in_flight.try_join_next().is_some() {}

            let Some(envelope) = next? else {
                info!(attempt, "socket mode transport stream closed");
                while in_flight.join_next().await.is_some() {}
                self.transport.disconnect().await?;
                return Ok(());
            };

            in_flight.spawn(dispatch_and_acknowledge(
                self.transport.clone(),
                self.dispatcher.clone(),
                envelope,
            ));
        }
    }
}

async fn dispatch_and_acknowledge(
    transport: Arc<dyn SocketTransport>,
    dispatcher: Arc<EventDispatcher>,
    envelope: SlackEnvelope,
) {
    let review_id = correlation_review_id(&envelope)
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_owned());

    info!(
        event_name = "ingress.slack.envelope_received",
        envelope_id = %envelope.envelope_id,
        event_type = ?envelope.event.event_type(),
        correlation_id = %envelope.envelope_id,
        review_id = %review_id,
        "received slack envelope"
    );

    // The ack carries the reply, so dispatch runs first.
    let context = EventContext { correlation_id: envelope.envelope_id.clone() };
    let ack = dispatcher.dispatch(&envelope, &context).await;
    let payload = ack.payload();

    if let Err(error) = transport.acknowledge(&envelope.envelope_id, payload.as_ref()).await {
        warn!(
            event_name = "ingress.slack.ack_sent",
            envelope_id = %envelope.envelope_id,
            correlation_id = %envelope.envelope_id,
            review_id = %review_id,
            error = %error,
            "failed to acknowledge slack envelope"
        );
    } else {
        debug!(
            event_name = "ingress.slack.ack_sent",
            envelope_id = %envelope.envelope_id,
            correlation_id = %envelope.envelope_id,
            review_id = %review_id,
            status = ack.status_code(),
            "acknowledged slack envelope"
        );
    }
}

/// Review the envelope is about, when it names one.
fn correlation_review_id(envelope: &SlackEnvelope) -> Option<ReviewId> {
    match &envelope.event {
        SlackEvent::BlockAction(event) => {
            action_id::decode(&event.action_id).ok().map(|action| action.review_id)
        }
        SlackEvent::SlashCommand(payload) if payload.command == "/changelist" => {
            payload.text.trim().trim_start_matches('#').parse().ok()
        }
        SlackEvent::SlashCommand(_)
        | SlackEvent::AppHomeOpened(_)
        | SlackEvent::Unsupported { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    use super::{ReconnectPolicy, SocketModeRunner, SocketTransport, TransportError};
    use crate::commands::SlashCommandPayload;
    use crate::events::{
        Acknowledgement, BlockActionEvent, EventContext, EventDispatcher, EventHandler,
        EventHandlerError, SlackEnvelope, SlackEvent, SlackEventType, SlashCommandHandler,
    };
    use crate::compose::ViewComposer;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use swarmbot_core::fixtures::FixtureReviewSource;
    use swarmbot_core::ReviewId;
    use tokio::sync::{Mutex, Notify};

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), TransportError>>,
        envelopes: VecDeque<Result<Option<SlackEnvelope>, TransportError>>,
        disconnect_results: VecDeque<Result<(), TransportError>>,
        connect_attempts: usize,
        acknowledgements: Vec<(String, Option<Value>)>,
        disconnect_calls: usize,
        release_on_ack: Option<(String, Arc<Notify>)>,
    }

    impl ScriptedTransport {
        fn with_script(
            connect_results: Vec<Result<(), TransportError>>,
            envelopes: Vec<Result<Option<SlackEnvelope>, TransportError>>,
            disconnect_results: Vec<Result<(), TransportError>>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    envelopes: envelopes.into(),
                    disconnect_results: disconnect_results.into(),
                    ..ScriptedState::default()
                }),
            }
        }

        async fn connect_attempts(&self) -> usize {
            self.state.lock().await.connect_attempts
        }

        async fn acknowledgements(&self) -> Vec<(String, Option<Value>)> {
            self.state.lock().await.acknowledgements.clone()
        }

        async fn disconnect_calls(&self) -> usize {
            self.state.lock().await.disconnect_calls
        }
    }

    #[async_trait]
    impl SocketTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
            let mut state = self.state.lock().await;
            state.envelopes.pop_front().unwrap_or(Ok(None))
        }

        async fn acknowledge(
            &self,
            envelope_id: &str,
            payload: Option<&Value>,
        ) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.acknowledgements.push((envelope_id.to_owned(), payload.cloned()));
            if let Some((release_id, gate)) = &state.release_on_ack {
                if release_id == envelope_id {
                    gate.notify_one();
                }
            }
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.disconnect_calls += 1;
            state.disconnect_results.pop_front().unwrap_or(Ok(()))
        }
    }

    /// Holds every block action until the gate is opened.
    struct GatedHandler {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl EventHandler for GatedHandler {
        fn event_type(&self) -> SlackEventType {
            SlackEventType::BlockAction
        }

        async fn handle(
            &self,
            _envelope: &SlackEnvelope,
            _ctx: &EventContext,
        ) -> Result<Acknowledgement, EventHandlerError> {
            self.gate.notified().await;
            Ok(Acknowledgement::Empty)
        }
    }

    fn unsupported(envelope_id: &str) -> SlackEnvelope {
        SlackEnvelope {
            envelope_id: envelope_id.to_owned(),
            event: SlackEvent::Unsupported { event_type: "test".to_owned() },
        }
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(TransportError::Connect("network down".to_owned())), Ok(())],
            vec![Ok(Some(unsupported("env-1"))), Ok(None)],
            vec![Ok(())],
        ));

        let runner = SocketModeRunner::new(
            transport.clone(),
            EventDispatcher::default(),
            ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 },
        );

        runner.start().await.expect("runner should not fail");

        assert_eq!(transport.connect_attempts().await, 2);
        assert_eq!(transport.acknowledgements().await, vec![("env-1".to_owned(), None)]);
        assert_eq!(transport.disconnect_calls().await, 1);
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![
                Err(TransportError::Connect("fail-1".to_owned())),
                Err(TransportError::Connect("fail-2".to_owned())),
                Err(TransportError::Connect("fail-3".to_owned())),
            ],
            vec![],
            vec![],
        ));

        let runner = SocketModeRunner::new(
            transport.clone(),
            EventDispatcher::default(),
            ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 },
        );

        runner.start().await.expect("runner should degrade gracefully");
        assert_eq!(transport.connect_attempts().await, 3);
    }

    #[tokio::test]
    async fn acknowledgement_carries_the_command_reply() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![Ok(Some(SlackEnvelope {
                envelope_id: "env-cmd".to_owned(),
                event: SlackEvent::SlashCommand(SlashCommandPayload {
                    command: "/changelist".to_owned(),
                    ..SlashCommandPayload::default()
                }),
            }))],
            vec![],
        ));
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(SlashCommandHandler::new(
            FixtureReviewSource::new(),
            ViewComposer::new("https://swarm.example.com/reviews/"),
        ));

        SocketModeRunner::new(transport.clone(), dispatcher, ReconnectPolicy::default())
            .start()
            .await
            .expect("runner");

        assert_eq!(
            transport.acknowledgements().await,
            vec![(
                "env-cmd".to_owned(),
                Some(json!({
                    "text": ":exclamation: Please provide change list number you want to review"
                }))
            )]
        );
    }

    #[tokio::test]
    async fn slow_dispatch_does_not_hold_back_later_acks() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![
                Ok(Some(SlackEnvelope {
                    envelope_id: "env-slow".to_owned(),
                    event: SlackEvent::BlockAction(BlockActionEvent {
                        action_id: "details_1".to_owned(),
                        ..BlockActionEvent::default()
                    }),
                })),
                Ok(Some(unsupported("env-fast"))),
            ],
            vec![],
        ));
        transport.state.lock().await.release_on_ack = Some(("env-fast".to_owned(), gate.clone()));

        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(GatedHandler { gate });
        let runner = SocketModeRunner::new(transport.clone(), dispatcher, ReconnectPolicy::default());

        tokio::time::timeout(Duration::from_secs(5), runner.start())
            .await
            .expect("slow envelope should not block the fast one")
            .expect("runner");

        let acked = transport
            .acknowledgements()
            .await
            .into_iter()
            .map(|(envelope_id, _)| envelope_id)
            .collect::<Vec<_>>();
        assert_eq!(acked, vec!["env-fast".to_owned(), "env-slow".to_owned()]);
    }

    #[test]
    fn extracts_review_correlation_from_actions_and_commands() {
        let action = SlackEnvelope {
            envelope_id: "env-2".to_owned(),
            event: SlackEvent::BlockAction(BlockActionEvent {
                action_id: "details_12345".to_owned(),
                ..BlockActionEvent::default()
            }),
        };
        let command = SlackEnvelope {
            envelope_id: "env-3".to_owned(),
            event: SlackEvent::SlashCommand(SlashCommandPayload {
                command: "/changelist".to_owned(),
                text: " #77 ".to_owned(),
                ..SlashCommandPayload::default()
            }),
        };

        assert_eq!(super::correlation_review_id(&action), Some(ReviewId(12345)));
        assert_eq!(super::correlation_review_id(&command), Some(ReviewId(77)));
        assert_eq!(super::correlation_review_id(&unsupported("env-4")), None);
    }
}
