use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::{json, Value};
use swarmbot_core::{InterfaceError, ReviewSource, ReviewType, ReviewsData, SwarmError};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    action_id::{self, ActionIdParseError, ActionOperation, CHANGE_REVIEW_TYPE},
    blocks::MessageTemplate,
    commands::{CommandRouteError, CommandRouter, SlashCommandPayload, REVIEW_NOT_FOUND},
    compose::ViewComposer,
    web_api::{SlackWebApi, ViewApiError},
};

pub const HOME_TAB: &str = "home";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    SlashCommand(SlashCommandPayload),
    BlockAction(BlockActionEvent),
    AppHomeOpened(AppHomeOpenedEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::SlashCommand(_) => SlackEventType::SlashCommand,
            Self::BlockAction(_) => SlackEventType::BlockAction,
            Self::AppHomeOpened(_) => SlackEventType::AppHomeOpened,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    SlashCommand,
    BlockAction,
    AppHomeOpened,
    Unsupported,
}

/// A single activated element from a `block_actions` payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockActionEvent {
    pub action_id: String,
    pub value: Option<String>,
    pub selected_option_value: Option<String>,
    pub user_id: String,
    pub trigger_id: String,
    /// Id of the surface the element lives on, absent for message buttons.
    pub view_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppHomeOpenedEvent {
    pub user_id: String,
    pub tab: String,
    /// Present once a home view has been published for this user.
    pub view_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

/// What goes back to Slack for an envelope. Every dispatched event ends in one of these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Acknowledgement {
    Empty,
    Message(MessageTemplate),
    Failure { status: u16, message: String },
}

impl Acknowledgement {
    pub fn failure(status: u16, message: impl Into<String>) -> Self {
        Self::Failure { status, message: message.into() }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Failure { status, .. } => *status,
            Self::Empty | Self::Message(_) => 200,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failure { .. })
    }

    /// Body of the Socket Mode ack, if any.
    pub fn payload(&self) -> Option<Value> {
        match self {
            Self::Empty => None,
            Self::Message(message) => serde_json::to_value(message).ok(),
            Self::Failure { message, .. } => Some(json!({ "text": message })),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Route(#[from] CommandRouteError),
    #[error(transparent)]
    Source(#[from] SwarmError),
    #[error(transparent)]
    ActionId(#[from] ActionIdParseError),
    #[error("unknown review type selection `{0}`")]
    ReviewTypeSelection(String),
    #[error("block action `{action_id}` is missing `{field}`")]
    MissingField { action_id: String, field: &'static str },
    #[error(transparent)]
    ViewApi(#[from] ViewApiError),
}

impl EventHandlerError {
    pub fn into_interface(self, correlation_id: &str) -> InterfaceError {
        match self {
            Self::Route(CommandRouteError::Source(source)) | Self::Source(source) => {
                source.into_interface(correlation_id)
            }
            Self::ViewApi(api) => InterfaceError::Internal {
                message: api.to_string(),
                correlation_id: correlation_id.to_owned(),
            },
            other => InterfaceError::BadRequest {
                message: other.to_string(),
                correlation_id: correlation_id.to_owned(),
            },
        }
    }

    /// Failure ack. Slack API errors are echoed verbatim so the cause shows up client side.
    pub fn acknowledgement(self, correlation_id: &str) -> Acknowledgement {
        let view_api_reason = match &self {
            Self::ViewApi(api) => Some(api.reason().to_owned()),
            _ => None,
        };
        let interface = self.into_interface(correlation_id);
        let message = match (&interface, view_api_reason) {
            (_, Some(reason)) => reason,
            (InterfaceError::NotFound { .. }, None) => REVIEW_NOT_FOUND.to_owned(),
            (other, None) => other.user_message().to_owned(),
        };
        Acknowledgement::failure(interface.status_code(), message)
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<Acknowledgement, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    /// Routes the envelope and turns handler errors into failure acks; nothing escapes.
    pub async fn dispatch(&self, envelope: &SlackEnvelope, ctx: &EventContext) -> Acknowledgement {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Acknowledgement::Empty;
        };

        match handler.handle(envelope, ctx).await {
            Ok(ack) => ack,
            Err(handler_error) => {
                log_handler_error(envelope, ctx, &handler_error);
                handler_error.acknowledgement(&ctx.correlation_id)
            }
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

fn log_handler_error(envelope: &SlackEnvelope, ctx: &EventContext, handler_error: &EventHandlerError) {
    let event_type = envelope.event.event_type();
    match handler_error {
        EventHandlerError::Route(CommandRouteError::Source(source)) | EventHandlerError::Source(source)
            if !source.is_not_found() =>
        {
            error!(
                event_name = "slack.dispatch.upstream_failed",
                correlation_id = %ctx.correlation_id,
                event_type = ?event_type,
                error = %handler_error,
                "swarm request failed"
            );
        }
        _ => {
            warn!(
                event_name = "slack.dispatch.handler_failed",
                correlation_id = %ctx.correlation_id,
                event_type = ?event_type,
                error = %handler_error,
                "event handler failed"
            );
        }
    }
}

/// Registers the slash command, block action and home tab handlers over shared collaborators.
///
/// `actor` is the Swarm account whose reviews are listed on the home tab.
pub fn interaction_dispatcher<S, W>(
    source: Arc<S>,
    web_api: Arc<W>,
    composer: ViewComposer,
    actor: impl Into<String>,
) -> EventDispatcher
where
    S: ReviewSource + ?Sized + 'static,
    W: SlackWebApi + ?Sized + 'static,
{
    let actor = actor.into();
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(source.clone(), composer.clone()));
    dispatcher.register(BlockActionHandler::new(
        source.clone(),
        web_api.clone(),
        composer.clone(),
        actor.clone(),
    ));
    dispatcher.register(AppHomeOpenedHandler::new(source, web_api, composer, actor));
    dispatcher
}

/// One page of the actor's reviews. `NotFound` yields `None` so the home tab still renders.
async fn fetch_review_page<S>(
    source: &S,
    review_type: ReviewType,
    actor: &str,
) -> Result<Option<ReviewsData>, SwarmError>
where
    S: ReviewSource + ?Sized,
{
    match source.fetch_review_list(review_type, actor).await {
        Ok(data) => Ok(Some(data)),
        Err(source_error) if source_error.is_not_found() => Ok(None),
        Err(source_error) => Err(source_error),
    }
}

pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> SlashCommandHandler<S>
where
    S: ReviewSource,
{
    pub fn new(source: S, composer: ViewComposer) -> Self {
        Self { router: CommandRouter::new(source, composer) }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: ReviewSource + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<Acknowledgement, EventHandlerError> {
        let SlackEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(Acknowledgement::Empty);
        };

        let message = self.router.route(payload).await?;
        Ok(Acknowledgement::Message(message))
    }
}

pub struct BlockActionHandler<S, W> {
    source: S,
    web_api: W,
    composer: ViewComposer,
    actor: String,
}

impl<S, W> BlockActionHandler<S, W>
where
    S: ReviewSource,
    W: SlackWebApi,
{
    pub fn new(source: S, web_api: W, composer: ViewComposer, actor: impl Into<String>) -> Self {
        Self { source, web_api, composer, actor: actor.into() }
    }

    async fn change_review_type(
        &self,
        event: &BlockActionEvent,
        ctx: &EventContext,
    ) -> Result<Acknowledgement, EventHandlerError> {
        let selection = event.selected_option_value.as_deref();
        let review_type = ReviewType::from_selection(selection).ok_or_else(|| {
            EventHandlerError::ReviewTypeSelection(selection.unwrap_or_default().to_owned())
        })?;
        let view_id = event.view_id.as_deref().ok_or_else(|| EventHandlerError::MissingField {
            action_id: event.action_id.clone(),
            field: "view_id",
        })?;

        let page = fetch_review_page(&self.source, review_type, &self.actor).await?;
        let view = self.composer.home_view(review_type, page.as_ref());
        self.web_api.update_view(view_id, &view).await?;

        info!(
            event_name = "slack.home.review_type_changed",
            correlation_id = %ctx.correlation_id,
            review_type = %review_type,
            reviews = page.as_ref().map_or(0, |data| data.reviews.len()),
            "home view updated"
        );
        Ok(Acknowledgement::Empty)
    }
}

#[async_trait]
impl<S, W> EventHandler for BlockActionHandler<S, W>
where
    S: ReviewSource + 'static,
    W: SlackWebApi + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::BlockAction
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<Acknowledgement, EventHandlerError> {
        let SlackEvent::BlockAction(event) = &envelope.event else {
            return Ok(Acknowledgement::Empty);
        };

        if event.action_id == CHANGE_REVIEW_TYPE {
            return self.change_review_type(event, ctx).await;
        }

        let action = action_id::decode(&event.action_id)?;
        match action.operation {
            ActionOperation::Details => {
                let review = self.source.fetch_review(action.review_id).await?;
                let view = self.composer.review_detail_modal(&review);
                self.web_api.open_view(&event.trigger_id, &view).await?;
                info!(
                    event_name = "slack.review.details_opened",
                    correlation_id = %ctx.correlation_id,
                    review_id = %action.review_id,
                    "review details modal opened"
                );
            }
            ActionOperation::Approve | ActionOperation::Decline => {
                // Decisions are acknowledged only; Swarm state is not changed from Slack.
                info!(
                    event_name = "slack.review.decision_requested",
                    correlation_id = %ctx.correlation_id,
                    review_id = %action.review_id,
                    action_id = %event.action_id,
                    user_id = %event.user_id,
                    "review decision acknowledged without applying it"
                );
            }
        }
        Ok(Acknowledgement::Empty)
    }
}

pub struct AppHomeOpenedHandler<S, W> {
    source: S,
    web_api: W,
    composer: ViewComposer,
    actor: String,
}

impl<S, W> AppHomeOpenedHandler<S, W>
where
    S: ReviewSource,
    W: SlackWebApi,
{
    pub fn new(source: S, web_api: W, composer: ViewComposer, actor: impl Into<String>) -> Self {
        Self { source, web_api, composer, actor: actor.into() }
    }
}

#[async_trait]
impl<S, W> EventHandler for AppHomeOpenedHandler<S, W>
where
    S: ReviewSource + 'static,
    W: SlackWebApi + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::AppHomeOpened
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<Acknowledgement, EventHandlerError> {
        let SlackEvent::AppHomeOpened(event) = &envelope.event else {
            return Ok(Acknowledgement::Empty);
        };

        if event.tab != HOME_TAB || event.view_id.is_some() {
            return Ok(Acknowledgement::Empty);
        }

        let review_type = ReviewType::Author;
        let page = fetch_review_page(&self.source, review_type, &self.actor).await?;
        let view = self.composer.home_view(review_type, page.as_ref());
        self.web_api.publish_view(&event.user_id, &view).await?;

        info!(
            event_name = "slack.home.published",
            correlation_id = %ctx.correlation_id,
            user_id = %event.user_id,
            "home view published"
        );
        Ok(Acknowledgement::Empty)
    }
}
