//! Socket Mode frame decoding.
//!
//! Slack wraps every delivery in an envelope `{envelope_id, type, payload}`. Only the three
//! payload shapes the bot reacts to are modelled; anything else decodes to
//! [`SlackEvent::Unsupported`] so it is still acknowledged.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::commands::SlashCommandPayload;
use crate::events::{AppHomeOpenedEvent, BlockActionEvent, SlackEnvelope, SlackEvent};

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("socket frame is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("socket envelope `{envelope_id}` has an invalid `{kind}` payload: {source}")]
    Payload {
        envelope_id: String,
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct WireFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
struct WireSlashCommand {
    command: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    user_name: String,
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    channel_name: String,
    #[serde(default)]
    trigger_id: String,
}

#[derive(Deserialize)]
struct WireInteraction {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    user: Option<WireUser>,
    #[serde(default)]
    trigger_id: String,
    #[serde(default)]
    view: Option<WireView>,
    #[serde(default)]
    actions: Vec<WireAction>,
}

#[derive(Deserialize)]
struct WireUser {
    id: String,
}

#[derive(Deserialize)]
struct WireView {
    id: String,
}

#[derive(Deserialize)]
struct WireAction {
    action_id: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    selected_option: Option<WireSelectedOption>,
}

#[derive(Deserialize)]
struct WireSelectedOption {
    value: String,
}

#[derive(Deserialize)]
struct WireEventCallback {
    event: WireEvent,
}

#[derive(Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    tab: String,
    #[serde(default)]
    view: Option<WireView>,
}

/// Decodes one text frame. Control frames (`hello`, `disconnect`) carry no envelope id and
/// yield `None`.
pub fn decode_frame(text: &str) -> Result<Option<SlackEnvelope>, EnvelopeError> {
    let frame: WireFrame = serde_json::from_str(text)?;
    let Some(envelope_id) = frame.envelope_id else {
        return Ok(None);
    };

    let payload_error = |source| EnvelopeError::Payload {
        envelope_id: envelope_id.clone(),
        kind: frame.kind.clone(),
        source,
    };

    let event = match frame.kind.as_str() {
        "slash_commands" => {
            let wire: WireSlashCommand =
                serde_json::from_value(frame.payload.clone()).map_err(payload_error)?;
            SlackEvent::SlashCommand(SlashCommandPayload {
                command: wire.command,
                text: wire.text,
                user_id: wire.user_id,
                user_name: wire.user_name,
                channel_id: wire.channel_id,
                channel_name: wire.channel_name,
                trigger_id: wire.trigger_id,
            })
        }
        "interactive" => {
            let wire: WireInteraction =
                serde_json::from_value(frame.payload.clone()).map_err(payload_error)?;
            interaction_event(wire)
        }
        "events_api" => {
            let wire: WireEventCallback =
                serde_json::from_value(frame.payload.clone()).map_err(payload_error)?;
            callback_event(wire.event)
        }
        other => SlackEvent::Unsupported { event_type: other.to_owned() },
    };

    Ok(Some(SlackEnvelope { envelope_id, event }))
}

fn interaction_event(wire: WireInteraction) -> SlackEvent {
    if wire.kind != "block_actions" {
        return SlackEvent::Unsupported { event_type: wire.kind };
    }
    // Slack delivers one activated element per block_actions payload.
    let Some(action) = wire.actions.into_iter().next() else {
        return SlackEvent::Unsupported { event_type: wire.kind };
    };

    SlackEvent::BlockAction(BlockActionEvent {
        action_id: action.action_id,
        value: action.value,
        selected_option_value: action.selected_option.map(|option| option.value),
        user_id: wire.user.map(|user| user.id).unwrap_or_default(),
        trigger_id: wire.trigger_id,
        view_id: wire.view.map(|view| view.id),
    })
}

fn callback_event(event: WireEvent) -> SlackEvent {
    if event.kind != "app_home_opened" {
        return SlackEvent::Unsupported { event_type: event.kind };
    }

    SlackEvent::AppHomeOpened(AppHomeOpenedEvent {
        user_id: event.user,
        tab: event.tab,
        view_id: event.view.map(|view| view.id),
    })
}
