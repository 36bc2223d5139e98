//! Slack interface for Helix Swarm reviews.
//!
//! - **Socket Mode** (`socket`, `envelope`) - event loop and frame decoding
//! - **Slash Commands** (`commands`) - `/hello`, `/user <name>`, `/changelist <id>`
//! - **Events** (`events`) - dispatcher for commands, button/menu actions and home tab opens
//! - **Views** (`compose`, `blocks`) - Block Kit rendering of reviews and users
//! - **Action ids** (`action_id`) - `<operation>_<review id>` routing tokens
//! - **Web API** (`web_api`) - `views.open`, `views.update` and `views.publish` port
//!
//! # Architecture
//!
//! ```text
//! Slack envelope → EventDispatcher → Handler → ReviewSource (Swarm)
//!                                       ↓
//!                  ack payload ← ViewComposer → SlackWebApi (views.*)
//! ```
//!
//! Handlers keep no state between interactions: the home tab's review type is read back
//! from the selector and review buttons carry their review id in the action id.

pub mod action_id;
pub mod blocks;
pub mod commands;
pub mod compose;
pub mod envelope;
pub mod events;
pub mod socket;
pub mod web_api;
