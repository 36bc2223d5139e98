//! Routing tokens embedded in interactive elements.
//!
//! A review button carries `<operation>_<review id>` as both its `action_id` and `value`,
//! so the interaction that comes back names the review it belongs to without any server-side
//! session. The format is `^[a-z]+_[0-9]+$`.

use std::fmt;
use std::str::FromStr;

use swarmbot_core::ReviewId;
use thiserror::Error;

/// Action id of the home tab's review-type selector.
pub const CHANGE_REVIEW_TYPE: &str = "change_review_type";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionOperation {
    Details,
    Approve,
    Decline,
}

impl ActionOperation {
    pub const ALL: [ActionOperation; 3] = [Self::Details, Self::Approve, Self::Decline];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Details => "details",
            Self::Approve => "approve",
            Self::Decline => "decline",
        }
    }
}

impl fmt::Display for ActionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionOperation {
    type Err = ActionIdParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|operation| operation.as_str() == value)
            .ok_or_else(|| ActionIdParseError::UnknownOperation(value.to_owned()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActionId {
    pub operation: ActionOperation,
    pub review_id: ReviewId,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActionIdParseError {
    #[error("action id `{0}` does not match `<operation>_<review id>`")]
    Malformed(String),
    #[error("unknown action operation `{0}`")]
    UnknownOperation(String),
    #[error("review id in action id `{0}` is out of range")]
    KeyOutOfRange(String),
}

impl ActionId {
    pub fn new(operation: ActionOperation, review_id: ReviewId) -> Self {
        Self { operation, review_id }
    }

    pub fn details(review_id: ReviewId) -> Self {
        Self::new(ActionOperation::Details, review_id)
    }

    pub fn approve(review_id: ReviewId) -> Self {
        Self::new(ActionOperation::Approve, review_id)
    }

    pub fn decline(review_id: ReviewId) -> Self {
        Self::new(ActionOperation::Decline, review_id)
    }

    pub fn encode(&self) -> String {
        encode(self.operation, self.review_id)
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.operation, self.review_id)
    }
}

impl FromStr for ActionId {
    type Err = ActionIdParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        decode(value)
    }
}

pub fn encode(operation: ActionOperation, review_id: ReviewId) -> String {
    format!("{operation}_{review_id}")
}

pub fn decode(value: &str) -> Result<ActionId, ActionIdParseError> {
    let malformed = || ActionIdParseError::Malformed(value.to_owned());

    let (operation, key) = value.split_once('_').ok_or_else(malformed)?;
    if operation.is_empty() || !operation.bytes().all(|byte| byte.is_ascii_lowercase()) {
        return Err(malformed());
    }
    if key.is_empty() || !key.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(malformed());
    }

    let operation = operation.parse::<ActionOperation>()?;
    let review_id =
        key.parse::<u64>().map_err(|_| ActionIdParseError::KeyOutOfRange(value.to_owned()))?;

    Ok(ActionId { operation, review_id: ReviewId(review_id) })
}
