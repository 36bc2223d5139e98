use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

use crate::blocks::View;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ViewApiError {
    /// Slack answered `ok: false`; carries the API error string (e.g. `expired_trigger_id`).
    #[error("slack api `{method}` failed: {error}")]
    Api { method: String, error: String },
    #[error("slack api transport failed: {0}")]
    Transport(String),
}

impl ViewApiError {
    pub fn api(method: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Api { method: method.into(), error: error.into() }
    }

    /// Short text suitable for a failure acknowledgment.
    pub fn reason(&self) -> &str {
        match self {
            Self::Api { error, .. } => error,
            Self::Transport(message) => message,
        }
    }
}

/// Outbound surface effects. One call per interaction at most.
#[async_trait]
pub trait SlackWebApi: Send + Sync {
    /// `views.open`
    async fn open_view(&self, trigger_id: &str, view: &View) -> Result<(), ViewApiError>;
    /// `views.update`
    async fn update_view(&self, view_id: &str, view: &View) -> Result<(), ViewApiError>;
    /// `views.publish`
    async fn publish_view(&self, user_id: &str, view: &View) -> Result<(), ViewApiError>;
}

#[async_trait]
impl<W> SlackWebApi for Arc<W>
where
    W: SlackWebApi + ?Sized,
{
    async fn open_view(&self, trigger_id: &str, view: &View) -> Result<(), ViewApiError> {
        (**self).open_view(trigger_id, view).await
    }

    async fn update_view(&self, view_id: &str, view: &View) -> Result<(), ViewApiError> {
        (**self).update_view(view_id, view).await
    }

    async fn publish_view(&self, user_id: &str, view: &View) -> Result<(), ViewApiError> {
        (**self).publish_view(user_id, view).await
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewCall {
    Open { trigger_id: String, view: View },
    Update { view_id: String, view: View },
    Publish { user_id: String, view: View },
}

/// Records every view call and optionally fails them all. Used by tests.
#[derive(Debug, Default)]
pub struct RecordingSlackWebApi {
    calls: Mutex<Vec<ViewCall>>,
    failure: Option<ViewApiError>,
}

impl RecordingSlackWebApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_with(error: ViewApiError) -> Self {
        Self { calls: Mutex::default(), failure: Some(error) }
    }

    pub fn calls(&self) -> Vec<ViewCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, call: ViewCall) -> Result<(), ViewApiError> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SlackWebApi for RecordingSlackWebApi {
    async fn open_view(&self, trigger_id: &str, view: &View) -> Result<(), ViewApiError> {
        self.record(ViewCall::Open { trigger_id: trigger_id.to_owned(), view: view.clone() })
    }

    async fn update_view(&self, view_id: &str, view: &View) -> Result<(), ViewApiError> {
        self.record(ViewCall::Update { view_id: view_id.to_owned(), view: view.clone() })
    }

    async fn publish_view(&self, user_id: &str, view: &View) -> Result<(), ViewApiError> {
        self.record(ViewCall::Publish { user_id: user_id.to_owned(), view: view.clone() })
    }
}
