use thiserror::Error;

/// Outcome of a failed Swarm read.
///
/// `NotFound` is a normal answer (the entity is absent or the backend refused the lookup)
/// and is shown to the user as such. `Upstream` covers everything that means the backend
/// could not be asked or did not answer sensibly.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SwarmError {
    #[error("{resource} not found")]
    NotFound { resource: String },
    #[error("swarm request failed: {0}")]
    Upstream(String),
}

impl SwarmError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "The request could not be processed.",
            Self::NotFound { .. } => "The requested item was not found.",
            Self::ServiceUnavailable { .. } => "Error retrieving reviews",
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::ServiceUnavailable { .. } | Self::Internal { .. } => 500,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl SwarmError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        match self {
            Self::NotFound { resource } => {
                InterfaceError::NotFound { message: format!("{resource} not found"), correlation_id }
            }
            Self::Upstream(message) => InterfaceError::ServiceUnavailable { message, correlation_id },
        }
    }
}
