//! Client error types.

use http::StatusCode;
use thiserror::Error;

use crate::auth::AuthError;
use crate::storage::StorageError;

/// Convenience alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the session layer and the request pipeline.
///
/// Every variant is cloneable so a single refresh outcome can be handed to
/// all requests waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("Server is not configured")]
    ServerNotConfigured,

    #[error("No refresh token stored")]
    MissingRefreshToken,

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Token refreshing failed: {0}")]
    RefreshFailed(String),

    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Response decode error: {0}")]
    Decode(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for a `401 Unauthorized` response.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// True for responses that invalidate the current session (401 / 403).
    pub fn is_session_invalidating(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
        )
    }

    /// True for failures worth retrying: transport errors and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Http { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(e: url::ParseError) -> Self {
        ClientError::InvalidUrl(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}
