//! Backend client error types

use thiserror::Error;

/// Errors that can occur when talking to the Chocó Limpio backend
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Backend unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),

    /// The backend answered `{"success": false, "error": ...}`
    #[error("Rejected by backend: {}", message.as_deref().unwrap_or("no message"))]
    Rejected { message: Option<String> },

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Map a reqwest failure the same way for every endpoint
    pub(crate) fn classify(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_connect() {
            ClientError::Unavailable
        } else {
            ClientError::Request(e)
        }
    }

    /// The message the backend asked us to show, if it sent one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Rejected { message } => message.as_deref().filter(|m| !m.is_empty()),
            _ => None,
        }
    }

    /// True for failures reported by the backend itself rather than the transport
    pub fn is_rejection(&self) -> bool {
        matches!(self, ClientError::Rejected { .. })
    }
}

/// Result type for backend operations
pub type ClientResult<T> = Result<T, ClientError>;
