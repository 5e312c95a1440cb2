//! Page Controllers
//!
//! One controller per page. Each owns its controls and sections, talks to
//! the backend only through [`Backend`](crate::client::Backend), and reports
//! the outcome of a user action as a [`Completion`](crate::page::Completion)
//! or an [`ActionError`] whose message is what the page shows.

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod profile;
pub mod report;
pub mod worklist;

#[cfg(test)]
pub(crate) mod testing;

pub use admin::AdminController;
pub use auth::{AuthController, PasswordResetController};
pub use dashboard::DashboardController;
pub use profile::ProfileController;
pub use report::ReportController;
pub use worklist::WorklistController;

use thiserror::Error;

use crate::client::ClientError;
use crate::page::{BusyGuard, Control, Notice};
use crate::validation::ValidationError;

/// Why a user action did not complete
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// Client-side validation failed; nothing was sent
    #[error("{0}")]
    Invalid(#[from] ValidationError),

    /// The backend refused the request
    #[error("{0}")]
    Rejected(String),

    /// The request never got a usable answer
    #[error("{0}")]
    Connection(String),

    /// The user declined the confirmation prompt
    #[error("{0}")]
    Cancelled(String),

    /// The control is disabled while a previous request is in flight
    #[error("La solicitud anterior sigue en curso.")]
    Busy,
}

impl ActionError {
    /// Message shown on the page
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn notice(&self) -> Notice {
        Notice::Error(self.user_message())
    }
}

/// Disable `control` for the length of one request
pub(crate) fn begin(control: &Control, busy_label: &str) -> Result<BusyGuard, ActionError> {
    control.try_begin(busy_label).ok_or(ActionError::Busy)
}

/// Map a backend failure: rejections go through `on_reject` with the
/// server's message, anything else becomes the fixed `connection` message.
pub(crate) fn request_failed(
    action: &'static str,
    error: ClientError,
    on_reject: impl FnOnce(Option<&str>) -> String,
    connection: &str,
) -> ActionError {
    if error.is_rejection() {
        tracing::info!(action, error = %error, "Backend rejected request");
        ActionError::Rejected(on_reject(error.server_message()))
    } else {
        tracing::warn!(action, error = %error, "Request failed");
        ActionError::Connection(connection.to_string())
    }
}

/// The server's message verbatim, or `fallback` when it sent none
pub(crate) fn verbatim_or(fallback: &'static str) -> impl FnOnce(Option<&str>) -> String {
    move |message: Option<&str>| message.unwrap_or(fallback).to_string()
}
