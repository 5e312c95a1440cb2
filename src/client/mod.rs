//! Backend API
//!
//! Everything the page controllers know about the backend goes through the
//! [`Backend`] trait. [`BackendClient`] is the HTTP implementation.
//!
//! ## Endpoints
//!
//! - `POST /` - login and registration (form-encoded, multipart with a boat photo)
//! - `POST /api/request-password-reset`, `POST /api/update-password`
//! - `GET /api/weekly_progress`, `GET /api/user`
//! - `GET /api/reportes`, `POST /api/reporte/recoger/{id}`
//! - `POST /admin/solicitud/procesar`
//! - `POST /perfil`, `POST /upload_avatar`, `POST /api/delete_account`
//! - `POST /reportar`, `GET /logout`

mod dto;
mod error;
mod http;
mod session;

pub use dto::{
    Ack, Attachment, LoginForm, PasswordUpdate, PickupReport, ProcessRequest, ProfileUpdate,
    RankedUser, RegistrationForm, Report, Reporter, RequestAction, Role, UserSnapshot,
    WeeklyProgress,
};
pub use error::{ClientError, ClientResult};
pub use http::{BackendClient, REQUEST_ID_HEADER};
pub use session::SessionStore;

use async_trait::async_trait;

/// Operations the backend offers to the page controllers.
///
/// Enveloped responses with `success: false` come back as
/// [`ClientError::Rejected`], so an `Ok` always means the backend accepted
/// the request.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn login(&self, form: &LoginForm) -> ClientResult<Ack>;

    async fn register(&self, form: &RegistrationForm) -> ClientResult<Ack>;

    /// Fire-and-forget; only transport failures are reported
    async fn request_password_reset(&self, email: &str) -> ClientResult<()>;

    async fn update_password(&self, update: &PasswordUpdate) -> ClientResult<Ack>;

    async fn weekly_progress(&self) -> ClientResult<WeeklyProgress>;

    async fn user_snapshot(&self) -> ClientResult<UserSnapshot>;

    async fn reports(&self) -> ClientResult<Vec<Report>>;

    async fn collect_report(&self, id: i64) -> ClientResult<Ack>;

    async fn process_request(&self, request: &ProcessRequest) -> ClientResult<Ack>;

    async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<Ack>;

    async fn upload_avatar(&self, avatar: &Attachment) -> ClientResult<Ack>;

    async fn delete_account(&self) -> ClientResult<Ack>;

    async fn submit_report(&self, report: &PickupReport) -> ClientResult<Ack>;

    async fn logout(&self) -> ClientResult<()>;
}
