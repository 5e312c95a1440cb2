//! Backend REST API Client
//!
//! HTTP client for the Chocó Limpio web backend. The backend keeps its
//! session in a cookie, so every client owns a cookie jar that can be
//! exported and restored between runs.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use super::dto::*;
use super::error::{ClientError, ClientResult};
use super::Backend;
use crate::config::BackendConfig;

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// HTTP implementation of [`Backend`]
pub struct BackendClient {
    client: Client,
    base_url: Url,
    jar: Arc<Jar>,
}

impl BackendClient {
    /// Create a client with an empty cookie jar
    pub fn new(config: &BackendConfig) -> ClientResult<Self> {
        Self::with_session(config, None)
    }

    /// Create a client, restoring a previously exported session cookie
    pub fn with_session(config: &BackendConfig, session: Option<&str>) -> ClientResult<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let jar = Arc::new(Jar::default());
        if let Some(cookies) = session {
            for cookie in cookies.split(';').map(str::trim).filter(|c| !c.is_empty()) {
                jar.add_cookie_str(cookie, &base_url);
            }
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(ClientError::Request)?;

        Ok(Self {
            client,
            base_url,
            jar,
        })
    }

    /// Current session cookie header, suitable for [`BackendClient::with_session`]
    pub fn session_cookie(&self) -> Option<String> {
        self.jar
            .cookies(&self.base_url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Path with a timestamp query parameter so intermediaries never serve a stale copy
    fn cache_busted(&self, path: &str, param: &str) -> String {
        format!("{}?{}={}", self.url(path), param, Utc::now().timestamp_millis())
    }

    /// Attach a request id, send, and classify transport failures
    async fn send(&self, request: RequestBuilder, endpoint: &'static str) -> ClientResult<Response> {
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::debug_span!("backend_request", request_id = %request_id, endpoint);

        async move {
            tracing::debug!("Sending backend request");
            let response = request
                .header(REQUEST_ID_HEADER, &request_id)
                .send()
                .await
                .map_err(|e| {
                    tracing::debug!(error = %e, "Backend request failed");
                    ClientError::classify(e)
                })?;

            tracing::debug!(status = response.status().as_u16(), "Backend responded");
            Ok(response)
        }
        .instrument(span)
        .await
    }

    /// Decode a JSON body. Error statuses are tolerated when the body still parses,
    /// because the backend reports failures as `{"success": false}` with 4xx/5xx codes.
    async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let status = response.status();
        let body = response.text().await.map_err(ClientError::classify)?;

        match serde_json::from_str::<T>(&body) {
            Ok(value) => Ok(value),
            Err(e) if status.is_success() => Err(ClientError::Decode(e.to_string())),
            Err(_) => Err(ClientError::Status {
                status: status.as_u16(),
                message: body,
            }),
        }
    }

    /// Decode an enveloped body and turn `success: false` into [`ClientError::Rejected`]
    async fn read_enveloped<T: DeserializeOwned + Enveloped>(response: Response) -> ClientResult<T> {
        let mut value: T = Self::read_json(response).await?;
        if value.succeeded() {
            Ok(value)
        } else {
            Err(ClientError::Rejected {
                message: value.take_error(),
            })
        }
    }

    fn attachment_part(attachment: &Attachment) -> ClientResult<Part> {
        Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name.clone())
            .mime_str(attachment.mime())
            .map_err(ClientError::Request)
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn login(&self, form: &LoginForm) -> ClientResult<Ack> {
        let fields = [
            ("action", "login"),
            ("identificador", form.identificador.trim()),
            ("contraseña", form.contrasena.as_str()),
        ];
        let response = self
            .send(self.client.post(self.url("/")).form(&fields), "login")
            .await?;
        Self::read_enveloped(response).await
    }

    async fn register(&self, form: &RegistrationForm) -> ClientResult<Ack> {
        let request = self.client.post(self.url("/"));
        let request = match &form.foto_lancha {
            Some(photo) => {
                let mut multipart = Form::new();
                for (key, value) in form.fields() {
                    multipart = multipart.text(key, value);
                }
                request.multipart(multipart.part("foto_lancha", Self::attachment_part(photo)?))
            }
            None => request.form(&form.fields()),
        };

        let response = self.send(request, "register").await?;
        Self::read_enveloped(response).await
    }

    async fn request_password_reset(&self, email: &str) -> ClientResult<()> {
        let fields = [("email", email.trim())];
        // Status and body are ignored; callers always show the same notice.
        self.send(
            self.client
                .post(self.url("/api/request-password-reset"))
                .form(&fields),
            "request_password_reset",
        )
        .await?;
        Ok(())
    }

    async fn update_password(&self, update: &PasswordUpdate) -> ClientResult<Ack> {
        let response = self
            .send(
                self.client.post(self.url("/api/update-password")).json(update),
                "update_password",
            )
            .await?;
        Self::read_enveloped(response).await
    }

    async fn weekly_progress(&self) -> ClientResult<WeeklyProgress> {
        let response = self
            .send(self.client.get(self.url("/api/weekly_progress")), "weekly_progress")
            .await?;
        Self::read_enveloped(response).await
    }

    async fn user_snapshot(&self) -> ClientResult<UserSnapshot> {
        let response = self
            .send(self.client.get(self.cache_busted("/api/user", "t")), "user_snapshot")
            .await?;
        Self::read_enveloped(response).await
    }

    async fn reports(&self) -> ClientResult<Vec<Report>> {
        let response = self
            .send(self.client.get(self.cache_busted("/api/reportes", "_")), "reports")
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Self::read_json(response).await
    }

    async fn collect_report(&self, id: i64) -> ClientResult<Ack> {
        let path = format!("/api/reporte/recoger/{}", id);
        let response = self
            .send(self.client.post(self.url(&path)), "collect_report")
            .await?;
        Self::read_enveloped(response).await
    }

    async fn process_request(&self, request: &ProcessRequest) -> ClientResult<Ack> {
        let response = self
            .send(
                self.client
                    .post(self.url("/admin/solicitud/procesar"))
                    .json(request),
                "process_request",
            )
            .await?;
        Self::read_enveloped(response).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<Ack> {
        let response = self
            .send(self.client.post(self.url("/perfil")).json(update), "update_profile")
            .await?;
        Self::read_enveloped(response).await
    }

    async fn upload_avatar(&self, avatar: &Attachment) -> ClientResult<Ack> {
        let form = Form::new().part("avatar", Self::attachment_part(avatar)?);
        let response = self
            .send(
                self.client.post(self.url("/upload_avatar")).multipart(form),
                "upload_avatar",
            )
            .await?;
        Self::read_enveloped(response).await
    }

    async fn delete_account(&self) -> ClientResult<Ack> {
        let response = self
            .send(self.client.post(self.url("/api/delete_account")), "delete_account")
            .await?;
        Self::read_enveloped(response).await
    }

    async fn submit_report(&self, report: &PickupReport) -> ClientResult<Ack> {
        let form = Form::new()
            .text("kg", report.kg.trim().to_string())
            .text("ubicacion", report.ubicacion.trim().to_string())
            .part("foto", Self::attachment_part(&report.foto)?);
        let response = self
            .send(self.client.post(self.url("/reportar")).multipart(form), "submit_report")
            .await?;
        Self::read_enveloped(response).await
    }

    async fn logout(&self) -> ClientResult<()> {
        self.send(self.client.get(self.url("/logout")), "logout").await?;
        Ok(())
    }
}
