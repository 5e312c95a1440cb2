//! Sign-in page: login, registration and password reset

use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{begin, request_failed, verbatim_or, ActionError};
use crate::client::{Backend, LoginForm, PasswordUpdate, RegistrationForm, Role};
use crate::page::{Completion, Control, Notice};
use crate::validation::{
    validate_new_password, validate_optional_birth_date, validate_password_length,
    validate_phone, ValidationError,
};

const CONNECTION_ERROR: &str = "Error de conexión";

pub const RESET_REQUESTED: &str =
    "Si tu correo está registrado, recibirás un enlace para restablecer tu contraseña en breve.";

pub const INVALID_RESET_TOKEN: &str =
    "Token de recuperación inválido o no encontrado. Por favor, solicita un nuevo enlace.";

pub const PASSWORD_UPDATED: &str =
    "¡Contraseña actualizada con éxito! Redirigiendo al inicio de sesión...";

/// Delay before leaving the reset page after a successful update
pub const PASSWORD_UPDATED_REDIRECT_DELAY: Duration = Duration::from_millis(3000);

/// Registration rules in display order: phone, birth date, password,
/// collector fields. The first failure wins.
pub fn validate_registration(form: &RegistrationForm, today: NaiveDate) -> Result<(), ValidationError> {
    validate_phone(form.telefono.trim())?;
    validate_optional_birth_date(&form.fecha_nac, today)?;
    validate_password_length(&form.contrasena)?;

    if form.rol == Role::Lanchero {
        let has_message = form
            .mensaje_lanchero
            .as_deref()
            .is_some_and(|m| !m.trim().is_empty());
        if !has_message || form.foto_lancha.is_none() {
            return Err(ValidationError::CollectorFieldsMissing);
        }
    }
    Ok(())
}

/// Login, registration and reset-link request forms
pub struct AuthController<B: Backend> {
    backend: Arc<B>,
    login_button: Control,
    register_button: Control,
    reset_request_button: Control,
}

impl<B: Backend> AuthController<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            login_button: Control::new("Entrar"),
            register_button: Control::new("Registrarse"),
            reset_request_button: Control::new("Enviar enlace"),
        }
    }

    pub fn login_button(&self) -> &Control {
        &self.login_button
    }

    pub fn register_button(&self) -> &Control {
        &self.register_button
    }

    pub fn reset_request_button(&self) -> &Control {
        &self.reset_request_button
    }

    /// Sign in and follow the server's redirect
    pub async fn login(&self, form: &LoginForm) -> Result<Completion, ActionError> {
        let _busy = begin(&self.login_button, "Entrando...")?;
        tracing::debug!(identificador = %form.identificador.trim(), "Submitting login");

        match self.backend.login(form).await {
            Ok(ack) => match ack.redirect {
                Some(target) => Ok(Completion::redirect(target)),
                None => Err(ActionError::Rejected(
                    ack.error.unwrap_or_else(|| "Error desconocido".to_string()),
                )),
            },
            Err(e) => Err(request_failed(
                "login",
                e,
                verbatim_or("Error desconocido"),
                CONNECTION_ERROR,
            )),
        }
    }

    /// Validate, then create the account
    pub async fn register(
        &self,
        form: &RegistrationForm,
        today: NaiveDate,
    ) -> Result<Completion, ActionError> {
        validate_registration(form, today)?;
        let _busy = begin(&self.register_button, "Registrando...")?;
        tracing::debug!(rol = form.rol.as_str(), "Submitting registration");

        match self.backend.register(form).await {
            Ok(ack) => match ack.redirect {
                Some(target) => Ok(Completion::redirect(target)),
                None => Err(ActionError::Rejected(
                    ack.error.unwrap_or_else(|| "Error al registrarse".to_string()),
                )),
            },
            Err(e) => Err(request_failed(
                "register",
                e,
                verbatim_or("Error al registrarse"),
                CONNECTION_ERROR,
            )),
        }
    }

    /// Ask for a reset link. The answer never reveals whether the address
    /// exists, so every outcome shows the same notice.
    pub async fn request_password_reset(&self, email: &str) -> Result<Completion, ActionError> {
        let _busy = begin(&self.reset_request_button, "Enviando...")?;

        if let Err(e) = self.backend.request_password_reset(email).await {
            tracing::warn!(error = %e, "Password reset request failed");
        }
        Ok(Completion::notice(Notice::Info(RESET_REQUESTED.to_string())))
    }
}

/// Read `access_token` from the fragment of a reset link
pub fn access_token_from_url(url: &str) -> Option<String> {
    let (_, fragment) = url.split_once('#')?;
    fragment
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "access_token")
        .and_then(|(_, value)| {
            // Form encoding in fragments uses '+' for spaces
            let value = value.replace('+', " ");
            urlencoding::decode(&value).ok().map(|v| v.into_owned())
        })
        .filter(|token| !token.is_empty())
}

/// New-password form reached from the emailed link
pub struct PasswordResetController<B: Backend> {
    backend: Arc<B>,
    access_token: Option<String>,
    form_hidden: AtomicBool,
    submit_button: Control,
}

impl<B: Backend> PasswordResetController<B> {
    /// Set up the page for `url`. Without a token the form starts hidden.
    pub fn from_url(backend: Arc<B>, url: &str) -> Self {
        let access_token = access_token_from_url(url);
        if access_token.is_none() {
            tracing::warn!("Reset link has no access token");
        }
        Self {
            backend,
            form_hidden: AtomicBool::new(access_token.is_none()),
            access_token,
            submit_button: Control::new("Guardar contraseña"),
        }
    }

    /// Notice shown as soon as the page loads
    pub fn initial_notice(&self) -> Option<Notice> {
        self.access_token
            .is_none()
            .then(|| Notice::Error(INVALID_RESET_TOKEN.to_string()))
    }

    pub fn is_form_hidden(&self) -> bool {
        self.form_hidden.load(Ordering::SeqCst)
    }

    pub fn submit_button(&self) -> &Control {
        &self.submit_button
    }

    pub async fn submit(
        &self,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<Completion, ActionError> {
        let access_token = match &self.access_token {
            Some(token) if !self.is_form_hidden() => token.clone(),
            _ => return Err(ActionError::Rejected(INVALID_RESET_TOKEN.to_string())),
        };
        validate_new_password(new_password, confirm_password)?;
        let _busy = begin(&self.submit_button, "Guardando...")?;

        let update = PasswordUpdate {
            access_token,
            new_password: new_password.to_string(),
        };
        match self.backend.update_password(&update).await {
            Ok(_) => {
                self.form_hidden.store(true, Ordering::SeqCst);
                Ok(
                    Completion::notice(Notice::Success(PASSWORD_UPDATED.to_string()))
                        .then_navigate("/", PASSWORD_UPDATED_REDIRECT_DELAY),
                )
            }
            Err(e) => Err(request_failed(
                "update_password",
                e,
                verbatim_or("No se pudo actualizar la contraseña."),
                CONNECTION_ERROR,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Attachment;
    use crate::controllers::testing::{FakeBackend, Reply};
    use crate::page::Navigation;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn registration() -> RegistrationForm {
        RegistrationForm {
            nombre: "Ana Palacios".to_string(),
            telefono: "3001234567".to_string(),
            email: "ana@example.org".to_string(),
            barrio: "Kennedy".to_string(),
            contrasena: "secreto".to_string(),
            fecha_nac: "2000-01-01".to_string(),
            ..Default::default()
        }
    }

    fn login_form() -> LoginForm {
        LoginForm {
            identificador: "ana@example.org".to_string(),
            contrasena: "secreto".to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_follows_redirect_and_restores_button() {
        let backend = Arc::new(FakeBackend::new().with("login", Reply::redirect("/lanchero")));
        let auth = AuthController::new(Arc::clone(&backend));

        let done = auth.login(&login_form()).await.unwrap();
        assert_eq!(done.navigation, Some(Navigation::now("/lanchero")));
        assert_eq!(auth.login_button().label(), "Entrar");
        assert!(!auth.login_button().is_disabled());
    }

    #[tokio::test]
    async fn test_login_errors() {
        let backend = Arc::new(
            FakeBackend::new()
                .with("login", Reply::reject("Contraseña incorrecta"))
                .with("login", Reply::Reject(None))
                .with("login", Reply::ok())
                .with("login", Reply::Down),
        );
        let auth = AuthController::new(backend);

        let messages: Vec<String> = {
            let mut out = Vec::new();
            for _ in 0..4 {
                out.push(auth.login(&login_form()).await.unwrap_err().user_message());
            }
            out
        };
        assert_eq!(
            messages,
            vec![
                "Contraseña incorrecta",
                "Error desconocido",
                "Error desconocido",
                "Error de conexión"
            ]
        );
        assert!(!auth.login_button().is_disabled());
    }

    #[tokio::test]
    async fn test_login_refused_while_in_flight() {
        let backend = Arc::new(FakeBackend::new().with(
            "login",
            Reply::Slow(Duration::from_millis(100), Box::new(Reply::redirect("/dashboard"))),
        ));
        let auth = Arc::new(AuthController::new(Arc::clone(&backend)));

        let first = {
            let auth = Arc::clone(&auth);
            tokio::spawn(async move { auth.login(&login_form()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(auth.login_button().label(), "Entrando...");
        assert_eq!(auth.login(&login_form()).await, Err(ActionError::Busy));

        assert!(first.await.unwrap().is_ok());
        assert_eq!(backend.count("login"), 1);
    }

    #[tokio::test]
    async fn test_register_invalid_phone_sends_nothing() {
        let backend = Arc::new(FakeBackend::new());
        let auth = AuthController::new(Arc::clone(&backend));
        let form = RegistrationForm {
            telefono: "2991234567".to_string(),
            ..registration()
        };

        let err = auth.register(&form, today()).await.unwrap_err();
        assert_eq!(err.user_message(), "Teléfono inválido (10 dígitos, empieza con 3)");
        assert!(backend.calls().is_empty());
        assert_eq!(auth.register_button().label(), "Registrarse");
    }

    #[test]
    fn test_registration_rule_order() {
        let form = RegistrationForm {
            telefono: "123".to_string(),
            fecha_nac: "2010-01-01".to_string(),
            contrasena: "abc".to_string(),
            ..registration()
        };
        assert_eq!(validate_registration(&form, today()), Err(ValidationError::InvalidPhone));

        let form = RegistrationForm {
            fecha_nac: "2010-01-01".to_string(),
            contrasena: "abc".to_string(),
            ..registration()
        };
        assert_eq!(validate_registration(&form, today()), Err(ValidationError::Underage));

        let form = RegistrationForm {
            contrasena: "abc".to_string(),
            ..registration()
        };
        assert_eq!(
            validate_registration(&form, today()),
            Err(ValidationError::PasswordTooShort)
        );
    }

    #[test]
    fn test_birth_date_boundaries() {
        let exactly_18 = RegistrationForm {
            fecha_nac: "2006-06-15".to_string(),
            ..registration()
        };
        assert_eq!(validate_registration(&exactly_18, today()), Ok(()));

        let one_day_short = RegistrationForm {
            fecha_nac: "2006-06-16".to_string(),
            ..registration()
        };
        assert_eq!(
            validate_registration(&one_day_short, today()),
            Err(ValidationError::Underage)
        );

        let future = RegistrationForm {
            fecha_nac: "2030-01-01".to_string(),
            ..registration()
        };
        assert_eq!(
            validate_registration(&future, today()),
            Err(ValidationError::BirthDateInFuture)
        );

        let blank = RegistrationForm {
            fecha_nac: String::new(),
            ..registration()
        };
        assert_eq!(validate_registration(&blank, today()), Ok(()));
    }

    #[test]
    fn test_collector_requires_message_and_photo() {
        let mut form = RegistrationForm {
            rol: Role::Lanchero,
            mensaje_lanchero: Some("  ".to_string()),
            foto_lancha: Some(Attachment::new("lancha.jpg", vec![1, 2, 3])),
            ..registration()
        };
        assert_eq!(
            validate_registration(&form, today()),
            Err(ValidationError::CollectorFieldsMissing)
        );

        form.mensaje_lanchero = Some("Tengo lancha con motor".to_string());
        assert_eq!(validate_registration(&form, today()), Ok(()));

        form.foto_lancha = None;
        assert_eq!(
            validate_registration(&form, today()),
            Err(ValidationError::CollectorFieldsMissing)
        );
    }

    #[tokio::test]
    async fn test_register_success_and_fallback() {
        let backend = Arc::new(
            FakeBackend::new()
                .with("register", Reply::redirect("/dashboard"))
                .with("register", Reply::Reject(None)),
        );
        let auth = AuthController::new(Arc::clone(&backend));

        let done = auth.register(&registration(), today()).await.unwrap();
        assert_eq!(done.navigation, Some(Navigation::now("/dashboard")));

        let err = auth.register(&registration(), today()).await.unwrap_err();
        assert_eq!(err.user_message(), "Error al registrarse");
        assert_eq!(backend.calls()[0], ("register", "3001234567:false".to_string()));
    }

    #[tokio::test]
    async fn test_reset_request_always_shows_notice() {
        let backend = Arc::new(FakeBackend::new().with("request_password_reset", Reply::Down));
        let auth = AuthController::new(Arc::clone(&backend));

        for _ in 0..2 {
            let done = auth.request_password_reset("nadie@example.org").await.unwrap();
            assert_eq!(done.notice, Some(Notice::Info(RESET_REQUESTED.to_string())));
        }
        assert_eq!(backend.count("request_password_reset"), 2);
        assert_eq!(auth.reset_request_button().label(), "Enviar enlace");
    }

    #[test]
    fn test_access_token_from_url() {
        assert_eq!(
            access_token_from_url("https://x.org/reset#access_token=abc%2B1&type=recovery").as_deref(),
            Some("abc+1")
        );
        assert_eq!(
            access_token_from_url("https://x.org/reset#type=recovery&access_token=xyz").as_deref(),
            Some("xyz")
        );
        assert_eq!(access_token_from_url("https://x.org/reset"), None);
        assert_eq!(access_token_from_url("https://x.org/reset#access_token="), None);
        assert_eq!(access_token_from_url("https://x.org/reset?access_token=abc"), None);
    }

    #[tokio::test]
    async fn test_reset_without_token_hides_form() {
        let backend = Arc::new(FakeBackend::new());
        let page = PasswordResetController::from_url(Arc::clone(&backend), "https://x.org/reset");

        assert!(page.is_form_hidden());
        assert_eq!(
            page.initial_notice(),
            Some(Notice::Error(INVALID_RESET_TOKEN.to_string()))
        );
        assert!(page.submit("secreto", "secreto").await.is_err());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reset_mismatch_is_not_sent() {
        let backend = Arc::new(FakeBackend::new());
        let page = PasswordResetController::from_url(
            Arc::clone(&backend),
            "https://x.org/reset#access_token=tok",
        );

        let err = page.submit("secreto1", "secreto2").await.unwrap_err();
        assert_eq!(err.user_message(), "Las contraseñas no coinciden.");
        let err = page.submit("abc", "abc").await.unwrap_err();
        assert_eq!(err.user_message(), "La contraseña debe tener al menos 6 caracteres.");
        assert!(backend.calls().is_empty());
        assert!(!page.is_form_hidden());
    }

    #[tokio::test]
    async fn test_reset_success_navigates_home_after_delay() {
        let backend = Arc::new(
            FakeBackend::new()
                .with("update_password", Reply::reject("Token expirado"))
                .with("update_password", Reply::ok()),
        );
        let page = PasswordResetController::from_url(
            Arc::clone(&backend),
            "https://x.org/reset#access_token=tok",
        );
        assert_eq!(page.initial_notice(), None);

        let err = page.submit("secreto1", "secreto1").await.unwrap_err();
        assert_eq!(err.user_message(), "Token expirado");

        let done = page.submit("secreto1", "secreto1").await.unwrap();
        assert_eq!(done.notice, Some(Notice::Success(PASSWORD_UPDATED.to_string())));
        assert_eq!(
            done.navigation,
            Some(Navigation::after("/", Duration::from_millis(3000)))
        );
        assert!(page.is_form_hidden());
        assert_eq!(backend.calls()[1], ("update_password", "tok".to_string()));
    }
}
