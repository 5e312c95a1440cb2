//! Pickup report form

use std::sync::Arc;
use std::time::Duration;

use super::{begin, request_failed, verbatim_or, ActionError};
use crate::client::{Backend, PickupReport};
use crate::page::{Completion, Control, Notice};

pub const REPORT_SENT: &str = "¡Reporte enviado con éxito! El lanchero ha sido notificado.";

pub const REPORT_SENT_DELAY: Duration = Duration::from_millis(2000);

pub struct ReportController<B: Backend> {
    backend: Arc<B>,
    submit_button: Control,
}

impl<B: Backend> ReportController<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            submit_button: Control::new("Enviar Reporte"),
        }
    }

    pub fn submit_button(&self) -> &Control {
        &self.submit_button
    }

    /// Send the report with its photo, then go back to the dashboard
    pub async fn submit(&self, report: &PickupReport) -> Result<Completion, ActionError> {
        let _busy = begin(&self.submit_button, "Enviando...")?;
        tracing::debug!(kg = %report.kg, foto = %report.foto.file_name, "Submitting pickup report");

        match self.backend.submit_report(report).await {
            Ok(_) => Ok(Completion::notice(Notice::Success(REPORT_SENT.to_string()))
                .then_navigate("/dashboard", REPORT_SENT_DELAY)),
            Err(e) => Err(request_failed(
                "submit_report",
                e,
                verbatim_or("Ocurrió un error al enviar el reporte."),
                "Error de conexión. Por favor, intenta de nuevo.",
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

    fn pickup() -> PickupReport {
        PickupReport {
            kg: "4.5".to_string(),
            ubicacion: "Frente al muelle".to_string(),
            foto: Attachment::new("bolsas.jpg", vec![0xFF, 0xD8]),
        }
    }

    #[tokio::test]
    async fn test_submit_success() {
        let backend = Arc::new(FakeBackend::new());
        let page = ReportController::new(Arc::clone(&backend));

        let done = page.submit(&pickup()).await.unwrap();
        assert_eq!(done.notice, Some(Notice::Success(REPORT_SENT.to_string())));
        assert_eq!(
            done.navigation,
            Some(Navigation::after("/dashboard", Duration::from_millis(2000)))
        );
        assert_eq!(backend.calls()[0], ("submit_report", "4.5:bolsas.jpg".to_string()));
        assert_eq!(page.submit_button().label(), "Enviar Reporte");
    }

    #[tokio::test]
    async fn test_submit_errors_restore_button() {
        let backend = Arc::new(
            FakeBackend::new()
                .with("submit_report", Reply::Reject(None))
                .with("submit_report", Reply::Down),
        );
        let page = ReportController::new(backend);

        let err = page.submit(&pickup()).await.unwrap_err();
        assert_eq!(err.user_message(), "Ocurrió un error al enviar el reporte.");
        let err = page.submit(&pickup()).await.unwrap_err();
        assert_eq!(err.user_message(), "Error de conexión. Por favor, intenta de nuevo.");
        assert!(!page.submit_button().is_disabled());
    }
}
