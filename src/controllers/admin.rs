//! Admin review of collector applications

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{begin, request_failed, ActionError};
use crate::client::{Backend, ProcessRequest, RequestAction};
use crate::confirm::Confirm;
use crate::page::{Completion, Control};
use crate::view::{Element, ViewNode};

pub const APPROVE_CONFIRMATION: &str = "¿Estás seguro de que quieres aprobar a este lanchero?";

pub const REJECT_CONFIRMATION: &str =
    "¿Estás seguro de que quieres rechazar y eliminar a este usuario? Esta acción no se puede deshacer.";

/// How long a processed row fades before it is removed
pub const DEFAULT_FADE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Visible,
    FadingOut,
}

#[derive(Debug, Clone)]
struct RequestRow {
    solicitud_id: String,
    control: Control,
    state: RowState,
}

pub struct AdminController<B: Backend> {
    backend: Arc<B>,
    confirm: Arc<dyn Confirm>,
    rows: Arc<Mutex<Vec<RequestRow>>>,
    fade: Duration,
}

fn lock_rows(rows: &Mutex<Vec<RequestRow>>) -> MutexGuard<'_, Vec<RequestRow>> {
    rows.lock().unwrap_or_else(|p| p.into_inner())
}

impl<B: Backend> AdminController<B> {
    /// Page listing the pending applications `solicitud_ids`
    pub fn new(
        backend: Arc<B>,
        confirm: Arc<dyn Confirm>,
        solicitud_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        let rows = solicitud_ids
            .into_iter()
            .map(|solicitud_id| RequestRow {
                solicitud_id,
                control: Control::new("Procesar"),
                state: RowState::Visible,
            })
            .collect();

        Self {
            backend,
            confirm,
            rows: Arc::new(Mutex::new(rows)),
            fade: DEFAULT_FADE,
        }
    }

    pub fn with_fade(mut self, fade: Duration) -> Self {
        self.fade = fade;
        self
    }

    /// Rows still on the page, in order
    pub fn rows(&self) -> Vec<(String, RowState)> {
        lock_rows(&self.rows)
            .iter()
            .map(|row| (row.solicitud_id.clone(), row.state))
            .collect()
    }

    pub fn control(&self, solicitud_id: &str) -> Option<Control> {
        lock_rows(&self.rows)
            .iter()
            .find(|row| row.solicitud_id == solicitud_id)
            .map(|row| row.control.clone())
    }

    /// Applications table; fading rows carry the opacity transition
    pub fn view(&self) -> ViewNode {
        let rows = lock_rows(&self.rows);
        let body = rows.iter().map(|row| {
            let tr = Element::new("tr")
                .attr("data-id", row.solicitud_id.clone())
                .child(Element::new("td").text(row.solicitud_id.clone()));
            match row.state {
                RowState::Visible => tr,
                RowState::FadingOut => tr.attr("style", "transition: opacity 0.5s ease; opacity: 0"),
            }
        });

        Element::new("table")
            .class("table solicitudes")
            .child(Element::new("tbody").children(body))
            .into()
    }

    /// Confirm, then approve or reject one application. On success the row
    /// fades out and is removed once the fade is over.
    pub async fn process(
        &self,
        solicitud_id: &str,
        action: RequestAction,
    ) -> Result<Completion, ActionError> {
        let (control, state) = lock_rows(&self.rows)
            .iter()
            .find(|row| row.solicitud_id == solicitud_id)
            .map(|row| (row.control.clone(), row.state))
            .ok_or_else(|| {
                ActionError::Rejected(format!("Solicitud {} no encontrada.", solicitud_id))
            })?;
        // A processed row stays refused until it is removed
        if control.is_disabled() || state == RowState::FadingOut {
            return Err(ActionError::Busy);
        }

        let question = match action {
            RequestAction::Approve => APPROVE_CONFIRMATION,
            RequestAction::Reject => REJECT_CONFIRMATION,
        };
        if !self.confirm.confirm(question).await {
            return Err(ActionError::Cancelled("Acción cancelada.".to_string()));
        }

        let _busy = begin(&control, "Procesando...")?;
        let request = ProcessRequest {
            solicitud_id: solicitud_id.to_string(),
            accion: action,
        };

        if let Err(e) = self.backend.process_request(&request).await {
            return Err(request_failed(
                "process_request",
                e,
                |message| {
                    format!(
                        "Error al procesar la solicitud: {}",
                        message.unwrap_or("Error desconocido")
                    )
                },
                "Error de conexión al procesar la solicitud.",
            ));
        }

        tracing::info!(solicitud_id, accion = ?action, "Application processed");
        self.fade_out(solicitud_id);
        Ok(Completion::default())
    }

    fn fade_out(&self, solicitud_id: &str) {
        if let Some(row) = lock_rows(&self.rows)
            .iter_mut()
            .find(|row| row.solicitud_id == solicitud_id)
        {
            row.state = RowState::FadingOut;
        }

        let rows = Arc::clone(&self.rows);
        let solicitud_id = solicitud_id.to_string();
        let fade = self.fade;
        tokio::spawn(async move {
            tokio::time::sleep(fade).await;
            lock_rows(&rows).retain(|row| row.solicitud_id != solicitud_id);
            tracing::debug!(solicitud_id = %solicitud_id, "Row removed");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::testing::ScriptedConfirm;
    use crate::controllers::testing::{FakeBackend, Reply};

    fn admin(
        backend: &Arc<FakeBackend>,
        confirm: ScriptedConfirm,
    ) -> AdminController<FakeBackend> {
        AdminController::new(
            Arc::clone(backend),
            Arc::new(confirm),
            ["a1".to_string(), "b2".to_string()],
        )
        .with_fade(Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_approve_fades_then_removes_row() {
        let backend = Arc::new(FakeBackend::new());
        let page = admin(&backend, ScriptedConfirm::yes());

        page.process("a1", RequestAction::Approve).await.unwrap();
        assert_eq!(page.rows()[0], ("a1".to_string(), RowState::FadingOut));
        assert!(page.view().to_html().contains("opacity: 0"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(page.rows(), vec![("b2".to_string(), RowState::Visible)]);
        assert_eq!(
            backend.calls()[0],
            ("process_request", r#"{"solicitud_id":"a1","accion":"aprobar"}"#.to_string())
        );
    }

    #[tokio::test]
    async fn test_fading_row_is_not_processed_again() {
        let backend = Arc::new(FakeBackend::new());
        let confirm = Arc::new(ScriptedConfirm::answering(["s", "s"]));
        let page = AdminController::new(Arc::clone(&backend), confirm.clone(), ["a1".to_string()])
            .with_fade(Duration::from_millis(200));

        page.process("a1", RequestAction::Approve).await.unwrap();
        let err = page.process("a1", RequestAction::Reject).await.unwrap_err();

        assert_eq!(err, ActionError::Busy);
        assert_eq!(backend.count("process_request"), 1);
        assert_eq!(confirm.questions().len(), 1);
    }

    #[tokio::test]
    async fn test_each_action_has_its_own_question() {
        let backend = Arc::new(FakeBackend::new());
        let confirm = Arc::new(ScriptedConfirm::answering(["n", "n"]));
        let page = AdminController::new(
            Arc::clone(&backend),
            confirm.clone(),
            ["a1".to_string()],
        );

        assert!(page.process("a1", RequestAction::Approve).await.is_err());
        assert!(page.process("a1", RequestAction::Reject).await.is_err());
        assert_eq!(confirm.questions(), vec![APPROVE_CONFIRMATION, REJECT_CONFIRMATION]);
        assert!(backend.calls().is_empty());
        assert_eq!(page.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_failures_keep_row() {
        let backend = Arc::new(
            FakeBackend::new()
                .with("process_request", Reply::reject("Solicitud ya procesada"))
                .with("process_request", Reply::Down),
        );
        let page = admin(&backend, ScriptedConfirm::answering(["s", "s"]));

        let err = page.process("b2", RequestAction::Reject).await.unwrap_err();
        assert_eq!(
            err.user_message(),
            "Error al procesar la solicitud: Solicitud ya procesada"
        );
        let err = page.process("b2", RequestAction::Reject).await.unwrap_err();
        assert_eq!(err.user_message(), "Error de conexión al procesar la solicitud.");

        assert_eq!(page.rows().len(), 2);
        assert!(!page.control("b2").unwrap().is_disabled());
    }

    #[tokio::test]
    async fn test_unknown_row() {
        let backend = Arc::new(FakeBackend::new());
        let page = admin(&backend, ScriptedConfirm::yes());
        let err = page.process("zz", RequestAction::Approve).await.unwrap_err();
        assert!(matches!(err, ActionError::Rejected(_)));
    }
}
