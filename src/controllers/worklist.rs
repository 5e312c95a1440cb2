//! Collector worklist: pending pickups and "mark as collected"

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{begin, request_failed, ActionError};
use crate::client::{Backend, ClientError, Report};
use crate::confirm::Confirm;
use crate::page::{Completion, Control, Section};
use crate::poller::Refresh;
use crate::view::{render_report_list, ViewNode};

pub const COLLECT_CONFIRMATION: &str = "¿Confirmas que has recogido este reciclaje?";

const COLLECT_LABEL: &str = "Marcar como Recogido";

pub struct WorklistController<B: Backend> {
    backend: Arc<B>,
    confirm: Arc<dyn Confirm>,
    list: Section,
    /// Reports behind the current list view
    reports: Mutex<Vec<Report>>,
    /// One control per rendered card, keyed by report id
    controls: Mutex<HashMap<i64, Control>>,
}

impl<B: Backend> WorklistController<B> {
    pub fn new(backend: Arc<B>, confirm: Arc<dyn Confirm>) -> Self {
        Self {
            backend,
            confirm,
            list: Section::new(),
            reports: Mutex::new(Vec::new()),
            controls: Mutex::new(HashMap::new()),
        }
    }

    /// The "mark as collected" control of card `id`
    pub fn control(&self, id: i64) -> Control {
        let mut controls = self.controls.lock().unwrap_or_else(|p| p.into_inner());
        controls
            .entry(id)
            .or_insert_with(|| Control::new(COLLECT_LABEL))
            .clone()
    }

    pub async fn view(&self) -> Option<ViewNode> {
        self.list.view().await
    }

    /// Fetch pending reports and rebuild the whole list
    pub async fn load_reports(&self) -> Result<(), ClientError> {
        let reports = self.backend.reports().await?;
        self.list.replace(render_report_list(&reports)).await;
        *self.reports.lock().unwrap_or_else(|p| p.into_inner()) = reports.clone();

        // Controls of cards that left the list go away unless a request is still running
        let mut controls = self.controls.lock().unwrap_or_else(|p| p.into_inner());
        controls.retain(|id, control| {
            control.is_disabled() || reports.iter().any(|report| report.id == *id)
        });
        drop(controls);

        tracing::debug!(pending = reports.len(), "Worklist refreshed");
        Ok(())
    }

    /// Confirm, then mark report `id` as collected. On success the card is
    /// removed and the list reloaded.
    pub async fn collect(&self, id: i64) -> Result<Completion, ActionError> {
        let control = self.control(id);
        if control.is_disabled() {
            return Err(ActionError::Busy);
        }
        if !self.confirm.confirm(COLLECT_CONFIRMATION).await {
            return Err(ActionError::Cancelled("Acción cancelada.".to_string()));
        }

        let busy = begin(&control, "Procesando...")?;
        let result = self.backend.collect_report(id).await;
        drop(busy);

        if let Err(e) = result {
            return Err(request_failed(
                "collect_report",
                e,
                |message| format!("Error: {}", message.unwrap_or("no se pudo marcar el reporte.")),
                "Error de conexión",
            ));
        }

        tracing::info!(report_id = id, "Report collected");
        let remaining = {
            let mut reports = self.reports.lock().unwrap_or_else(|p| p.into_inner());
            reports.retain(|report| report.id != id);
            reports.clone()
        };
        self.list.replace(render_report_list(&remaining)).await;
        self.controls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&id);

        if let Err(e) = self.load_reports().await {
            tracing::warn!(error = %e, "Failed to reload worklist after collecting");
        }
        Ok(Completion::default())
    }
}

#[async_trait]
impl<B: Backend + 'static> Refresh for WorklistController<B> {
    fn name(&self) -> &'static str {
        "worklist"
    }

    async fn refresh(&self) -> Result<(), ClientError> {
        self.load_reports().await
    }
}
