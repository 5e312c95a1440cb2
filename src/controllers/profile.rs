//! Profile page: edit details, change avatar, delete the account

use chrono::{NaiveDate, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{begin, request_failed, verbatim_or, ActionError};
use crate::client::{Attachment, Backend, ProfileUpdate};
use crate::confirm::Confirm;
use crate::page::{Completion, Control, Navigation, Notice};
use crate::validation::validate_optional_birth_date;

pub const PROFILE_UPDATED: &str = "¡Perfil actualizado con éxito!";

/// Where a saved profile sends the user, and after how long
pub const PROFILE_UPDATED_TARGET: &str = "/dashboard?updated=true";
pub const PROFILE_UPDATED_DELAY: Duration = Duration::from_millis(1500);

pub const DELETE_PROMPT: &str =
    "Esta acción es irreversible. Perderás todos tus datos.\n\nEscribe 'ELIMINAR' para confirmar.";

/// The exact text the user must type to delete the account
pub const DELETE_KEYWORD: &str = "ELIMINAR";

pub const ACCOUNT_DELETED: &str = "Tu cuenta ha sido eliminada con éxito.";

pub struct ProfileController<B: Backend> {
    backend: Arc<B>,
    confirm: Arc<dyn Confirm>,
    save_button: Control,
    avatar_input: Control,
    delete_button: Control,
    avatar_src: Mutex<Option<String>>,
}

impl<B: Backend> ProfileController<B> {
    pub fn new(backend: Arc<B>, confirm: Arc<dyn Confirm>) -> Self {
        Self {
            backend,
            confirm,
            save_button: Control::new("Guardar cambios"),
            avatar_input: Control::new("Cambiar foto"),
            delete_button: Control::new("Eliminar cuenta"),
            avatar_src: Mutex::new(None),
        }
    }

    pub fn save_button(&self) -> &Control {
        &self.save_button
    }

    /// Current avatar image source, once one has been uploaded
    pub fn avatar_src(&self) -> Option<String> {
        self.avatar_src
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
        today: NaiveDate,
    ) -> Result<Completion, ActionError> {
        validate_optional_birth_date(&update.fecha_nac, today)?;
        let _busy = begin(&self.save_button, "Guardando...")?;

        match self.backend.update_profile(update).await {
            Ok(_) => {
                tracing::info!("Profile updated");
                Ok(Completion::notice(Notice::Success(PROFILE_UPDATED.to_string()))
                    .then_navigate(PROFILE_UPDATED_TARGET, PROFILE_UPDATED_DELAY))
            }
            Err(e) => Err(request_failed(
                "update_profile",
                e,
                verbatim_or("Ocurrió un error al actualizar el perfil."),
                "Error de conexión",
            )),
        }
    }

    /// Upload a new avatar. The image source gets a timestamp so the new
    /// picture replaces any cached copy.
    pub async fn upload_avatar(&self, avatar: &Attachment) -> Result<Completion, ActionError> {
        let _busy = begin(&self.avatar_input, "Subiendo...")?;

        let ack = self.backend.upload_avatar(avatar).await.map_err(|e| {
            request_failed(
                "upload_avatar",
                e,
                verbatim_or("Error al subir la imagen."),
                "Error de conexión al subir la imagen.",
            )
        })?;

        let url = ack
            .url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ActionError::Rejected("Error al subir la imagen.".to_string()))?;
        let src = format!("{}?t={}", url, Utc::now().timestamp_millis());
        tracing::debug!(src = %src, "Avatar replaced");

        *self.avatar_src.lock().unwrap_or_else(|p| p.into_inner()) = Some(src);
        Ok(Completion::default())
    }

    /// Delete the account after the user types the keyword exactly
    pub async fn delete_account(&self) -> Result<Completion, ActionError> {
        let answer = self.confirm.prompt(DELETE_PROMPT).await;
        if answer.as_deref() != Some(DELETE_KEYWORD) {
            return Err(ActionError::Cancelled("Eliminación cancelada.".to_string()));
        }
        let _busy = begin(&self.delete_button, "Eliminando...")?;

        match self.backend.delete_account().await {
            Ok(_) => {
                tracing::info!("Account deleted");
                Ok(Completion {
                    notice: Some(Notice::Success(ACCOUNT_DELETED.to_string())),
                    navigation: Some(Navigation::now("/")),
                })
            }
            Err(e) => Err(request_failed(
                "delete_account",
                e,
                verbatim_or("No se pudo eliminar la cuenta."),
                "Error de conexión al intentar eliminar la cuenta.",
            )),
        }
    }
}
