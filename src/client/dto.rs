//! Request and response shapes of the backend API
//!
//! Field names follow the backend's JSON and form keys, which are Spanish.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;

// ============ Responses ============

/// Generic `{success, error, redirect, url}` acknowledgement
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// `GET /api/weekly_progress`: kilograms collected per day, keyed by `YYYY-MM-DD`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeeklyProgress {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub progress: HashMap<String, f64>,
}

/// `GET /api/user`: aggregate stats of the signed-in user plus the leaderboard
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserSnapshot {
    pub success: bool,
    pub error: Option<String>,
    pub nombre: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub kg_reciclados: f64,
    pub minutos: i64,
    pub arboles: i64,
    #[serde(deserialize_with = "lenient_f64")]
    pub co2_evitado: f64,
    pub top_users: Vec<RankedUser>,
}

/// One leaderboard entry
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RankedUser {
    #[serde(default)]
    pub nombre: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub kg_reciclados: f64,
}

/// `GET /api/reportes`: one pending pickup
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Report {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub kg_reportados: f64,
    #[serde(default)]
    pub ubicacion_desc: Option<String>,
    #[serde(default)]
    pub foto_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub usuarios: Reporter,
}

/// The user who filed a report
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Reporter {
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub barrio: Option<String>,
}

/// Numeric columns may arrive as JSON numbers or as decimal strings
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Numeric {
        Number(f64),
        Text(String),
        Null(()),
    }

    match Numeric::deserialize(deserializer)? {
        Numeric::Number(n) => Ok(n),
        Numeric::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Numeric::Null(()) => Ok(0.0),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Responses that carry a `success` flag
pub(crate) trait Enveloped {
    fn succeeded(&self) -> bool;
    fn take_error(&mut self) -> Option<String>;
}

impl Enveloped for Ack {
    fn succeeded(&self) -> bool {
        self.success
    }
    fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }
}

impl Enveloped for WeeklyProgress {
    fn succeeded(&self) -> bool {
        self.success
    }
    fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }
}

impl Enveloped for UserSnapshot {
    fn succeeded(&self) -> bool {
        self.success
    }
    fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }
}

// ============ Requests ============

/// Login accepts an email, phone number or user name as identifier
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub identificador: String,
    pub contrasena: String,
}

/// Account role requested at registration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Role {
    #[default]
    Usuario,
    Lanchero,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Usuario => "usuario",
            Role::Lanchero => "lanchero",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub nombre: String,
    pub telefono: String,
    pub email: String,
    pub barrio: String,
    pub contrasena: String,
    /// Raw `YYYY-MM-DD` value as typed
    pub fecha_nac: String,
    pub rol: Role,
    /// Collector applications only
    pub mensaje_lanchero: Option<String>,
    /// Collector applications only
    pub foto_lancha: Option<Attachment>,
}

impl RegistrationForm {
    /// URL-encoded fields, in the order the backend form declares them
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("action", "register".to_string()),
            ("nombre", self.nombre.trim().to_string()),
            ("telefono", self.telefono.trim().to_string()),
            ("email", self.email.trim().to_string()),
            ("barrio", self.barrio.trim().to_string()),
            ("contraseña", self.contrasena.clone()),
            ("fecha_nac", self.fecha_nac.clone()),
            ("rol", self.rol.as_str().to_string()),
        ];
        if let Some(message) = &self.mensaje_lanchero {
            fields.push(("mensaje_lanchero", message.trim().to_string()));
        }
        fields
    }
}

/// Profile edit; blank fields are left out and keep their stored value
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub nombre: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub barrio: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fecha_nac: String,
}

/// A recycling pickup request filed by a user
#[derive(Debug, Clone)]
pub struct PickupReport {
    pub kg: String,
    pub ubicacion: String,
    pub foto: Attachment,
}

/// Admin decision on a collector application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RequestAction {
    #[serde(rename = "aprobar")]
    Approve,
    #[serde(rename = "rechazar")]
    Reject,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessRequest {
    pub solicitud_id: String,
    pub accion: RequestAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordUpdate {
    pub access_token: String,
    pub new_password: String,
}

/// A file picked for upload
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its file name
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { file_name, bytes })
    }

    /// Content type guessed from the extension
    pub fn mime(&self) -> &'static str {
        let ext = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "heic" => "image/heic",
            _ => "application/octet-stream",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_snapshot_parses_backend_payload() {
        let json = r#"{
            "success": true,
            "nombre": "Yoryani Mosquera",
            "kg_reciclados": 12.5,
            "minutos": 40,
            "arboles": 12,
            "co2_evitado": 31.3,
            "top_users": [
                {"nombre": "Ana Palacios", "kg_reciclados": "20.25"},
                {"nombre": "Luis", "kg_reciclados": 7}
            ]
        }"#;

        let snapshot: UserSnapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.success);
        assert_eq!(snapshot.minutos, 40);
        assert_eq!(snapshot.top_users.len(), 2);
        assert_eq!(snapshot.top_users[0].kg_reciclados, 20.25);
        assert_eq!(snapshot.top_users[1].kg_reciclados, 7.0);
    }

    #[test]
    fn test_failed_snapshot_has_defaults() {
        let snapshot: UserSnapshot = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(!snapshot.success);
        assert!(snapshot.top_users.is_empty());
    }

    #[test]
    fn test_report_tolerates_missing_reporter() {
        let json = r#"[
            {"id": 7, "kg_reportados": "3.5", "ubicacion_desc": "Muelle", "foto_url": null, "usuarios": null},
            {"id": 8, "kg_reportados": 2, "usuarios": {"nombre": "Ana", "barrio": "La Playita"}}
        ]"#;

        let reports: Vec<Report> = serde_json::from_str(json).unwrap();
        assert_eq!(reports[0].kg_reportados, 3.5);
        assert_eq!(reports[0].usuarios, Reporter::default());
        assert_eq!(reports[1].usuarios.barrio.as_deref(), Some("La Playita"));
        assert_eq!(reports[1].ubicacion_desc, None);
    }

    #[test]
    fn test_registration_fields() {
        let form = RegistrationForm {
            nombre: " Ana ".to_string(),
            telefono: "3001234567".to_string(),
            rol: Role::Lanchero,
            mensaje_lanchero: Some("Tengo lancha propia".to_string()),
            ..Default::default()
        };

        let fields = form.fields();
        assert_eq!(fields[0], ("action", "register".to_string()));
        assert!(fields.contains(&("nombre", "Ana".to_string())));
        assert!(fields.contains(&("rol", "lanchero".to_string())));
        assert!(fields.contains(&("mensaje_lanchero", "Tengo lancha propia".to_string())));
    }

    #[test]
    fn test_profile_update_skips_blank_fields() {
        let update = ProfileUpdate {
            nombre: "Ana".to_string(),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"nombre":"Ana"}"#);
    }

    #[test]
    fn test_process_request_wire_format() {
        let request = ProcessRequest {
            solicitud_id: "abc".to_string(),
            accion: RequestAction::Reject,
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"solicitud_id":"abc","accion":"rechazar"}"#
        );
    }

    #[test]
    fn test_attachment_mime() {
        assert_eq!(Attachment::new("lancha.JPG", vec![]).mime(), "image/jpeg");
        assert_eq!(Attachment::new("foto.png", vec![]).mime(), "image/png");
        assert_eq!(Attachment::new("sin_extension", vec![]).mime(), "application/octet-stream");
    }
}
