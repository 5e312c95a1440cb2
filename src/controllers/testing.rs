//! Scripted in-memory backend for controller tests

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::client::*;

/// One canned answer
#[derive(Debug, Clone)]
pub enum Reply {
    Ack(Ack),
    Progress(HashMap<String, f64>),
    Snapshot(UserSnapshot),
    Reports(Vec<Report>),
    Reject(Option<String>),
    Down,
    /// Hold the request open before answering
    Slow(Duration, Box<Reply>),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Ack(Ack {
            success: true,
            ..Default::default()
        })
    }

    pub fn redirect(target: &str) -> Self {
        Reply::Ack(Ack {
            success: true,
            redirect: Some(target.to_string()),
            ..Default::default()
        })
    }

    pub fn url(url: &str) -> Self {
        Reply::Ack(Ack {
            success: true,
            url: Some(url.to_string()),
            ..Default::default()
        })
    }

    pub fn reject(message: &str) -> Self {
        Reply::Reject(Some(message.to_string()))
    }
}

/// Backend double. Replies are queued per operation; an operation with an
/// empty queue answers with a bare success. Every call is recorded as
/// `(operation, detail)`.
#[derive(Default)]
pub struct FakeBackend {
    replies: Mutex<HashMap<&'static str, VecDeque<Reply>>>,
    calls: Mutex<Vec<(&'static str, String)>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, operation: &'static str, reply: Reply) -> Self {
        self.push(operation, reply);
        self
    }

    pub fn push(&self, operation: &'static str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(operation)
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<(&'static str, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|(op, _)| *op == operation).count()
    }

    async fn answer(&self, operation: &'static str, detail: String) -> Result<Reply, ClientError> {
        self.calls.lock().unwrap().push((operation, detail));
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(operation)
            .and_then(VecDeque::pop_front);

        let mut reply = reply.unwrap_or_else(Reply::ok);
        let reply = loop {
            match reply {
                Reply::Slow(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
                other => break other,
            }
        };

        match reply {
            Reply::Reject(message) => Err(ClientError::Rejected { message }),
            Reply::Down => Err(ClientError::Unavailable),
            other => Ok(other),
        }
    }

    async fn ack(&self, operation: &'static str, detail: String) -> ClientResult<Ack> {
        match self.answer(operation, detail).await? {
            Reply::Ack(ack) => Ok(ack),
            other => panic!("{operation} cannot answer with {other:?}"),
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn login(&self, form: &LoginForm) -> ClientResult<Ack> {
        self.ack("login", form.identificador.clone()).await
    }

    async fn register(&self, form: &RegistrationForm) -> ClientResult<Ack> {
        let detail = format!("{}:{}", form.telefono, form.foto_lancha.is_some());
        self.ack("register", detail).await
    }

    async fn request_password_reset(&self, email: &str) -> ClientResult<()> {
        self.answer("request_password_reset", email.to_string()).await?;
        Ok(())
    }

    async fn update_password(&self, update: &PasswordUpdate) -> ClientResult<Ack> {
        self.ack("update_password", update.access_token.clone()).await
    }

    async fn weekly_progress(&self) -> ClientResult<WeeklyProgress> {
        match self.answer("weekly_progress", String::new()).await? {
            Reply::Progress(progress) => Ok(WeeklyProgress {
                success: true,
                error: None,
                progress,
            }),
            _ => Ok(WeeklyProgress {
                success: true,
                ..Default::default()
            }),
        }
    }

    async fn user_snapshot(&self) -> ClientResult<UserSnapshot> {
        match self.answer("user_snapshot", String::new()).await? {
            Reply::Snapshot(snapshot) => Ok(snapshot),
            _ => Ok(UserSnapshot {
                success: true,
                ..Default::default()
            }),
        }
    }

    async fn reports(&self) -> ClientResult<Vec<Report>> {
        match self.answer("reports", String::new()).await? {
            Reply::Reports(reports) => Ok(reports),
            _ => Ok(Vec::new()),
        }
    }

    async fn collect_report(&self, id: i64) -> ClientResult<Ack> {
        self.ack("collect_report", id.to_string()).await
    }

    async fn process_request(&self, request: &ProcessRequest) -> ClientResult<Ack> {
        let detail = serde_json::to_string(request).unwrap();
        self.ack("process_request", detail).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<Ack> {
        let detail = serde_json::to_string(update).unwrap();
        self.ack("update_profile", detail).await
    }

    async fn upload_avatar(&self, avatar: &Attachment) -> ClientResult<Ack> {
        self.ack("upload_avatar", avatar.file_name.clone()).await
    }

    async fn delete_account(&self) -> ClientResult<Ack> {
        self.ack("delete_account", String::new()).await
    }

    async fn submit_report(&self, report: &PickupReport) -> ClientResult<Ack> {
        let detail = format!("{}:{}", report.kg, report.foto.file_name);
        self.ack("submit_report", detail).await
    }

    async fn logout(&self) -> ClientResult<()> {
        self.answer("logout", String::new()).await?;
        Ok(())
    }
}

pub fn snapshot(nombre: &str, kg: f64, top: &[(&str, f64)]) -> UserSnapshot {
    UserSnapshot {
        success: true,
        nombre: nombre.to_string(),
        kg_reciclados: kg,
        minutos: 30,
        arboles: 2,
        co2_evitado: kg * 2.5,
        top_users: top
            .iter()
            .map(|(nombre, kg)| RankedUser {
                nombre: nombre.to_string(),
                kg_reciclados: *kg,
            })
            .collect(),
        ..Default::default()
    }
}

pub fn report(id: i64) -> Report {
    Report {
        id,
        kg_reportados: 2.0,
        ubicacion_desc: Some("Muelle".to_string()),
        foto_url: None,
        usuarios: Reporter {
            nombre: "Ana".to_string(),
            barrio: Some("La Yesca".to_string()),
        },
    }
}
