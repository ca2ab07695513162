//! Best-effort e-mail notifications keyed on domain events.
//!
//! Dispatch never blocks or fails the triggering operation: each message is sent on a tracked
//! background task and delivery errors are only logged.

mod resend;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::ids::{EditalId, TenantId, UserId};
use crate::store::RepositoryError;
use crate::workflows::edital::Phase;

pub use resend::{LogMailer, ResendMailer};

/// Resolved delivery address for a platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub user_id: UserId,
    pub email: String,
    pub nome: String,
}

/// Lookup of notification addresses.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn contact(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Option<Contact>, RepositoryError>;

    /// Distinct proponents holding at least one project in the edital.
    async fn proponent_contacts(
        &self,
        tenant_id: TenantId,
        edital_id: EditalId,
    ) -> Result<Vec<Contact>, RepositoryError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    PhaseChanged {
        edital_numero: String,
        edital_titulo: String,
        fase: Phase,
    },
    HabilitationDecided {
        edital_titulo: String,
        protocolo: String,
        habilitado: bool,
        motivo: Option<String>,
    },
    AppealDecided {
        protocolo: String,
        deferido: bool,
        resposta: String,
    },
    AccountabilityDecided {
        protocolo: String,
        situacao: &'static str,
        parecer: Option<String>,
    },
}

impl NotificationEvent {
    pub const fn template(&self) -> &'static str {
        match self {
            Self::PhaseChanged { .. } => "edital_fase_alterada",
            Self::HabilitationDecided { .. } => "habilitacao_decidida",
            Self::AppealDecided { .. } => "recurso_decidido",
            Self::AccountabilityDecided { .. } => "prestacao_contas_analisada",
        }
    }

    pub fn render(&self, contact: &Contact) -> EmailMessage {
        let greeting = format!("<p>Olá, {}.</p>", escape_html(&contact.nome));
        let (subject, body) = match self {
            Self::PhaseChanged {
                edital_numero,
                edital_titulo,
                fase,
            } => (
                format!("Edital {edital_numero}: {}", fase.label()),
                format!(
                    "<p>O edital <strong>{}</strong> avançou para a fase <strong>{}</strong>.</p>",
                    escape_html(edital_titulo),
                    fase.label()
                ),
            ),
            Self::HabilitationDecided {
                edital_titulo,
                protocolo,
                habilitado,
                motivo,
            } => {
                let outcome = if *habilitado {
                    "habilitado"
                } else {
                    "inabilitado"
                };
                let reason = motivo
                    .as_deref()
                    .map(|text| format!("<p>Motivo: {}</p>", escape_html(text)))
                    .unwrap_or_default();
                (
                    format!("Projeto {protocolo} {outcome}"),
                    format!(
                        "<p>Seu projeto {protocolo} no edital <strong>{}</strong> \
                         foi {outcome}.</p>{reason}",
                        escape_html(edital_titulo)
                    ),
                )
            }
            Self::AppealDecided {
                protocolo,
                deferido,
                resposta,
            } => {
                let outcome = if *deferido { "deferido" } else { "indeferido" };
                (
                    format!("Recurso do projeto {protocolo} {outcome}"),
                    format!(
                        "<p>Seu recurso referente ao projeto {protocolo} foi {outcome}.</p>\
                         <p>{}</p>",
                        escape_html(resposta)
                    ),
                )
            }
            Self::AccountabilityDecided {
                protocolo,
                situacao,
                parecer,
            } => {
                let opinion = parecer
                    .as_deref()
                    .map(|text| format!("<p>Parecer: {}</p>", escape_html(text)))
                    .unwrap_or_default();
                (
                    format!("Prestação de contas do projeto {protocolo}"),
                    format!(
                        "<p>A prestação de contas do projeto {protocolo} foi analisada: \
                         {situacao}.</p>{opinion}"
                    ),
                )
            }
        };

        EmailMessage {
            template: self.template(),
            to: contact.email.clone(),
            subject,
            html: format!("{greeting}{body}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub template: &'static str,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Outbound transport (Resend in production).
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("mail provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
    tracker: TaskTracker,
}

impl NotificationDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self {
            mailer,
            tracker: TaskTracker::new(),
        }
    }

    /// Queue one message per distinct recipient address and return how many were queued.
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, event: NotificationEvent, recipients: Vec<Contact>) -> usize {
        let mut seen = BTreeSet::new();
        let mut queued = 0;

        for contact in recipients {
            if !seen.insert(contact.email.to_ascii_lowercase()) {
                continue;
            }
            let message = event.render(&contact);
            let mailer = Arc::clone(&self.mailer);
            self.tracker.spawn(async move {
                match mailer.send(&message).await {
                    Ok(()) => {
                        debug!(template = message.template, to = %message.to, "notification sent")
                    }
                    Err(err) => warn!(
                        template = message.template,
                        to = %message.to,
                        error = %err,
                        "notification delivery failed"
                    ),
                }
            });
            queued += 1;
        }

        queued
    }

    /// Wait for every queued send to finish. Used on shutdown and by tests.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("pending", &self.tracker.len())
            .finish()
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
