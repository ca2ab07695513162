//! Fixtures shared by the workflow test modules.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{Duration, Utc};
use serde_json::Value;

use crate::context::{RequestContext, Role};
use crate::ids::{CriterioId, EditalId, ProjetoId, TenantId, UserId};
use crate::notifications::{Contact, EmailMessage, Mailer, MailerError, NotificationDispatcher};
use crate::store::MemoryStore;
use crate::workflows::edital::{Edital, EditalRepository, Phase};
use crate::workflows::evaluation::{Criterio, EvaluationRepository};
use crate::workflows::projects::{
    protocol_number, HabilitationStatus, ProjectRepository, Projeto, SelectionStatus,
};
use crate::workflows::triage::{ChatPrompt, ProviderError, TriageModel};

#[derive(Default)]
pub(crate) struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub(crate) fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push(message.clone());
        Ok(())
    }
}

type Responder = dyn Fn(&ChatPrompt) -> Result<String, ProviderError> + Send + Sync;

/// Model answering each prompt through a closure and recording what it was asked.
pub(crate) struct ScriptedModel {
    responder: Box<Responder>,
    prompts: Mutex<Vec<ChatPrompt>>,
}

impl ScriptedModel {
    pub(crate) fn new(
        responder: impl Fn(&ChatPrompt) -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().expect("prompt mutex poisoned").len()
    }
}

#[async_trait]
impl TriageModel for ScriptedModel {
    async fn complete_json(&self, prompt: &ChatPrompt) -> Result<String, ProviderError> {
        self.prompts
            .lock()
            .expect("prompt mutex poisoned")
            .push(prompt.clone());
        (self.responder)(prompt)
    }
}

pub(crate) struct Fixture {
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) mailer: Arc<RecordingMailer>,
    pub(crate) notifier: NotificationDispatcher,
    pub(crate) tenant_id: TenantId,
    pub(crate) gestor: RequestContext,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let tenant_id = TenantId::new();
        Self {
            store: Arc::new(MemoryStore::new()),
            notifier: NotificationDispatcher::new(mailer.clone()),
            mailer,
            tenant_id,
            gestor: RequestContext::new(tenant_id, UserId::new(), Role::Gestor),
        }
    }

    pub(crate) fn actor(&self, role: Role) -> RequestContext {
        RequestContext::new(self.tenant_id, UserId::new(), role)
    }

    /// A proponent with a registered e-mail address.
    pub(crate) fn proponent(&self, email: &str) -> RequestContext {
        let ctx = self.actor(Role::Proponente);
        self.store.register_contact(
            self.tenant_id,
            Contact {
                user_id: ctx.actor_id,
                email: email.to_string(),
                nome: email.split('@').next().unwrap_or(email).to_string(),
            },
        );
        ctx
    }

    pub(crate) async fn edital_in(&self, status: Phase, vagas: u32) -> Edital {
        let edital = Edital {
            id: EditalId::new(),
            tenant_id: self.tenant_id,
            numero: format!("{:03}/2025", next_numero()),
            titulo: "Fomento às Artes Cênicas".to_string(),
            descricao: "Seleção de projetos culturais".to_string(),
            status,
            janelas: BTreeMap::new(),
            vagas,
            ativo: true,
            version: 0,
            criado_em: Utc::now(),
        };
        self.store
            .insert_edital(edital)
            .await
            .expect("edital is stored")
    }

    pub(crate) async fn project(
        &self,
        edital: &Edital,
        proponente: &RequestContext,
        titulo: &str,
        descricao: &str,
        orcamento: f64,
    ) -> Projeto {
        let existing = self
            .store
            .projects_for_edital(self.tenant_id, edital.id)
            .await
            .expect("projects listed")
            .len() as i64;
        let criado_em = Utc::now() + Duration::milliseconds(existing);
        let projeto = Projeto {
            id: ProjetoId::new(),
            tenant_id: self.tenant_id,
            edital_id: edital.id,
            proponente_id: proponente.actor_id,
            numero_protocolo: protocol_number(criado_em),
            titulo: titulo.to_string(),
            resumo: format!("Resumo de {titulo}"),
            descricao_tecnica: descricao.to_string(),
            orcamento_total: orcamento,
            cronograma_execucao: "Março a junho".to_string(),
            status_habilitacao: HabilitationStatus::Pendente,
            motivo_habilitacao: None,
            nota_final: None,
            status_selecao: SelectionStatus::Pendente,
            criado_em,
        };
        self.store
            .insert_project(projeto)
            .await
            .expect("project is stored")
    }

    /// Criteria scored from 0 to 10 with the given weights, in order.
    pub(crate) async fn criteria(&self, edital: &Edital, pesos: &[f64]) -> Vec<Criterio> {
        let criterios: Vec<Criterio> = pesos
            .iter()
            .enumerate()
            .map(|(index, peso)| Criterio {
                id: CriterioId::new(),
                tenant_id: self.tenant_id,
                edital_id: edital.id,
                descricao: format!("Critério {}", index + 1),
                nota_minima: 0.0,
                nota_maxima: 10.0,
                peso: *peso,
                ordem: index as u32 + 1,
            })
            .collect();
        self.store
            .replace_criteria(self.tenant_id, edital.id, criterios.clone())
            .await
            .expect("criteria stored");
        criterios
    }
}

fn next_numero() -> u32 {
    static NEXT: AtomicU32 = AtomicU32::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

pub(crate) fn request(
    method: &str,
    uri: &str,
    ctx: Option<&RequestContext>,
    body: Option<Value>,
) -> axum::http::Request<axum::body::Body> {
    let mut builder = axum::http::Request::builder().method(method).uri(uri);
    if let Some(ctx) = ctx {
        builder = builder
            .header(crate::context::TENANT_HEADER, ctx.tenant_id.to_string())
            .header(crate::context::USER_HEADER, ctx.actor_id.to_string())
            .header(crate::context::ROLE_HEADER, ctx.role.label());
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(axum::http::header::CONTENT_TYPE, "application/json");
            axum::body::Body::from(serde_json::to_vec(&value).expect("json body"))
        }
        None => axum::body::Body::empty(),
    };
    builder.body(body).expect("request builds")
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
