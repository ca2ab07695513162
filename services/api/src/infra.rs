use elo_cultura::config::AppConfig;
use elo_cultura::error::AppError;
use elo_cultura::notifications::{LogMailer, Mailer, NotificationDispatcher, ResendMailer};
use elo_cultura::store::MemoryStore;
use elo_cultura::workflows::accountability::AccountabilityService;
use elo_cultura::workflows::appeals::AppealService;
use elo_cultura::workflows::edital::EditalStateMachine;
use elo_cultura::workflows::evaluation::{AssignmentMatrix, EvaluationService, EvaluationState};
use elo_cultura::workflows::projects::ProjectService;
use elo_cultura::workflows::triage::{
    OpenAiClient, TriageModel, TriageOrchestrator, TriageSettings, UnconfiguredModel,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Every workflow service wired over one shared store and notification dispatcher.
pub(crate) struct Services {
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) notifier: NotificationDispatcher,
    pub(crate) editais: Arc<EditalStateMachine<MemoryStore>>,
    pub(crate) projects: Arc<ProjectService<MemoryStore>>,
    pub(crate) evaluation: EvaluationState<MemoryStore>,
    pub(crate) appeals: Arc<AppealService<MemoryStore>>,
    pub(crate) accountability: Arc<AccountabilityService<MemoryStore>>,
    pub(crate) triage: Arc<TriageOrchestrator<MemoryStore>>,
}

impl Services {
    pub(crate) fn new(
        store: Arc<MemoryStore>,
        model: Arc<dyn TriageModel>,
        mailer: Arc<dyn Mailer>,
        settings: TriageSettings,
    ) -> Self {
        let notifier = NotificationDispatcher::new(mailer);
        Self {
            editais: Arc::new(EditalStateMachine::new(store.clone(), notifier.clone())),
            projects: Arc::new(ProjectService::new(store.clone(), notifier.clone())),
            evaluation: EvaluationState {
                matrix: Arc::new(AssignmentMatrix::new(store.clone())),
                service: Arc::new(EvaluationService::new(store.clone())),
            },
            appeals: Arc::new(AppealService::new(store.clone(), notifier.clone())),
            accountability: Arc::new(AccountabilityService::new(store.clone(), notifier.clone())),
            triage: Arc::new(TriageOrchestrator::new(store.clone(), model, settings)),
            notifier,
            store,
        }
    }

    /// Production wiring: OpenAI and Resend when their keys are present, logged fallbacks
    /// otherwise.
    pub(crate) fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.ai.timeout)
            .build()?;

        let openai = OpenAiClient::from_config(client.clone(), &config.ai);
        let model: Arc<dyn TriageModel> = match openai {
            Some(openai) => {
                info!(model = openai.model(), "AI triage provider configured");
                Arc::new(openai)
            }
            None => {
                warn!("OPENAI_API_KEY not set; triage runs will record fallback suggestions");
                Arc::new(UnconfiguredModel)
            }
        };

        let mailer: Arc<dyn Mailer> = match ResendMailer::from_config(client, &config.email) {
            Some(resend) => Arc::new(resend),
            None => {
                warn!("RESEND_API_KEY not set; notifications will only be logged");
                Arc::new(LogMailer)
            }
        };

        Ok(Self::new(
            Arc::new(MemoryStore::new()),
            model,
            mailer,
            TriageSettings::from_config(&config.triage, &config.ai),
        ))
    }

    /// Wait for background triage runs, then for the e-mails they and the handlers queued.
    pub(crate) async fn drain(&self) {
        self.triage.drain().await;
        self.notifier.drain().await;
    }
}
