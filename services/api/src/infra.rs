use async_trait::async_trait;
use incident_watch::config::{AppConfig, ModelConfig, StoreConfig};
use incident_watch::error::AppError;
use incident_watch::workflows::reports::{
    BroadcastNotifier, DistressScorer, HttpSentimentModel, InMemoryReportStore,
    IncidentReportService, LexiconSentimentModel, ModelError, NewReport, PgReportStore, Report,
    ReportId, ReportStatus, ReportStore, ScoringClaim, ScoringState, SentimentModel, StoreError,
    UrgentCutoff,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) notifier: Arc<BroadcastNotifier>,
}

pub(crate) type ApiReportService = IncidentReportService<ReportBackend, BroadcastNotifier>;

/// Store selected at startup: Postgres when a database URL is configured, otherwise memory.
pub(crate) enum ReportBackend {
    Memory(InMemoryReportStore),
    Postgres(PgReportStore),
}

impl ReportBackend {
    pub(crate) async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        match &config.database_url {
            Some(url) => {
                let store = PgReportStore::connect(url, config.max_connections).await?;
                info!(
                    max_connections = config.max_connections,
                    "connected to postgres report store"
                );
                Ok(Self::Postgres(store))
            }
            None => {
                warn!("DATABASE_URL not set, reports are kept in memory");
                Ok(Self::Memory(InMemoryReportStore::default()))
            }
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            ReportBackend::Memory(_) => "memory",
            ReportBackend::Postgres(_) => "postgres",
        }
    }
}

#[async_trait]
impl ReportStore for ReportBackend {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        match self {
            ReportBackend::Memory(store) => store.ensure_schema().await,
            ReportBackend::Postgres(store) => store.ensure_schema().await,
        }
    }

    async fn insert(&self, report: NewReport) -> Result<Report, StoreError> {
        match self {
            ReportBackend::Memory(store) => store.insert(report).await,
            ReportBackend::Postgres(store) => store.insert(report).await,
        }
    }

    async fn fetch(&self, id: ReportId) -> Result<Option<Report>, StoreError> {
        match self {
            ReportBackend::Memory(store) => store.fetch(id).await,
            ReportBackend::Postgres(store) => store.fetch(id).await,
        }
    }

    async fn set_scoring_state(
        &self,
        id: ReportId,
        state: ScoringState,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        match self {
            ReportBackend::Memory(store) => store.set_scoring_state(id, state, error).await,
            ReportBackend::Postgres(store) => store.set_scoring_state(id, state, error).await,
        }
    }

    async fn claim_scoring(&self, id: ReportId) -> Result<ScoringClaim, StoreError> {
        match self {
            ReportBackend::Memory(store) => store.claim_scoring(id).await,
            ReportBackend::Postgres(store) => store.claim_scoring(id).await,
        }
    }

    async fn fail_interrupted(&self, message: &str) -> Result<u64, StoreError> {
        match self {
            ReportBackend::Memory(store) => store.fail_interrupted(message).await,
            ReportBackend::Postgres(store) => store.fail_interrupted(message).await,
        }
    }

    async fn record_score(
        &self,
        id: ReportId,
        distress_percentage: f64,
        status: ReportStatus,
    ) -> Result<Report, StoreError> {
        match self {
            ReportBackend::Memory(store) => {
                store.record_score(id, distress_percentage, status).await
            }
            ReportBackend::Postgres(store) => {
                store.record_score(id, distress_percentage, status).await
            }
        }
    }

    async fn list_ranked(&self) -> Result<Vec<Report>, StoreError> {
        match self {
            ReportBackend::Memory(store) => store.list_ranked().await,
            ReportBackend::Postgres(store) => store.list_ranked().await,
        }
    }

    async fn recompute_statuses(&self, cutoff: UrgentCutoff) -> Result<u64, StoreError> {
        match self {
            ReportBackend::Memory(store) => store.recompute_statuses(cutoff).await,
            ReportBackend::Postgres(store) => store.recompute_statuses(cutoff).await,
        }
    }
}

/// Remote classifier when an endpoint is configured, the offline lexicon otherwise.
pub(crate) fn sentiment_model(config: &ModelConfig) -> Result<Arc<dyn SentimentModel>, ModelError> {
    match &config.endpoint {
        Some(endpoint) => {
            let model = HttpSentimentModel::new(endpoint.clone(), config.token.clone())?;
            info!(endpoint = model.endpoint(), "using remote sentiment model");
            Ok(Arc::new(model))
        }
        None => {
            warn!("SENTIMENT_MODEL_URL not set, using the lexicon sentiment model");
            Ok(Arc::new(LexiconSentimentModel::new()?))
        }
    }
}

pub(crate) fn build_report_service(
    config: &AppConfig,
    store: Arc<ReportBackend>,
    notifier: Arc<BroadcastNotifier>,
) -> Result<Arc<ApiReportService>, AppError> {
    let model = sentiment_model(&config.model)?;
    let scorer = DistressScorer::new(model, config.scoring.confidence_threshold);
    Ok(Arc::new(IncidentReportService::new(
        store,
        notifier,
        scorer,
        config.scoring,
    )))
}
