use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::reports::distress::{
    DistressScorer, ModelError, ScoringPolicy, SentimentLabel, SentimentModel,
    SentimentPrediction, UrgentCutoff,
};
use crate::workflows::reports::domain::{
    IncidentType, NewReport, Report, ReportId, ReportStatus, ReportSubmission, ScoringState,
};
use crate::workflows::reports::repository::{
    NotificationPublisher, NotifyError, ReportNotification, ReportStore, ScoringClaim,
    StoreError,
};
use crate::workflows::reports::{report_router, InMemoryReportStore, IncidentReportService};

pub(super) const HURT_NARRATIVE: &str = "I was hurt. I am scared. The weather was nice.";

/// Model double answering from a fixed table; unknown fragments are weakly positive.
#[derive(Default)]
pub(super) struct ScriptedModel {
    answers: HashMap<String, (SentimentLabel, f64)>,
}

impl ScriptedModel {
    pub(super) fn with(mut self, fragment: &str, label: SentimentLabel, score: f64) -> Self {
        self.answers.insert(fragment.to_string(), (label, score));
        self
    }

    pub(super) fn hurt_narrative() -> Self {
        Self::default()
            .with("I was hurt", SentimentLabel::Negative, 0.95)
            .with("I am scared", SentimentLabel::Negative, 0.93)
            .with("The weather was nice", SentimentLabel::Positive, 0.99)
    }
}

#[async_trait]
impl SentimentModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn classify(&self, fragment: &str) -> Result<SentimentPrediction, ModelError> {
        let (label, score) = self
            .answers
            .get(fragment)
            .copied()
            .unwrap_or((SentimentLabel::Positive, 0.6));
        SentimentPrediction::new(label, score)
    }
}

pub(super) struct FailingModel;

#[async_trait]
impl SentimentModel for FailingModel {
    fn name(&self) -> &str {
        "failing"
    }

    async fn classify(&self, _fragment: &str) -> Result<SentimentPrediction, ModelError> {
        Err(ModelError::Inference("model weights missing".to_string()))
    }
}

/// Returns fewer predictions than requested.
pub(super) struct TruncatingModel;

#[async_trait]
impl SentimentModel for TruncatingModel {
    fn name(&self) -> &str {
        "truncating"
    }

    async fn classify(&self, _fragment: &str) -> Result<SentimentPrediction, ModelError> {
        SentimentPrediction::new(SentimentLabel::Negative, 0.99)
    }

    async fn classify_batch(
        &self,
        _fragments: &[String],
    ) -> Result<Vec<SentimentPrediction>, ModelError> {
        Ok(vec![SentimentPrediction::new(SentimentLabel::Negative, 0.99)?])
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    events: Arc<Mutex<Vec<ReportNotification>>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<ReportNotification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationPublisher for MemoryNotifier {
    fn publish(&self, notification: ReportNotification) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct UnavailableStore;

#[async_trait]
impl ReportStore for UnavailableStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn insert(&self, _report: NewReport) -> Result<Report, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn fetch(&self, _id: ReportId) -> Result<Option<Report>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn set_scoring_state(
        &self,
        _id: ReportId,
        _state: ScoringState,
        _error: Option<String>,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn claim_scoring(&self, _id: ReportId) -> Result<ScoringClaim, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn fail_interrupted(&self, _message: &str) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn record_score(
        &self,
        _id: ReportId,
        _distress_percentage: f64,
        _status: ReportStatus,
    ) -> Result<Report, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn list_ranked(&self) -> Result<Vec<Report>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn recompute_statuses(&self, _cutoff: UrgentCutoff) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// In-memory store whose next `failures` score writes are rejected.
#[derive(Clone, Default)]
pub(super) struct FlakyStore {
    inner: InMemoryReportStore,
    failures: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub(super) fn failing_score_writes(failures: usize) -> Self {
        Self {
            inner: InMemoryReportStore::default(),
            failures: Arc::new(AtomicUsize::new(failures)),
        }
    }
}

#[async_trait]
impl ReportStore for FlakyStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.inner.ensure_schema().await
    }

    async fn insert(&self, report: NewReport) -> Result<Report, StoreError> {
        self.inner.insert(report).await
    }

    async fn fetch(&self, id: ReportId) -> Result<Option<Report>, StoreError> {
        self.inner.fetch(id).await
    }

    async fn set_scoring_state(
        &self,
        id: ReportId,
        state: ScoringState,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        self.inner.set_scoring_state(id, state, error).await
    }

    async fn claim_scoring(&self, id: ReportId) -> Result<ScoringClaim, StoreError> {
        self.inner.claim_scoring(id).await
    }

    async fn fail_interrupted(&self, message: &str) -> Result<u64, StoreError> {
        self.inner.fail_interrupted(message).await
    }

    async fn record_score(
        &self,
        id: ReportId,
        distress_percentage: f64,
        status: ReportStatus,
    ) -> Result<Report, StoreError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner
            .record_score(id, distress_percentage, status)
            .await
    }

    async fn list_ranked(&self) -> Result<Vec<Report>, StoreError> {
        self.inner.list_ranked().await
    }

    async fn recompute_statuses(&self, cutoff: UrgentCutoff) -> Result<u64, StoreError> {
        self.inner.recompute_statuses(cutoff).await
    }
}

pub(super) type MemoryService = IncidentReportService<InMemoryReportStore, MemoryNotifier>;

pub(super) fn scorer(model: impl SentimentModel + 'static) -> DistressScorer {
    DistressScorer::new(Arc::new(model), ScoringPolicy::default().confidence_threshold)
}

pub(super) fn build_service(
    model: impl SentimentModel + 'static,
) -> (Arc<MemoryService>, Arc<InMemoryReportStore>, Arc<MemoryNotifier>) {
    let store = Arc::new(InMemoryReportStore::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = Arc::new(IncidentReportService::new(
        store.clone(),
        notifier.clone(),
        scorer(model),
        ScoringPolicy::default(),
    ));
    (service, store, notifier)
}

pub(super) fn submission(description: &str) -> ReportSubmission {
    ReportSubmission {
        incident_date: NaiveDate::from_ymd_opt(2025, 2, 4).expect("valid date"),
        location: "Work Desk".to_string(),
        incident_type: IncidentType::Emotional,
        description: description.to_string(),
        witness: "Victim".to_string(),
    }
}

pub(super) fn stored_report(id: i64, distress: f64, status: ReportStatus, hour: u32) -> NewReport {
    NewReport {
        incident_date: NaiveDate::from_ymd_opt(2025, 2, 1).expect("valid date"),
        location: format!("Site {id}"),
        incident_type: IncidentType::Physical,
        description: vec!["Someone pushed me".to_string()],
        witness: "Witness".to_string(),
        submitted_at: NaiveDate::from_ymd_opt(2025, 3, 1)
            .and_then(|date| date.and_hms_opt(hour, 0, 0))
            .expect("valid timestamp"),
        status,
        distress_percentage: distress,
        scoring_state: ScoringState::Scored,
    }
}

pub(super) fn memory_router(service: Arc<MemoryService>) -> axum::Router {
    report_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
