use async_trait::async_trait;
use serde::Serialize;

use super::distress::UrgentCutoff;
use super::domain::{NewReport, Report, ReportId, ReportSnapshot, ReportStatus, ScoringState};

/// Event name pushed to administrators when a report crosses the urgent cutoff.
pub const URGENT_REPORT_EVENT: &str = "new_urgent_report";

/// Storage abstraction so the service can run against Postgres or an in-memory map.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Create or upgrade the schema. Safe to run on every start.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    async fn insert(&self, report: NewReport) -> Result<Report, StoreError>;

    async fn fetch(&self, id: ReportId) -> Result<Option<Report>, StoreError>;

    async fn set_scoring_state(
        &self,
        id: ReportId,
        state: ScoringState,
        error: Option<String>,
    ) -> Result<(), StoreError>;

    /// Atomically move a `pending` or `failed` report to `scoring`. Any other state is
    /// refused and left untouched.
    async fn claim_scoring(&self, id: ReportId) -> Result<ScoringClaim, StoreError>;

    /// Mark every report left in `scoring` as `failed` with `message`; returns the count.
    async fn fail_interrupted(&self, message: &str) -> Result<u64, StoreError>;

    /// Persist the final score and status and mark the report scored.
    async fn record_score(
        &self,
        id: ReportId,
        distress_percentage: f64,
        status: ReportStatus,
    ) -> Result<Report, StoreError>;

    /// All reports, highest distress first, newest first among ties.
    async fn list_ranked(&self) -> Result<Vec<Report>, StoreError>;

    /// Re-derive Urgent/Pending from stored percentages; returns the number of rows changed.
    async fn recompute_statuses(&self, cutoff: UrgentCutoff) -> Result<u64, StoreError>;
}

/// Result of [`ReportStore::claim_scoring`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringClaim {
    Claimed(Report),
    Refused(ScoringState),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("report {0} not found")]
    NotFound(ReportId),
    #[error("report store unavailable: {0}")]
    Unavailable(String),
    #[error("stored report {id} is corrupt: {detail}")]
    Corrupt { id: i64, detail: String },
}

/// Outbound push channel (websocket fan-out or a test double).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: ReportNotification) -> Result<(), NotifyError>;
}

/// Named event carrying a full report snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportNotification {
    pub event: &'static str,
    pub data: ReportSnapshot,
}

impl ReportNotification {
    pub fn urgent(report: &Report) -> Self {
        Self {
            event: URGENT_REPORT_EVENT,
            data: report.snapshot(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
