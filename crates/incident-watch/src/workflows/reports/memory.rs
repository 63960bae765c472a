use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::distress::UrgentCutoff;
use super::domain::{NewReport, Report, ReportId, ReportStatus, ScoringState};
use super::repository::{ReportStore, ScoringClaim, StoreError};

/// Process-local store for development, demos and tests.
#[derive(Clone)]
pub struct InMemoryReportStore {
    records: Arc<Mutex<BTreeMap<ReportId, Report>>>,
    sequence: Arc<AtomicI64>,
}

impl Default for InMemoryReportStore {
    fn default() -> Self {
        Self {
            records: Arc::default(),
            sequence: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl InMemoryReportStore {
    fn records(&self) -> Result<MutexGuard<'_, BTreeMap<ReportId, Report>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("report store mutex poisoned".to_string()))
    }

    pub fn len(&self) -> usize {
        self.records().map(|guard| guard.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert(&self, report: NewReport) -> Result<Report, StoreError> {
        let id = ReportId(self.sequence.fetch_add(1, Ordering::Relaxed));
        let record = Report::from_new(id, report);
        self.records()?.insert(id, record.clone());
        Ok(record)
    }

    async fn fetch(&self, id: ReportId) -> Result<Option<Report>, StoreError> {
        Ok(self.records()?.get(&id).cloned())
    }

    async fn set_scoring_state(
        &self,
        id: ReportId,
        state: ScoringState,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        let mut guard = self.records()?;
        let record = guard.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.scoring_state = state;
        record.scoring_error = error;
        Ok(())
    }

    async fn claim_scoring(&self, id: ReportId) -> Result<ScoringClaim, StoreError> {
        let mut guard = self.records()?;
        let record = guard.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if !record.scoring_state.can_dispatch() {
            return Ok(ScoringClaim::Refused(record.scoring_state));
        }
        record.scoring_state = ScoringState::Scoring;
        record.scoring_error = None;
        Ok(ScoringClaim::Claimed(record.clone()))
    }

    async fn fail_interrupted(&self, message: &str) -> Result<u64, StoreError> {
        let mut guard = self.records()?;
        let mut failed = 0;
        for record in guard
            .values_mut()
            .filter(|record| record.scoring_state == ScoringState::Scoring)
        {
            record.scoring_state = ScoringState::Failed;
            record.scoring_error = Some(message.to_string());
            failed += 1;
        }
        Ok(failed)
    }

    async fn record_score(
        &self,
        id: ReportId,
        distress_percentage: f64,
        status: ReportStatus,
    ) -> Result<Report, StoreError> {
        let mut guard = self.records()?;
        let record = guard.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.distress_percentage = distress_percentage;
        record.status = status;
        record.scoring_state = ScoringState::Scored;
        record.scoring_error = None;
        Ok(record.clone())
    }

    async fn list_ranked(&self) -> Result<Vec<Report>, StoreError> {
        let mut reports: Vec<Report> = self.records()?.values().cloned().collect();
        reports.sort_by(|left, right| {
            right
                .distress_percentage
                .total_cmp(&left.distress_percentage)
                .then_with(|| right.submitted_at.cmp(&left.submitted_at))
        });
        Ok(reports)
    }

    async fn recompute_statuses(&self, cutoff: UrgentCutoff) -> Result<u64, StoreError> {
        let mut guard = self.records()?;
        let mut changed = 0;
        for record in guard.values_mut() {
            let next = backfilled_status(record.status, record.distress_percentage, cutoff);
            if next != record.status {
                record.status = next;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

/// Status a stored report should carry after backfill. Reviewed survives unless the
/// percentage is over the cutoff.
pub(crate) fn backfilled_status(
    current: ReportStatus,
    distress_percentage: f64,
    cutoff: UrgentCutoff,
) -> ReportStatus {
    if cutoff.is_urgent(distress_percentage) {
        ReportStatus::Urgent
    } else if current == ReportStatus::Reviewed {
        ReportStatus::Reviewed
    } else {
        ReportStatus::Pending
    }
}
