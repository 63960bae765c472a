use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::distress::{DistressScorer, ModelError, ScoringPolicy};
use super::domain::{
    NewReport, Report, ReportId, ReportStatus, ReportSubmission, ScoringState,
    MAX_INCIDENT_TYPE_LEN, MAX_LOCATION_LEN, MAX_WITNESS_LEN,
};
use super::repository::{
    NotificationPublisher, ReportNotification, ReportStore, ScoringClaim, StoreError,
};
use super::segmenter::segment_narrative;

/// Failure message recorded for reports found in `scoring` at startup.
pub const INTERRUPTED_SCORING: &str = "scoring interrupted before completion";

/// Service composing intake validation, the store, the distress scorer and the
/// notification channel.
pub struct IncidentReportService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    scorer: DistressScorer,
    policy: ScoringPolicy,
    in_flight: Arc<Mutex<HashSet<ReportId>>>,
}

impl<S, N> IncidentReportService<S, N>
where
    S: ReportStore + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        store: Arc<S>,
        notifier: Arc<N>,
        scorer: DistressScorer,
        policy: ScoringPolicy,
    ) -> Self {
        Self {
            store,
            notifier,
            scorer,
            policy,
            in_flight: Arc::default(),
        }
    }

    pub fn policy(&self) -> ScoringPolicy {
        self.policy
    }

    pub fn scorer(&self) -> &DistressScorer {
        &self.scorer
    }

    /// Validate, segment and persist a submission with a placeholder score.
    pub async fn submit(
        &self,
        submission: ReportSubmission,
    ) -> Result<Report, ReportServiceError> {
        let started = Instant::now();
        let new_report = prepare_submission(submission, Local::now().naive_local())?;
        let segmented_in = started.elapsed();

        let report = self.store.insert(new_report).await?;
        info!(
            report_id = %report.id,
            fragments = report.description.len(),
            segment_us = segmented_in.as_micros() as u64,
            total_ms = started.elapsed().as_millis() as u64,
            "report stored, distress scoring pending"
        );
        Ok(report)
    }

    /// Persist the submission and hand scoring off to a background task.
    pub async fn submit_and_dispatch(
        self: &Arc<Self>,
        submission: ReportSubmission,
    ) -> Result<(Report, ScoringHandle), ReportServiceError> {
        let report = self.submit(submission).await?;
        let handle = self.dispatch_scoring(report.id)?;
        Ok((report, handle))
    }

    /// Spawn the single scoring task for a report. At most one task per report runs at a
    /// time within this process.
    pub fn dispatch_scoring(
        self: &Arc<Self>,
        id: ReportId,
    ) -> Result<ScoringHandle, ReportServiceError> {
        let claim = InFlightClaim::acquire(&self.in_flight, id)
            .ok_or(ReportServiceError::ScoringInFlight(id))?;

        let service = Arc::clone(self);
        let task = tokio::spawn(async move {
            let _claim = claim;
            service.score_report(id).await
        });

        Ok(ScoringHandle { id, task })
    }

    /// Re-dispatch scoring for a report whose previous attempt failed or never started.
    pub async fn rescore(
        self: &Arc<Self>,
        id: ReportId,
    ) -> Result<(Report, ScoringHandle), ReportServiceError> {
        let report = self.get(id).await?;
        if !report.scoring_state.can_dispatch() {
            return Err(ReportServiceError::NotDispatchable {
                id,
                state: report.scoring_state,
            });
        }

        let handle = self.dispatch_scoring(id)?;
        info!(
            report_id = %id,
            previous = report.scoring_state.label(),
            "distress rescoring dispatched"
        );
        Ok((report, handle))
    }

    /// Score a stored report and apply the status and notification side effects.
    ///
    /// The store claim is the only way into `scoring`, so a stale dispatch for a report
    /// that has since been scored is refused. Every failure after the claim leaves the
    /// report `failed` and therefore rescorable.
    pub async fn score_report(&self, id: ReportId) -> Result<ScoringOutcome, ScoringError> {
        let report = match self.store.claim_scoring(id).await? {
            ScoringClaim::Claimed(report) => report,
            ScoringClaim::Refused(state) => {
                warn!(
                    report_id = %id,
                    state = state.label(),
                    "scoring claim refused"
                );
                return Err(ScoringError::NotDispatchable { id, state });
            }
        };

        match self.score_claimed(report).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.record_failure(id, &err).await;
                Err(err)
            }
        }
    }

    async fn score_claimed(&self, report: Report) -> Result<ScoringOutcome, ScoringError> {
        let id = report.id;
        let started = Instant::now();
        let assessment = self
            .scorer
            .assess(&report.description, self.policy.confidence_threshold)
            .await
            .map_err(|source| ScoringError::Model { id, source })?;

        let status = self.policy.urgent_cutoff.status_for(assessment.percentage);
        let scored = self
            .store
            .record_score(id, assessment.percentage, status)
            .await?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let mut notified = false;
        if status == ReportStatus::Urgent {
            warn!(
                report_id = %id,
                distress = scored.distress_percentage,
                signals = assessment.signal_count,
                elapsed_ms,
                "report escalated to urgent"
            );
            match self.notifier.publish(ReportNotification::urgent(&scored)) {
                Ok(()) => notified = true,
                Err(err) => error!(report_id = %id, error = %err, "urgent notification failed"),
            }
        } else {
            info!(
                report_id = %id,
                distress = scored.distress_percentage,
                signals = assessment.signal_count,
                elapsed_ms,
                "report scored"
            );
        }

        Ok(ScoringOutcome {
            report: scored,
            signal_count: assessment.signal_count,
            notified,
        })
    }

    async fn record_failure(&self, id: ReportId, err: &ScoringError) {
        let message = match err {
            ScoringError::Model { source, .. } => source.to_string(),
            other => other.to_string(),
        };
        error!(
            report_id = %id,
            model = self.scorer.model_name(),
            error = %message,
            "distress scoring failed"
        );
        if let Err(store_error) = self
            .store
            .set_scoring_state(id, ScoringState::Failed, Some(message))
            .await
        {
            error!(
                report_id = %id,
                error = %store_error,
                "unable to record scoring failure"
            );
        }
    }

    pub async fn get(&self, id: ReportId) -> Result<Report, ReportServiceError> {
        let report = self.store.fetch(id).await?.ok_or(StoreError::NotFound(id))?;
        Ok(report)
    }

    /// All reports, most distressing first.
    pub async fn list(&self) -> Result<Vec<Report>, ReportServiceError> {
        Ok(self.store.list_ranked().await?)
    }

    /// Fail reports a previous process left in `scoring` so they can be rescored.
    pub async fn recover_interrupted(&self) -> Result<u64, ReportServiceError> {
        let recovered = self.store.fail_interrupted(INTERRUPTED_SCORING).await?;
        if recovered > 0 {
            warn!(recovered, "interrupted scoring marked failed");
        }
        Ok(recovered)
    }

    /// Bring stored statuses in line with the urgent cutoff.
    pub async fn backfill_statuses(&self) -> Result<u64, ReportServiceError> {
        let changed = self
            .store
            .recompute_statuses(self.policy.urgent_cutoff)
            .await?;
        info!(
            changed,
            cutoff = self.policy.urgent_cutoff.value(),
            "report statuses backfilled"
        );
        Ok(changed)
    }
}

/// Turn a raw submission into an insertable report: segment the narrative and check the
/// free-text fields.
pub fn prepare_submission(
    submission: ReportSubmission,
    submitted_at: NaiveDateTime,
) -> Result<NewReport, ValidationError> {
    let ReportSubmission {
        incident_date,
        location,
        incident_type,
        description,
        witness,
    } = submission;

    let location = required_field("location", &location, MAX_LOCATION_LEN)?;
    let witness = required_field("witness", &witness, MAX_WITNESS_LEN)?;
    required_field("incident_type", incident_type.label(), MAX_INCIDENT_TYPE_LEN)?;

    let fragments = segment_narrative(&description);
    if fragments.is_empty() {
        return Err(ValidationError::EmptyDescription);
    }

    Ok(NewReport {
        incident_date,
        location,
        incident_type,
        description: fragments,
        witness,
        submitted_at,
        status: ReportStatus::Pending,
        distress_percentage: 0.0,
        scoring_state: ScoringState::Pending,
    })
}

fn required_field(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    if trimmed.chars().count() > max_len {
        return Err(ValidationError::FieldTooLong { field, max_len });
    }
    Ok(trimmed.to_string())
}

struct InFlightClaim {
    registry: Arc<Mutex<HashSet<ReportId>>>,
    id: ReportId,
}

impl InFlightClaim {
    fn acquire(registry: &Arc<Mutex<HashSet<ReportId>>>, id: ReportId) -> Option<Self> {
        let mut guard = registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !guard.insert(id) {
            return None;
        }
        Some(Self {
            registry: Arc::clone(registry),
            id,
        })
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        let mut guard = self
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.remove(&self.id);
    }
}

/// Join handle for a background scoring task. Dropping it detaches the task.
#[derive(Debug)]
pub struct ScoringHandle {
    id: ReportId,
    task: JoinHandle<Result<ScoringOutcome, ScoringError>>,
}

impl ScoringHandle {
    pub fn report_id(&self) -> ReportId {
        self.id
    }

    pub async fn outcome(self) -> Result<ScoringOutcome, ScoringError> {
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(ScoringError::Aborted {
                id: self.id,
                reason: err.to_string(),
            }),
        }
    }
}

/// Result of a completed scoring task.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringOutcome {
    pub report: Report,
    pub signal_count: usize,
    pub notified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("description must contain at least one sentence")]
    EmptyDescription,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{field} must be at most {max_len} characters")]
    FieldTooLong { field: &'static str, max_len: usize },
}

/// Error raised by the report service.
#[derive(Debug, thiserror::Error)]
pub enum ReportServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("report {id} cannot be rescored while {}", .state.label())]
    NotDispatchable { id: ReportId, state: ScoringState },
    #[error("report {0} is already being scored")]
    ScoringInFlight(ReportId),
}

/// Terminal failure of one scoring attempt. A claimed report is left `failed`.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("distress model failed for report {id}: {source}")]
    Model {
        id: ReportId,
        #[source]
        source: ModelError,
    },
    #[error("report {id} cannot be scored while {}", .state.label())]
    NotDispatchable { id: ReportId, state: ScoringState },
    #[error("scoring task for report {id} aborted: {reason}")]
    Aborted { id: ReportId, reason: String },
}
