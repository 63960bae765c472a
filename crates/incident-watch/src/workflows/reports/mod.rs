//! Incident report intake, distress scoring, and urgent escalation.
//!
//! A submission is segmented into sentence fragments and stored with a placeholder score;
//! a background task then scores the fragments, writes the percentage back, and pushes a
//! notification when the report becomes urgent.

pub mod distress;
pub mod domain;
pub mod memory;
pub mod notify;
pub mod postgres;
pub mod repository;
pub mod router;
pub mod seed;
pub mod segmenter;
pub mod service;

#[cfg(test)]
mod tests;

pub use distress::{
    calculate_distress_percentage, detect_distress_signals, ConfidenceThreshold,
    DistressAssessment, DistressScorer, HttpSentimentModel, LexiconSentimentModel, ModelError,
    ScoringPolicy, SentimentClassification, SentimentLabel, SentimentModel, SentimentPrediction,
    UrgentCutoff,
};
pub use domain::{
    IncidentType, NewReport, Report, ReportId, ReportSnapshot, ReportStatus, ReportSubmission,
    ScoringState,
};
pub use memory::InMemoryReportStore;
pub use notify::BroadcastNotifier;
pub use postgres::PgReportStore;
pub use repository::{
    NotificationPublisher, NotifyError, ReportNotification, ReportStore, ScoringClaim,
    StoreError, URGENT_REPORT_EVENT,
};
pub use router::report_router;
pub use seed::{sample_reports, seed_store};
pub use segmenter::segment_narrative;
pub use service::{
    prepare_submission, IncidentReportService, ReportServiceError, ScoringError, ScoringHandle,
    ScoringOutcome, ValidationError, INTERRUPTED_SCORING,
};
