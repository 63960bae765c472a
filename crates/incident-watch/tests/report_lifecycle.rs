use std::sync::Arc;

use chrono::NaiveDate;
use incident_watch::workflows::reports::{
    sample_reports, seed_store, BroadcastNotifier, DistressScorer, InMemoryReportStore,
    IncidentReportService, IncidentType, LexiconSentimentModel, ReportStatus, ReportStore,
    ReportSubmission, ScoringPolicy, ScoringState, URGENT_REPORT_EVENT,
};
use tokio::sync::broadcast::error::TryRecvError;

type LexiconService = IncidentReportService<InMemoryReportStore, BroadcastNotifier>;

fn lexicon_service() -> (Arc<LexiconService>, Arc<InMemoryReportStore>, Arc<BroadcastNotifier>) {
    let store = Arc::new(InMemoryReportStore::default());
    let notifier = Arc::new(BroadcastNotifier::default());
    let policy = ScoringPolicy::default();
    let model = LexiconSentimentModel::new().expect("lexicon builds");
    let scorer = DistressScorer::new(Arc::new(model), policy.confidence_threshold);
    let service = Arc::new(IncidentReportService::new(
        store.clone(),
        notifier.clone(),
        scorer,
        policy,
    ));
    (service, store, notifier)
}

fn submission(incident_type: IncidentType, description: &str) -> ReportSubmission {
    ReportSubmission {
        incident_date: NaiveDate::from_ymd_opt(2025, 2, 2).expect("valid date"),
        location: "Home".to_string(),
        incident_type,
        description: description.to_string(),
        witness: "Victim".to_string(),
    }
}

#[tokio::test]
async fn urgent_report_is_broadcast_to_listeners() {
    let (service, store, notifier) = lexicon_service();
    let mut listener = notifier.subscribe();

    let (report, handle) = service
        .submit_and_dispatch(submission(
            IncidentType::Physical,
            "My partner hit me. I'm scared for my life.",
        ))
        .await
        .expect("submission accepted");
    assert_eq!(report.scoring_state, ScoringState::Pending);

    let outcome = handle.outcome().await.expect("scoring completes");
    assert_eq!(outcome.report.distress_percentage, 100.0);
    assert_eq!(outcome.report.status, ReportStatus::Urgent);

    let notification = listener.recv().await.expect("urgent notification");
    assert_eq!(notification.event, URGENT_REPORT_EVENT);
    assert_eq!(notification.data.report_id, report.id);
    assert_eq!(notification.data.incident_type, "Physical");
    assert_eq!(
        notification.data.description,
        vec!["My partner hit me", "I'm scared for my life"]
    );

    let stored = store
        .fetch(report.id)
        .await
        .expect("fetch")
        .expect("report exists");
    assert_eq!(stored.scoring_state, ScoringState::Scored);
}

#[tokio::test]
async fn reassuring_report_is_not_broadcast() {
    let (service, _store, notifier) = lexicon_service();
    let mut listener = notifier.subscribe();

    let (_report, handle) = service
        .submit_and_dispatch(submission(
            IncidentType::Other("Follow-up".to_string()),
            "The counselor was kind. I feel safe now.",
        ))
        .await
        .expect("submission accepted");
    let outcome = handle.outcome().await.expect("scoring completes");

    assert_eq!(outcome.report.distress_percentage, 0.0);
    assert_eq!(outcome.report.status, ReportStatus::Pending);
    assert_eq!(outcome.report.incident_type.label(), "Follow-up");
    assert!(matches!(listener.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn seeded_reports_are_ranked_and_backfilled() {
    let (service, store, _notifier) = lexicon_service();
    let inserted = seed_store(store.as_ref()).await.expect("seed succeeds");
    assert_eq!(inserted, sample_reports().expect("sample data").len());

    service.backfill_statuses().await.expect("backfill succeeds");
    let reports = service.list().await.expect("list succeeds");

    assert_eq!(reports.len(), inserted);
    assert!(reports
        .windows(2)
        .all(|pair| pair[0].distress_percentage >= pair[1].distress_percentage));
    assert_eq!(reports[0].distress_percentage, 90.0);
    assert_eq!(reports[0].status, ReportStatus::Urgent);
    assert!(reports
        .iter()
        .filter(|report| report.distress_percentage <= 60.0)
        .all(|report| report.status == ReportStatus::Pending));
}

#[tokio::test]
async fn new_submission_joins_the_ranking() {
    let (service, store, _notifier) = lexicon_service();
    seed_store(store.as_ref()).await.expect("seed succeeds");

    let (report, handle) = service
        .submit_and_dispatch(submission(
            IncidentType::Sexual,
            "He groped me on the bus. I felt humiliated. Nobody helped.",
        ))
        .await
        .expect("submission accepted");
    let outcome = handle.outcome().await.expect("scoring completes");
    assert_eq!(outcome.report.distress_percentage, 66.67);

    let reports = service.list().await.expect("list succeeds");
    let position = reports
        .iter()
        .position(|candidate| candidate.id == report.id)
        .expect("new report listed");
    assert!(reports[..position]
        .iter()
        .all(|earlier| earlier.distress_percentage >= 66.67));
    assert!(reports[position + 1..]
        .iter()
        .all(|later| later.distress_percentage <= 66.67));
}
