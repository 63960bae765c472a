use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::domain::{ReportId, ReportSnapshot, ReportSubmission};
use super::repository::{NotificationPublisher, ReportStore, StoreError};
use super::service::{IncidentReportService, ReportServiceError};

/// Router builder exposing report intake, listing, lookup and rescoring.
pub fn report_router<S, N>(service: Arc<IncidentReportService<S, N>>) -> Router
where
    S: ReportStore + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/reports",
            post(submit_handler::<S, N>).get(list_handler::<S, N>),
        )
        .route("/api/v1/reports/:report_id", get(report_handler::<S, N>))
        .route(
            "/api/v1/reports/:report_id/rescore",
            post(rescore_handler::<S, N>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<S, N>(
    State(service): State<Arc<IncidentReportService<S, N>>>,
    payload: Result<axum::Json<ReportSubmission>, JsonRejection>,
) -> Response
where
    S: ReportStore + 'static,
    N: NotificationPublisher + 'static,
{
    let submission = match payload {
        Ok(axum::Json(submission)) => submission,
        Err(rejection) => return error_body(rejection.status(), rejection.body_text()),
    };

    match service.submit_and_dispatch(submission).await {
        Ok((report, _scoring)) => {
            let payload = json!({
                "message": format!(
                    "Report submitted successfully. Your report ID is {}. Distress calculation is in progress.",
                    report.id
                ),
                "report": report.snapshot(),
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<S, N>(
    State(service): State<Arc<IncidentReportService<S, N>>>,
) -> Response
where
    S: ReportStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.list().await {
        Ok(reports) => {
            let snapshots: Vec<ReportSnapshot> = reports.iter().map(|r| r.snapshot()).collect();
            (StatusCode::OK, axum::Json(snapshots)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn report_handler<S, N>(
    State(service): State<Arc<IncidentReportService<S, N>>>,
    Path(report_id): Path<i64>,
) -> Response
where
    S: ReportStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.get(ReportId(report_id)).await {
        Ok(report) => (StatusCode::OK, axum::Json(report.snapshot())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn rescore_handler<S, N>(
    State(service): State<Arc<IncidentReportService<S, N>>>,
    Path(report_id): Path<i64>,
) -> Response
where
    S: ReportStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.rescore(ReportId(report_id)).await {
        Ok((report, _scoring)) => {
            (StatusCode::ACCEPTED, axum::Json(report.snapshot())).into_response()
        }
        Err(error) => error_response(error),
    }
}

fn error_response(error: ReportServiceError) -> Response {
    let status = match &error {
        ReportServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ReportServiceError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        ReportServiceError::NotDispatchable { .. } | ReportServiceError::ScoringInFlight(_) => {
            StatusCode::CONFLICT
        }
        ReportServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, error.to_string())
}

fn error_body(status: StatusCode, message: String) -> Response {
    let payload = json!({
        "error": message,
    });
    (status, axum::Json(payload)).into_response()
}
