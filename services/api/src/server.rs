use crate::cli::ServeArgs;
use crate::infra::{build_report_service, AppState, ReportBackend};
use crate::routes::with_report_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use incident_watch::config::AppConfig;
use incident_watch::error::AppError;
use incident_watch::telemetry;
use incident_watch::workflows::reports::{seed_store, BroadcastNotifier, ReportStore};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let notifier = Arc::new(BroadcastNotifier::default());
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        notifier: notifier.clone(),
    };

    let store = Arc::new(ReportBackend::connect(&config.store).await?);
    store.ensure_schema().await?;
    if args.seed {
        let inserted = seed_store(store.as_ref()).await?;
        info!(inserted, store = store.label(), "sample reports seeded");
    }

    let report_service = build_report_service(&config, store, notifier)?;
    report_service.recover_interrupted().await?;
    report_service.backfill_statuses().await?;

    let app = with_report_routes(report_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "incident report service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

pub(crate) async fn seed() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let store = ReportBackend::connect(&config.store).await?;
    store.ensure_schema().await?;
    let inserted = seed_store(&store).await?;
    let changed = store
        .recompute_statuses(config.scoring.urgent_cutoff)
        .await?;

    info!(inserted, changed, store = store.label(), "sample reports seeded");
    println!(
        "Seeded {inserted} reports into the {} store ({changed} statuses updated).",
        store.label()
    );
    Ok(())
}
