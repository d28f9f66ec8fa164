use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryJobStore, UsageBackend};
use crate::routes::with_platform_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use pactum::config::AppConfig;
use pactum::error::AppError;
use pactum::migrations::MigrationOrchestrator;
use pactum::telemetry;
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
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let analytics = UsageBackend::load(config.migration.usage_csv.as_deref())?;
    let orchestrator = Arc::new(MigrationOrchestrator::new(
        Arc::new(InMemoryJobStore::default()),
        Arc::new(analytics),
        config.migration.risk_thresholds,
    ));

    let app = with_platform_routes(orchestrator)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        medium_risk = config.migration.risk_thresholds.medium,
        high_risk = config.migration.risk_thresholds.high,
        "pactum versioning service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
