use crate::cli::ServeArgs;
use crate::infra::{
    demo_roster, AppState, InMemoryActivityRepository, InMemoryRecipientRepository,
    InMemoryTemplateRepository, LoggingMailer,
};
use crate::routes::with_communication_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hireloop::communications::{CommunicationService, RosterImporter};
use hireloop::config::AppConfig;
use hireloop::error::AppError;
use hireloop::telemetry;
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
    if let Some(path) = args.roster_csv.take() {
        config.roster_csv = Some(path);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let roster = match &config.roster_csv {
        Some(path) => RosterImporter::from_path(path)?,
        None => demo_roster(),
    };
    info!(
        recipients = roster.len(),
        source = if config.roster_csv.is_some() { "csv" } else { "demo" },
        "recipient roster loaded"
    );

    let service = Arc::new(CommunicationService::new(
        Arc::new(InMemoryTemplateRepository::default()),
        Arc::new(InMemoryRecipientRepository::seeded(roster)),
        Arc::new(InMemoryActivityRepository::default()),
        Arc::new(LoggingMailer::default()),
        config.dispatch,
    ));

    let app = with_communication_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        max_concurrency = config.dispatch.max_concurrency,
        "candidate communication service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
