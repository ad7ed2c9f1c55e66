use crate::cli::ServeArgs;
use crate::infra::{AppState, MatchingState};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use talent_match::config::AppConfig;
use talent_match::error::AppError;
use talent_match::matching::MatchingEngine;
use talent_match::profile::HostedProfileClient;
use talent_match::source::{ReferenceCache, RestTableSource};
use talent_match::telemetry;
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

    let source = Arc::new(RestTableSource::from_config(&config.source)?);
    let generator = Arc::new(HostedProfileClient::from_config(&config.profile)?);
    let matching_state = Arc::new(MatchingState {
        engine: Arc::new(MatchingEngine::new(source.clone())),
        source,
        reference: Arc::new(ReferenceCache::new(config.source.reference_cache_ttl)),
        generator,
        settings: config.matching.clone(),
    });

    let app = with_service_routes(matching_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "talent matching service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
