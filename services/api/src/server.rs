use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryStorage, TracingAlertBroadcaster};
use crate::routes::base_routes;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use forecourt::alerts::{alert_router, AlertRouterState};
use forecourt::auth::router::{auth_router, AuthRouterState};
use forecourt::auth::{provider_for, JwtIdentityProvider};
use forecourt::config::AppConfig;
use forecourt::error::AppError;
use forecourt::reviews::{review_router, ReviewRouterState, ReviewService, RewardPolicy};
use forecourt::stations::{station_router, StationRouterState};
use forecourt::storage::Storage;
use forecourt::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

/// The public API surface over a concrete store: auth, stations, reviews
/// and rewards, and alerts.
pub fn api_router<S: Storage + 'static>(config: &AppConfig, storage: Arc<S>) -> Router {
    let jwt = Arc::new(JwtIdentityProvider::new(
        &config.auth.jwt_secret,
        config.auth.token_ttl_hours,
    ));
    let identity = provider_for(config, jwt.clone());

    let policy = RewardPolicy {
        visit_threshold: config.rewards.visit_threshold,
        duplicate_window_hours: config.rewards.duplicate_window_hours,
        coupon_ttl_days: config.rewards.coupon_ttl_days,
    };
    let service = Arc::new(ReviewService::new(storage.clone(), policy));
    let broadcaster = Arc::new(TracingAlertBroadcaster);

    auth_router(AuthRouterState {
        storage: storage.clone(),
        tokens: jwt,
    })
    .merge(station_router(StationRouterState {
        storage: storage.clone(),
        identity: identity.clone(),
        public_url: config.server.public_url.clone(),
    }))
    .merge(review_router(ReviewRouterState {
        service,
        identity: identity.clone(),
    }))
    .merge(alert_router(AlertRouterState {
        storage,
        broadcaster,
        identity,
    }))
}

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
    let storage = Arc::new(InMemoryStorage::default());
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        storage: storage.clone(),
    };

    let app = api_router(&config, storage)
        .merge(base_routes())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "review platform ready");

    axum::serve(listener, app).await?;
    Ok(())
}
