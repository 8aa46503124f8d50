pub mod error;
pub mod health;
pub mod response;
pub mod simulate;

use axum::{
    http::{HeaderValue, Method},
    routing::{any, get},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::Config, simulation::SimulationRunner};

#[derive(Debug, Clone)]
pub struct AppState {
    pub runner: SimulationRunner,
}

impl AppState {
    pub fn new(cfg: &Config) -> Self {
        Self {
            runner: SimulationRunner::new(cfg.simulation.clone()),
        }
    }
}

pub fn router(state: AppState, cfg: &Config) -> Router {
    let mut router = Router::new()
        // any method reaches the handler so non-POST gets the JSON envelope
        .route(&cfg.server.endpoint_path, any(simulate::run_simulation))
        .route("/healthz", get(health::healthz))
        .route("/health/ready", get(health::readiness_check))
        .with_state(state);

    if cfg.server.enable_cors {
        let mut cors = CorsLayer::new()
            .allow_methods([Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE]);
        match cfg.server.cors_origin.as_deref().map(HeaderValue::from_str) {
            Some(Ok(origin)) => cors = cors.allow_origin(origin),
            Some(Err(e)) => tracing::warn!(error = %e, "Ignoring invalid server.cors_origin"),
            None => cors = cors.allow_origin(tower_http::cors::Any),
        }
        router = router.layer(cors);
    }

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(axum::extract::DefaultBodyLimit::max(cfg.server.max_upload_bytes)),
    )
}
