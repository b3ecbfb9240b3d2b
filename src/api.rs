pub(crate) mod classify;
pub(crate) mod health;
pub(crate) mod keywords;
pub(crate) mod metrics;
pub(crate) mod samples;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::app::AppState;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(metrics::exporter))
        .route("/v1/classify", post(classify::classify))
        .route("/v1/samples", get(samples::list))
        .route("/v1/keywords", get(keywords::dictionary))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
