pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;

use crate::config::ScannerConfig;
use crate::services::dispatcher::ScanDispatcher;
use crate::services::scanner::VirusScanner;
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Current API base path.
pub const API_BASE_PATH: &str = "/v1";

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::index::index,
        api::handlers::health::health_check,
        api::handlers::scans::scan_object_async,
        api::handlers::scans::list_in_flight,
    ),
    components(
        schemas(
            models::ScanRequest,
            models::ApiMessage,
            models::IndexResponse,
            api::handlers::health::HealthResponse,
            services::dispatcher::InFlightScan,
            services::dispatcher::ScanStatsSnapshot,
        )
    ),
    tags(
        (name = "scans", description = "Malware scanning endpoints"),
        (name = "system", description = "Index and health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: ScanDispatcher,
    pub scanner: Arc<dyn VirusScanner>,
    pub config: ScannerConfig,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(api::handlers::index::index))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/v1/scanObject.async",
            post(api::handlers::scans::scan_object_async),
        )
        .route("/v1/scans", get(api::handlers::scans::list_in_flight))
        .fallback(api::handlers::index::not_found)
        .layer(from_fn(api::middleware::errors::json_method_not_allowed))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(CatchPanicLayer::custom(
            api::middleware::errors::panic_response,
        ))
        .with_state(state)
}
