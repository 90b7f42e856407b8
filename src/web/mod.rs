use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use crate::config::AppConfig;
use crate::search::SearchService;

pub mod handlers;
pub mod middleware;
pub mod responses;

pub use handlers::{get_cars, health_check, list_sources, search_detailed, CarsQuery, SearchParams};
pub use responses::{ApiError, ErrorBody, HealthResponse};

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchService>,
    pub metrics: Option<PrometheusHandle>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(search: SearchService, config: AppConfig) -> Self {
        Self {
            search: Arc::new(search),
            metrics: None,
            config: Arc::new(config),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config.server.request_timeout);

    let mut router = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes());

    if state.metrics.is_some() {
        let endpoint = state.config.metrics.endpoint.clone();
        router = router.route(&endpoint, get(handlers::metrics));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive())
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .layer(axum::middleware::from_fn_with_state(
                    request_timeout,
                    middleware::request_timeout,
                )),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/cars", get(get_cars))
        .route("/search", get(search_detailed))
        .route("/sources", get(list_sources))
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let address = format!("{}:{}", state.config.server.host, state.config.server.port);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(address = %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
