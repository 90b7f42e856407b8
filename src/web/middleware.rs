use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::responses::ApiError;

/// Request logging middleware
pub async fn request_logging(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;
    let duration_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    if status.is_server_error() {
        error!(method = %method, uri = %uri, status = %status, duration_ms, "Request completed");
    } else if status.is_client_error() {
        warn!(method = %method, uri = %uri, status = %status, duration_ms, "Request completed");
    } else {
        info!(method = %method, uri = %uri, status = %status, duration_ms, "Request completed");
    }

    response
}

/// Caps the whole request. Sources time out on their own well before this,
/// so hitting it means something upstream of them hung.
pub async fn request_timeout(
    State(timeout): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let uri = request.uri().clone();
    match tokio::time::timeout(timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(uri = %uri, "Request timed out after {:?}", timeout);
            ApiError::internal(format!("request exceeded {:?}", timeout)).into_response()
        }
    }
}
