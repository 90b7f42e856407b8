use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;

use super::responses::{ApiError, HealthResponse, INVALID_PRICE_FILTER};
use super::AppState;
use crate::aggregator::validate_query;
use crate::filter::{self, parse_price, FilterCriteria};
use crate::models::{Listing, SearchReport, SourceInfo};

/// Query string of `/api/cars`. The filter names follow the browser UI.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarsQuery {
    pub query: Option<String>,
    pub platform: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub location: Option<String>,
}

impl CarsQuery {
    pub fn criteria(&self) -> Result<FilterCriteria, ApiError> {
        Ok(FilterCriteria {
            brand: self.brand.clone(),
            min_price: price_bound(self.min_price.as_deref())?,
            max_price: price_bound(self.max_price.as_deref())?,
            location: self.location.clone(),
        })
    }
}

fn price_bound(raw: Option<&str>) -> Result<Option<f64>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_price(text)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request(INVALID_PRICE_FILTER)),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub platform: Option<String>,
}

/// `GET /api/cars`: plain array of listings, optionally filtered.
pub async fn get_cars(
    State(state): State<AppState>,
    Query(params): Query<CarsQuery>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    validate_query(params.query.as_deref())?;
    let criteria = params.criteria()?;

    tracing::info!(
        query = ?params.query,
        platform = ?params.platform,
        filtered = !criteria.is_empty(),
        "Car search requested"
    );

    let report = state
        .search
        .search(params.query.as_deref(), params.platform.as_deref())
        .await?;

    if criteria.is_empty() {
        return Ok(Json(report.listings));
    }
    Ok(Json(filter::apply(&report.listings, &criteria)))
}

/// `GET /api/search`: listings plus per-source status.
pub async fn search_detailed(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchReport>, ApiError> {
    let report = state
        .search
        .search(params.query.as_deref(), params.platform.as_deref())
        .await?;
    Ok(Json(report))
}

pub async fn list_sources(State(state): State<AppState>) -> Json<Vec<SourceInfo>> {
    Json(state.search.sources())
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
