// Integration tests for carscout
// These tests drive the HTTP API end to end with stub sources

pub mod api_tests;
pub mod gateway_tests;
pub mod search_tests;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use carscout::{
    aggregator::Aggregator,
    cache::QueryCache,
    config::{CacheConfig, SearchConfig},
    models::{FetchStrategy, Listing, SourceInfo, SourceListings},
    sources::SourceClient,
    web::{create_router, AppState},
    AppConfig, AppError, SearchService,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub enum Behaviour {
    Listings(Vec<Listing>),
    Fail,
    Unimplemented,
}

/// Source double that counts how often it is asked.
pub struct StubSource {
    pub name: &'static str,
    pub behaviour: Behaviour,
    pub delay: Duration,
    calls: AtomicUsize,
}

impl StubSource {
    pub fn new(name: &'static str, behaviour: Behaviour) -> Arc<Self> {
        Self::slow(name, behaviour, Duration::ZERO)
    }

    pub fn slow(name: &'static str, behaviour: Behaviour, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            behaviour,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceClient for StubSource {
    fn name(&self) -> &str {
        self.name
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: self.name.to_string(),
            display_name: self.name.to_string(),
            strategy: match self.behaviour {
                Behaviour::Unimplemented => FetchStrategy::Unimplemented,
                _ => FetchStrategy::Static,
            },
        }
    }

    async fn search(&self, _query: &str) -> carscout::Result<SourceListings> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match &self.behaviour {
            Behaviour::Listings(listings) => Ok(SourceListings::Found(listings.clone())),
            Behaviour::Fail => Err(AppError::browser("net::ERR_CONNECTION_RESET")),
            Behaviour::Unimplemented => Ok(SourceListings::Unimplemented),
        }
    }
}

pub fn sample_listings() -> Vec<Listing> {
    vec![
        Listing::new(
            "Toyota Corolla 2015",
            "ETB 500,000",
            "https://www.mekina.net/cars/toyota-corolla-2015",
            "",
            "https://www.mekina.net/img/corolla.jpg",
        ),
        Listing::new(
            "Honda Civic 2012",
            "ETB 300,000",
            "https://www.mekina.net/cars/honda-civic-2012",
            "Bahir Dar",
            "",
        ),
        Listing::new("Toyota Hilux", "Call for price", "https://www.mekina.net/cars/hilux", "", ""),
    ]
}

/// Test configuration for integration tests
pub fn get_test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.request_timeout = 10;
    config.scraper.request_timeout = 2;
    config.scraper.retry_attempts = 0;
    config.cache = CacheConfig {
        enabled: true,
        max_entries: 100,
        ttl_seconds: None,
    };
    config.search = SearchConfig::default();
    config
}

pub fn create_test_app_state(sources: Vec<Arc<dyn SourceClient>>) -> AppState {
    let config = get_test_config();
    let search = SearchService::new(
        Aggregator::new(sources, config.scraper.request_timeout()),
        QueryCache::new(&config.cache),
        &config.search,
    );
    AppState::new(search, config)
}

pub fn create_test_app(sources: Vec<Arc<dyn SourceClient>>) -> Router {
    create_router(create_test_app_state(sources))
}

/// Issues a GET against the router and decodes the JSON body.
pub async fn get_json(app: &Router, uri: &str) -> anyhow::Result<(StatusCode, Value)> {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&body)?))
}
