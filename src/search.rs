use std::sync::Arc;
use tracing::{debug, info};

use crate::aggregator::{merge, validate_query, Aggregator, PlatformSelector};
use crate::cache::{CacheKey, QueryCache};
use crate::config::{AppConfig, SearchConfig};
use crate::models::{SearchOutcome, SearchReport, SourceInfo};
use crate::sources::build_sources;
use crate::utils::error::{AppError, Result};

/// Aggregator behind the query cache, plus the listing clean-up applied
/// before anything is cached.
pub struct SearchService {
    aggregator: Aggregator,
    cache: QueryCache,
    default_location: String,
    require_link: bool,
}

impl SearchService {
    pub fn new(aggregator: Aggregator, cache: QueryCache, search: &SearchConfig) -> Self {
        Self {
            aggregator,
            cache,
            default_location: search.default_location.trim().to_string(),
            require_link: search.require_link,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let sources = build_sources(config)?;
        info!(
            sources = sources.len(),
            cache_enabled = config.cache.enabled,
            "Search service ready"
        );
        Ok(Self::new(
            Aggregator::new(sources, config.scraper.request_timeout()),
            QueryCache::new(&config.cache),
            &config.search,
        ))
    }

    pub fn sources(&self) -> Vec<SourceInfo> {
        self.aggregator.source_infos()
    }

    /// Validates the request, then serves it from the cache or a fresh
    /// aggregated fetch.
    pub async fn search(&self, query: Option<&str>, platform: Option<&str>) -> Result<SearchReport> {
        let query = validate_query(query)?;
        let selector = PlatformSelector::parse(platform);
        let selected = self.aggregator.resolve(&selector)?;
        let key = CacheKey::new(query, selected.iter().map(|s| s.name().to_string()));

        let sources_key = key.clone();
        let fetch = async move {
            let reuse = self.cache.reusable(&sources_key).await;
            let results = self.aggregator.run_sources(query, &selected, &reuse).await;
            self.cache.remember_sources(&sources_key, &results).await;
            let outcome = merge(query, results)?;
            Ok::<_, AppError>(self.prepare(outcome))
        };
        let (outcome, cached) = self.cache.get_or_fetch(key, fetch).await?;
        debug!(query = %query, cached, listings = outcome.listings.len(), "Search served");

        let outcome = Arc::unwrap_or_clone(outcome);
        Ok(SearchReport {
            query: query.to_string(),
            listings: outcome.listings,
            sources: outcome.sources,
            cached,
            fetched_at: outcome.fetched_at,
        })
    }

    fn prepare(&self, mut outcome: SearchOutcome) -> SearchOutcome {
        if self.require_link {
            let before = outcome.listings.len();
            outcome.listings.retain(|l| l.has_link());
            let dropped = before - outcome.listings.len();
            if dropped > 0 {
                debug!(dropped, "Dropped listings without a link");
            }
        }
        if !self.default_location.is_empty() {
            outcome.listings = outcome
                .listings
                .iter()
                .map(|l| l.with_default_location(&self.default_location))
                .collect();
        }
        outcome
    }
}
