use metrics::counter;
use moka::future::Cache;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::config::CacheConfig;
use crate::models::{SearchOutcome, SourceResult};
use crate::utils::error::{AppError, Result};

/// `(normalized query, requested sources in declaration order)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    query: String,
    sources: Vec<String>,
}

impl CacheKey {
    /// Queries differing only in case or spacing share an entry.
    pub fn new<S: Into<String>>(query: &str, sources: impl IntoIterator<Item = S>) -> Self {
        Self {
            query: query
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase(),
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

pub type CachedResult = Arc<SearchOutcome>;

/// Why a fetch did not produce a cacheable value.
#[derive(Debug)]
enum Uncached {
    /// Some source failed; handed to every waiter but not stored.
    Partial(SearchOutcome),
    Failed(AppError),
}

/// Memoizes aggregated searches.
///
/// Concurrent lookups of a missing key share one fetch. Only outcomes where
/// no source failed are stored, so a transient failure is retried by the
/// next request rather than pinned. The healthy sources of a partial outcome
/// are kept on the side and reused by that retry.
#[derive(Clone)]
pub struct QueryCache {
    inner: Option<Cache<CacheKey, CachedResult>>,
    partial: Option<Cache<CacheKey, SourceResult>>,
}

impl QueryCache {
    pub fn new(config: &CacheConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let mut builder = Cache::builder().max_capacity(config.max_entries);
        let mut partial = Cache::builder().max_capacity(config.max_entries);
        if let Some(ttl) = config.ttl() {
            builder = builder.time_to_live(ttl);
            partial = partial.time_to_live(ttl);
        }
        Self {
            inner: Some(builder.build()),
            partial: Some(partial.build()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            inner: None,
            partial: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CachedResult> {
        self.inner.as_ref()?.get(key).await
    }

    pub async fn put(&self, key: CacheKey, result: CachedResult) {
        if let Some(cache) = &self.inner {
            cache.insert(key, result).await;
        }
    }

    /// Per-source results left by an earlier partial fetch of `key`.
    pub async fn reusable(&self, key: &CacheKey) -> HashMap<String, SourceResult> {
        let Some(partial) = &self.partial else {
            return HashMap::new();
        };

        let mut found = HashMap::new();
        for source in &key.sources {
            if let Some(result) = partial.get(&source_key(key, source)).await {
                found.insert(source.clone(), result);
            }
        }
        found
    }

    /// Keeps the sources that did not fail when some did. Once nothing failed
    /// the side entries are dropped, the whole outcome gets cached instead.
    pub async fn remember_sources(&self, key: &CacheKey, results: &[SourceResult]) {
        let Some(partial) = &self.partial else {
            return;
        };

        if results.iter().any(SourceResult::is_failed) {
            for result in results.iter().filter(|r| !r.is_failed()) {
                partial
                    .insert(source_key(key, result.source()), result.clone())
                    .await;
            }
        } else {
            for source in &key.sources {
                partial.invalidate(&source_key(key, source)).await;
            }
        }
    }

    /// Returns the stored outcome for `key`, or runs `fetch` once for all
    /// concurrent callers. The flag is true when the value came from the cache
    /// or from another caller's in-flight fetch.
    pub async fn get_or_fetch<F>(&self, key: CacheKey, fetch: F) -> Result<(CachedResult, bool)>
    where
        F: Future<Output = Result<SearchOutcome>>,
    {
        let Some(cache) = &self.inner else {
            return Ok((Arc::new(fetch.await?), false));
        };

        let init = async move {
            match fetch.await {
                Ok(outcome) if outcome.is_complete() => Ok(Arc::new(outcome)),
                Ok(outcome) => Err(Uncached::Partial(outcome)),
                Err(e) => Err(Uncached::Failed(e)),
            }
        };

        match cache.entry(key.clone()).or_try_insert_with(init).await {
            Ok(entry) => {
                let hit = !entry.is_fresh();
                counter!("carscout_cache_requests_total", "result" => if hit { "hit" } else { "miss" })
                    .increment(1);
                debug!(query = %key.query, hit, "Query cache lookup");
                Ok((entry.into_value(), hit))
            }
            Err(uncached) => {
                counter!("carscout_cache_requests_total", "result" => "miss").increment(1);
                match uncached.as_ref() {
                    Uncached::Partial(outcome) => Ok((Arc::new(outcome.clone()), false)),
                    Uncached::Failed(AppError::AllSourcesFailed(detail)) => {
                        Err(AppError::AllSourcesFailed(detail.clone()))
                    }
                    Uncached::Failed(e) => Err(AppError::Internal(e.to_string())),
                }
            }
        }
    }
}

fn source_key(key: &CacheKey, source: &str) -> CacheKey {
    CacheKey::new(&key.query, [source])
}
