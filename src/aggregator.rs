use chrono::Utc;
use futures::future::join_all;
use metrics::{counter, histogram};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::ALL_SOURCES_SENTINELS;
use crate::models::{
    SearchOutcome, SourceInfo, SourceListings, SourceReport, SourceResult, SourceStatus,
};
use crate::sources::SourceClient;
use crate::utils::error::{AppError, Result};

pub const MISSING_QUERY: &str = "Query parameter is required";

/// Which configured sources a search should hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformSelector {
    All,
    One(String),
}

impl PlatformSelector {
    /// Missing, blank, `both` and `all` select every source.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|p| p.trim().to_lowercase()) {
            None => PlatformSelector::All,
            Some(p) if p.is_empty() || ALL_SOURCES_SENTINELS.contains(&p.as_str()) => {
                PlatformSelector::All
            }
            Some(p) => PlatformSelector::One(p),
        }
    }
}

/// Trims the query and rejects it when nothing is left.
pub fn validate_query(query: Option<&str>) -> Result<&str> {
    match query.map(str::trim) {
        Some(q) if !q.is_empty() => Ok(q),
        _ => Err(AppError::Validation(MISSING_QUERY.to_string())),
    }
}

/// Fans a query out to the selected sources and merges what comes back.
pub struct Aggregator {
    sources: Vec<Arc<dyn SourceClient>>,
    source_timeout: Duration,
}

impl Aggregator {
    pub fn new(sources: Vec<Arc<dyn SourceClient>>, source_timeout: Duration) -> Self {
        Self {
            sources,
            source_timeout,
        }
    }

    pub fn source_infos(&self) -> Vec<SourceInfo> {
        self.sources.iter().map(|s| s.info()).collect()
    }

    /// Sources picked by `selector`, in declaration order.
    pub fn resolve(&self, selector: &PlatformSelector) -> Result<Vec<Arc<dyn SourceClient>>> {
        match selector {
            PlatformSelector::All => Ok(self.sources.clone()),
            PlatformSelector::One(name) => self
                .sources
                .iter()
                .find(|s| s.name() == name)
                .map(|s| vec![Arc::clone(s)])
                .ok_or_else(|| AppError::UnknownPlatform(name.clone())),
        }
    }

    /// Runs every selected source concurrently. Listings come back in source
    /// declaration order, then per-source order, whatever finishes first.
    ///
    /// A failing source is reported in `sources` without failing the call,
    /// unless no requested source produced results at all.
    pub async fn search(&self, query: &str, selector: &PlatformSelector) -> Result<SearchOutcome> {
        let query = validate_query(Some(query))?;
        let selected = self.resolve(selector)?;
        let results = self.run_sources(query, &selected, &HashMap::new()).await;
        merge(query, results)
    }

    /// One result per selected source, in declaration order. Sources found in
    /// `reuse` are not contacted again.
    pub async fn run_sources(
        &self,
        query: &str,
        selected: &[Arc<dyn SourceClient>],
        reuse: &HashMap<String, SourceResult>,
    ) -> Vec<SourceResult> {
        join_all(selected.iter().map(|source| async move {
            match reuse.get(source.name()) {
                Some(result) => {
                    debug!(source = %source.name(), "Reusing earlier result");
                    result.clone()
                }
                None => self.run_source(source.as_ref(), query).await,
            }
        }))
        .await
    }

    async fn run_source(&self, source: &dyn SourceClient, query: &str) -> SourceResult {
        let name = source.name().to_string();
        let start = Instant::now();

        let result = tokio::time::timeout(self.source_timeout, source.search(query)).await;
        let elapsed = start.elapsed();
        let duration_ms = elapsed.as_millis() as u64;
        histogram!("carscout_source_duration_seconds", "source" => name.clone())
            .record(elapsed.as_secs_f64());

        match result {
            Ok(Ok(SourceListings::Found(listings))) => {
                counter!("carscout_source_requests_total", "source" => name.clone(), "outcome" => "ok")
                    .increment(1);
                counter!("carscout_source_listings_total", "source" => name.clone())
                    .increment(listings.len() as u64);
                SourceResult::new(SourceReport::ok(name, listings.len(), duration_ms), listings)
            }
            Ok(Ok(SourceListings::Unimplemented)) => {
                counter!("carscout_source_requests_total", "source" => name.clone(), "outcome" => "unimplemented")
                    .increment(1);
                info!(source = %name, "Source not implemented, contributing no listings");
                SourceResult::new(SourceReport::unimplemented(name), Vec::new())
            }
            Ok(Err(e)) => {
                counter!("carscout_source_requests_total", "source" => name.clone(), "outcome" => "failed")
                    .increment(1);
                warn!(source = %name, error = %e, "Source failed");
                SourceResult::new(SourceReport::failed(name, e.to_string(), duration_ms), Vec::new())
            }
            Err(_) => {
                counter!("carscout_source_requests_total", "source" => name.clone(), "outcome" => "timeout")
                    .increment(1);
                let e = AppError::Timeout {
                    source_name: name.clone(),
                    seconds: self.source_timeout.as_secs(),
                };
                warn!(source = %name, error = %e, "Source timed out");
                SourceResult::new(SourceReport::failed(name, e.to_string(), duration_ms), Vec::new())
            }
        }
    }
}

/// Concatenates per-source results. Fails only when some source failed and
/// none came back `ok`.
pub fn merge(query: &str, results: Vec<SourceResult>) -> Result<SearchOutcome> {
    let mut listings = Vec::new();
    let mut sources = Vec::with_capacity(results.len());
    for result in results {
        listings.extend(result.listings);
        sources.push(result.report);
    }

    let failed: Vec<&SourceReport> = sources.iter().filter(|r| r.is_failed()).collect();
    let any_ok = sources.iter().any(|r| r.status == SourceStatus::Ok);
    if !failed.is_empty() && !any_ok {
        let detail = failed
            .iter()
            .map(|r| format!("{}: {}", r.source, r.error.as_deref().unwrap_or("unknown")))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(AppError::AllSourcesFailed(detail));
    }

    info!(
        query = %query,
        sources = sources.len(),
        failed = failed.len(),
        listings = listings.len(),
        "Aggregated search"
    );

    Ok(SearchOutcome {
        listings,
        sources,
        fetched_at: Utc::now(),
    })
}
