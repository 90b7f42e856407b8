use reqwest::Client;
use std::sync::Arc;
use tracing::info;
use url::Url;

use super::{RetryPolicy, ScrapingSource, SourceClient, UnimplementedSource, UpstreamSource};
use crate::config::{AppConfig, SourceConfig};
use crate::extractors;
use crate::fetcher::{BrowserFetcher, HttpFetcher, PageFetcher};
use crate::models::FetchStrategy;
use crate::utils::error::{AppError, Result};

/// Builds one client per configured source, keeping declaration order.
pub fn build_sources(config: &AppConfig) -> Result<Vec<Arc<dyn SourceClient>>> {
    let http = HttpFetcher::new(&config.scraper)?;
    let upstream_client = Client::builder()
        .timeout(config.scraper.request_timeout())
        .user_agent(config.scraper.user_agent.as_str())
        .build()?;
    let retry = RetryPolicy::from_config(&config.scraper);

    config
        .sources
        .iter()
        .map(|source| {
            let client = build_source(source, config, &http, &upstream_client, retry)?;
            info!(
                source = %source.name,
                strategy = %source.strategy,
                "Registered source"
            );
            Ok(client)
        })
        .collect()
}

fn build_source(
    source: &SourceConfig,
    config: &AppConfig,
    http: &HttpFetcher,
    upstream_client: &Client,
    retry: RetryPolicy,
) -> Result<Arc<dyn SourceClient>> {
    let name = source.name.clone();
    let display_name = source.display_name().to_string();

    let client: Arc<dyn SourceClient> = match source.strategy {
        FetchStrategy::Rendered | FetchStrategy::Static => {
            let fetcher: Arc<dyn PageFetcher> = if source.strategy == FetchStrategy::Rendered {
                Arc::new(BrowserFetcher::new(config.scraper.clone()))
            } else {
                Arc::new(http.clone())
            };
            let extractor_name = source.extractor.as_deref().unwrap_or_default();
            let extractor = extractors::by_name(extractor_name).ok_or_else(|| {
                AppError::Validation(format!(
                    "Source '{}' names unknown extractor '{}'",
                    name, extractor_name
                ))
            })?;
            let search_url = source.search_url.clone().ok_or_else(|| {
                AppError::Validation(format!("Source '{}' has no search_url", name))
            })?;

            Arc::new(
                ScrapingSource::new(name, display_name, search_url, fetcher, extractor)
                    .with_retry(retry),
            )
        }
        FetchStrategy::Upstream => {
            let raw = source.upstream_url.as_deref().unwrap_or_default();
            let endpoint = Url::parse(raw).map_err(|e| {
                AppError::Validation(format!("Source '{}' has invalid upstream_url: {}", name, e))
            })?;

            Arc::new(
                UpstreamSource::new(name, display_name, endpoint, upstream_client.clone())
                    .with_retry(retry),
            )
        }
        FetchStrategy::Unimplemented => Arc::new(UnimplementedSource::new(name, display_name)),
    };

    Ok(client)
}
