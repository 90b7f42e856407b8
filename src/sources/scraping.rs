use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use super::{RetryPolicy, SourceClient, escape_query};
use crate::extractors::{Extractor, extract_all};
use crate::fetcher::PageFetcher;
use crate::models::{SourceInfo, SourceListings};
use crate::utils::error::{AppError, Result};

/// A site read through a [`PageFetcher`] and parsed with an [`Extractor`].
///
/// Rendered and static sources differ only in the fetcher they are given.
pub struct ScrapingSource {
    name: String,
    display_name: String,
    search_url: String,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn Extractor>,
    retry: RetryPolicy,
}

impl ScrapingSource {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        search_url: impl Into<String>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            search_url: search_url.into(),
            fetcher,
            extractor,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn search_url_for(&self, query: &str) -> Result<Url> {
        let raw = self.search_url.replace("{query}", &escape_query(query));
        Url::parse(&raw).map_err(|e| AppError::parse(format!("Invalid search URL {}: {}", raw, e)))
    }
}

#[async_trait]
impl SourceClient for ScrapingSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            strategy: self.fetcher.strategy(),
        }
    }

    async fn search(&self, query: &str) -> Result<SourceListings> {
        let url = self.search_url_for(query)?;
        debug!(source = %self.name, url = %url, strategy = %self.fetcher.strategy(), "Fetching search page");

        let html = self
            .retry
            .run(&self.name, || self.fetcher.fetch(&url))
            .await?;

        let listings = extract_all(self.extractor.as_ref(), &html, &url);
        info!(
            source = %self.name,
            extractor = self.extractor.name(),
            count = listings.len(),
            "Extracted listings"
        );

        Ok(SourceListings::Found(listings))
    }
}
