use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{RetryPolicy, SourceClient};
use crate::models::{FetchStrategy, Listing, SourceInfo, SourceListings};
use crate::utils::error::{AppError, Result};

/// Forwards to another carscout instance's `/api/cars` for one platform,
/// for gateway deployments that keep the scraping worker elsewhere.
pub struct UpstreamSource {
    name: String,
    display_name: String,
    endpoint: Url,
    client: Client,
    retry: RetryPolicy,
}

impl UpstreamSource {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        endpoint: Url,
        client: Client,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            endpoint,
            client,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request_url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("platform", &self.name)
            .append_pair("query", query);
        url
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<Listing>> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json::<Vec<Listing>>().await?)
    }
}

#[async_trait]
impl SourceClient for UpstreamSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            strategy: FetchStrategy::Upstream,
        }
    }

    async fn search(&self, query: &str) -> Result<SourceListings> {
        let url = self.request_url(query);
        debug!(source = %self.name, url = %url, "Forwarding search upstream");

        let listings = self.retry.run(&self.name, || self.fetch(&url)).await?;
        Ok(SourceListings::Found(listings))
    }
}
