use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;
use tracing::warn;

use crate::config::ScraperConfig;
use crate::models::{SourceInfo, SourceListings};
use crate::utils::error::{AppError, Result};

pub mod registry;
pub mod scraping;
pub mod unimplemented;
pub mod upstream;

pub use registry::build_sources;
pub use scraping::ScrapingSource;
pub use unimplemented::UnimplementedSource;
pub use upstream::UpstreamSource;

/// Fetch + extract pipeline for one classifieds site.
#[async_trait]
pub trait SourceClient: Send + Sync {
    fn name(&self) -> &str;

    fn info(&self) -> SourceInfo;

    /// Zero matches is `Ok(SourceListings::Found(vec![]))`; an error means the
    /// source itself could not be read.
    async fn search(&self, query: &str) -> Result<SourceListings>;
}

/// Bounded retry on transient failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            attempts: 0,
            delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            attempts: config.retry_attempts as usize,
            delay: config.retry_delay(),
        }
    }

    pub async fn run<T, F, Fut>(&self, source: &str, action: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let strategy = FixedInterval::new(self.delay).take(self.attempts);
        RetryIf::start(strategy, action, |e: &AppError| {
            let retry = e.is_transient();
            if retry {
                warn!(source = %source, error = %e, "Transient failure, retrying");
            }
            retry
        })
        .await
    }
}

/// Percent-encodes a query the way browsers encode a URI component.
pub fn escape_query(query: &str) -> String {
    url::form_urlencoded::byte_serialize(query.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
