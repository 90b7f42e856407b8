use async_trait::async_trait;
use tracing::debug;

use super::SourceClient;
use crate::models::{FetchStrategy, SourceInfo, SourceListings};
use crate::utils::error::Result;

/// A known site without an extractor yet. Always answers
/// [`SourceListings::Unimplemented`] so it never reads as "zero results".
pub struct UnimplementedSource {
    name: String,
    display_name: String,
}

impl UnimplementedSource {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
        }
    }
}

#[async_trait]
impl SourceClient for UnimplementedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            strategy: FetchStrategy::Unimplemented,
        }
    }

    async fn search(&self, query: &str) -> Result<SourceListings> {
        debug!(source = %self.name, query = %query, "Source has no extractor, skipping");
        Ok(SourceListings::Unimplemented)
    }
}
