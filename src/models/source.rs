use serde::{Deserialize, Serialize};

use super::{FetchStrategy, Listing};

/// What a source client hands back for one query.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceListings {
    /// Extraction ran; an empty vector means the site really had no matches.
    Found(Vec<Listing>),
    /// The source has no extractor yet, nothing was fetched.
    Unimplemented,
}

impl SourceListings {
    pub fn into_listings(self) -> Vec<Listing> {
        match self {
            SourceListings::Found(listings) => listings,
            SourceListings::Unimplemented => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Ok,
    Failed,
    Unimplemented,
}

/// Per-source outcome of one aggregated search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceReport {
    pub source: String,
    pub status: SourceStatus,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl SourceReport {
    pub fn ok(source: impl Into<String>, count: usize, duration_ms: u64) -> Self {
        Self {
            source: source.into(),
            status: SourceStatus::Ok,
            count,
            error: None,
            duration_ms,
        }
    }

    pub fn unimplemented(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            status: SourceStatus::Unimplemented,
            count: 0,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn failed(source: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            source: source.into(),
            status: SourceStatus::Failed,
            count: 0,
            error: Some(error.into()),
            duration_ms,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == SourceStatus::Failed
    }
}

/// Public description of a configured source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceInfo {
    pub name: String,
    pub display_name: String,
    pub strategy: FetchStrategy,
}
