use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Listing, SourceReport};

/// What one source produced for one query, before merging.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceResult {
    pub report: SourceReport,
    pub listings: Vec<Listing>,
}

impl SourceResult {
    pub fn new(report: SourceReport, listings: Vec<Listing>) -> Self {
        Self { report, listings }
    }

    pub fn source(&self) -> &str {
        &self.report.source
    }

    pub fn is_failed(&self) -> bool {
        self.report.is_failed()
    }
}

/// Merged listings of one aggregated search plus how each source fared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchOutcome {
    pub listings: Vec<Listing>,
    pub sources: Vec<SourceReport>,
    pub fetched_at: DateTime<Utc>,
}

impl SearchOutcome {
    /// True when no requested source failed. Only complete outcomes are cached.
    pub fn is_complete(&self) -> bool {
        !self.sources.iter().any(SourceReport::is_failed)
    }

    pub fn failed_sources(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|r| r.is_failed())
            .map(|r| r.source.as_str())
            .collect()
    }
}

/// Body of `GET /api/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub query: String,
    pub listings: Vec<Listing>,
    pub sources: Vec<SourceReport>,
    pub cached: bool,
    pub fetched_at: DateTime<Utc>,
}
