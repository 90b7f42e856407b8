use serde::{Deserialize, Serialize};

pub mod listing;
pub mod outcome;
pub mod source;

// Re-exports for convenience
pub use listing::*;
pub use outcome::*;
pub use source::*;

/// How a source's raw content is obtained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// Full browser render, for pages built by JavaScript.
    Rendered,
    /// Plain HTTP GET and a static HTML parse.
    Static,
    /// Forward to another carscout instance's `/api/cars`.
    Upstream,
    /// Source is known but has no working extractor yet.
    Unimplemented,
}

impl std::fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FetchStrategy::Rendered => "rendered",
            FetchStrategy::Static => "static",
            FetchStrategy::Upstream => "upstream",
            FetchStrategy::Unimplemented => "unimplemented",
        };
        f.write_str(s)
    }
}
