pub mod aggregator;
pub mod cache;
pub mod config;
pub mod extractors;
pub mod fetcher;
pub mod filter;
pub mod models;
pub mod search;
pub mod sources;
pub mod telemetry;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use config::AppConfig;
pub use models::Listing;
pub use search::SearchService;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
