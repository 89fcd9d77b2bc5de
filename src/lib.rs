//! Page-Extractor: a bounded-concurrency "next page" crawler
//!
//! This crate follows a chain of "next page" links from a root URL up to a
//! bounded depth, extracts named result links from every fetched page, and
//! persists raw page text plus the extracted records as flat files while
//! streaming progress notifications to the caller.

pub mod config;
pub mod crawler;
pub mod extraction;
pub mod output;
pub mod state;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Page-Extractor operations
#[derive(Debug, Error)]
pub enum SpiderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Failed to persist {path}: {source}")]
    Persistence {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid request transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RequestPhase,
        to: state::RequestPhase,
    },

    #[error("A crawl is already in progress")]
    CrawlInProgress,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid result selector: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Empty URL")]
    Empty,
}

/// Result type alias for Page-Extractor operations
pub type Result<T> = std::result::Result<T, SpiderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, SpiderConfig, TextEncoding};
pub use crawler::{CrawlFailure, FailureKind, Notification, Spider};
pub use extraction::{ExtractionResult, ExtractionStrategy, LabelledLinkStrategy, ResultRecord};
pub use state::RequestPhase;
pub use url::{clean_discovered_url, is_excluded_resource, normalize_root_url};
