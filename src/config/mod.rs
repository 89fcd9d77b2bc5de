//! Configuration module for Page-Extractor
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use page_extractor::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("spider.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.spider.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ExtractionConfig, HttpConfig, SpiderConfig, TextEncoding, DEFAULT_ACCEPT,
    DEFAULT_NEXT_PAGE_LABEL, DEFAULT_RESULT_SELECTOR, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
