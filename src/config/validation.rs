use crate::config::types::{Config, ExtractionConfig, HttpConfig, SpiderConfig};
use crate::url::normalize_root_url;
use crate::{ConfigError, ConfigResult};
use scraper::Selector;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_spider_config(&config.spider)?;
    validate_http_config(&config.http)?;
    validate_extraction_config(&config.extraction)?;
    Ok(())
}

/// Validates crawl engine configuration
fn validate_spider_config(config: &SpiderConfig) -> ConfigResult<()> {
    if config.max_depth < 1 {
        return Err(ConfigError::Validation(format!(
            "max_depth must be >= 1, got {}",
            config.max_depth
        )));
    }

    if config.max_connections < 1 || config.max_connections > 100 {
        return Err(ConfigError::Validation(format!(
            "max_connections must be between 1 and 100, got {}",
            config.max_connections
        )));
    }

    if config.request_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_ms must be > 0".to_string(),
        ));
    }

    if config.completion_poll_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "completion_poll_ms must be >= 10ms, got {}ms",
            config.completion_poll_ms
        )));
    }

    if config.output_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    if let Some(root) = &config.root_url {
        normalize_root_url(root)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root_url '{}': {}", root, e)))?;
    }

    Ok(())
}

/// Validates request header configuration
fn validate_http_config(config: &HttpConfig) -> ConfigResult<()> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.accept.trim().is_empty() {
        return Err(ConfigError::Validation("accept cannot be empty".to_string()));
    }

    Ok(())
}

/// Validates extraction configuration
fn validate_extraction_config(config: &ExtractionConfig) -> ConfigResult<()> {
    if config.next_page_label.trim().is_empty() {
        return Err(ConfigError::Validation(
            "next_page_label cannot be empty".to_string(),
        ));
    }

    Selector::parse(&config.result_selector).map_err(|e| {
        ConfigError::InvalidSelector(format!("'{}': {:?}", config.result_selector, e))
    })?;

    if config.max_concurrent_resolutions < 1 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_resolutions must be >= 1, got {}",
            config.max_concurrent_resolutions
        )));
    }

    Ok(())
}
