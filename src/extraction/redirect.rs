//! Redirect resolution for result URLs
//!
//! Search result links are often tracking redirects. The resolver follows
//! them to the final destination. Concurrency is bounded by its own
//! semaphore, independent of the crawl's worker slots, and all records of a
//! page are resolved concurrently. Each resolution is bounded in time so a
//! result host that never answers cannot hold up the page.

use crate::extraction::ResultRecord;
use crate::SpiderError;
use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Resolves URLs to the target of their redirect chain
#[derive(Debug, Clone)]
pub struct RedirectResolver {
    client: Client,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl RedirectResolver {
    /// Creates a resolver allowing at most `max_concurrent` resolutions at once
    ///
    /// The client's redirect policy decides how many hops are followed. A
    /// resolution that has not received response headers within `timeout`
    /// fails with [`SpiderError::Timeout`].
    pub fn new(client: Client, max_concurrent: usize, timeout: Duration) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
        }
    }

    /// Returns the final URL reached from `url`
    ///
    /// Only the response headers are awaited; the body is never read.
    pub async fn resolve(&self, url: &str) -> Result<String, SpiderError> {
        let _permit = self.permits.acquire().await.ok();

        let sent = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| SpiderError::Timeout {
                url: url.to_string(),
            })?;

        let response = sent
            .and_then(|response| response.error_for_status())
            .map_err(|source| SpiderError::Http {
                url: url.to_string(),
                source,
            })?;

        Ok(response.url().to_string())
    }

    /// Resolves every record's URL in place
    ///
    /// Records whose resolution fails keep their original URL; the errors
    /// are returned in record order.
    pub async fn resolve_all(&self, records: &mut [ResultRecord]) -> Vec<SpiderError> {
        let outcomes = join_all(records.iter().map(|record| self.resolve(&record.url))).await;

        let mut errors = Vec::new();
        for (record, outcome) in records.iter_mut().zip(outcomes) {
            match outcome {
                Ok(resolved) => {
                    if resolved != record.url {
                        tracing::debug!("Resolved {} -> {}", record.url, resolved);
                    }
                    record.url = resolved;
                }
                Err(e) => {
                    tracing::warn!("Failed to resolve {}: {}", record.url, e);
                    errors.push(e);
                }
            }
        }
        errors
    }

    /// Number of resolutions that could start right now
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}
