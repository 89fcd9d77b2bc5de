//! Statistics gathered from the notification stream
//!
//! This module provides functionality for tallying a crawl's notifications
//! and displaying the result once the crawl is over.

use crate::crawler::{FailureKind, Notification};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// When the first notification was expected
    pub started_at: DateTime<Utc>,

    /// When the DownloadFinish notification arrived
    pub finished_at: Option<DateTime<Utc>>,

    /// Number of page files written
    pub pages_saved: u64,

    /// Number of result records written
    pub records_saved: u64,

    /// Page count reported by DownloadFinish
    pub total_pages: Option<usize>,

    /// Failures by kind
    pub failures: HashMap<FailureKind, u64>,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            pages_saved: 0,
            records_saved: 0,
            total_pages: None,
            failures: HashMap::new(),
        }
    }

    /// Folds one notification into the statistics
    pub fn record(&mut self, notification: &Notification) {
        match notification {
            Notification::ContentsSaved { .. } => self.pages_saved += 1,
            Notification::DataSaved { .. } => self.records_saved += 1,
            Notification::DownloadFinish { total_pages } => {
                self.total_pages = Some(*total_pages);
                self.finished_at = Some(Utc::now());
            }
            Notification::Error(failure) => {
                *self.failures.entry(failure.kind).or_insert(0) += 1;
            }
        }
    }

    pub fn total_failures(&self) -> u64 {
        self.failures.values().sum()
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Elapsed seconds between start and finish
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

impl Default for CrawlStatistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Started: {}", stats.started_at.to_rfc3339());
    match (stats.finished_at, stats.duration_seconds()) {
        (Some(finished), Some(duration)) => {
            println!("  Finished: {} ({}s)", finished.to_rfc3339(), duration)
        }
        _ => println!("  Finished: not reported"),
    }
    println!("  Page files written: {}", stats.pages_saved);
    println!("  Result records written: {}", stats.records_saved);
    if let Some(total) = stats.total_pages {
        println!("  Pages reported at finish: {}", total);
    }
    println!();

    if !stats.failures.is_empty() {
        println!("Failures ({}):", stats.total_failures());
        let mut failure_counts: Vec<_> = stats.failures.iter().collect();
        failure_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in failure_counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }
}
