//! Notifications streamed from the crawl engine to its caller
//!
//! Progress, completion and failures share one channel; callers tell them
//! apart by variant.

use crate::SpiderError;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Receiving end of a spider's notification channel
pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

/// Classification of a non-fatal crawl failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Connection failure, protocol error, or non-2xx status
    Network,

    /// The fetch exceeded the configured maximum time
    Timeout,

    /// An output file could not be written
    Persistence,

    /// A result URL could not be resolved to its redirect target
    Redirect,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Persistence => "persistence",
            Self::Redirect => "redirect",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failure reported to the caller; the crawl carries on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlFailure {
    /// URL being processed when the failure happened
    pub url: String,
    pub kind: FailureKind,
    pub message: String,
}

impl CrawlFailure {
    pub fn new(url: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            message: message.into(),
        }
    }

    /// Builds a failure from an engine error, classifying it by variant
    pub fn from_error(url: impl Into<String>, error: &SpiderError) -> Self {
        let kind = match error {
            SpiderError::Timeout { .. } => FailureKind::Timeout,
            SpiderError::Persistence { .. } | SpiderError::Io(_) => FailureKind::Persistence,
            _ => FailureKind::Network,
        };
        Self::new(url, kind, error.to_string())
    }
}

impl fmt::Display for CrawlFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.url, self.message)
    }
}

/// Event emitted by the crawl engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Raw text of a fetched page was written to `path`
    ContentsSaved { path: PathBuf, url: String },

    /// One labelled result record was persisted
    DataSaved { name: String, url: String },

    /// The crawl is over; fired once per crawl
    DownloadFinish { total_pages: usize },

    /// A non-fatal failure
    Error(CrawlFailure),
}
