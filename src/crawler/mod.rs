//! Crawler module for page fetching and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - The per-request lifecycle with streaming decode and time limit
//! - Notifications sent to the caller
//! - Overall crawl coordination across worker slots

mod events;
mod fetcher;
mod spider;

pub use events::{CrawlFailure, FailureKind, Notification, NotificationReceiver};
pub use fetcher::{
    build_http_client, run_request, FetchOutcome, InFlightRequest, TextAccumulator, READ_BUFFER_SIZE,
};
pub use spider::Spider;
