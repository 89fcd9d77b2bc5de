//! Output module for persisting crawl results
//!
//! This module handles:
//! - Writing raw page text and labelled result records as flat files
//! - Labelling result records with their crawl-wide numbers
//! - Recording crawl statistics from the notification stream

mod files;
pub mod stats;
mod traits;

pub use files::FileSink;
pub use stats::{print_statistics, CrawlStatistics};
pub use traits::{LabelledRecord, OutputResult, OutputSink};
