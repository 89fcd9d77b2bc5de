//! Output sink trait and record types
//!
//! This module defines the trait interface for persisting crawl output and
//! the labelled record written to data files.

use crate::extraction::ResultRecord;
use crate::state::PageAllocation;
use crate::SpiderError;
use std::fmt;
use std::path::PathBuf;

/// Result type for output operations
pub type OutputResult<T> = Result<T, SpiderError>;

/// A result record carrying its crawl-wide label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelledRecord {
    /// `NO.{number} Page{page}({position}):{name}`
    pub label: String,

    pub url: String,
}

impl LabelledRecord {
    /// Labels a record
    ///
    /// # Arguments
    ///
    /// * `number` - Crawl-wide result number, starting at 1
    /// * `page_index` - Index of the page the record was found on
    /// * `position` - Position of the record within its page, starting at 0
    /// * `record` - The extracted record
    pub fn new(number: usize, page_index: usize, position: usize, record: &ResultRecord) -> Self {
        Self {
            label: format!("NO.{} Page{}({}):{}", number, page_index, position, record.name),
            url: record.url.clone(),
        }
    }

    /// Labels every record of a page using its allocation
    pub fn label_page(allocation: PageAllocation, records: &[ResultRecord]) -> Vec<Self> {
        records
            .iter()
            .enumerate()
            .map(|(position, record)| {
                Self::new(
                    allocation.first_result + position,
                    allocation.page_index,
                    position,
                    record,
                )
            })
            .collect()
    }
}

impl fmt::Display for LabelledRecord {
    /// Data file line format
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name:{}        Url:{}", self.label, self.url)
    }
}

/// Trait for output sinks
///
/// Sinks persist the raw text of every saved page and the labelled records
/// extracted from it. Both writes for one page share the page index.
/// Implementations must be thread-safe; the engine calls them from blocking
/// worker threads.
pub trait OutputSink: Send + Sync {
    /// Writes a page's raw text
    ///
    /// # Returns
    ///
    /// The path of the written file
    fn save_contents(&self, page_index: usize, text: &str) -> OutputResult<PathBuf>;

    /// Writes a page's labelled records, one per line
    ///
    /// # Returns
    ///
    /// The path of the written file
    fn save_records(&self, page_index: usize, records: &[LabelledRecord]) -> OutputResult<PathBuf>;
}
