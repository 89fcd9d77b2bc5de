//! Extraction strategies turning page text into next-hop URLs and records
//!
//! The crawl engine never inspects markup itself. It hands every fetched
//! page to an [`ExtractionStrategy`] and acts on the returned
//! [`ExtractionResult`]: next-hop URLs go back into the frontier, result
//! records are labelled and persisted.
//!
//! - `LabelledLinkStrategy`: default strategy driven by a "next page" anchor
//!   label and a CSS selector for result links
//! - `RedirectResolver`: optional async step resolving result URLs to their
//!   final redirect target

mod labelled;
mod redirect;

pub use labelled::LabelledLinkStrategy;
pub use redirect::RedirectResolver;

/// One named result link extracted from a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRecord {
    pub name: String,
    pub url: String,
}

impl ResultRecord {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Everything a strategy found on one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    /// URLs to crawl next, in document order
    pub next_urls: Vec<String>,

    /// Named result links, in document order
    pub records: Vec<ResultRecord>,
}

impl ExtractionResult {
    /// True if the page yielded neither next-hop URLs nor records
    pub fn is_empty(&self) -> bool {
        self.next_urls.is_empty() && self.records.is_empty()
    }
}

/// Maps fetched page text to next-hop URLs and result records
///
/// Implementations must be cheap to share across slots and must not block
/// on I/O. A page without matches is not an error; return an empty result.
pub trait ExtractionStrategy: Send + Sync {
    /// Extracts links from `text`, fetched from `page_url`
    fn extract(&self, page_url: &str, text: &str) -> ExtractionResult;
}

impl<F> ExtractionStrategy for F
where
    F: Fn(&str, &str) -> ExtractionResult + Send + Sync,
{
    fn extract(&self, page_url: &str, text: &str) -> ExtractionResult {
        self(page_url, text)
    }
}
