//! Default extraction strategy
//!
//! Next-hop links are anchors whose visible text starts with a configured
//! label (a search engine's "next page" link), result records are the
//! anchors matched by a configured CSS selector.

use crate::config::ExtractionConfig;
use crate::extraction::{ExtractionResult, ExtractionStrategy, ResultRecord};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Label-and-selector driven strategy
#[derive(Debug, Clone)]
pub struct LabelledLinkStrategy {
    next_page_label: String,
    anchor_selector: Selector,
    result_selector: Selector,
}

impl LabelledLinkStrategy {
    /// Creates a strategy from a next-page label and a result selector
    ///
    /// # Example
    ///
    /// ```
    /// use page_extractor::extraction::{ExtractionStrategy, LabelledLinkStrategy};
    ///
    /// let strategy = LabelledLinkStrategy::new("Next", "h3.t > a").unwrap();
    /// let html = r#"<a href="/p2">Next &gt;</a><h3 class="t"><a href="/r">Result</a></h3>"#;
    /// let result = strategy.extract("https://example.com/p1", html);
    /// assert_eq!(result.next_urls, vec!["https://example.com/p2"]);
    /// assert_eq!(result.records[0].name, "Result");
    /// ```
    pub fn new(next_page_label: &str, result_selector: &str) -> Result<Self, ConfigError> {
        let anchor_selector = Selector::parse("a[href]")
            .map_err(|e| ConfigError::InvalidSelector(format!("a[href]: {:?}", e)))?;
        let result_selector = Selector::parse(result_selector)
            .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", result_selector, e)))?;

        Ok(Self {
            next_page_label: next_page_label.trim().to_string(),
            anchor_selector,
            result_selector,
        })
    }

    /// Creates a strategy from the `[extraction]` configuration table
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        Self::new(&config.next_page_label, &config.result_selector)
    }

    fn next_page_links(&self, document: &Html, base_url: Option<&Url>) -> Vec<String> {
        document
            .select(&self.anchor_selector)
            .filter(|anchor| visible_text(anchor).starts_with(&self.next_page_label))
            .filter_map(|anchor| anchor.value().attr("href"))
            .filter_map(|href| resolve_link(href, base_url))
            .collect()
    }

    fn result_records(&self, document: &Html, base_url: Option<&Url>) -> Vec<ResultRecord> {
        let mut records = Vec::new();

        for element in document.select(&self.result_selector) {
            let Some((anchor, href)) = self.anchor_with_href(element) else {
                continue;
            };
            let Some(url) = resolve_link(href, base_url) else {
                continue;
            };

            records.push(ResultRecord::new(visible_text(&anchor), url));
        }

        records
    }

    /// The element itself if it carries an href, else its first anchor
    fn anchor_with_href<'a>(&self, element: ElementRef<'a>) -> Option<(ElementRef<'a>, &'a str)> {
        if let Some(href) = element.value().attr("href") {
            return Some((element, href));
        }
        element
            .select(&self.anchor_selector)
            .next()
            .and_then(|anchor| anchor.value().attr("href").map(|href| (anchor, href)))
    }
}

impl ExtractionStrategy for LabelledLinkStrategy {
    fn extract(&self, page_url: &str, text: &str) -> ExtractionResult {
        let document = Html::parse_document(text);
        let base_url = Url::parse(page_url).ok();

        ExtractionResult {
            next_urls: self.next_page_links(&document, base_url.as_ref()),
            records: self.result_records(&document, base_url.as_ref()),
        }
    }
}

/// Visible text of an element with whitespace runs collapsed
fn visible_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves an href to an absolute http(s) URL
///
/// Returns None for `javascript:`, `mailto:`, `tel:` and `data:` links,
/// fragment-only links, and anything that does not resolve to http(s).
fn resolve_link(href: &str, base_url: Option<&Url>) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = match base_url {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };

    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}
