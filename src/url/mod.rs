//! URL handling module for Page-Extractor
//!
//! This module provides root URL normalization, cleanup of discovered links,
//! and the static filter for non-content resources.

mod normalize;

// Re-export main functions
pub use normalize::{clean_discovered_url, normalize_root_url};

/// Extensions of resources that never carry crawlable page content
pub const EXCLUDED_EXTENSIONS: &[&str] = &[".jpg", ".gif", ".png", ".css", ".js"];

/// Returns true if the URL points at a non-content resource
///
/// Only the path is inspected (query string and fragment are ignored), and
/// the comparison is case-insensitive. `page.json` or `index.jsp` are not
/// excluded; `app.js?v=3` is.
///
/// # Examples
///
/// ```
/// use page_extractor::url::is_excluded_resource;
///
/// assert!(is_excluded_resource("https://example.com/logo.PNG"));
/// assert!(!is_excluded_resource("https://example.com/s?wd=logo.png"));
/// ```
pub fn is_excluded_resource(url: &str) -> bool {
    let path_end = url.find(['?', '#']).unwrap_or(url.len());
    let path = url[..path_end].to_ascii_lowercase();

    EXCLUDED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
