use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes the configured root URL
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace; reject if empty
/// 2. Keep an explicit `http://` or `https://` scheme as-is
/// 3. Reject any other explicit scheme
/// 4. Prefix scheme-less input with `https://`
/// 5. Parse the result to make sure it is a usable URL
///
/// # Examples
///
/// ```
/// use page_extractor::url::normalize_root_url;
///
/// let url = normalize_root_url("www.example.com/s?wd=rust").unwrap();
/// assert_eq!(url, "https://www.example.com/s?wd=rust");
/// ```
pub fn normalize_root_url(raw: &str) -> UrlResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else if let Some((scheme, _)) = trimmed.split_once("://") {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            scheme
        )));
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;
    if parsed.host_str().is_none() {
        return Err(UrlError::Parse(format!("missing host in '{}'", candidate)));
    }

    Ok(candidate)
}

/// Cleans a discovered URL before it enters the frontier
///
/// Surrounding whitespace is trimmed, everything from the first inner space
/// on is dropped, and trailing slashes are stripped. The result may be empty.
///
/// # Examples
///
/// ```
/// use page_extractor::url::clean_discovered_url;
///
/// assert_eq!(clean_discovered_url("  https://example.com/a/ extra"), "https://example.com/a");
/// ```
pub fn clean_discovered_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let cut = match trimmed.find(' ') {
        Some(end) => &trimmed[..end],
        None => trimmed,
    };
    cut.trim_end_matches('/').to_string()
}
