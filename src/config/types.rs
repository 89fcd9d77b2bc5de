use serde::Deserialize;
use std::time::Duration;

/// Default user agent sent with every page request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/4.0 (compatible; MSIE 8.0; Windows NT 6.1; Trident/4.0)";

/// Default Accept header sent with every page request
pub const DEFAULT_ACCEPT: &str = "text/html";

/// Default visible text of a "next page" anchor
pub const DEFAULT_NEXT_PAGE_LABEL: &str = "下一页";

/// Default CSS selector for result headings
pub const DEFAULT_RESULT_SELECTOR: &str = "h3.t > a";

/// Main configuration structure for Page-Extractor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub spider: SpiderConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// Text encoding used to decode fetched page bodies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum TextEncoding {
    #[default]
    #[serde(rename = "utf8", alias = "utf-8")]
    Utf8,
    /// GB18030, a superset of GBK and GB2312
    #[serde(rename = "gb18030", alias = "gb", alias = "gbk")]
    Gb18030,
}

impl TextEncoding {
    /// Returns the `encoding_rs` codec for this encoding
    pub fn codec(&self) -> &'static encoding_rs::Encoding {
        match self {
            Self::Utf8 => encoding_rs::UTF_8,
            Self::Gb18030 => encoding_rs::GB18030,
        }
    }

    /// Parses a user-supplied encoding name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Some(Self::Utf8),
            "gb18030" | "gb" | "gbk" => Some(Self::Gb18030),
            _ => None,
        }
    }
}

/// Crawl engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SpiderConfig {
    /// URL the crawl starts from
    #[serde(rename = "root-url", default)]
    pub root_url: Option<String>,

    /// Directory receiving page and data files
    #[serde(rename = "output-dir", default = "default_output_dir")]
    pub output_dir: String,

    /// Discovered URLs at this depth or deeper are never queued
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Number of worker slots (concurrent in-flight fetches)
    #[serde(rename = "max-connections", default = "default_max_connections")]
    pub max_connections: u32,

    /// Encoding used to decode page bodies
    #[serde(default)]
    pub encoding: TextEncoding,

    /// Maximum time a single fetch may take (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Fallback polling interval of the completion watcher (milliseconds)
    #[serde(rename = "completion-poll-ms", default = "default_completion_poll_ms")]
    pub completion_poll_ms: u64,
}

impl SpiderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn completion_poll_interval(&self) -> Duration {
        Duration::from_millis(self.completion_poll_ms)
    }
}

impl Default for SpiderConfig {
    fn default() -> Self {
        Self {
            root_url: None,
            output_dir: default_output_dir(),
            max_depth: default_max_depth(),
            max_connections: default_max_connections(),
            encoding: TextEncoding::default(),
            request_timeout_ms: default_request_timeout_ms(),
            completion_poll_ms: default_completion_poll_ms(),
        }
    }
}

/// Request header configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept")]
    pub accept: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept: default_accept(),
        }
    }
}

/// Settings for the default extraction strategy and redirect resolution
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Visible text identifying a "next page" anchor
    #[serde(rename = "next-page-label", default = "default_next_page_label")]
    pub next_page_label: String,

    /// CSS selector matching result anchors
    #[serde(rename = "result-selector", default = "default_result_selector")]
    pub result_selector: String,

    /// Resolve each result URL to its final redirect target
    #[serde(rename = "resolve-redirects", default)]
    pub resolve_redirects: bool,

    /// Upper bound on concurrent redirect resolutions
    #[serde(
        rename = "max-concurrent-resolutions",
        default = "default_max_concurrent_resolutions"
    )]
    pub max_concurrent_resolutions: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            next_page_label: default_next_page_label(),
            result_selector: default_result_selector(),
            resolve_redirects: false,
            max_concurrent_resolutions: default_max_concurrent_resolutions(),
        }
    }
}

fn default_output_dir() -> String {
    "./pages".to_string()
}

fn default_max_depth() -> u32 {
    2000
}

fn default_max_connections() -> u32 {
    4
}

fn default_request_timeout_ms() -> u64 {
    120_000
}

fn default_completion_poll_ms() -> u64 {
    300
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept() -> String {
    DEFAULT_ACCEPT.to_string()
}

fn default_next_page_label() -> String {
    DEFAULT_NEXT_PAGE_LABEL.to_string()
}

fn default_result_selector() -> String {
    DEFAULT_RESULT_SELECTOR.to_string()
}

fn default_max_concurrent_resolutions() -> u32 {
    4
}
