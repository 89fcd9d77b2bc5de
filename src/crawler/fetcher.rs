//! HTTP fetcher implementation
//!
//! This module drives a single request through its lifecycle:
//! - Building the shared HTTP client with the configured headers
//! - Issuing the GET and waiting for the response headers
//! - Streaming the body through a fixed-size read buffer
//! - Decoding bytes incrementally with the configured text encoding
//! - Enforcing the per-request time limit and the crawl's stop flag
//! - Error classification

use crate::config::{HttpConfig, TextEncoding};
use crate::state::{FrontierEntry, RequestPhase};
use crate::SpiderError;
use encoding_rs::{CoderResult, Decoder};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Size of the body read buffer in bytes
pub const READ_BUFFER_SIZE: usize = 128 * 1024;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// The whole body was received and decoded
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Decoded page text
        text: String,
    },

    /// The server answered with a non-2xx status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, reset, TLS failure, etc.)
    NetworkError {
        /// Error description
        error: String,
    },

    /// The request ran longer than the allowed time
    TimedOut,

    /// The crawl was stopped while the request was in flight
    Cancelled,
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed with reqwest's default policy. No overall timeout
/// is set on the client; the time limit is applied per request by
/// [`run_request`].
///
/// # Arguments
///
/// * `config` - The `[http]` configuration table
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(SpiderError)` - Invalid header value or client build failure
///
/// # Example
///
/// ```no_run
/// use page_extractor::config::HttpConfig;
/// use page_extractor::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, SpiderError> {
    let accept = HeaderValue::from_str(&config.accept)
        .map_err(|e| crate::ConfigError::Validation(format!("Invalid accept header: {}", e)))?;

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, accept);

    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(30))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Incremental body decoder
///
/// Bytes are collected in a read buffer of [`READ_BUFFER_SIZE`]; whenever it
/// fills up, and once more at the end, its contents are run through a
/// streaming decoder. Multi-byte sequences split across reads decode
/// correctly.
pub struct TextAccumulator {
    decoder: Decoder,
    read_buffer: Vec<u8>,
    text: String,
}

impl TextAccumulator {
    pub fn new(encoding: TextEncoding) -> Self {
        Self {
            decoder: encoding.codec().new_decoder(),
            read_buffer: Vec::with_capacity(READ_BUFFER_SIZE),
            text: String::new(),
        }
    }

    /// Appends received bytes
    pub fn push(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let room = READ_BUFFER_SIZE - self.read_buffer.len();
            let take = room.min(bytes.len());
            self.read_buffer.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];

            if self.read_buffer.len() == READ_BUFFER_SIZE {
                self.decode_buffer(false);
            }
        }
    }

    /// Flushes the read buffer and the decoder, returning all text
    pub fn finish(mut self) -> String {
        self.decode_buffer(true);
        self.text
    }

    fn decode_buffer(&mut self, last: bool) {
        let mut src = &self.read_buffer[..];

        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(src.len())
                .unwrap_or(src.len() * 4 + 16);
            self.text.reserve(needed);

            let (result, read, _had_errors) = self.decoder.decode_to_string(src, &mut self.text, last);
            src = &src[read..];

            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }

        self.read_buffer.clear();
    }
}

/// One fetch in flight, bound to a worker slot
pub struct InFlightRequest {
    url: String,
    depth: u32,
    slot: usize,
    phase: RequestPhase,
    body: TextAccumulator,
}

impl InFlightRequest {
    pub fn new(entry: &FrontierEntry, slot: usize, encoding: TextEncoding) -> Self {
        Self {
            url: entry.url.clone(),
            depth: entry.depth,
            slot,
            phase: RequestPhase::Idle,
            body: TextAccumulator::new(encoding),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    /// Moves the request to `next`, rejecting illegal transitions
    pub fn transition(&mut self, next: RequestPhase) -> Result<(), SpiderError> {
        if !self.phase.can_transition_to(next) {
            return Err(SpiderError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::trace!("Slot {} {}: {} -> {}", self.slot, self.url, self.phase, next);
        self.phase = next;
        Ok(())
    }

    /// Runs the request to a terminal phase, without a time limit
    ///
    /// The stop flag is checked before sending, once headers arrive, and
    /// between body chunks. Dropping the response on any early return
    /// releases the connection.
    pub async fn fetch(&mut self, client: &Client, stop: &AtomicBool) -> Result<FetchOutcome, SpiderError> {
        if stop.load(Ordering::SeqCst) {
            return self.cancel();
        }

        self.transition(RequestPhase::Requesting)?;

        let mut response = match client.get(&self.url).send().await {
            Ok(response) => response,
            Err(e) => {
                self.transition(RequestPhase::Failed)?;
                return Ok(FetchOutcome::NetworkError {
                    error: classify_error(&e),
                });
            }
        };

        if stop.load(Ordering::SeqCst) {
            return self.cancel();
        }

        let status = response.status();
        if !status.is_success() {
            self.transition(RequestPhase::Failed)?;
            return Ok(FetchOutcome::HttpError {
                status_code: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        self.transition(RequestPhase::StreamingBody)?;

        loop {
            if stop.load(Ordering::SeqCst) {
                return self.cancel();
            }

            match response.chunk().await {
                Ok(Some(bytes)) => self.body.push(&bytes),
                Ok(None) => break,
                Err(e) => {
                    self.transition(RequestPhase::Failed)?;
                    return Ok(FetchOutcome::NetworkError {
                        error: classify_error(&e),
                    });
                }
            }
        }

        self.transition(RequestPhase::Done)?;

        let body = std::mem::replace(&mut self.body, TextAccumulator::new(TextEncoding::Utf8));
        Ok(FetchOutcome::Success {
            final_url,
            status_code: status.as_u16(),
            text: body.finish(),
        })
    }

    fn cancel(&mut self) -> Result<FetchOutcome, SpiderError> {
        self.transition(RequestPhase::Cancelled)?;
        Ok(FetchOutcome::Cancelled)
    }
}

/// Fetches a frontier entry on behalf of a slot, bounded by `timeout`
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `entry` - The claimed URL and its depth
/// * `slot` - Index of the worker slot running the request
/// * `encoding` - Text encoding of the response body
/// * `timeout` - Maximum time from sending the request to the end of the body
/// * `stop` - The crawl's stop flag
///
/// # Returns
///
/// A FetchOutcome indicating success or the type of failure. `Err` is only
/// returned for an internal lifecycle violation.
pub async fn run_request(
    client: &Client,
    entry: &FrontierEntry,
    slot: usize,
    encoding: TextEncoding,
    timeout: Duration,
    stop: &AtomicBool,
) -> Result<FetchOutcome, SpiderError> {
    let mut request = InFlightRequest::new(entry, slot, encoding);

    let result = tokio::time::timeout(timeout, request.fetch(client, stop)).await;

    match result {
        Ok(outcome) => outcome,
        Err(_) => {
            request.transition(RequestPhase::TimedOut)?;
            Ok(FetchOutcome::TimedOut)
        }
    }
}

fn classify_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else {
        error.to_string()
    }
}
