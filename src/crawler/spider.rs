//! Spider - main crawl orchestration logic
//!
//! This module contains the engine that coordinates one crawl at a time:
//! - Seeding the frontier with the root URL
//! - Handing pending URLs to idle worker slots
//! - Extracting next-hop URLs and result records from fetched pages
//! - Persisting pages and records and emitting notifications
//! - Detecting completion and handling aborts
//!
//! Every crawl runs in its own session. Tasks left over from an aborted
//! crawl only ever see their own session's stop flag and state, so they
//! cannot touch a crawl started later.

use crate::config::{Config, TextEncoding};
use crate::crawler::events::{CrawlFailure, FailureKind, Notification, NotificationReceiver};
use crate::crawler::fetcher::{build_http_client, run_request, FetchOutcome};
use crate::extraction::{ExtractionResult, ExtractionStrategy, LabelledLinkStrategy, RedirectResolver};
use crate::output::{FileSink, LabelledRecord, OutputResult, OutputSink};
use crate::state::{CrawlState, FrontierEntry};
use crate::url::normalize_root_url;
use crate::{SpiderError, UrlError};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Crawl engine handle
///
/// Created together with the receiving end of its notification channel.
/// Methods take `&self` (except [`Spider::set_root_url`]), so a spider can
/// be shared behind an `Arc` to abort from another task.
pub struct Spider {
    config: Config,
    client: Client,
    strategy: Arc<dyn ExtractionStrategy>,
    resolver: Option<RedirectResolver>,
    events: mpsc::UnboundedSender<Notification>,
    active: Mutex<Option<ActiveCrawl>>,
}

struct ActiveCrawl {
    session: Arc<Session>,
    watcher: Option<JoinHandle<usize>>,
}

impl Spider {
    /// Creates a spider using the default labelled-link strategy
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok((Spider, NotificationReceiver))` - The engine and its notification stream
    /// * `Err(SpiderError)` - Invalid selector, root URL or HTTP settings
    pub fn new(config: Config) -> Result<(Self, NotificationReceiver), SpiderError> {
        let strategy = LabelledLinkStrategy::from_config(&config.extraction)?;
        Self::with_strategy(config, Arc::new(strategy))
    }

    /// Creates a spider with a caller-supplied extraction strategy
    pub fn with_strategy(
        mut config: Config,
        strategy: Arc<dyn ExtractionStrategy>,
    ) -> Result<(Self, NotificationReceiver), SpiderError> {
        if let Some(root_url) = config.spider.root_url.take() {
            config.spider.root_url = Some(normalize_root_url(&root_url)?);
        }

        let client = build_http_client(&config.http)?;

        let resolver = if config.extraction.resolve_redirects {
            Some(RedirectResolver::new(
                client.clone(),
                config.extraction.max_concurrent_resolutions as usize,
                config.spider.request_timeout(),
            ))
        } else {
            None
        };

        let (events, receiver) = mpsc::unbounded_channel();

        let spider = Self {
            config,
            client,
            strategy,
            resolver,
            events,
            active: Mutex::new(None),
        };

        Ok((spider, receiver))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The normalized root URL, if one is set
    pub fn root_url(&self) -> Option<&str> {
        self.config.spider.root_url.as_deref()
    }

    /// Sets the root URL for the next crawl
    ///
    /// A missing scheme defaults to `https://`.
    pub fn set_root_url(&mut self, url: &str) -> Result<(), UrlError> {
        let normalized = normalize_root_url(url)?;
        tracing::debug!("Root URL set to {}", normalized);
        self.config.spider.root_url = Some(normalized);
        Ok(())
    }

    /// Starts a crawl writing into `output_dir`
    ///
    /// Must be called from within a Tokio runtime. Returns immediately;
    /// progress arrives on the notification channel and the crawl ends with
    /// exactly one `DownloadFinish`.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The crawl started
    /// * `Ok(false)` - No root URL is set; nothing happened
    /// * `Err(SpiderError::CrawlInProgress)` - The previous crawl has not finished
    /// * `Err(SpiderError::Persistence)` - The output directory could not be created
    pub fn download(&self, output_dir: impl AsRef<Path>) -> Result<bool, SpiderError> {
        let Some(root_url) = self.config.spider.root_url.clone() else {
            tracing::warn!("No root URL set, not starting a crawl");
            return Ok(false);
        };

        if self.is_running() {
            return Err(SpiderError::CrawlInProgress);
        }

        let sink = FileSink::create(output_dir.as_ref())?;
        let session = Arc::new(Session::new(
            &self.config,
            self.client.clone(),
            Arc::clone(&self.strategy),
            self.resolver.clone(),
            Arc::new(sink),
            self.events.clone(),
        ));
        session.lock_state().frontier.add_discovered([root_url.as_str()], 0);

        {
            let mut active = self.lock_active();
            if active.as_ref().is_some_and(|crawl| !crawl.session.is_finished()) {
                return Err(SpiderError::CrawlInProgress);
            }

            let watcher = tokio::spawn(Arc::clone(&session).watch_completion());
            *active = Some(ActiveCrawl {
                session: Arc::clone(&session),
                watcher: Some(watcher),
            });
        }

        tracing::info!(
            "Starting crawl of {} into {} (max depth {}, {} connections)",
            root_url,
            output_dir.as_ref().display(),
            self.config.spider.max_depth,
            self.config.spider.max_connections
        );

        session.dispatch();
        Ok(true)
    }

    /// Stops the current crawl
    ///
    /// Pending URLs are dropped, in-flight requests are cancelled and no new
    /// page files are started. The crawl still ends with one
    /// `DownloadFinish` carrying the pages saved so far. Calling this with
    /// no crawl, or more than once, does nothing.
    pub fn abort(&self) {
        if let Some(crawl) = self.lock_active().as_ref() {
            crawl.session.abort();
        }
    }

    /// True while a crawl has not yet emitted `DownloadFinish`
    pub fn is_running(&self) -> bool {
        self.lock_active()
            .as_ref()
            .is_some_and(|crawl| !crawl.session.is_finished())
    }

    /// Waits for the current crawl to finish
    ///
    /// Returns the total page count reported by `DownloadFinish`, or `None`
    /// if no crawl was started or it was already waited on.
    pub async fn wait(&self) -> Option<usize> {
        let watcher = self
            .lock_active()
            .as_mut()
            .and_then(|crawl| crawl.watcher.take())?;

        watcher.await.ok()
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveCrawl>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// State and collaborators of one crawl
struct Session {
    state: Mutex<CrawlState>,
    stop: AtomicBool,
    finished: AtomicBool,
    progress: Notify,
    client: Client,
    strategy: Arc<dyn ExtractionStrategy>,
    resolver: Option<RedirectResolver>,
    sink: Arc<dyn OutputSink>,
    events: mpsc::UnboundedSender<Notification>,
    encoding: TextEncoding,
    request_timeout: Duration,
    poll_interval: Duration,
}

impl Session {
    fn new(
        config: &Config,
        client: Client,
        strategy: Arc<dyn ExtractionStrategy>,
        resolver: Option<RedirectResolver>,
        sink: Arc<dyn OutputSink>,
        events: mpsc::UnboundedSender<Notification>,
    ) -> Self {
        Self {
            state: Mutex::new(CrawlState::new(
                config.spider.max_depth,
                config.spider.max_connections as usize,
            )),
            stop: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            progress: Notify::new(),
            client,
            strategy,
            resolver,
            sink,
            events,
            encoding: config.spider.encoding,
            request_timeout: config.spider.request_timeout(),
            poll_interval: config.spider.completion_poll_interval(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, CrawlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn emit(&self, notification: Notification) {
        // A dropped receiver only means nobody is listening.
        let _ = self.events.send(notification);
    }

    fn report(&self, failure: CrawlFailure) {
        tracing::warn!("{}", failure);
        self.emit(Notification::Error(failure));
    }

    fn abort(&self) {
        if self.stop.swap(true, Ordering::SeqCst) {
            return;
        }

        {
            let mut state = self.lock_state();
            tracing::info!(
                "Aborting crawl: dropping {} pending URLs, {} requests in flight",
                state.frontier.pending_len(),
                state.slots.busy_count()
            );
            state.abort();
        }
        self.progress.notify_one();
    }

    /// Starts a request on every idle slot that can get a pending URL
    fn dispatch(self: &Arc<Self>) {
        if self.is_stopped() {
            return;
        }

        let claimed = {
            let mut state = self.lock_state();
            if self.is_stopped() {
                return;
            }
            state.claim_for_idle_slots()
        };

        for (slot, entry) in claimed {
            let session = Arc::clone(self);
            tokio::spawn(session.process(slot, entry));
        }
    }

    /// Runs one claimed URL to completion and frees its slot
    async fn process(self: Arc<Self>, slot: usize, entry: FrontierEntry) {
        tracing::debug!("Slot {} fetching {} (depth {})", slot, entry.url, entry.depth);

        let outcome = run_request(
            &self.client,
            &entry,
            slot,
            self.encoding,
            self.request_timeout,
            &self.stop,
        )
        .await;

        let discovered = match outcome {
            Ok(FetchOutcome::Success {
                final_url,
                status_code,
                text,
            }) => {
                tracing::debug!("Fetched {} ({}, {} bytes of text)", final_url, status_code, text.len());
                self.handle_page(&entry, &final_url, text).await
            }
            Ok(FetchOutcome::HttpError { status_code }) => {
                let error = SpiderError::Status {
                    url: entry.url.clone(),
                    status: status_code,
                };
                self.report(CrawlFailure::from_error(&entry.url, &error));
                Vec::new()
            }
            Ok(FetchOutcome::NetworkError { error }) => {
                self.report(CrawlFailure::new(&entry.url, FailureKind::Network, error));
                Vec::new()
            }
            Ok(FetchOutcome::TimedOut) => {
                tracing::debug!("No complete response within {:?}", self.request_timeout);
                let error = SpiderError::Timeout {
                    url: entry.url.clone(),
                };
                self.report(CrawlFailure::from_error(&entry.url, &error));
                Vec::new()
            }
            Ok(FetchOutcome::Cancelled) => {
                tracing::debug!("Slot {} cancelled {}", slot, entry.url);
                Vec::new()
            }
            Err(e) => {
                self.report(CrawlFailure::from_error(&entry.url, &e));
                Vec::new()
            }
        };

        self.release(slot, discovered, entry.depth + 1);
    }

    /// Extracts, persists and reports one fetched page
    ///
    /// Returns the next-hop URLs the page produced.
    async fn handle_page(&self, entry: &FrontierEntry, page_url: &str, text: String) -> Vec<String> {
        if text.is_empty() {
            tracing::debug!("Empty body from {}, nothing to save", entry.url);
            return Vec::new();
        }

        let ExtractionResult {
            next_urls,
            mut records,
        } = self.strategy.extract(page_url, &text);

        if let Some(resolver) = &self.resolver {
            for error in resolver.resolve_all(&mut records).await {
                self.report(CrawlFailure::new(
                    &entry.url,
                    FailureKind::Redirect,
                    error.to_string(),
                ));
            }
        }

        let allocation = {
            let mut state = self.lock_state();
            if self.is_stopped() {
                tracing::debug!("Crawl stopped, discarding {}", entry.url);
                return Vec::new();
            }
            state.allocate_page(records.len())
        };
        let page_index = allocation.page_index;
        let labelled = LabelledRecord::label_page(allocation, &records);

        // Notifications for this page go out before finish_page so they
        // always precede DownloadFinish.
        let written = self.write_page(entry, page_index, text, labelled).await;
        self.lock_state().finish_page(written);
        self.progress.notify_one();

        if written {
            tracing::info!(
                "Saved page {} from {} ({} records, {} next links)",
                page_index,
                entry.url,
                records.len(),
                next_urls.len()
            );
        }

        next_urls
    }

    /// Writes a page's contents and data files
    ///
    /// Returns true if the contents file was written. Nothing further is
    /// written once the crawl has been stopped.
    async fn write_page(
        &self,
        entry: &FrontierEntry,
        page_index: usize,
        text: String,
        labelled: Vec<LabelledRecord>,
    ) -> bool {
        if self.is_stopped() {
            tracing::debug!("Crawl stopped, not writing page {}", page_index);
            return false;
        }

        match self.persist(move |sink| sink.save_contents(page_index, &text)).await {
            Ok(path) => self.emit(Notification::ContentsSaved {
                path,
                url: entry.url.clone(),
            }),
            Err(e) => {
                self.report(CrawlFailure::from_error(&entry.url, &e));
                return false;
            }
        }

        if self.is_stopped() {
            tracing::debug!("Crawl stopped, not writing records of page {}", page_index);
            return true;
        }

        let to_save = labelled.clone();
        match self.persist(move |sink| sink.save_records(page_index, &to_save)).await {
            Ok(_) => {
                for record in labelled {
                    self.emit(Notification::DataSaved {
                        name: record.label,
                        url: record.url,
                    });
                }
            }
            Err(e) => self.report(CrawlFailure::from_error(&entry.url, &e)),
        }

        true
    }

    /// Runs a blocking sink write off the async workers
    async fn persist<F>(&self, job: F) -> OutputResult<PathBuf>
    where
        F: FnOnce(&dyn OutputSink) -> OutputResult<PathBuf> + Send + 'static,
    {
        let sink = Arc::clone(&self.sink);
        tokio::task::spawn_blocking(move || job(sink.as_ref()))
            .await
            .map_err(|e| SpiderError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }

    /// Enqueues a page's discoveries, frees its slot and dispatches again
    fn release(self: &Arc<Self>, slot: usize, discovered: Vec<String>, depth: u32) {
        {
            let mut state = self.lock_state();
            if self.is_stopped() {
                state.release_slot(slot);
            } else {
                state.complete_slot(slot, discovered, depth);
            }
        }

        self.progress.notify_one();
        self.dispatch();
    }

    /// Emits `DownloadFinish` once the crawl is complete
    ///
    /// Wakes on slot releases and aborts, and also polls so completion is
    /// never missed.
    async fn watch_completion(self: Arc<Self>) -> usize {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.progress.notified() => {}
                _ = ticker.tick() => {}
            }

            let (total_pages, total_results) = {
                let state = self.lock_state();
                if !state.is_complete() {
                    continue;
                }
                (state.pages_saved(), state.results_labelled())
            };

            self.finished.store(true, Ordering::SeqCst);
            tracing::info!(
                "Crawl finished: {} pages saved, {} results labelled",
                total_pages,
                total_results
            );
            self.emit(Notification::DownloadFinish { total_pages });
            return total_pages;
        }
    }
}
