//! URL frontier with deduplication and depth control
//!
//! The frontier owns the pending queue (discovered, not yet fetched) and the
//! visited map (claimed for fetching). A URL lives in at most one of the two,
//! and its depth is fixed the moment it enters the pending queue.

use crate::url::{clean_discovered_url, is_excluded_resource};
use std::collections::{HashMap, VecDeque};

/// A URL waiting in (or claimed from) the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// The cleaned URL
    pub url: String,

    /// Number of next-page hops from the root at which it was discovered
    pub depth: u32,
}

/// Pending queue plus visited set for one crawl
#[derive(Debug)]
pub struct Frontier {
    /// Pending entries in insertion order
    queue: VecDeque<FrontierEntry>,

    /// Pending url -> depth, mirrors `queue` for O(1) membership checks
    pending: HashMap<String, u32>,

    /// Claimed url -> depth
    visited: HashMap<String, u32>,

    /// URLs discovered at this depth or deeper are dropped
    max_depth: u32,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// `max_depth` is clamped to at least 1 so the root is always admitted.
    pub fn new(max_depth: u32) -> Self {
        Self {
            queue: VecDeque::new(),
            pending: HashMap::new(),
            visited: HashMap::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Adds discovered URLs at the given depth
    ///
    /// Each URL is cleaned first (see [`clean_discovered_url`]). A URL is
    /// skipped when it is empty after cleaning, points at a non-content
    /// resource, or is already pending or visited. The whole call is a no-op
    /// when `depth >= max_depth`.
    pub fn add_discovered<I, S>(&mut self, urls: I, depth: u32)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if depth >= self.max_depth {
            tracing::trace!(
                "Depth {} reached max depth {}, dropping discoveries",
                depth,
                self.max_depth
            );
            return;
        }

        for raw in urls {
            let url = clean_discovered_url(raw.as_ref());
            if url.is_empty() {
                continue;
            }
            if is_excluded_resource(&url) {
                tracing::trace!("Skipping non-content resource {}", url);
                continue;
            }
            if self.contains(&url) {
                tracing::trace!("Skipping already known URL {}", url);
                continue;
            }

            self.pending.insert(url.clone(), depth);
            self.queue.push_back(FrontierEntry { url, depth });
        }
    }

    /// Claims the oldest pending entry and moves it to the visited map
    ///
    /// Returns `None` when nothing is pending.
    pub fn claim_next(&mut self) -> Option<FrontierEntry> {
        let entry = self.queue.pop_front()?;
        self.pending.remove(&entry.url);
        self.visited.insert(entry.url.clone(), entry.depth);
        Some(entry)
    }

    /// Drops every pending entry; visited entries are kept
    pub fn clear_pending(&mut self) {
        self.queue.clear();
        self.pending.clear();
    }

    /// Returns true if the URL is pending or visited
    pub fn contains(&self, url: &str) -> bool {
        self.pending.contains_key(url) || self.visited.contains_key(url)
    }

    pub fn is_pending(&self, url: &str) -> bool {
        self.pending.contains_key(url)
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains_key(url)
    }

    /// Returns the depth recorded for a pending or visited URL
    pub fn depth_of(&self, url: &str) -> Option<u32> {
        self.pending
            .get(url)
            .or_else(|| self.visited.get(url))
            .copied()
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    /// Returns true if nothing is waiting to be fetched
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Iterates over visited URLs and their depths
    pub fn visited(&self) -> impl Iterator<Item = (&str, u32)> {
        self.visited.iter().map(|(url, depth)| (url.as_str(), *depth))
    }
}
