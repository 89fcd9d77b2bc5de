//! Shared per-crawl state
//!
//! Everything that concurrent slots mutate lives here so it can sit behind a
//! single lock: claiming a URL and marking its slot busy happen in one step,
//! as do releasing a slot and enqueueing the URLs its page produced.

use crate::state::frontier::{Frontier, FrontierEntry};
use crate::state::slot_pool::SlotPool;

/// Numbers reserved for one page about to be persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageAllocation {
    /// Completion-order index naming the page's output files
    pub page_index: usize,

    /// Crawl-wide number of the page's first result record (1-based)
    pub first_result: usize,
}

/// Frontier, slot flags and counters for one crawl
#[derive(Debug)]
pub struct CrawlState {
    pub frontier: Frontier,
    pub slots: SlotPool,
    next_page_index: usize,
    result_counter: usize,
    writes_in_flight: usize,
    pages_written: usize,
}

impl CrawlState {
    /// Creates fresh state for a crawl
    pub fn new(max_depth: u32, slot_count: usize) -> Self {
        Self {
            frontier: Frontier::new(max_depth),
            slots: SlotPool::new(slot_count),
            next_page_index: 0,
            result_counter: 0,
            writes_in_flight: 0,
            pages_written: 0,
        }
    }

    /// Claims one pending URL for every idle slot
    ///
    /// Each returned slot is already marked busy. Slots left without work
    /// stay idle.
    pub fn claim_for_idle_slots(&mut self) -> Vec<(usize, FrontierEntry)> {
        let mut claimed = Vec::new();
        for slot in self.slots.idle_slots() {
            match self.frontier.claim_next() {
                Some(entry) => {
                    self.slots.mark_busy(slot);
                    claimed.push((slot, entry));
                }
                None => break,
            }
        }
        claimed
    }

    /// Reserves the next page index and `record_count` result numbers
    ///
    /// The page counts as being written until [`CrawlState::finish_page`]
    /// is called for it.
    pub fn allocate_page(&mut self, record_count: usize) -> PageAllocation {
        let allocation = PageAllocation {
            page_index: self.next_page_index,
            first_result: self.result_counter + 1,
        };
        self.next_page_index += 1;
        self.result_counter += record_count;
        self.writes_in_flight += 1;
        allocation
    }

    /// Ends the write of an allocated page
    ///
    /// `written` is false when the contents file was skipped or failed.
    pub fn finish_page(&mut self, written: bool) {
        self.writes_in_flight = self.writes_in_flight.saturating_sub(1);
        if written {
            self.pages_written += 1;
        }
    }

    /// Enqueues a finished page's discoveries and releases its slot
    pub fn complete_slot<I, S>(&mut self, slot: usize, discovered: I, depth: u32)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.frontier.add_discovered(discovered, depth);
        self.slots.mark_idle(slot);
    }

    /// Releases a slot without enqueueing anything
    pub fn release_slot(&mut self, slot: usize) {
        self.slots.mark_idle(slot);
    }

    /// True when nothing is pending, no slot is busy and no page is mid-write
    pub fn is_complete(&self) -> bool {
        self.frontier.is_empty() && self.slots.all_idle() && self.writes_in_flight == 0
    }

    /// Forces completion: all slots idle, pending queue dropped
    ///
    /// Pages already being written still hold completion back.
    pub fn abort(&mut self) {
        self.slots.force_all_idle();
        self.frontier.clear_pending();
    }

    /// Number of pages whose contents file was written
    pub fn pages_saved(&self) -> usize {
        self.pages_written
    }

    /// Number of result records labelled so far
    pub fn results_labelled(&self) -> usize {
        self.result_counter
    }
}
