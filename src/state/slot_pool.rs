//! Fixed pool of worker slots
//!
//! A slot is busy while it owns an in-flight fetch. The pool never blocks;
//! the orchestrator reads it to decide where to dispatch and when the crawl
//! is complete.

/// Busy/idle flags for N worker slots
#[derive(Debug, Clone)]
pub struct SlotPool {
    busy: Vec<bool>,
}

impl SlotPool {
    /// Creates a pool of `size` idle slots (at least one)
    pub fn new(size: usize) -> Self {
        Self {
            busy: vec![false; size.max(1)],
        }
    }

    pub fn len(&self) -> usize {
        self.busy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.busy.is_empty()
    }

    /// Marks a slot busy; out-of-range indices are ignored
    pub fn mark_busy(&mut self, index: usize) {
        if let Some(slot) = self.busy.get_mut(index) {
            *slot = true;
        }
    }

    /// Marks a slot idle; out-of-range indices are ignored
    pub fn mark_idle(&mut self, index: usize) {
        if let Some(slot) = self.busy.get_mut(index) {
            *slot = false;
        }
    }

    pub fn is_busy(&self, index: usize) -> bool {
        self.busy.get(index).copied().unwrap_or(false)
    }

    /// Returns true iff every slot is idle
    pub fn all_idle(&self) -> bool {
        self.busy.iter().all(|busy| !busy)
    }

    /// Marks every slot idle regardless of in-flight work
    pub fn force_all_idle(&mut self) {
        self.busy.iter_mut().for_each(|busy| *busy = false);
    }

    /// Indices of the currently idle slots, in ascending order
    pub fn idle_slots(&self) -> Vec<usize> {
        self.busy
            .iter()
            .enumerate()
            .filter(|(_, busy)| !**busy)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn busy_count(&self) -> usize {
        self.busy.iter().filter(|busy| **busy).count()
    }
}
