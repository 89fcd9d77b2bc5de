//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `Frontier`: pending and visited URLs with their discovery depth
//! - `SlotPool`: busy/idle flags of the worker slots
//! - `CrawlState`: frontier, slots and counters shared behind one lock
//! - `RequestPhase`: lifecycle phase of a single in-flight fetch

mod crawl_state;
mod frontier;
mod request_phase;
mod slot_pool;

// Re-export main types
pub use crawl_state::{CrawlState, PageAllocation};
pub use frontier::{Frontier, FrontierEntry};
pub use request_phase::RequestPhase;
pub use slot_pool::SlotPool;
