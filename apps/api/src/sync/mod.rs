//! Provider synchronization pipeline.
//!
//! Both passes share the same shape: fetch raw records, skip what is already
//! stored (unless forced), classify the rest, and stage rows for batched
//! writes through a store trait. Per-record failures are logged and skipped;
//! only pre-fetch failures abort a pass.

pub mod emails;
pub mod events;

use serde::Serialize;

/// Staged rows are flushed to the store every this many processed records,
/// plus one final flush.
pub(crate) const FLUSH_EVERY: usize = 10;

/// How a staged row should be applied.
///
/// `Insert` writes the full row and defaults user-owned fields; `Refresh`
/// rewrites only sync-owned fields, leaving user-owned state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Insert,
    Refresh,
}

/// Outcome of one sync pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SyncReport {
    /// Records seen for the first time and inserted.
    pub synced: u64,
    /// Already-known records rewritten because of a forced refresh.
    pub updated: u64,
}
