//! Synced-baseline snapshot with flush ordering.
//!
//! Flushes are not cancelled when superseded. Each flush takes a ticket when
//! it is scheduled; a completed flush only replaces the baseline when no flush
//! with a later ticket has already completed.

use std::sync::Arc;

use crate::document::ResumeDocument;

/// Ordering token handed out when a flush is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlushTicket(u64);

impl FlushTicket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncedBaseline {
    snapshot: Option<Arc<ResumeDocument>>,
    issued: u64,
    applied: u64,
}

impl SyncedBaseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last document confirmed stored remotely.
    pub fn snapshot(&self) -> Option<&Arc<ResumeDocument>> {
        self.snapshot.as_ref()
    }

    /// Deep comparison against the baseline.
    pub fn matches(&self, document: &ResumeDocument) -> bool {
        self.snapshot
            .as_deref()
            .is_some_and(|baseline| baseline == document)
    }

    pub fn begin_flush(&mut self) -> FlushTicket {
        self.issued += 1;
        FlushTicket(self.issued)
    }

    /// Record a successful flush. Returns false when a newer flush already won.
    pub fn complete(&mut self, ticket: FlushTicket, stored: Arc<ResumeDocument>) -> bool {
        if ticket.0 <= self.applied {
            return false;
        }
        self.applied = ticket.0;
        self.snapshot = Some(stored);
        true
    }

    /// Seed from a fetched remote document. Ignored once any flush has completed.
    pub fn seed(&mut self, remote: Arc<ResumeDocument>) -> bool {
        if self.applied > 0 {
            return false;
        }
        self.snapshot = Some(remote);
        true
    }

    pub fn has_newer_than(&self, ticket: FlushTicket) -> bool {
        self.applied > ticket.0
    }
}
