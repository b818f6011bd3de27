/// Monotonic request tags for discarding superseded asynchronous results.
///
/// Each pair shown may trigger enrichment lookups that finish out of order.
/// Tag each request with `begin()` and drop the result unless
/// `is_current(tag)` still holds when it arrives. The bundled CLI is
/// synchronous; this is exported for front ends that fetch per-pair details
/// in the background.
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RequestSequence {
    latest: AtomicU64,
}

impl RequestSequence {
    pub fn new() -> Self {
        RequestSequence::default()
    }

    /// Start a new request; every earlier tag becomes stale.
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_current(&self, tag: u64) -> bool {
        self.latest.load(Ordering::Acquire) == tag
    }

    /// Invalidate every outstanding tag without starting a request.
    pub fn cancel(&self) {
        self.latest.fetch_add(1, Ordering::AcqRel);
    }
}
