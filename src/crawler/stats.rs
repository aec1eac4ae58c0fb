//! Run statistics
//!
//! Counters are written only from the engine's control path but are atomics so an
//! [`crate::crawler::EngineHandle`] can take a snapshot while a run is in progress.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for a crawl run
#[derive(Debug, Default)]
pub struct CrawlStats {
    requests_sent: AtomicU64,
    responses_received: AtomicU64,
    records_accepted: AtomicU64,
    records_dropped: AtomicU64,
    requests_abandoned: AtomicU64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroes every counter at the start of a run
    pub fn reset(&self) {
        self.requests_sent.store(0, Ordering::SeqCst);
        self.responses_received.store(0, Ordering::SeqCst);
        self.records_accepted.store(0, Ordering::SeqCst);
        self.records_dropped.store(0, Ordering::SeqCst);
        self.requests_abandoned.store(0, Ordering::SeqCst);
    }

    pub(crate) fn increment_requests_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_responses_received(&self) {
        self.responses_received.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_records_accepted(&self) {
        self.records_accepted.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_records_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_requests_abandoned(&self) {
        self.requests_abandoned.fetch_add(1, Ordering::SeqCst);
    }

    /// Captures the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_sent: self.requests_sent.load(Ordering::SeqCst),
            responses_received: self.responses_received.load(Ordering::SeqCst),
            records_accepted: self.records_accepted.load(Ordering::SeqCst),
            records_dropped: self.records_dropped.load(Ordering::SeqCst),
            requests_abandoned: self.requests_abandoned.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time copy of the run counters; also the result of a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Fetch attempts started (retries included)
    pub requests_sent: u64,

    /// Fetch attempts that returned a response
    pub responses_received: u64,

    /// Records that passed every stage
    pub records_accepted: u64,

    /// Records dropped by some stage
    pub records_dropped: u64,

    /// Requests given up on after exhausting the retry budget
    pub requests_abandoned: u64,
}

impl StatsSnapshot {
    /// Total records routed through the stage chain
    pub fn records_total(&self) -> u64 {
        self.records_accepted + self.records_dropped
    }

    /// Failed attempts: sent attempts that never produced a response
    pub fn failed_fetches(&self) -> u64 {
        self.requests_sent.saturating_sub(self.responses_received)
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StatsSnapshot) {
    println!("=== Crawl Statistics ===\n");

    println!("Requests:");
    println!("  Sent (incl. retries): {}", stats.requests_sent);
    println!("  Responses received: {}", stats.responses_received);
    println!("  Failed fetches: {}", stats.failed_fetches());
    println!("  Abandoned: {}", stats.requests_abandoned);
    println!();

    println!("Records:");
    println!("  Accepted: {}", stats.records_accepted);
    println!("  Dropped: {}", stats.records_dropped);

    let acceptance_rate = if stats.records_total() > 0 {
        (stats.records_accepted as f64 / stats.records_total() as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "\nAcceptance Rate: {:.1}% ({} / {} records)",
        acceptance_rate,
        stats.records_accepted,
        stats.records_total()
    );
}
