//! Frontier queue of requests waiting to be dispatched
//!
//! The frontier is a plain FIFO: no priority, no deduplication. Whatever a source
//! yields becomes future work in the order it was yielded. It is owned by the
//! engine's control path, which is the only place that pushes or pops.

use crate::model::FetchRequest;
use std::collections::VecDeque;

/// Ordered queue of pending fetch requests
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FetchRequest>,
    total_pushed: u64,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a request to the tail
    pub fn push(&mut self, request: FetchRequest) {
        self.total_pushed += 1;
        self.queue.push_back(request);
    }

    /// Appends every request in order
    pub fn extend<I>(&mut self, requests: I)
    where
        I: IntoIterator<Item = FetchRequest>,
    {
        for request in requests {
            self.push(request);
        }
    }

    /// Removes and returns the head, or `None` when empty
    pub fn pop(&mut self) -> Option<FetchRequest> {
        self.queue.pop_front()
    }

    /// Returns the number of queued requests
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns whether the frontier is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of requests pushed since creation
    pub fn total_pushed(&self) -> u64 {
        self.total_pushed
    }
}
