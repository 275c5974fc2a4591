//! State shared between the sync driver and the periodic tasks

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Catching-up flag and the live proposal worklist
#[derive(Debug, Default)]
pub struct SharedState {
    catching_up: AtomicBool,
    live_proposals: RwLock<BTreeSet<u64>>,
}

impl SharedState {
    /// Create state with the flag cleared and an empty worklist
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the last processed block was older than the catching-up threshold
    pub fn is_catching_up(&self) -> bool {
        self.catching_up.load(Ordering::Acquire)
    }

    /// Set the catching-up flag
    pub fn set_catching_up(&self, value: bool) {
        self.catching_up.store(value, Ordering::Release);
    }

    /// Proposal ids awaiting a refresh
    pub fn live_proposals(&self) -> &RwLock<BTreeSet<u64>> {
        &self.live_proposals
    }
}
