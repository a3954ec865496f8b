//! Acquire/release accounting shared by workspaces and descriptors

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Counters {
    workspaces_acquired: AtomicUsize,
    workspaces_released: AtomicUsize,
    workspace_bytes_live: AtomicUsize,
    descriptors_created: AtomicUsize,
    descriptors_released: AtomicUsize,
}

/// Point-in-time copy of the ledger counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LedgerSnapshot {
    pub workspaces_acquired: usize,
    pub workspaces_released: usize,
    pub workspace_bytes_live: usize,
    pub descriptors_created: usize,
    pub descriptors_released: usize,
}

impl LedgerSnapshot {
    pub fn live_workspaces(&self) -> usize {
        self.workspaces_acquired - self.workspaces_released
    }

    pub fn live_descriptors(&self) -> usize {
        self.descriptors_created - self.descriptors_released
    }
}

/// Shared counters; clones observe the same ledger
#[derive(Debug, Clone, Default)]
pub struct ResourceLedger {
    counters: Arc<Counters>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_workspace_acquired(&self, bytes: usize) {
        self.counters
            .workspaces_acquired
            .fetch_add(1, Ordering::SeqCst);
        self.counters
            .workspace_bytes_live
            .fetch_add(bytes, Ordering::SeqCst);
    }

    pub(crate) fn record_workspace_released(&self, bytes: usize) {
        self.counters
            .workspaces_released
            .fetch_add(1, Ordering::SeqCst);
        self.counters
            .workspace_bytes_live
            .fetch_sub(bytes, Ordering::SeqCst);
    }

    pub(crate) fn record_descriptor_created(&self) {
        self.counters
            .descriptors_created
            .fetch_add(1, Ordering::SeqCst);
    }

    /// Counted whether or not the destroy call itself succeeded
    pub(crate) fn record_descriptor_released(&self) {
        self.counters
            .descriptors_released
            .fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            workspaces_acquired: self.counters.workspaces_acquired.load(Ordering::SeqCst),
            workspaces_released: self.counters.workspaces_released.load(Ordering::SeqCst),
            workspace_bytes_live: self.counters.workspace_bytes_live.load(Ordering::SeqCst),
            descriptors_created: self.counters.descriptors_created.load(Ordering::SeqCst),
            descriptors_released: self.counters.descriptors_released.load(Ordering::SeqCst),
        }
    }

    /// True when everything acquired has been released
    pub fn is_balanced(&self) -> bool {
        let snap = self.snapshot();
        snap.live_workspaces() == 0
            && snap.live_descriptors() == 0
            && snap.workspace_bytes_live == 0
    }
}
