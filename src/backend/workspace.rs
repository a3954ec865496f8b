//! Scoped scratch memory handed to operator calls

use super::ResourceLedger;
use std::ops::{Deref, DerefMut};
use thiserror::Error;
use tracing::{debug, warn};

/// Upper bound on a single workspace request (1 GiB)
pub const DEFAULT_MAX_WORKSPACE_BYTES: usize = 1 << 30;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("Workspace request of {requested} bytes exceeds limit of {limit} bytes")]
    ExceedsLimit { requested: usize, limit: usize },
    #[error("Workspace allocation failed: {0}")]
    AllocationFailed(String),
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Hands out zeroed workspaces and records them in a ledger
#[derive(Debug, Clone)]
pub struct WorkspaceAllocator {
    ledger: ResourceLedger,
    max_bytes: usize,
}

impl WorkspaceAllocator {
    pub fn new(ledger: ResourceLedger) -> Self {
        WorkspaceAllocator {
            ledger,
            max_bytes: DEFAULT_MAX_WORKSPACE_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Acquire `size` bytes; released when the returned guard drops
    ///
    /// A zero-byte workspace is valid and still counted.
    pub fn acquire(&self, size: usize) -> WorkspaceResult<Workspace> {
        if size > self.max_bytes {
            warn!(
                "Refusing workspace of {} bytes (limit {})",
                size, self.max_bytes
            );
            return Err(WorkspaceError::ExceedsLimit {
                requested: size,
                limit: self.max_bytes,
            });
        }

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(size)
            .map_err(|e| WorkspaceError::AllocationFailed(e.to_string()))?;
        buffer.resize(size, 0u8);

        self.ledger.record_workspace_acquired(size);
        debug!("Acquired workspace: {} bytes", size);

        Ok(Workspace {
            buffer,
            ledger: self.ledger.clone(),
        })
    }
}

/// RAII workspace buffer
#[derive(Debug)]
pub struct Workspace {
    buffer: Vec<u8>,
    ledger: ResourceLedger,
}

impl Workspace {
    pub fn size(&self) -> usize {
        self.buffer.len()
    }
}

impl Deref for Workspace {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buffer
    }
}

impl DerefMut for Workspace {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.ledger.record_workspace_released(self.buffer.len());
        debug!("Released workspace: {} bytes", self.buffer.len());
    }
}
