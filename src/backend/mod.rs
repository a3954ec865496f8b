//! Host-side resources owned by a running scenario

pub mod ledger;
pub mod workspace;

pub use ledger::{LedgerSnapshot, ResourceLedger};
pub use workspace::{
    Workspace, WorkspaceAllocator, WorkspaceError, WorkspaceResult, DEFAULT_MAX_WORKSPACE_BYTES,
};
