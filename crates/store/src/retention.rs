//! Checkpoint garbage-collection policy.
//!
//! The distilled spec flags checkpoint deletion as unimplemented future work
//! ("the source never GCs checkpoints"). This gives that future work a
//! concrete, opt-in shape: the default (`Keep`) preserves the original
//! behavior exactly, so existing scenarios are unaffected.

use crate::error::StoreError;
use crate::store::Store;
use fabric_core::{checkpoint_prefix, TaskId};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckpointRetention {
    /// Never delete checkpoints. Matches the original (unspecified-GC) behavior.
    #[default]
    Keep,
    /// Delete all checkpoints for a task the moment it reaches a terminal status.
    DeleteOnTerminal,
    /// Reserved for a future time-based sweep; not enforced by `gc_if_terminal`
    /// (a TTL needs a background sweeper with its own clock access, which
    /// belongs in the coordinator, not this policy enum).
    Ttl(Duration),
}

/// Apply `policy` after a task transitions to COMPLETED or FAILED.
///
/// No-op for `Keep` and `Ttl` (the latter is swept elsewhere, see the doc
/// comment on [`CheckpointRetention::Ttl`]).
pub async fn gc_if_terminal(
    store: &dyn Store,
    task_id: &TaskId,
    policy: CheckpointRetention,
) -> Result<(), StoreError> {
    if policy != CheckpointRetention::DeleteOnTerminal {
        return Ok(());
    }
    let prefix = checkpoint_prefix(task_id);
    for key in store.scan_prefix(&prefix).await? {
        store.delete(&key).await?;
    }
    Ok(())
}
