//! Store key layout: `task:{id}` and `checkpoint:{id}:{progress}`.

use crate::ids::TaskId;

pub fn task_key(id: &TaskId) -> String {
    format!("task:{id}")
}

pub const TASK_PREFIX: &str = "task:";

pub fn checkpoint_key(id: &TaskId, progress: u8) -> String {
    format!("checkpoint:{id}:{progress}")
}

pub fn checkpoint_prefix(id: &TaskId) -> String {
    format!("checkpoint:{id}:")
}

/// Extract the progress suffix from a `checkpoint:{id}:{progress}` key.
///
/// Testable property #3: every stored checkpoint's `progress` field equals
/// the numeric suffix of its key, so this parse must stay in lockstep with
/// [`checkpoint_key`].
pub fn parse_checkpoint_progress(key: &str) -> Option<u8> {
    let mut parts = key.split(':');
    if parts.next()? != "checkpoint" {
        return None;
    }
    parts.next()?; // task id
    let progress = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    progress.parse().ok()
}
