//! Recovery-start logic: where a resumed task picks up from.

use crate::error::WorkerError;
use fabric_core::{checkpoint_prefix, parse_checkpoint_progress, CheckpointRecord, Task};
use fabric_store::Store;

/// Determine the progress a recovered task should resume from.
///
/// If the task already carries `checkpoint_data`, that wins outright — it's
/// the most recent snapshot the task itself knows about. Otherwise fall back
/// to the store: enumerate `checkpoint:{task_id}:*` and take the largest
/// `progress` found. No checkpoints at all means resume from 0.
pub async fn resume_progress(store: &dyn Store, task: &Task) -> Result<u8, WorkerError> {
    if let Some(data) = &task.checkpoint_data {
        if let Ok(checkpoint) = serde_json::from_value::<CheckpointRecord>(data.clone()) {
            return Ok(checkpoint.progress);
        }
    }

    let keys = store.scan_prefix(&checkpoint_prefix(&task.id)).await?;
    let max_progress = keys.iter().filter_map(|key| parse_checkpoint_progress(key)).max().unwrap_or(0);
    Ok(max_progress)
}
