//! Tunables for the execution/checkpoint/heartbeat protocol. Defaults match
//! §4.2's stated knobs; `fabric-daemon` overrides them from `FABRIC_*` env vars.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of equal progress steps per task (N in the execution protocol).
    pub steps: u8,
    /// Bounds on the per-step simulated work delay.
    pub step_delay_min: Duration,
    pub step_delay_max: Duration,
    /// Per-step failure probability for a task that started fresh (progress 0).
    pub fail_probability_fresh: f64,
    /// Per-step failure probability for a task resumed from a checkpoint.
    pub fail_probability_recovered: f64,
    /// Checkpoint ticker period.
    pub checkpoint_interval: Duration,
    /// Heartbeat ticker period.
    pub heartbeat_interval: Duration,
    /// Capacity of the bounded intake buffer between bus delivery and execution.
    pub intake_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            steps: 10,
            step_delay_min: Duration::from_millis(500),
            step_delay_max: Duration::from_millis(1500),
            fail_probability_fresh: 0.05,
            fail_probability_recovered: 0.03,
            checkpoint_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(5),
            intake_capacity: 10,
        }
    }
}
