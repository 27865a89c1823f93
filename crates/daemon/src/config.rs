//! Centralized environment variable access for the daemon binary. Every knob
//! has a default matching the distilled protocol's stated behavior; set the
//! corresponding `FABRIC_*` var to override it.

use std::time::Duration;

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

pub fn liveness_timeout() -> Duration {
    Duration::from_millis(env_u64("FABRIC_LIVENESS_TIMEOUT_MS", 30_000))
}

pub fn liveness_sweep_interval() -> Duration {
    Duration::from_millis(env_u64("FABRIC_LIVENESS_SWEEP_MS", 5_000))
}

pub fn checkpoint_interval() -> Duration {
    Duration::from_millis(env_u64("FABRIC_CHECKPOINT_INTERVAL_MS", 5_000))
}

pub fn heartbeat_interval() -> Duration {
    Duration::from_millis(env_u64("FABRIC_HEARTBEAT_INTERVAL_MS", 5_000))
}

pub fn worker_steps() -> u8 {
    env_u64("FABRIC_WORKER_STEPS", 10) as u8
}

pub fn step_delay_min() -> Duration {
    Duration::from_millis(env_u64("FABRIC_STEP_DELAY_MIN_MS", 500))
}

pub fn step_delay_max() -> Duration {
    Duration::from_millis(env_u64("FABRIC_STEP_DELAY_MAX_MS", 1_500))
}

pub fn fail_probability_fresh() -> f64 {
    env_f64("FABRIC_FAIL_PROBABILITY_FRESH", 0.05)
}

pub fn fail_probability_recovered() -> f64 {
    env_f64("FABRIC_FAIL_PROBABILITY_RECOVERED", 0.03)
}

pub fn admin_addr() -> String {
    std::env::var("FABRIC_ADMIN_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string())
}

pub fn drain_timeout() -> Duration {
    Duration::from_millis(env_u64("FABRIC_DRAIN_TIMEOUT_MS", 5_000))
}

pub fn demo_workers() -> usize {
    env_u64("FABRIC_DEMO_WORKERS", 3) as usize
}

pub fn worker_config() -> fabric_worker::WorkerConfig {
    fabric_worker::WorkerConfig {
        steps: worker_steps(),
        step_delay_min: step_delay_min(),
        step_delay_max: step_delay_max(),
        fail_probability_fresh: fail_probability_fresh(),
        fail_probability_recovered: fail_probability_recovered(),
        checkpoint_interval: checkpoint_interval(),
        heartbeat_interval: heartbeat_interval(),
        intake_capacity: 10,
    }
}
