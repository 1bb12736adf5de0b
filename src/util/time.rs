//! Time constants and uptime tracking

use std::time::{Duration, Instant};

/// Fixed battle tick length
pub const TICK_INTERVAL: Duration = Duration::from_millis(200);

/// Tick ceiling: a battle that has not produced a winner by then is
/// called off
pub const MAX_TICKS: u64 = 10_000;

/// How long a finished room keeps broadcasting before teardown
pub const TEARDOWN_GRACE: Duration = Duration::from_secs(5);

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}
