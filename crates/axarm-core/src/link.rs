//! Link monitor - derives `connected` from telemetry recency
//!
//! **Purpose**: the remote interface has no push channel, so "connected"
//! means "a telemetry round succeeded recently".
//!
//! **App Start Relative Time Pattern**:
//! - Uses monotonic time anchored to application start
//! - Unaffected by system clock changes (NTP, manual adjustments)
//! - Safe to store in AtomicU64 for lock-free access

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Global anchor point for monotonic time
/// Set once on first access, never changes
static APP_START: OnceLock<Instant> = OnceLock::new();

/// Get monotonic time as microseconds since app start
fn get_monotonic_micros() -> u64 {
    let start = APP_START.get_or_init(Instant::now);
    start.elapsed().as_micros() as u64
}

/// Connection liveness monitor
///
/// Tracks the time since the last successful telemetry round.
/// The sentinel value 0 means "nothing seen yet" — the link starts
/// out disconnected instead of pretending the last round just happened.
pub struct LinkMonitor {
    last_seen: AtomicU64,
    timeout: Duration,
}

impl LinkMonitor {
    /// Create a new monitor; `timeout` is the maximum silence before
    /// the link is considered down.
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_seen: AtomicU64::new(0),
            timeout,
        }
    }

    /// Register a successful telemetry round.
    pub fn register_telemetry(&self) {
        // max(1): never store the "nothing seen" sentinel after real traffic
        let now = get_monotonic_micros().max(1);
        self.last_seen.store(now, Ordering::Relaxed);
    }

    /// True if telemetry arrived within the timeout window.
    pub fn is_connected(&self) -> bool {
        let last_us = self.last_seen.load(Ordering::Relaxed);
        if last_us == 0 {
            return false;
        }
        let now_us = get_monotonic_micros();
        let elapsed = Duration::from_micros(now_us.saturating_sub(last_us));
        elapsed < self.timeout
    }

    /// Time since the last successful round, if any.
    pub fn time_since_last_telemetry(&self) -> Option<Duration> {
        let last_us = self.last_seen.load(Ordering::Relaxed);
        if last_us == 0 {
            return None;
        }
        let now_us = get_monotonic_micros();
        Some(Duration::from_micros(now_us.saturating_sub(last_us)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_starts_disconnected() {
        let monitor = LinkMonitor::new(Duration::from_secs(1));
        assert!(!monitor.is_connected());
        assert!(monitor.time_since_last_telemetry().is_none());
    }

    #[test]
    fn test_connected_after_telemetry() {
        let monitor = LinkMonitor::new(Duration::from_secs(10));
        monitor.register_telemetry();
        assert!(monitor.is_connected());
        assert!(monitor.time_since_last_telemetry().is_some());
    }

    #[test]
    fn test_disconnects_after_timeout() {
        let monitor = LinkMonitor::new(Duration::from_millis(10));
        monitor.register_telemetry();
        thread::sleep(Duration::from_millis(30));
        assert!(!monitor.is_connected());
    }
}
