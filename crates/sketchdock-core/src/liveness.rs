//! Connection-liveness state machine.
//!
//! Pure and clock-free: callers pass `now_ms` (epoch milliseconds) into
//! every operation. The tracker reports each connected/disconnected flip
//! exactly once, so the caller can announce transitions rather than
//! re-deriving them from polled state.

// ─── Constants ────────────────────────────────────────────────────

/// How often the periodic liveness check runs (milliseconds).
pub const LIVENESS_CHECK_INTERVAL_MS: u64 = 5_000;

/// Silence window after which the connection is considered lost
/// (milliseconds since the last inbound message).
pub const CONNECTION_TIMEOUT_MS: u64 = 30_000;

// ─── Types ────────────────────────────────────────────────────────

/// A connected/disconnected flip, emitted once per state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionTransition {
    Connected,
    Disconnected,
}

/// Tracks whether the panel has communicated within the timeout window.
///
/// Starts disconnected; the first inbound message flips it to connected.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    connected: bool,
    last_message_ms: Option<u64>,
    timeout_ms: u64,
}

impl ConnectionTracker {
    /// Create a tracker with the default 30s timeout.
    pub fn new() -> Self {
        Self::with_timeout(CONNECTION_TIMEOUT_MS)
    }

    /// Create a tracker with a custom timeout window.
    pub fn with_timeout(timeout_ms: u64) -> Self {
        Self {
            connected: false,
            last_message_ms: None,
            timeout_ms,
        }
    }

    /// Record an inbound message at `now_ms`.
    ///
    /// Returns `Some(Connected)` on the disconnected→connected flip,
    /// `None` when already connected.
    pub fn record_inbound(&mut self, now_ms: u64) -> Option<ConnectionTransition> {
        self.last_message_ms = Some(now_ms);
        if self.connected {
            None
        } else {
            self.connected = true;
            Some(ConnectionTransition::Connected)
        }
    }

    /// Periodic liveness check at `now_ms`.
    ///
    /// Returns `Some(Disconnected)` on the connected→disconnected flip
    /// (timeout window elapsed with no inbound message), `None` otherwise.
    pub fn check(&mut self, now_ms: u64) -> Option<ConnectionTransition> {
        if !self.connected {
            return None;
        }
        let expired = match self.last_message_ms {
            Some(last) => now_ms.saturating_sub(last) >= self.timeout_ms,
            None => true,
        };
        if expired {
            self.connected = false;
            Some(ConnectionTransition::Disconnected)
        } else {
            None
        }
    }

    /// Current connection status.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Reset to the initial disconnected state (panel detached).
    pub fn reset(&mut self) {
        self.connected = false;
        self.last_message_ms = None;
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disconnected() {
        let tracker = ConnectionTracker::new();
        assert!(!tracker.is_connected());
    }

    #[test]
    fn first_message_flips_to_connected_once() {
        let mut tracker = ConnectionTracker::new();
        assert_eq!(
            tracker.record_inbound(1_000),
            Some(ConnectionTransition::Connected)
        );
        assert!(tracker.is_connected());
        // Second message: no further transition.
        assert_eq!(tracker.record_inbound(2_000), None);
    }

    #[test]
    fn check_before_any_message_stays_silent() {
        let mut tracker = ConnectionTracker::new();
        assert_eq!(tracker.check(100_000), None);
        assert!(!tracker.is_connected());
    }

    #[test]
    fn timeout_flips_to_disconnected_once() {
        let mut tracker = ConnectionTracker::new();
        tracker.record_inbound(1_000);

        // Inside the window: still connected.
        assert_eq!(tracker.check(1_000 + CONNECTION_TIMEOUT_MS - 1), None);
        assert!(tracker.is_connected());

        // Window elapsed: exactly one Disconnected.
        assert_eq!(
            tracker.check(1_000 + CONNECTION_TIMEOUT_MS),
            Some(ConnectionTransition::Disconnected)
        );
        assert!(!tracker.is_connected());
        assert_eq!(tracker.check(1_000 + CONNECTION_TIMEOUT_MS * 2), None);
    }

    #[test]
    fn message_after_timeout_reconnects() {
        let mut tracker = ConnectionTracker::new();
        tracker.record_inbound(1_000);
        tracker.check(1_000 + CONNECTION_TIMEOUT_MS);
        assert!(!tracker.is_connected());

        assert_eq!(
            tracker.record_inbound(50_000),
            Some(ConnectionTransition::Connected)
        );
        assert!(tracker.is_connected());
    }

    #[test]
    fn messages_keep_the_window_fresh() {
        let mut tracker = ConnectionTracker::with_timeout(10_000);
        tracker.record_inbound(0);
        tracker.record_inbound(8_000);
        // 15s after the first message but only 7s after the second.
        assert_eq!(tracker.check(15_000), None);
        assert!(tracker.is_connected());
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let mut tracker = ConnectionTracker::new();
        tracker.record_inbound(1_000);
        tracker.reset();
        assert!(!tracker.is_connected());
        // Post-reset check does not emit a stale Disconnected.
        assert_eq!(tracker.check(100_000), None);
    }

    #[test]
    fn default_constants() {
        assert_eq!(LIVENESS_CHECK_INTERVAL_MS, 5_000);
        assert_eq!(CONNECTION_TIMEOUT_MS, 30_000);
    }
}
