//! # Connection State
//!
//! Lock-free tracker for the billing connection lifecycle:
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──setup OK──▶ Ready
//!      ▲                        │                      │
//!      └────── setup failed ────┘◀──── disconnected ───┘
//! ```
//!
//! Tearing the session down forces `Disconnected` and marks every later
//! callback as ignorable until the next `connect`.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Connection state of a billing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
}

impl ConnectionState {
    fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Ready => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Ready,
            _ => ConnectionState::Disconnected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change, reported for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

impl Transition {
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }
}

/// Atomic connection-state tracker shared by the session and its dispatcher
#[derive(Debug)]
pub struct ConnectionTracker {
    state: AtomicU8,
    torn_down: AtomicBool,
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected.to_u8()),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Last-known state; never blocks
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Move `Disconnected → Connecting` and accept callbacks again.
    ///
    /// Returns false (and changes nothing) from any other state.
    pub fn connect(&self) -> bool {
        let moved = self
            .state
            .compare_exchange(
                ConnectionState::Disconnected.to_u8(),
                ConnectionState::Connecting.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if moved {
            self.torn_down.store(false, Ordering::Release);
        }
        moved
    }

    /// Apply a setup-finished callback: `Connecting → Ready` on success,
    /// `Connecting → Disconnected` on failure.
    ///
    /// Returns `None` (and changes nothing) when no connection attempt is in
    /// progress, including after a teardown.
    pub fn setup_finished(&self, ok: bool) -> Option<Transition> {
        let to = if ok {
            ConnectionState::Ready
        } else {
            ConnectionState::Disconnected
        };
        self.state
            .compare_exchange(
                ConnectionState::Connecting.to_u8(),
                to.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| Transition {
                from: ConnectionState::Connecting,
                to,
            })
    }

    /// Apply a service-disconnected callback
    pub fn disconnected(&self) -> Transition {
        self.swap(ConnectionState::Disconnected)
    }

    /// End the session: force `Disconnected` and ignore callbacks from now on
    pub fn tear_down(&self) -> Transition {
        self.torn_down.store(true, Ordering::Release);
        self.swap(ConnectionState::Disconnected)
    }

    fn swap(&self, to: ConnectionState) -> Transition {
        let from = ConnectionState::from_u8(self.state.swap(to.to_u8(), Ordering::AcqRel));
        Transition { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_disconnected() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.state(), ConnectionState::Disconnected);
        assert!(!tracker.is_ready());
        assert!(!tracker.is_torn_down());
    }

    #[test]
    fn test_successful_setup() {
        let tracker = ConnectionTracker::new();
        assert!(tracker.connect());
        assert_eq!(tracker.state(), ConnectionState::Connecting);

        let transition = tracker.setup_finished(true).unwrap();
        assert_eq!(transition.from, ConnectionState::Connecting);
        assert_eq!(transition.to, ConnectionState::Ready);
        assert!(tracker.is_ready());
    }

    #[test]
    fn test_failed_setup() {
        let tracker = ConnectionTracker::new();
        tracker.connect();
        tracker.setup_finished(false);
        assert_eq!(tracker.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_connect_only_from_disconnected() {
        let tracker = ConnectionTracker::new();
        assert!(tracker.connect());
        assert!(!tracker.connect());

        tracker.setup_finished(true);
        assert!(!tracker.connect());
        assert_eq!(tracker.state(), ConnectionState::Ready);
    }

    #[test]
    fn test_disconnect_and_restart() {
        let tracker = ConnectionTracker::new();
        tracker.connect();
        tracker.setup_finished(true);

        let transition = tracker.disconnected();
        assert!(transition.is_change());
        assert_eq!(tracker.state(), ConnectionState::Disconnected);

        assert!(tracker.connect());
        assert_eq!(tracker.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_teardown_until_reconnect() {
        let tracker = ConnectionTracker::new();
        tracker.connect();
        tracker.setup_finished(true);

        tracker.tear_down();
        assert!(tracker.is_torn_down());
        assert_eq!(tracker.state(), ConnectionState::Disconnected);

        assert!(tracker.connect());
        assert!(!tracker.is_torn_down());
    }

    #[test]
    fn test_setup_requires_connecting() {
        let tracker = ConnectionTracker::new();
        assert!(tracker.setup_finished(true).is_none());
        assert_eq!(tracker.state(), ConnectionState::Disconnected);

        tracker.connect();
        tracker.setup_finished(true);
        assert!(tracker.setup_finished(false).is_none());
        assert_eq!(tracker.state(), ConnectionState::Ready);
    }

    #[test]
    fn test_teardown_before_setup_result_wins() {
        let tracker = ConnectionTracker::new();
        tracker.connect();

        // Dispatcher has passed its teardown check and parsed the payload
        assert!(!tracker.is_torn_down());
        tracker.tear_down();

        assert!(tracker.setup_finished(true).is_none());
        assert_eq!(tracker.state(), ConnectionState::Disconnected);
        assert!(tracker.is_torn_down());
    }
}
