//! Restart-on-activity debounce timers
//!
//! Settle detection (visibility commit, quality upgrade, mode-switch recenter)
//! is modelled as a small state machine instead of wall-clock callbacks:
//!
//! ```text
//! Idle --arm--> Armed --poll(now >= deadline)--> Fired
//!                ^  |                              |
//!                +--+ arm (activity restarts)      |
//!                +---------------- arm ------------+
//! ```
//!
//! Time is always passed in, so tests drive timers with synthetic instants
//! and never sleep.

use std::time::{Duration, Instant};

/// Visibility commit settle window
pub const SETTLE_WINDOW: Duration = Duration::from_millis(120);

/// Minimum spacing between immediate visibility commits
pub const COMMIT_COOLDOWN: Duration = Duration::from_millis(500);

/// Delay before the quality pass runs after a fast pass
pub const QUALITY_UPGRADE_DELAY: Duration = Duration::from_millis(600);

/// Delay before recentring after a layout mode switch
pub const MODE_SWITCH_RECENTER_DELAY: Duration = Duration::from_millis(50);

/// Debounce timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    /// Not armed
    Idle,

    /// Waiting for the deadline
    Armed { deadline: Instant },

    /// Deadline reached and observed by `poll`
    Fired,
}

/// A single debounce timer
///
/// # Example
///
/// ```
/// use pagestream_scheduler::Debounce;
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let mut settle = Debounce::new(Duration::from_millis(120));
///
/// settle.arm(start);
/// assert!(!settle.poll(start + Duration::from_millis(100)));
///
/// // Activity restarts the window
/// settle.arm(start + Duration::from_millis(100));
/// assert!(!settle.poll(start + Duration::from_millis(200)));
/// assert!(settle.poll(start + Duration::from_millis(220)));
/// ```
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    state: DebounceState,
}

impl Debounce {
    /// Create an idle timer with the given delay
    pub fn new(delay: Duration) -> Self {
        Self { delay, state: DebounceState::Idle }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, DebounceState::Armed { .. })
    }

    /// Deadline of an armed timer
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            DebounceState::Armed { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Arm the timer, restarting the window if it was already armed
    ///
    /// A delay too long to represent as an `Instant` leaves the timer idle.
    pub fn arm(&mut self, now: Instant) {
        self.state = match now.checked_add(self.delay) {
            Some(deadline) => DebounceState::Armed { deadline },
            None => DebounceState::Idle,
        };
    }

    /// Restart the window only if the timer is currently armed
    pub fn rearm_if_armed(&mut self, now: Instant) {
        if self.is_armed() {
            self.arm(now);
        }
    }

    /// Disarm without firing
    pub fn cancel(&mut self) {
        self.state = DebounceState::Idle;
    }

    /// Advance to `now`
    ///
    /// Returns `true` exactly once per arming, when the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            DebounceState::Armed { deadline } if now >= deadline => {
                self.state = DebounceState::Fired;
                true
            }
            _ => false,
        }
    }
}
