//! Wall-clock adapter for the `Clock` port.

use chrono::{DateTime, Utc};
use httpulse_application::ports::Clock;

/// Clock backed by the system time, used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Creates a new system clock.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_tracks_wall_clock() {
        let before = Utc::now();
        let now = SystemClock::new().now();
        let after = Utc::now();

        assert!(before <= now && now <= after);
    }
}
