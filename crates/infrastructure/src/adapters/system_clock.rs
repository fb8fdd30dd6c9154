//! System clock adapter

use chrono::{DateTime, Utc};
use hostvar_application::ports::Clock;

/// Wall-clock time in UTC.
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
    fn now_tracks_wall_clock() {
        let before = Utc::now();
        let now = SystemClock::new().now();
        assert!(now >= before);
        assert!(now <= Utc::now());
    }

    #[test]
    fn timestamps_serialize_as_iso_8601() {
        let now = SystemClock::new().now();
        let json = serde_json::to_string(&now).unwrap_or_default();
        assert!(json.contains('T'));
        assert!(json.ends_with("Z\""));
    }
}
