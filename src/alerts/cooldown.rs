use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::models::{Metric, Tier};

// ---

/// Identifies one monitored condition, e.g. `(bedroom, tvoc, too_high)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub room: String,
    pub metric: Metric,
    pub tier: Tier,
}

impl AlertKey {
    pub fn new(room: &str, metric: Metric, tier: Tier) -> Self {
        AlertKey {
            room: room.to_string(),
            metric,
            tier,
        }
    }

    /// Alert type as shown to dashboards and written to the alert log.
    pub fn kind(&self) -> String {
        format!("{}_{}", self.metric.key(), self.tier.as_str())
    }
}

/// Last-fired instant per alert key.
///
/// Entries are never evicted; the key space is rooms × metrics × tiers.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    last_fired: HashMap<AlertKey, DateTime<Utc>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `key` may fire at `now`, and records `now` if so.
    ///
    /// A key fires when it has never fired, or when strictly more than
    /// `cooldown` has elapsed since it last did.
    pub fn should_fire(&mut self, key: &AlertKey, now: DateTime<Utc>, cooldown: Duration) -> bool {
        // ---
        let fire = match self.last_fired.get(key) {
            None => true,
            Some(last) => now.signed_duration_since(*last) > cooldown,
        };

        if fire {
            self.last_fired.insert(key.clone(), now);
        }
        fire
    }

    pub fn last_fired(&self, key: &AlertKey) -> Option<DateTime<Utc>> {
        self.last_fired.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.last_fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_fired.is_empty()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 26, 18, 0, 0).unwrap()
    }

    fn key() -> AlertKey {
        AlertKey::new("bedroom", Metric::Tvoc, Tier::TooHigh)
    }

    #[test]
    fn test_first_attempt_fires() {
        // ---
        let mut tracker = CooldownTracker::new();
        assert!(tracker.should_fire(&key(), t0(), Duration::minutes(5)));
        assert_eq!(tracker.last_fired(&key()), Some(t0()));
    }

    #[test]
    fn test_within_window_is_suppressed() {
        // ---
        let mut tracker = CooldownTracker::new();
        let window = Duration::minutes(5);

        assert!(tracker.should_fire(&key(), t0(), window));
        assert!(!tracker.should_fire(&key(), t0() + Duration::minutes(2), window));
        // exactly D later is still inside the window
        assert!(!tracker.should_fire(&key(), t0() + window, window));
        assert_eq!(tracker.last_fired(&key()), Some(t0()));
    }

    #[test]
    fn test_after_window_fires_again() {
        // ---
        let mut tracker = CooldownTracker::new();
        let window = Duration::minutes(5);
        let t1 = t0() + window + Duration::seconds(1);

        assert!(tracker.should_fire(&key(), t0(), window));
        assert!(tracker.should_fire(&key(), t1, window));
        assert_eq!(tracker.last_fired(&key()), Some(t1));
    }

    #[test]
    fn test_suppressed_attempt_does_not_extend_window() {
        // ---
        let mut tracker = CooldownTracker::new();
        let window = Duration::minutes(10);

        assert!(tracker.should_fire(&key(), t0(), window));
        assert!(!tracker.should_fire(&key(), t0() + Duration::minutes(9), window));
        assert!(tracker.should_fire(&key(), t0() + Duration::minutes(11), window));
    }

    #[test]
    fn test_keys_are_independent() {
        // ---
        let mut tracker = CooldownTracker::new();
        let window = Duration::minutes(5);
        let high = AlertKey::new("bedroom", Metric::Tvoc, Tier::High);
        let other_room = AlertKey::new("workingroom", Metric::Tvoc, Tier::TooHigh);

        assert!(tracker.should_fire(&key(), t0(), window));
        assert!(tracker.should_fire(&high, t0(), window));
        assert!(tracker.should_fire(&other_room, t0(), window));
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn test_kind_format() {
        // ---
        assert_eq!(key().kind(), "tvoc_too_high");
        assert_eq!(AlertKey::new("bedroom", Metric::Temperature, Tier::Low).kind(), "temp_low");
    }
}
