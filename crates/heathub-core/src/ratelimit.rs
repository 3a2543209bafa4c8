//! Per-device rate limiting for telemetry intake.
//!
//! Both limiters keep their windows in process memory only; a restart
//! resets the throttle, which simply lets the next report through early.
//!
//! Callers must run input validation first and consult the limiter only
//! once a report would otherwise be accepted: a successful `try_accept`
//! consumes budget exactly once per accepted report.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    /// Rejected; `retry_at` is the earliest instant a report can be accepted.
    Throttled { retry_at: DateTime<Utc> },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed)
    }
}

/// Accepts at most one report per device per fixed interval.
///
/// Used by the raw telemetry endpoint (30 s between reports).
#[derive(Debug)]
pub struct IntervalLimiter {
    window: Duration,
    last_accepted: HashMap<String, DateTime<Utc>>,
}

impl IntervalLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
        }
    }

    /// The interval the limiter enforces.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide on a report from `device_id` at `now`, recording the
    /// acceptance timestamp when allowed.
    pub fn try_accept(&mut self, device_id: &str, now: DateTime<Utc>) -> RateLimitDecision {
        if let Some(&last) = self.last_accepted.get(device_id) {
            if now - last < self.window {
                return RateLimitDecision::Throttled {
                    retry_at: last + self.window,
                };
            }
        }
        self.last_accepted.insert(device_id.to_string(), now);
        RateLimitDecision::Allowed
    }
}

/// Accepts at most `max_requests` reports per device within a window.
///
/// Used by the alternate device-data endpoint (10 reports per 60 s).
/// The window is fixed from its first accepted report; once it elapses a
/// fresh window starts with the next report.
#[derive(Debug)]
pub struct WindowLimiter {
    window: Duration,
    max_requests: u32,
    windows: HashMap<String, (DateTime<Utc>, u32)>,
}

impl WindowLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            windows: HashMap::new(),
        }
    }

    pub fn try_accept(&mut self, device_id: &str, now: DateTime<Utc>) -> RateLimitDecision {
        match self.windows.get_mut(device_id) {
            Some((started, count)) if now - *started < self.window => {
                if *count >= self.max_requests {
                    return RateLimitDecision::Throttled {
                        retry_at: *started + self.window,
                    };
                }
                *count += 1;
                RateLimitDecision::Allowed
            }
            _ => {
                self.windows.insert(device_id.to_string(), (now, 1));
                RateLimitDecision::Allowed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_interval_first_report_allowed() {
        let mut limiter = IntervalLimiter::new(Duration::seconds(30));
        assert!(limiter.try_accept("Room-01", at(0)).is_allowed());
    }

    #[test]
    fn test_interval_second_report_throttled() {
        let mut limiter = IntervalLimiter::new(Duration::seconds(30));
        limiter.try_accept("Room-01", at(0));

        assert_eq!(
            limiter.try_accept("Room-01", at(29)),
            RateLimitDecision::Throttled { retry_at: at(30) }
        );
    }

    #[test]
    fn test_interval_allows_after_window() {
        let mut limiter = IntervalLimiter::new(Duration::seconds(30));
        limiter.try_accept("Room-01", at(0));
        assert!(limiter.try_accept("Room-01", at(30)).is_allowed());
    }

    #[test]
    fn test_interval_devices_independent() {
        let mut limiter = IntervalLimiter::new(Duration::seconds(30));
        limiter.try_accept("Room-01", at(0));
        assert!(limiter.try_accept("Room-02", at(1)).is_allowed());
    }

    #[test]
    fn test_interval_rejection_consumes_no_budget() {
        let mut limiter = IntervalLimiter::new(Duration::seconds(30));
        limiter.try_accept("Room-01", at(0));
        limiter.try_accept("Room-01", at(29));
        // The rejected attempt must not push the window forward.
        assert!(limiter.try_accept("Room-01", at(30)).is_allowed());
    }

    #[test]
    fn test_window_allows_up_to_max() {
        let mut limiter = WindowLimiter::new(Duration::seconds(60), 10);
        for i in 0..10 {
            assert!(
                limiter.try_accept("Room-01", at(i)).is_allowed(),
                "report {i} should be allowed"
            );
        }
        assert_eq!(
            limiter.try_accept("Room-01", at(10)),
            RateLimitDecision::Throttled { retry_at: at(60) }
        );
    }

    #[test]
    fn test_window_resets_after_elapsing() {
        let mut limiter = WindowLimiter::new(Duration::seconds(60), 10);
        for i in 0..10 {
            limiter.try_accept("Room-01", at(i));
        }
        assert!(limiter.try_accept("Room-01", at(60)).is_allowed());
    }

    #[test]
    fn test_window_devices_independent() {
        let mut limiter = WindowLimiter::new(Duration::seconds(60), 1);
        limiter.try_accept("Room-01", at(0));
        assert!(limiter.try_accept("Room-02", at(0)).is_allowed());
    }
}
