use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Time state of a running attempt, derived purely from the stored start
/// time and the current wall clock. No timer process exists anywhere;
/// expiry is recomputed like this on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBudget {
    pub time_used: i64,
    pub time_remaining: i64,
}

impl TimeBudget {
    pub fn has_time_left(&self) -> bool {
        self.time_remaining > 0
    }
}

pub fn time_budget(
    now: DateTime<Utc>,
    started_at: DateTime<Utc>,
    duration_minutes: i32,
) -> TimeBudget {
    let total = i64::from(duration_minutes) * 60;
    let elapsed = (now - started_at).num_seconds().max(0);
    TimeBudget {
        time_used: elapsed.min(total),
        time_remaining: (total - elapsed).max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn fresh_attempt_has_full_budget() {
        let start = Utc::now();
        let budget = time_budget(start, start, 10);
        assert_eq!(budget.time_used, 0);
        assert_eq!(budget.time_remaining, 600);
        assert!(budget.has_time_left());
    }

    #[test]
    fn expired_attempt_reports_zero_remaining() {
        let start = Utc::now();
        let now = start + Duration::minutes(11);
        let budget = time_budget(now, start, 10);
        assert_eq!(budget.time_remaining, 0);
        assert_eq!(budget.time_used, 600);
        assert!(!budget.has_time_left());
    }

    #[test]
    fn partial_use_splits_the_budget() {
        let start = Utc::now();
        let now = start + Duration::seconds(90);
        let budget = time_budget(now, start, 10);
        assert_eq!(budget.time_used, 90);
        assert_eq!(budget.time_remaining, 510);
    }

    #[test]
    fn clock_skew_before_start_counts_as_unused() {
        let start = Utc::now();
        let now = start - Duration::seconds(5);
        let budget = time_budget(now, start, 10);
        assert_eq!(budget.time_used, 0);
        assert_eq!(budget.time_remaining, 600);
    }
}
