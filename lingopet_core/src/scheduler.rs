//! Spaced-repetition scheduling for graded recalls.
//!
//! Mastery progression rules:
//! - A correct recall moves the word up one level, capped at the table length
//! - Level `n` waits `intervals[n - 1]` days before the word is due again
//! - A failed recall resets the word to level 0 and makes it due immediately
//!
//! The reset on failure is a full reset, not a step back by one level.

use chrono::{DateTime, Duration, Utc};

/// Days until next review for mastery levels 1..=5
pub const DEFAULT_INTERVALS_DAYS: [u32; 5] = [1, 3, 7, 14, 30];

/// Result of scheduling a graded recall
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleUpdate {
    pub new_level: i32,
    pub next_review_date: DateTime<Utc>,
}

/// Highest mastery level reachable with this interval table
pub fn max_level(intervals_days: &[u32]) -> i32 {
    intervals_days.len() as i32
}

/// Compute the new mastery level and next review date after a recall
///
/// Negative levels are treated as 0 and levels past the table are clamped,
/// so this never fails. An empty table behaves like a single one-day interval.
pub fn calc_next_review(
    intervals_days: &[u32],
    current_level: i32,
    was_correct: bool,
    now: DateTime<Utc>,
) -> ScheduleUpdate {
    if !was_correct {
        tracing::debug!("Recall failed at level {}, resetting to 0", current_level);
        return ScheduleUpdate {
            new_level: 0,
            next_review_date: now,
        };
    }

    let cap = max_level(intervals_days).max(1);
    let current = current_level.clamp(0, cap);
    let new_level = (current + 1).min(cap);

    let index = (new_level - 1).max(0) as usize;
    let days = intervals_days.get(index).copied().unwrap_or(1);

    tracing::debug!(
        "Recall correct: level {} -> {}, next review in {} days",
        current_level,
        new_level,
        days
    );

    // Saturate rather than overflow for absurdly long intervals
    let next_review_date = now
        .checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    ScheduleUpdate {
        new_level,
        next_review_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 8, 30, 0).unwrap()
    }

    fn next(level: i32, correct: bool) -> ScheduleUpdate {
        calc_next_review(&DEFAULT_INTERVALS_DAYS, level, correct, now())
    }

    #[test]
    fn test_interval_progression() {
        let expected = [(0, 1, 1), (1, 2, 3), (2, 3, 7), (3, 4, 14), (4, 5, 30)];
        for (level, new_level, days) in expected {
            let update = next(level, true);
            assert_eq!(update.new_level, new_level, "from level {}", level);
            assert_eq!(update.next_review_date, now() + Duration::days(days));
        }
    }

    #[test]
    fn test_capped_at_top_interval() {
        let update = next(5, true);
        assert_eq!(update.new_level, 5);
        assert_eq!(update.next_review_date, now() + Duration::days(30));

        // Repeated success never climbs past the cap
        let mut level = 5;
        for _ in 0..10 {
            level = next(level, true).new_level;
            assert_eq!(level, 5);
        }
    }

    #[test]
    fn test_level_beyond_table_clamps() {
        let update = next(42, true);
        assert_eq!(update.new_level, 5);
        assert_eq!(update.next_review_date, now() + Duration::days(30));
    }

    #[test]
    fn test_negative_level_treated_as_zero() {
        let update = next(-3, true);
        assert_eq!(update.new_level, 1);
        assert_eq!(update.next_review_date, now() + Duration::days(1));
    }

    #[test]
    fn test_failure_resets_fully() {
        for level in [-1, 0, 1, 3, 5, 9] {
            let update = next(level, false);
            assert_eq!(update.new_level, 0);
            assert_eq!(update.next_review_date, now());
        }
    }

    #[test]
    fn test_success_never_decreases_level() {
        for level in 0..=7 {
            let update = next(level, true);
            assert!(update.new_level >= level.min(5));
            assert!(update.new_level <= 5);
        }
    }

    #[test]
    fn test_custom_table() {
        let table = [2, 5];
        let update = calc_next_review(&table, 1, true, now());
        assert_eq!(update.new_level, 2);
        assert_eq!(update.next_review_date, now() + Duration::days(5));
        assert_eq!(max_level(&table), 2);
    }

    #[test]
    fn test_huge_interval_saturates() {
        let table = [1, 100_000_000];
        let update = calc_next_review(&table, 1, true, now());
        assert_eq!(update.new_level, 2);
        assert_eq!(update.next_review_date, DateTime::<Utc>::MAX_UTC);

        let update = calc_next_review(&[u32::MAX], 0, true, now());
        assert_eq!(update.next_review_date, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_empty_table_does_not_panic() {
        let update = calc_next_review(&[], 0, true, now());
        assert_eq!(update.new_level, 1);
        assert_eq!(update.next_review_date, now() + Duration::days(1));
    }
}
