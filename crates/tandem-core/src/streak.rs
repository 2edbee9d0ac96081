//! Streak engine — pure calendar-day arithmetic, no clock access.
//!
//! Callers pass the observation day explicitly so the same code path serves
//! live traffic and tests alike.

use chrono::NaiveDate;

/// Result of advancing a streak by one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakUpdate {
  pub streak:  u32,
  pub longest: u32,
}

/// Advance a day streak given the previous qualifying day.
///
/// - no previous day: the streak starts at 1;
/// - exactly one day later: the streak increments;
/// - the same day: unchanged (same-day repeats do not double-count);
/// - any other gap: reset to 1.
///
/// `longest` never decreases.
pub fn advance(
  previous: Option<NaiveDate>,
  today: NaiveDate,
  current: u32,
  longest: u32,
) -> StreakUpdate {
  let streak = match previous {
    None => 1,
    Some(prev) => match today.signed_duration_since(prev).num_days() {
      0 => current,
      1 => current + 1,
      _ => 1,
    },
  };

  StreakUpdate { streak, longest: longest.max(streak) }
}

/// Count the consecutive run of non-skipped days ending at `today`.
///
/// `days` is ordered most-recent-first, one entry per calendar day, with the
/// flag marking a day whose only activity was a skip. The walk halts at the
/// first skip or at the first gap in the expected consecutive sequence.
pub fn answer_run(days: &[(NaiveDate, bool)], today: NaiveDate) -> u32 {
  let mut expected = today;
  let mut run = 0u32;

  for &(day, skipped) in days {
    if day > expected {
      // Stale duplicate ahead of the cursor; ignore.
      continue;
    }
    if day < expected {
      break;
    }
    if skipped {
      break;
    }
    run += 1;
    expected = match expected.pred_opt() {
      Some(d) => d,
      None => break,
    };
  }

  run
}

#[cfg(test)]
mod tests {
  use super::*;

  fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Days::new(n as u64)
  }

  #[test]
  fn first_interaction_starts_at_one() {
    let up = advance(None, day(0), 0, 0);
    assert_eq!(up, StreakUpdate { streak: 1, longest: 1 });
  }

  #[test]
  fn next_day_increments() {
    let up = advance(Some(day(4)), day(5), 5, 5);
    assert_eq!(up.streak, 6);
    assert_eq!(up.longest, 6);
  }

  #[test]
  fn same_day_is_unchanged() {
    let up = advance(Some(day(4)), day(4), 5, 9);
    assert_eq!(up.streak, 5);
    assert_eq!(up.longest, 9);
  }

  #[test]
  fn gap_resets_to_one() {
    let up = advance(Some(day(4)), day(7), 5, 9);
    assert_eq!(up.streak, 1);
    assert_eq!(up.longest, 9);
  }

  #[test]
  fn longest_never_decreases() {
    for (prev, today, current) in [
      (Some(day(1)), day(2), 3u32),
      (Some(day(1)), day(9), 3),
      (None, day(9), 0),
    ] {
      let up = advance(prev, today, current, 50);
      assert_eq!(up.longest, 50);
    }
  }

  #[test]
  fn answer_run_counts_back_from_today() {
    let days = vec![
      (day(10), false),
      (day(9), false),
      (day(8), false),
      (day(6), false), // gap at day 7
    ];
    assert_eq!(answer_run(&days, day(10)), 3);
  }

  #[test]
  fn answer_run_halts_at_skip() {
    let days = vec![(day(10), false), (day(9), true), (day(8), false)];
    assert_eq!(answer_run(&days, day(10)), 1);
  }

  #[test]
  fn answer_run_zero_when_no_entry_today() {
    let days = vec![(day(8), false)];
    assert_eq!(answer_run(&days, day(10)), 0);
    assert_eq!(answer_run(&[], day(10)), 0);
  }
}
