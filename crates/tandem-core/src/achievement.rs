//! Achievement rules — one authoritative table, evaluated deterministically.
//!
//! Evaluation is a pure function of a metric snapshot: identical snapshots
//! always produce identical grant sets. The per-user grant ledger (not this
//! module) is the idempotency guard against double-granting.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Kind ────────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
  // ── Interaction counts ────────────────────────────────────────────────
  FirstInteraction,
  TenInteractions,
  HundredInteractions,
  ThousandInteractions,
  // ── Interaction volume ────────────────────────────────────────────────
  DailyFive,
  WeeklyTwenty,
  // ── Interaction streaks ───────────────────────────────────────────────
  WeekStreak,
  MonthStreak,
  HundredDayStreak,
  // ── Answers ───────────────────────────────────────────────────────────
  FirstAnswer,
  TenAnswers,
  HundredAnswers,
  AnswerWeekStreak,
  CategoryExplorer,
  ThoughtfulResponder,
  // ── Partnership status & level ────────────────────────────────────────
  PartnershipFormed,
  LevelTen,
  LevelFifty,
  LevelHundred,
  MonthConnected,
  YearConnected,
}

/// Rule category; each orchestrated operation evaluates only the categories
/// its metrics can affect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
  Interaction,
  Answer,
  PartnershipStatus,
}

/// Static metadata for a grant: what to show the user and what it pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Metadata {
  pub title:       &'static str,
  pub description: &'static str,
  pub points:      u64,
}

impl AchievementKind {
  pub const ALL: &'static [AchievementKind] = &[
    Self::FirstInteraction,
    Self::TenInteractions,
    Self::HundredInteractions,
    Self::ThousandInteractions,
    Self::DailyFive,
    Self::WeeklyTwenty,
    Self::WeekStreak,
    Self::MonthStreak,
    Self::HundredDayStreak,
    Self::FirstAnswer,
    Self::TenAnswers,
    Self::HundredAnswers,
    Self::AnswerWeekStreak,
    Self::CategoryExplorer,
    Self::ThoughtfulResponder,
    Self::PartnershipFormed,
    Self::LevelTen,
    Self::LevelFifty,
    Self::LevelHundred,
    Self::MonthConnected,
    Self::YearConnected,
  ];

  /// The discriminant string stored in the grant ledger and the
  /// partnership's achievement set.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::FirstInteraction => "first_interaction",
      Self::TenInteractions => "ten_interactions",
      Self::HundredInteractions => "hundred_interactions",
      Self::ThousandInteractions => "thousand_interactions",
      Self::DailyFive => "daily_five",
      Self::WeeklyTwenty => "weekly_twenty",
      Self::WeekStreak => "week_streak",
      Self::MonthStreak => "month_streak",
      Self::HundredDayStreak => "hundred_day_streak",
      Self::FirstAnswer => "first_answer",
      Self::TenAnswers => "ten_answers",
      Self::HundredAnswers => "hundred_answers",
      Self::AnswerWeekStreak => "answer_week_streak",
      Self::CategoryExplorer => "category_explorer",
      Self::ThoughtfulResponder => "thoughtful_responder",
      Self::PartnershipFormed => "partnership_formed",
      Self::LevelTen => "level_ten",
      Self::LevelFifty => "level_fifty",
      Self::LevelHundred => "level_hundred",
      Self::MonthConnected => "month_connected",
      Self::YearConnected => "year_connected",
    }
  }

  /// An unknown discriminant is an integrity error, never silently ignored.
  pub fn from_discriminant(s: &str) -> Result<Self> {
    Self::ALL
      .iter()
      .copied()
      .find(|k| k.discriminant() == s)
      .ok_or_else(|| Error::UnknownAchievementType(s.to_owned()))
  }

  pub fn category(&self) -> Category {
    match self {
      Self::FirstInteraction
      | Self::TenInteractions
      | Self::HundredInteractions
      | Self::ThousandInteractions
      | Self::DailyFive
      | Self::WeeklyTwenty
      | Self::WeekStreak
      | Self::MonthStreak
      | Self::HundredDayStreak => Category::Interaction,
      Self::FirstAnswer
      | Self::TenAnswers
      | Self::HundredAnswers
      | Self::AnswerWeekStreak
      | Self::CategoryExplorer
      | Self::ThoughtfulResponder => Category::Answer,
      Self::PartnershipFormed
      | Self::LevelTen
      | Self::LevelFifty
      | Self::LevelHundred
      | Self::MonthConnected
      | Self::YearConnected => Category::PartnershipStatus,
    }
  }

  pub fn metadata(&self) -> Metadata {
    match self {
      Self::FirstInteraction => Metadata {
        title:       "Breaking the Ice",
        description: "Record your first interaction",
        points:      10,
      },
      Self::TenInteractions => Metadata {
        title:       "Getting Acquainted",
        description: "Record 10 interactions",
        points:      25,
      },
      Self::HundredInteractions => Metadata {
        title:       "Inseparable",
        description: "Record 100 interactions",
        points:      100,
      },
      Self::ThousandInteractions => Metadata {
        title:       "A Thousand Moments",
        description: "Record 1,000 interactions",
        points:      500,
      },
      Self::DailyFive => Metadata {
        title:       "Chatterbox",
        description: "Five interactions in one day",
        points:      15,
      },
      Self::WeeklyTwenty => Metadata {
        title:       "Weekly Regular",
        description: "Twenty interactions in seven days",
        points:      30,
      },
      Self::WeekStreak => Metadata {
        title:       "Seven in a Row",
        description: "A seven-day interaction streak",
        points:      50,
      },
      Self::MonthStreak => Metadata {
        title:       "Monthly Devotion",
        description: "A thirty-day interaction streak",
        points:      150,
      },
      Self::HundredDayStreak => Metadata {
        title:       "Centurion",
        description: "A hundred-day interaction streak",
        points:      400,
      },
      Self::FirstAnswer => Metadata {
        title:       "First Words",
        description: "Answer your first question",
        points:      10,
      },
      Self::TenAnswers => Metadata {
        title:       "Opening Up",
        description: "Answer 10 questions",
        points:      25,
      },
      Self::HundredAnswers => Metadata {
        title:       "An Open Book",
        description: "Answer 100 questions",
        points:      100,
      },
      Self::AnswerWeekStreak => Metadata {
        title:       "Daily Ritual",
        description: "Answer every day for a week",
        points:      50,
      },
      Self::CategoryExplorer => Metadata {
        title:       "Explorer",
        description: "Answer questions from five categories",
        points:      40,
      },
      Self::ThoughtfulResponder => Metadata {
        title:       "Thoughtful",
        description: "Average answer length of 100 characters",
        points:      60,
      },
      Self::PartnershipFormed => Metadata {
        title:       "It Takes Two",
        description: "Activate a partnership",
        points:      20,
      },
      Self::LevelTen => Metadata {
        title:       "Level Ten",
        description: "Reach partnership level 10",
        points:      50,
      },
      Self::LevelFifty => Metadata {
        title:       "Level Fifty",
        description: "Reach partnership level 50",
        points:      200,
      },
      Self::LevelHundred => Metadata {
        title:       "Peak Partnership",
        description: "Reach partnership level 100",
        points:      500,
      },
      Self::MonthConnected => Metadata {
        title:       "One Month Strong",
        description: "Thirty days since the partnership formed",
        points:      30,
      },
      Self::YearConnected => Metadata {
        title:       "Anniversary",
        description: "A full year since the partnership formed",
        points:      300,
      },
    }
  }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Read-only aggregate metrics captured inside the evaluating transaction.
/// Fields a trigger cannot know are left at their zero values; every rule
/// requires a strictly positive metric, so absent data never fires a grant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSnapshot {
  pub total_interactions:  u64,
  pub daily_interactions:  u64,
  pub weekly_interactions: u64,
  pub current_streak:      u32,
  pub longest_streak:      u32,
  pub total_answers:       u64,
  pub answer_streak:       u32,
  pub category_count:      u64,
  pub avg_answer_length:   f64,
  pub partnership_level:   u32,
  pub days_connected:      i64,
  pub status_active:       bool,
}

impl AchievementKind {
  fn met_by(&self, m: &MetricSnapshot) -> bool {
    match self {
      Self::FirstInteraction => m.total_interactions >= 1,
      Self::TenInteractions => m.total_interactions >= 10,
      Self::HundredInteractions => m.total_interactions >= 100,
      Self::ThousandInteractions => m.total_interactions >= 1000,
      Self::DailyFive => m.daily_interactions >= 5,
      Self::WeeklyTwenty => m.weekly_interactions >= 20,
      Self::WeekStreak => m.current_streak >= 7,
      Self::MonthStreak => m.current_streak >= 30,
      Self::HundredDayStreak => m.current_streak >= 100,
      Self::FirstAnswer => m.total_answers >= 1,
      Self::TenAnswers => m.total_answers >= 10,
      Self::HundredAnswers => m.total_answers >= 100,
      Self::AnswerWeekStreak => m.answer_streak >= 7,
      Self::CategoryExplorer => m.category_count >= 5,
      Self::ThoughtfulResponder => {
        m.total_answers >= 10 && m.avg_answer_length >= 100.0
      }
      Self::PartnershipFormed => m.status_active,
      Self::LevelTen => m.partnership_level >= 10,
      Self::LevelFifty => m.partnership_level >= 50,
      Self::LevelHundred => m.partnership_level >= 100,
      Self::MonthConnected => m.days_connected >= 30,
      Self::YearConnected => m.days_connected >= 365,
    }
  }
}

// ─── Evaluation ──────────────────────────────────────────────────────────────

/// Return the achievements in `categories` whose threshold `snapshot` meets,
/// minus those whose discriminants appear in `already`.
pub fn evaluate(
  snapshot: &MetricSnapshot,
  already: &BTreeSet<String>,
  categories: &[Category],
) -> BTreeSet<AchievementKind> {
  AchievementKind::ALL
    .iter()
    .copied()
    .filter(|k| categories.contains(&k.category()))
    .filter(|k| !already.contains(k.discriminant()))
    .filter(|k| k.met_by(snapshot))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn no_prior() -> BTreeSet<String> { BTreeSet::new() }

  #[test]
  fn zero_snapshot_grants_nothing() {
    let met = evaluate(
      &MetricSnapshot::default(),
      &no_prior(),
      &[Category::Interaction, Category::Answer, Category::PartnershipStatus],
    );
    assert!(met.is_empty());
  }

  #[test]
  fn thresholds_fire_cumulatively() {
    let snapshot = MetricSnapshot {
      total_interactions: 100,
      current_streak: 8,
      ..Default::default()
    };
    let met = evaluate(&snapshot, &no_prior(), &[Category::Interaction]);
    assert!(met.contains(&AchievementKind::FirstInteraction));
    assert!(met.contains(&AchievementKind::TenInteractions));
    assert!(met.contains(&AchievementKind::HundredInteractions));
    assert!(met.contains(&AchievementKind::WeekStreak));
    assert!(!met.contains(&AchievementKind::ThousandInteractions));
    assert!(!met.contains(&AchievementKind::MonthStreak));
  }

  #[test]
  fn already_granted_kinds_are_excluded() {
    let snapshot = MetricSnapshot {
      total_interactions: 10,
      ..Default::default()
    };
    let mut already = no_prior();
    already.insert("first_interaction".to_owned());

    let met = evaluate(&snapshot, &already, &[Category::Interaction]);
    assert!(!met.contains(&AchievementKind::FirstInteraction));
    assert!(met.contains(&AchievementKind::TenInteractions));
  }

  #[test]
  fn category_filter_scopes_the_rules() {
    let snapshot = MetricSnapshot {
      total_interactions: 10,
      total_answers: 10,
      ..Default::default()
    };
    let met = evaluate(&snapshot, &no_prior(), &[Category::Answer]);
    assert!(met.contains(&AchievementKind::TenAnswers));
    assert!(!met.contains(&AchievementKind::TenInteractions));
  }

  #[test]
  fn evaluation_is_deterministic() {
    let snapshot = MetricSnapshot {
      total_interactions: 1000,
      daily_interactions: 6,
      weekly_interactions: 25,
      current_streak: 31,
      longest_streak: 31,
      partnership_level: 50,
      days_connected: 31,
      status_active: true,
      ..Default::default()
    };
    let cats =
      [Category::Interaction, Category::Answer, Category::PartnershipStatus];
    let a = evaluate(&snapshot, &no_prior(), &cats);
    let b = evaluate(&snapshot, &no_prior(), &cats);
    assert_eq!(a, b);
    assert!(a.contains(&AchievementKind::PartnershipFormed));
    assert!(a.contains(&AchievementKind::MonthConnected));
    assert!(a.contains(&AchievementKind::LevelFifty));
  }

  #[test]
  fn thoughtful_requires_a_body_of_answers() {
    let snapshot = MetricSnapshot {
      total_answers: 3,
      avg_answer_length: 500.0,
      ..Default::default()
    };
    let met = evaluate(&snapshot, &no_prior(), &[Category::Answer]);
    assert!(!met.contains(&AchievementKind::ThoughtfulResponder));
  }

  #[test]
  fn unknown_discriminant_is_an_integrity_error() {
    let err = AchievementKind::from_discriminant("golden_unicorn").unwrap_err();
    assert!(err.is_integrity());
    assert!(matches!(err, Error::UnknownAchievementType(_)));
  }

  #[test]
  fn every_kind_round_trips_and_has_metadata() {
    for &kind in AchievementKind::ALL {
      let back =
        AchievementKind::from_discriminant(kind.discriminant()).unwrap();
      assert_eq!(back, kind);
      assert!(kind.metadata().points > 0);
    }
  }
}
