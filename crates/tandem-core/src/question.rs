//! Question — a daily prompt with running aggregate statistics.
//!
//! Aggregates fold each new answer into the previous values; no operation
//! ever rescans the answer rows to recompute them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Running stats ───────────────────────────────────────────────────────────

/// Incrementally-maintained aggregates over all answers to one question.
///
/// `times_skipped`/`times_rated` are carried so the means and the skip rate
/// stay exact under incremental updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionStats {
  #[serde(default)]
  pub times_asked:           u64,
  #[serde(default)]
  pub times_skipped:         u64,
  #[serde(default)]
  pub times_rated:           u64,
  #[serde(default)]
  pub skip_rate:             f64,
  /// Mean text length over non-skipped answers.
  #[serde(default)]
  pub avg_response_length:   f64,
  /// Mean difficulty over answers that carried a rating.
  #[serde(default)]
  pub avg_difficulty_rating: f64,
}

impl QuestionStats {
  /// Fold one answer into the aggregates.
  pub fn absorb(
    &mut self,
    skipped: bool,
    response_length: usize,
    difficulty: Option<u8>,
  ) {
    self.times_asked += 1;
    if skipped {
      self.times_skipped += 1;
    } else {
      let answered = (self.times_asked - self.times_skipped) as f64;
      self.avg_response_length = self.avg_response_length
        + (response_length as f64 - self.avg_response_length) / answered;
    }
    self.skip_rate = self.times_skipped as f64 / self.times_asked as f64;

    if let Some(d) = difficulty {
      self.times_rated += 1;
      let rated = self.times_rated as f64;
      self.avg_difficulty_rating = self.avg_difficulty_rating
        + (f64::from(d) - self.avg_difficulty_rating) / rated;
    }
  }
}

// ─── Question ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
  pub question_id:       Uuid,
  pub text:              String,
  pub category:          String,
  pub active:            bool,
  pub min_level:         u32,
  pub max_level:         u32,
  /// `None` means the question is never repeated to the same user.
  pub repeat_after_days: Option<u32>,
  pub stats:             QuestionStats,
  pub created_at:        DateTime<Utc>,
}

// ─── NewQuestion ─────────────────────────────────────────────────────────────

/// Input to `create_question`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
  pub text:              String,
  pub category:          String,
  #[serde(default = "default_min_level")]
  pub min_level:         u32,
  #[serde(default = "default_max_level")]
  pub max_level:         u32,
  #[serde(default)]
  pub repeat_after_days: Option<u32>,
}

fn default_min_level() -> u32 { 1 }
fn default_max_level() -> u32 { crate::partnership::MAX_LEVEL }
