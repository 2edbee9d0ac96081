//! Answer — a user's response to a question, optionally tied to a
//! partnership. Reactions are an append-only list on the row.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Valid range for `difficulty_rating`.
pub const DIFFICULTY_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

// ─── Visibility ──────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
  #[default]
  PartnersOnly,
  Public,
}

impl Visibility {
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::PartnersOnly => "partners_only",
      Self::Public => "public",
    }
  }

  pub fn from_discriminant(s: &str) -> Option<Self> {
    match s {
      "partners_only" => Some(Self::PartnersOnly),
      "public" => Some(Self::Public),
      _ => None,
    }
  }
}

// ─── Metadata ────────────────────────────────────────────────────────────────

/// Typed replacement for the fixed-key answer `metadata` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerMetadata {
  #[serde(default)]
  pub response_time_secs: Option<u32>,
  #[serde(default)]
  pub edited_count:       u32,
  #[serde(default)]
  pub last_edited_at:     Option<DateTime<Utc>>,
  /// Computed from `text` by the store when left at zero.
  #[serde(default)]
  pub word_count:         u32,
  #[serde(default)]
  pub language:           Option<String>,
}

// ─── Answer ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
  pub answer_id:         Uuid,
  pub user_id:           Uuid,
  pub question_id:       Uuid,
  /// The logical partnership edge this answer was shared with, if any.
  pub pair_id:           Option<Uuid>,
  pub text:              Option<String>,
  pub skipped:           bool,
  pub skip_reason:       Option<String>,
  pub visibility:        Visibility,
  /// Append-only free-text reaction tokens.
  pub reactions:         Vec<String>,
  pub difficulty_rating: Option<u8>,
  pub metadata:          AnswerMetadata,
  /// The UTC calendar day the answer was submitted.
  pub answered_on:       NaiveDate,
  pub created_at:        DateTime<Utc>,
}

// ─── NewAnswer ───────────────────────────────────────────────────────────────

/// Input to `submit_answer`. UUIDs and timestamps are store-assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAnswer {
  #[serde(default)]
  pub text:              Option<String>,
  #[serde(default)]
  pub skipped:           bool,
  #[serde(default)]
  pub skip_reason:       Option<String>,
  #[serde(default)]
  pub visibility:        Visibility,
  #[serde(default)]
  pub difficulty_rating: Option<u8>,
  #[serde(default)]
  pub metadata:          AnswerMetadata,
  #[serde(default)]
  pub pair_id:           Option<Uuid>,
}

impl NewAnswer {
  /// A non-skipped answer with the given text.
  pub fn text(text: impl Into<String>) -> Self {
    Self {
      text:              Some(text.into()),
      skipped:           false,
      skip_reason:       None,
      visibility:        Visibility::default(),
      difficulty_rating: None,
      metadata:          AnswerMetadata::default(),
      pair_id:           None,
    }
  }

  /// A skipped answer with the given reason.
  pub fn skip(reason: impl Into<String>) -> Self {
    Self {
      text:              None,
      skipped:           true,
      skip_reason:       Some(reason.into()),
      visibility:        Visibility::default(),
      difficulty_rating: None,
      metadata:          AnswerMetadata::default(),
      pair_id:           None,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.skipped {
      if self.skip_reason.as_deref().is_none_or(|r| r.trim().is_empty()) {
        return Err(Error::validation(
          "skip_reason",
          "required when the answer is skipped",
        ));
      }
    } else if self.text.as_deref().is_none_or(|t| t.trim().is_empty()) {
      return Err(Error::validation(
        "text",
        "required unless the answer is skipped",
      ));
    }

    if let Some(d) = self.difficulty_rating
      && !DIFFICULTY_RANGE.contains(&d)
    {
      return Err(Error::validation(
        "difficulty_rating",
        format!("{d} outside 1..=10"),
      ));
    }

    Ok(())
  }
}

/// Whitespace-separated word count for the stored metadata.
pub fn word_count(text: &str) -> u32 {
  text.split_whitespace().count() as u32
}
