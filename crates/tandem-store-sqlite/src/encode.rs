//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar days as `YYYY-MM-DD`,
//! UUIDs as hyphenated lowercase strings, and structured fields (stats,
//! settings, metadata, reactions, achievement sets) as compact JSON.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use tandem_core::{
  answer::{Answer, AnswerMetadata, Visibility},
  interaction::{Interaction, InteractionKind},
  partnership::{
    Partnership, PartnershipSettings, PartnershipStats, PartnershipStatus,
  },
  question::{Question, QuestionStats},
  user::{User, UserStats},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

pub fn encode_day(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_day(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(e.to_string()))
}

// ─── Discriminants ───────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<PartnershipStatus> {
  PartnershipStatus::from_discriminant(s)
    .ok_or_else(|| Error::Decode(format!("unknown status: {s:?}")))
}

pub fn decode_kind(s: &str) -> Result<InteractionKind> {
  InteractionKind::from_discriminant(s)
    .ok_or_else(|| Error::Decode(format!("unknown interaction type: {s:?}")))
}

pub fn decode_visibility(s: &str) -> Result<Visibility> {
  Visibility::from_discriminant(s)
    .ok_or_else(|| Error::Decode(format!("unknown visibility: {s:?}")))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_json<T: serde::Serialize>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_json<T: serde::de::DeserializeOwned>(s: &str) -> Result<T> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_achievements(set: &BTreeSet<String>) -> Result<String> {
  Ok(serde_json::to_string(set)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:            String,
  pub created_at:         String,
  pub display_name:       String,
  pub active:             bool,
  pub points:             i64,
  pub level:              i64,
  pub highest_level:      i64,
  pub streak_days:        i64,
  pub questions_answered: i64,
  pub interaction_count:  i64,
  pub stats:              String,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:            decode_uuid(&self.user_id)?,
      created_at:         decode_dt(&self.created_at)?,
      display_name:       self.display_name,
      active:             self.active,
      points:             self.points as u64,
      level:              self.level as u32,
      highest_level:      self.highest_level as u32,
      streak_days:        self.streak_days as u32,
      questions_answered: self.questions_answered as u64,
      interaction_count:  self.interaction_count as u64,
      stats:              decode_json::<UserStats>(&self.stats)?,
    })
  }
}

/// Raw strings read directly from a `partnerships` row.
pub struct RawPartnership {
  pub partnership_id:        String,
  pub pair_id:               String,
  pub user_id:               String,
  pub partner_id:            String,
  pub status:                String,
  pub partnership_level:     i64,
  pub streak_days:           i64,
  pub longest_streak:        i64,
  pub interaction_count:     i64,
  pub last_interaction_date: Option<String>,
  pub last_milestone:        Option<i64>,
  pub achievements:          String,
  pub mutual_answer_count:   i64,
  pub custom_settings:       String,
  pub stats:                 String,
  pub created_at:            String,
}

impl RawPartnership {
  pub fn into_partnership(self) -> Result<Partnership> {
    Ok(Partnership {
      partnership_id:        decode_uuid(&self.partnership_id)?,
      pair_id:               decode_uuid(&self.pair_id)?,
      user_id:               decode_uuid(&self.user_id)?,
      partner_id:            decode_uuid(&self.partner_id)?,
      status:                decode_status(&self.status)?,
      partnership_level:     self.partnership_level as u32,
      streak_days:           self.streak_days as u32,
      longest_streak:        self.longest_streak as u32,
      interaction_count:     self.interaction_count as u64,
      last_interaction_date: self
        .last_interaction_date
        .as_deref()
        .map(decode_day)
        .transpose()?,
      last_milestone:        self.last_milestone.map(|m| m as u64),
      achievements:          decode_json::<BTreeSet<String>>(
        &self.achievements,
      )?,
      mutual_answer_count:   self.mutual_answer_count as u64,
      custom_settings:       decode_json::<PartnershipSettings>(
        &self.custom_settings,
      )?,
      stats:                 decode_json::<PartnershipStats>(&self.stats)?,
      created_at:            decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `interactions` row.
pub struct RawInteraction {
  pub interaction_id:   String,
  pub pair_id:          String,
  pub partnership_id:   String,
  pub interaction_type: String,
  pub content:          String,
  pub metadata:         Option<String>,
  pub recorded_at:      String,
}

impl RawInteraction {
  pub fn into_interaction(self) -> Result<Interaction> {
    Ok(Interaction {
      interaction_id: decode_uuid(&self.interaction_id)?,
      pair_id:        decode_uuid(&self.pair_id)?,
      partnership_id: decode_uuid(&self.partnership_id)?,
      kind:           decode_kind(&self.interaction_type)?,
      content:        decode_json::<serde_json::Value>(&self.content)?,
      metadata:       self
        .metadata
        .as_deref()
        .map(decode_json::<serde_json::Value>)
        .transpose()?,
      recorded_at:    decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw strings read directly from a `questions` row.
pub struct RawQuestion {
  pub question_id:           String,
  pub text:                  String,
  pub category:              String,
  pub active:                bool,
  pub min_level:             i64,
  pub max_level:             i64,
  pub repeat_after_days:     Option<i64>,
  pub times_asked:           i64,
  pub times_skipped:         i64,
  pub times_rated:           i64,
  pub skip_rate:             f64,
  pub avg_response_length:   f64,
  pub avg_difficulty_rating: f64,
  pub created_at:            String,
}

impl RawQuestion {
  pub fn into_question(self) -> Result<Question> {
    Ok(Question {
      question_id:       decode_uuid(&self.question_id)?,
      text:              self.text,
      category:          self.category,
      active:            self.active,
      min_level:         self.min_level as u32,
      max_level:         self.max_level as u32,
      repeat_after_days: self.repeat_after_days.map(|d| d as u32),
      stats:             QuestionStats {
        times_asked:           self.times_asked as u64,
        times_skipped:         self.times_skipped as u64,
        times_rated:           self.times_rated as u64,
        skip_rate:             self.skip_rate,
        avg_response_length:   self.avg_response_length,
        avg_difficulty_rating: self.avg_difficulty_rating,
      },
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `answers` row.
pub struct RawAnswer {
  pub answer_id:         String,
  pub user_id:           String,
  pub question_id:       String,
  pub pair_id:           Option<String>,
  pub text:              Option<String>,
  pub skipped:           bool,
  pub skip_reason:       Option<String>,
  pub visibility:        String,
  pub reactions:         String,
  pub difficulty_rating: Option<i64>,
  pub metadata:          String,
  pub answered_on:       String,
  pub created_at:        String,
}

impl RawAnswer {
  pub fn into_answer(self) -> Result<Answer> {
    Ok(Answer {
      answer_id:         decode_uuid(&self.answer_id)?,
      user_id:           decode_uuid(&self.user_id)?,
      question_id:       decode_uuid(&self.question_id)?,
      pair_id:           self.pair_id.as_deref().map(decode_uuid).transpose()?,
      text:              self.text,
      skipped:           self.skipped,
      skip_reason:       self.skip_reason,
      visibility:        decode_visibility(&self.visibility)?,
      reactions:         decode_json::<Vec<String>>(&self.reactions)?,
      difficulty_rating: self.difficulty_rating.map(|d| d as u8),
      metadata:          decode_json::<AnswerMetadata>(&self.metadata)?,
      answered_on:       decode_day(&self.answered_on)?,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}
