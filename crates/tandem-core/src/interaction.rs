//! Interaction — an append-only fact in the partnership ledger.
//!
//! Interactions are never updated or deleted; aggregates (streaks, counts,
//! stats maps) are derived from them and from the partnership counters the
//! same transaction maintains.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Kind ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
  Message,
  AnswerShared,
  Reaction,
  Achievement,
  StatusChange,
}

impl InteractionKind {
  /// The discriminant string stored in the `interaction_type` column.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::Message => "message",
      Self::AnswerShared => "answer_shared",
      Self::Reaction => "reaction",
      Self::Achievement => "achievement",
      Self::StatusChange => "status_change",
    }
  }

  pub fn from_discriminant(s: &str) -> Option<Self> {
    match s {
      "message" => Some(Self::Message),
      "answer_shared" => Some(Self::AnswerShared),
      "reaction" => Some(Self::Reaction),
      "achievement" => Some(Self::Achievement),
      "status_change" => Some(Self::StatusChange),
      _ => None,
    }
  }
}

// ─── Interaction ─────────────────────────────────────────────────────────────

/// An immutable ledger entry. `recorded_at` is always store-assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
  pub interaction_id: Uuid,
  /// The logical edge this entry belongs to.
  pub pair_id:        Uuid,
  /// The directional row through which the entry was recorded.
  pub partnership_id: Uuid,
  pub kind:           InteractionKind,
  /// Free-form structured payload; required, never null.
  pub content:        serde_json::Value,
  pub metadata:       Option<serde_json::Value>,
  pub recorded_at:    DateTime<Utc>,
}

// ─── NewInteraction ──────────────────────────────────────────────────────────

/// Input to `record_interaction`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInteraction {
  pub kind:     InteractionKind,
  pub content:  serde_json::Value,
  #[serde(default)]
  pub metadata: Option<serde_json::Value>,
}

impl NewInteraction {
  pub fn new(kind: InteractionKind, content: serde_json::Value) -> Self {
    Self { kind, content, metadata: None }
  }

  pub fn validate(&self) -> Result<()> {
    if self.content.is_null() {
      return Err(Error::validation("content", "payload is required"));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kind_discriminants_round_trip() {
    for kind in [
      InteractionKind::Message,
      InteractionKind::AnswerShared,
      InteractionKind::Reaction,
      InteractionKind::Achievement,
      InteractionKind::StatusChange,
    ] {
      assert_eq!(
        InteractionKind::from_discriminant(kind.discriminant()),
        Some(kind)
      );
    }
  }

  #[test]
  fn null_content_fails_validation() {
    let input =
      NewInteraction::new(InteractionKind::Message, serde_json::Value::Null);
    assert!(matches!(
      input.validate(),
      Err(Error::Validation { field: "content", .. })
    ));
  }
}
