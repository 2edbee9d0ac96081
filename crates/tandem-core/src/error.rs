//! Error taxonomy for `tandem-core`.
//!
//! Variants fall into the classes the orchestrator treats differently:
//! validation (surfaced with field detail, never retried), integrity
//! (fatal bugs, logged loudly), conflicts, not-found, and infrastructure.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  // ── Validation ────────────────────────────────────────────────────────
  #[error("validation failed on `{field}`: {message}")]
  Validation {
    field:   &'static str,
    message: String,
  },

  #[error("a user cannot partner with themselves")]
  SelfRelationship,

  // ── Conflicts ─────────────────────────────────────────────────────────
  #[error("partnership between {user_id} and {partner_id} already exists")]
  DuplicateRelationship { user_id: Uuid, partner_id: Uuid },

  #[error("user {user_id} already has an answer on record for question {question_id}")]
  AlreadyAnswered { user_id: Uuid, question_id: Uuid },

  // ── Integrity ─────────────────────────────────────────────────────────
  /// The mirrored reverse row for a partnership is gone. This is a
  /// data-integrity violation; the missing row is never silently recreated.
  #[error("reverse partnership row missing for {0}")]
  ReverseRelationshipMissing(Uuid),

  #[error("unknown achievement type: {0:?}")]
  UnknownAchievementType(String),

  // ── Not found ─────────────────────────────────────────────────────────
  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("partnership not found: {0}")]
  PartnershipNotFound(Uuid),

  #[error("question not found: {0}")]
  QuestionNotFound(Uuid),

  #[error("answer not found: {0}")]
  AnswerNotFound(Uuid),

  // ── Preconditions ─────────────────────────────────────────────────────
  #[error("user {0} is not active")]
  UserInactive(Uuid),

  #[error("question {0} is not active")]
  QuestionInactive(Uuid),

  #[error("user level {level} outside question range {min}..={max}")]
  LevelOutOfRange { level: u32, min: u32, max: u32 },

  // ── Infrastructure ────────────────────────────────────────────────────
  #[error("operation deadline exceeded; transaction rolled back")]
  DeadlineExceeded,

  #[error("storage error: {0}")]
  Storage(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Shorthand for a field-level validation error.
  pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
    Self::Validation { field, message: message.into() }
  }

  /// Integrity errors are bugs, not operational conditions. Callers log them
  /// at `error` level and never attempt a repair.
  pub fn is_integrity(&self) -> bool {
    matches!(
      self,
      Self::ReverseRelationshipMissing(_) | Self::UnknownAchievementType(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
