//! The `PartnershipStore` trait and the composite result types its
//! transactional operations return.
//!
//! The trait is implemented by storage backends (e.g. `tandem-store-sqlite`).
//! Every method that touches more than one row is a single atomic
//! transaction in the backend; partial application is a bug, not a degraded
//! state. The orchestrator depends on this abstraction, not on any backend.

use std::{
  collections::{BTreeMap, BTreeSet},
  future::Future,
  time::{Duration, Instant},
};

use serde::Serialize;
use uuid::Uuid;

use crate::{
  achievement::AchievementKind,
  answer::{Answer, NewAnswer},
  interaction::{Interaction, NewInteraction},
  partnership::{Partnership, PartnershipSettings, PartnershipStatus},
  question::{NewQuestion, Question},
  user::{NewUser, User},
};

// ─── Deadline ────────────────────────────────────────────────────────────────

/// A caller-supplied deadline for a composed transaction. The backend
/// re-checks it between steps and before commit; expiry rolls the whole
/// transaction back.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(pub Instant);

impl Deadline {
  pub fn after(d: Duration) -> Self { Self(Instant::now() + d) }

  pub fn expired(&self) -> bool { Instant::now() >= self.0 }
}

// ─── Composite results ───────────────────────────────────────────────────────

/// One achievement granted to one user, with the points credited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GrantedAchievement {
  pub user_id: Uuid,
  pub kind:    AchievementKind,
  pub points:  u64,
}

/// Both mirrored rows of a freshly created partnership.
#[derive(Debug, Clone, Serialize)]
pub struct PartnershipPair {
  pub forward: Partnership,
  pub reverse: Partnership,
}

/// Result of a status change: the updated forward row, the appended
/// `status_change` ledger entry, and any achievements granted.
#[derive(Debug, Clone, Serialize)]
pub struct StatusOutcome {
  pub partnership: Partnership,
  pub interaction: Interaction,
  pub granted:     Vec<GrantedAchievement>,
}

/// Result of recording an interaction.
#[derive(Debug, Clone, Serialize)]
pub struct InteractionOutcome {
  pub interaction: Interaction,
  pub partnership: Partnership,
  pub granted:     Vec<GrantedAchievement>,
}

/// Result of submitting an answer. `partner_ids` lists the active partners
/// to notify; the store computes it inside the same transaction.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
  pub answer:      Answer,
  pub granted:     Vec<GrantedAchievement>,
  pub partner_ids: Vec<Uuid>,
}

/// Answer totals reported by [`PartnershipStatsView`].
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AnswerBreakdown {
  /// Answers recorded by either member.
  pub total:   u64,
  pub skipped: u64,
  /// `answer_shared` ledger entries for the pair.
  pub shared:  u64,
}

/// Read-only rollup for one partnership.
#[derive(Debug, Clone, Serialize)]
pub struct PartnershipStatsView {
  pub partnership_id:        Uuid,
  pub status:                PartnershipStatus,
  pub level:                 u32,
  pub streak_days:           u32,
  pub longest_streak:        u32,
  pub total_interactions:    u64,
  pub days_connected:        i64,
  pub achievements:          BTreeSet<String>,
  /// Ledger entry counts keyed by interaction-type discriminant.
  pub interaction_breakdown: BTreeMap<String, u64>,
  pub answer_breakdown:      AnswerBreakdown,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Tandem storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (tokio with `axum`).
pub trait PartnershipStore: Send + Sync {
  type Error: std::error::Error
    + Into<crate::Error>
    + Send
    + Sync
    + 'static;

  // ── Users & questions ─────────────────────────────────────────────────

  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn create_question(
    &self,
    input: NewQuestion,
  ) -> impl Future<Output = Result<Question, Self::Error>> + Send + '_;

  fn get_question(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Question>, Self::Error>> + Send + '_;

  // ── Partnerships ──────────────────────────────────────────────────────

  /// Insert the forward and mirrored reverse rows in one transaction. Both
  /// start with identical status, level, and settings.
  fn create_partnership(
    &self,
    user_id: Uuid,
    partner_id: Uuid,
    status: PartnershipStatus,
  ) -> impl Future<Output = Result<PartnershipPair, Self::Error>> + Send + '_;

  fn get_partnership(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Partnership>, Self::Error>> + Send + '_;

  /// Update both mirrored rows, append a `status_change` ledger entry, and
  /// evaluate status/level achievements for both members — one transaction.
  /// A missing reverse row aborts with `ReverseRelationshipMissing`.
  fn update_status(
    &self,
    partnership_id: Uuid,
    new_status: PartnershipStatus,
    reason: Option<String>,
  ) -> impl Future<Output = Result<StatusOutcome, Self::Error>> + Send + '_;

  /// Propagate identical settings to both mirrored rows.
  fn update_settings(
    &self,
    partnership_id: Uuid,
    settings: PartnershipSettings,
  ) -> impl Future<Output = Result<Partnership, Self::Error>> + Send + '_;

  /// Composed write: ledger insert, pair counters and streak, both
  /// members' personal counters, achievement evaluation. One transaction.
  fn record_interaction(
    &self,
    partnership_id: Uuid,
    input: NewInteraction,
    deadline: Option<Deadline>,
  ) -> impl Future<Output = Result<InteractionOutcome, Self::Error>> + Send + '_;

  // ── Answers ───────────────────────────────────────────────────────────

  /// Ordered precondition checks, then answer insert plus user and question
  /// aggregate updates plus answer achievements — one transaction.
  fn submit_answer(
    &self,
    user_id: Uuid,
    question_id: Uuid,
    input: NewAnswer,
  ) -> impl Future<Output = Result<AnswerOutcome, Self::Error>> + Send + '_;

  /// Append a reaction token to an answer.
  fn add_reaction(
    &self,
    answer_id: Uuid,
    reaction: String,
  ) -> impl Future<Output = Result<Answer, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn partnership_stats(
    &self,
    partnership_id: Uuid,
  ) -> impl Future<Output = Result<PartnershipStatsView, Self::Error>> + Send + '_;

  /// The pair's ledger entries, most recent first, capped at `limit`.
  fn interaction_history(
    &self,
    partnership_id: Uuid,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<Interaction>, Self::Error>> + Send + '_;
}
