//! The partnership orchestrator — the single entry point for inbound
//! mutations.
//!
//! Composition per operation: validate input, run the store's atomic
//! transaction, then fire best-effort notifications. Notification failures
//! are swallowed by [`dispatch_best_effort`]; they can never fail the
//! operation or roll anything back.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
  Error, Result,
  answer::{Answer, NewAnswer},
  cache::{DailyMarkerCache, MemoryMarkerCache},
  interaction::{Interaction, NewInteraction},
  notify::{
    DispatchPolicy, NotificationSink, dispatch_best_effort, event, user_topic,
  },
  partnership::{Partnership, PartnershipSettings, PartnershipStatus},
  question::{NewQuestion, Question},
  store::{
    AnswerOutcome, Deadline, GrantedAchievement, InteractionOutcome,
    PartnershipPair, PartnershipStatsView, PartnershipStore, StatusOutcome,
  },
  user::{NewUser, User},
};

/// Convert a store error into the core taxonomy, logging integrity
/// violations loudly on the way through.
fn lift<E: Into<Error>>(e: E) -> Error {
  let e = e.into();
  if e.is_integrity() {
    tracing::error!(error = %e, "data integrity violation");
  }
  e
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

pub struct Orchestrator<S, N> {
  store:  Arc<S>,
  sink:   Arc<N>,
  policy: DispatchPolicy,
  cache:  Arc<dyn DailyMarkerCache>,
}

impl<S, N> Orchestrator<S, N>
where
  S: PartnershipStore,
  N: NotificationSink,
{
  pub fn new(store: Arc<S>, sink: Arc<N>) -> Self {
    Self {
      store,
      sink,
      policy: DispatchPolicy::default(),
      cache: Arc::new(MemoryMarkerCache::new()),
    }
  }

  pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_cache(mut self, cache: Arc<dyn DailyMarkerCache>) -> Self {
    self.cache = cache;
    self
  }

  // ── Notification helpers ──────────────────────────────────────────────

  async fn notify(&self, user: Uuid, event: &str, payload: serde_json::Value) {
    dispatch_best_effort(
      &*self.sink,
      &self.policy,
      &user_topic(user),
      event,
      payload,
    )
    .await;
  }

  async fn notify_grants(&self, granted: &[GrantedAchievement]) {
    for grant in granted {
      let md = grant.kind.metadata();
      self
        .notify(
          grant.user_id,
          event::ACHIEVEMENT_UNLOCKED,
          json!({
            "achievement": grant.kind.discriminant(),
            "title": md.title,
            "points": grant.points,
          }),
        )
        .await;
    }
  }

  // ── Partnerships ──────────────────────────────────────────────────────

  /// Create the mirrored pair. Fails with `SelfRelationship` before any
  /// store access when both IDs match; the partner notification is
  /// best-effort and never fails the create.
  pub async fn create_partnership(
    &self,
    user_id: Uuid,
    partner_id: Uuid,
    status: PartnershipStatus,
  ) -> Result<PartnershipPair> {
    if user_id == partner_id {
      return Err(Error::SelfRelationship);
    }

    let pair = self
      .store
      .create_partnership(user_id, partner_id, status)
      .await
      .map_err(lift)?;

    self
      .notify(
        partner_id,
        event::PARTNERSHIP_CREATED,
        json!({
          "pair_id": pair.forward.pair_id,
          "from": user_id,
          "status": status.discriminant(),
        }),
      )
      .await;

    Ok(pair)
  }

  pub async fn get_partnership(&self, id: Uuid) -> Result<Option<Partnership>> {
    self.store.get_partnership(id).await.map_err(lift)
  }

  pub async fn update_status(
    &self,
    partnership_id: Uuid,
    new_status: PartnershipStatus,
    reason: Option<String>,
  ) -> Result<StatusOutcome> {
    let outcome = self
      .store
      .update_status(partnership_id, new_status, reason.clone())
      .await
      .map_err(lift)?;

    let payload = json!({
      "pair_id": outcome.partnership.pair_id,
      "status": new_status.discriminant(),
      "reason": reason,
    });
    self
      .notify(outcome.partnership.user_id, event::STATUS_CHANGED, payload.clone())
      .await;
    self
      .notify(outcome.partnership.partner_id, event::STATUS_CHANGED, payload)
      .await;
    self.notify_grants(&outcome.granted).await;

    Ok(outcome)
  }

  pub async fn update_settings(
    &self,
    partnership_id: Uuid,
    settings: PartnershipSettings,
  ) -> Result<Partnership> {
    let updated = self
      .store
      .update_settings(partnership_id, settings)
      .await
      .map_err(lift)?;

    let payload = json!({ "pair_id": updated.pair_id });
    self
      .notify(updated.user_id, event::SETTINGS_UPDATED, payload.clone())
      .await;
    self
      .notify(updated.partner_id, event::SETTINGS_UPDATED, payload)
      .await;

    Ok(updated)
  }

  pub async fn record_interaction(
    &self,
    partnership_id: Uuid,
    input: NewInteraction,
    deadline: Option<Deadline>,
  ) -> Result<InteractionOutcome> {
    input.validate()?;

    let outcome = self
      .store
      .record_interaction(partnership_id, input, deadline)
      .await
      .map_err(lift)?;

    let payload = json!({
      "pair_id": outcome.interaction.pair_id,
      "interaction_type": outcome.interaction.kind.discriminant(),
    });
    self
      .notify(outcome.partnership.user_id, event::NEW_INTERACTION, payload.clone())
      .await;
    self
      .notify(outcome.partnership.partner_id, event::NEW_INTERACTION, payload)
      .await;
    self.notify_grants(&outcome.granted).await;

    Ok(outcome)
  }

  // ── Answers ───────────────────────────────────────────────────────────

  pub async fn submit_answer(
    &self,
    user_id: Uuid,
    question_id: Uuid,
    input: NewAnswer,
  ) -> Result<AnswerOutcome> {
    input.validate()?;

    // Fast-path hint only; the store's same-day check stays authoritative.
    let today = Utc::now().date_naive();
    if self.cache.get(user_id, question_id, today) {
      return Err(Error::AlreadyAnswered { user_id, question_id });
    }

    let outcome = self
      .store
      .submit_answer(user_id, question_id, input)
      .await
      .map_err(lift)?;

    self
      .cache
      .put(user_id, question_id, outcome.answer.answered_on);
    self.cache.expire(today);

    let payload = json!({
      "question_id": question_id,
      "from": user_id,
      "skipped": outcome.answer.skipped,
    });
    for partner in &outcome.partner_ids {
      self
        .notify(*partner, event::ANSWER_SUBMITTED, payload.clone())
        .await;
    }
    self.notify_grants(&outcome.granted).await;

    Ok(outcome)
  }

  pub async fn add_reaction(
    &self,
    answer_id: Uuid,
    reaction: String,
  ) -> Result<Answer> {
    if reaction.trim().is_empty() {
      return Err(Error::validation("reaction", "must not be empty"));
    }

    let answer = self
      .store
      .add_reaction(answer_id, reaction.clone())
      .await
      .map_err(lift)?;

    self
      .notify(
        answer.user_id,
        event::REACTION_ADDED,
        json!({ "answer_id": answer.answer_id, "reaction": reaction }),
      )
      .await;

    Ok(answer)
  }

  // ── Reads & fixtures ──────────────────────────────────────────────────

  pub async fn partnership_stats(
    &self,
    partnership_id: Uuid,
  ) -> Result<PartnershipStatsView> {
    self.store.partnership_stats(partnership_id).await.map_err(lift)
  }

  pub async fn interaction_history(
    &self,
    partnership_id: Uuid,
    limit: u32,
  ) -> Result<Vec<Interaction>> {
    self
      .store
      .interaction_history(partnership_id, limit)
      .await
      .map_err(lift)
  }

  pub async fn create_user(&self, input: NewUser) -> Result<User> {
    if input.display_name.trim().is_empty() {
      return Err(Error::validation("display_name", "must not be empty"));
    }
    self.store.create_user(input).await.map_err(lift)
  }

  pub async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    self.store.get_user(id).await.map_err(lift)
  }

  pub async fn create_question(&self, input: NewQuestion) -> Result<Question> {
    if input.text.trim().is_empty() {
      return Err(Error::validation("text", "must not be empty"));
    }
    if input.min_level > input.max_level {
      return Err(Error::validation(
        "min_level",
        "must not exceed max_level",
      ));
    }
    self.store.create_question(input).await.map_err(lift)
  }

  pub async fn get_question(&self, id: Uuid) -> Result<Option<Question>> {
    self.store.get_question(id).await.map_err(lift)
  }
}
