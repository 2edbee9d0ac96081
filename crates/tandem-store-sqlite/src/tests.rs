//! Integration tests against an in-memory store, with an injected clock so
//! calendar-day behaviour (streaks, daily caps, repeat windows) is exact.

use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

use chrono::{DateTime, TimeZone as _, Utc};
use serde_json::json;
use uuid::Uuid;

use tandem_core::{
  achievement::AchievementKind,
  answer::NewAnswer,
  interaction::{InteractionKind, NewInteraction},
  notify::{DispatchPolicy, NotificationSink, SinkError},
  orchestrator::Orchestrator,
  partnership::PartnershipStatus,
  question::NewQuestion,
  store::{Deadline, PartnershipStore as _},
  user::NewUser,
};

use crate::{Clock, Error, SqliteStore};

// ─── Fixtures ────────────────────────────────────────────────────────────────

/// Noon UTC on the given day of March 2026.
fn noon(day: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
}

/// A store whose clock reads the shared handle, starting at `noon(1)`.
async fn clocked_store() -> (SqliteStore, Arc<Mutex<DateTime<Utc>>>) {
  let handle = Arc::new(Mutex::new(noon(1)));
  let reader = handle.clone();
  let clock: Clock = Arc::new(move || *reader.lock().unwrap());
  let store = SqliteStore::open_in_memory().await.unwrap().with_clock(clock);
  (store, handle)
}

fn set_day(handle: &Mutex<DateTime<Utc>>, day: u32) {
  *handle.lock().unwrap() = noon(day);
}

async fn two_users(store: &SqliteStore) -> (Uuid, Uuid) {
  let a = store
    .create_user(NewUser { display_name: "Ada".into() })
    .await
    .unwrap();
  let b = store
    .create_user(NewUser { display_name: "Blaise".into() })
    .await
    .unwrap();
  (a.user_id, b.user_id)
}

fn message() -> NewInteraction {
  NewInteraction::new(InteractionKind::Message, json!({ "text": "hello" }))
}

fn question_input() -> NewQuestion {
  NewQuestion {
    text:              "What made you smile today?".into(),
    category:          "gratitude".into(),
    min_level:         1,
    max_level:         100,
    repeat_after_days: None,
  }
}

async fn core_err(result: Result<impl Sized, Error>) -> tandem_core::Error {
  match result {
    Err(Error::Core(e)) => e,
    Err(other) => panic!("expected a core error, got {other:?}"),
    Ok(_) => panic!("expected an error"),
  }
}

// ─── Partnership creation ────────────────────────────────────────────────────

#[tokio::test]
async fn mirrored_rows_share_pair_state() {
  let (store, _) = clocked_store().await;
  let (a, b) = two_users(&store).await;

  let pair = store
    .create_partnership(a, b, PartnershipStatus::Pending)
    .await
    .unwrap();

  assert_eq!(pair.forward.user_id, a);
  assert_eq!(pair.forward.partner_id, b);
  assert_eq!(pair.reverse.user_id, b);
  assert_eq!(pair.reverse.partner_id, a);
  assert_eq!(pair.forward.pair_id, pair.reverse.pair_id);
  assert_ne!(pair.forward.partnership_id, pair.reverse.partnership_id);
  assert_eq!(pair.forward.status, PartnershipStatus::Pending);
  assert_eq!(pair.forward.custom_settings, pair.reverse.custom_settings);

  // Both halves are addressable rows.
  for id in [pair.forward.partnership_id, pair.reverse.partnership_id] {
    assert!(store.get_partnership(id).await.unwrap().is_some());
  }
}

#[tokio::test]
async fn self_partnership_is_rejected() {
  let (store, _) = clocked_store().await;
  let (a, _) = two_users(&store).await;

  let err = store
    .create_partnership(a, a, PartnershipStatus::Pending)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(tandem_core::Error::SelfRelationship)));
}

#[tokio::test]
async fn duplicate_partnership_is_rejected() {
  let (store, _) = clocked_store().await;
  let (a, b) = two_users(&store).await;

  store
    .create_partnership(a, b, PartnershipStatus::Pending)
    .await
    .unwrap();
  let err =
    core_err(store.create_partnership(a, b, PartnershipStatus::Pending).await)
      .await;
  assert!(matches!(
    err,
    tandem_core::Error::DuplicateRelationship { user_id, partner_id }
      if user_id == a && partner_id == b
  ));
}

#[tokio::test]
async fn partnership_requires_existing_users() {
  let (store, _) = clocked_store().await;
  let ghost = Uuid::new_v4();
  let other = Uuid::new_v4();

  let err =
    core_err(store.create_partnership(ghost, other, Default::default()).await)
      .await;
  assert!(matches!(err, tandem_core::Error::UserNotFound(id) if id == ghost));
}

// ─── Interactions ────────────────────────────────────────────────────────────

#[tokio::test]
async fn interaction_updates_both_rows_and_both_users() {
  let (store, _) = clocked_store().await;
  let (a, b) = two_users(&store).await;
  let pair = store
    .create_partnership(a, b, PartnershipStatus::Active)
    .await
    .unwrap();

  let outcome = store
    .record_interaction(pair.forward.partnership_id, message(), None)
    .await
    .unwrap();

  assert_eq!(outcome.partnership.interaction_count, 1);
  assert_eq!(outcome.partnership.streak_days, 1);
  assert_eq!(outcome.partnership.stats.messages_sent, 1);

  let reverse = store
    .get_partnership(pair.reverse.partnership_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(reverse.interaction_count, 1);
  assert_eq!(reverse.streak_days, 1);
  assert_eq!(reverse.stats.messages_sent, 1);

  for id in [a, b] {
    let user = store.get_user(id).await.unwrap().unwrap();
    assert_eq!(user.interaction_count, 1);
    assert_eq!(user.stats.total_interactions, 1);
    assert_eq!(user.stats.by_type.get("message"), Some(&1));
    assert_eq!(user.stats.monthly_activity.get("2026-03"), Some(&1));
    // first_interaction (10) + partnership_formed (20), each granted once.
    assert_eq!(user.points, 30);
  }

  let kinds: Vec<_> = outcome.granted.iter().map(|g| g.kind).collect();
  assert!(kinds.contains(&AchievementKind::FirstInteraction));
  assert!(kinds.contains(&AchievementKind::PartnershipFormed));
}

#[tokio::test]
async fn streak_advances_across_days_and_grants_week_streak() {
  let (store, clock) = clocked_store().await;
  let (a, b) = two_users(&store).await;
  let pair = store
    .create_partnership(a, b, PartnershipStatus::Active)
    .await
    .unwrap();

  let mut last = None;
  for day in 1..=7 {
    set_day(&clock, day);
    last = Some(
      store
        .record_interaction(pair.forward.partnership_id, message(), None)
        .await
        .unwrap(),
    );
  }

  let outcome = last.unwrap();
  assert_eq!(outcome.partnership.streak_days, 7);
  assert_eq!(outcome.partnership.longest_streak, 7);
  assert!(outcome.partnership.achievements.contains("week_streak"));
  assert!(
    outcome
      .granted
      .iter()
      .any(|g| g.kind == AchievementKind::WeekStreak && g.user_id == a)
  );

  // first_interaction + partnership_formed + week_streak, once each.
  let user = store.get_user(a).await.unwrap().unwrap();
  assert_eq!(user.points, 10 + 20 + 50);
}

#[tokio::test]
async fn gap_resets_streak_but_longest_survives() {
  let (store, clock) = clocked_store().await;
  let (a, b) = two_users(&store).await;
  let pair = store
    .create_partnership(a, b, PartnershipStatus::Active)
    .await
    .unwrap();

  for day in [1, 2, 5] {
    set_day(&clock, day);
    store
      .record_interaction(pair.forward.partnership_id, message(), None)
      .await
      .unwrap();
  }

  let row = store
    .get_partnership(pair.forward.partnership_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(row.streak_days, 1);
  assert_eq!(row.longest_streak, 2);
}

#[tokio::test]
async fn same_day_interactions_do_not_inflate_the_streak() {
  let (store, _) = clocked_store().await;
  let (a, b) = two_users(&store).await;
  let pair = store
    .create_partnership(a, b, PartnershipStatus::Active)
    .await
    .unwrap();

  for _ in 0..3 {
    store
      .record_interaction(pair.forward.partnership_id, message(), None)
      .await
      .unwrap();
  }

  let row = store
    .get_partnership(pair.forward.partnership_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(row.streak_days, 1);
  assert_eq!(row.interaction_count, 3);
}

#[tokio::test]
async fn tenth_interaction_advances_level_and_milestone() {
  let (store, _) = clocked_store().await;
  let (a, b) = two_users(&store).await;
  let pair = store
    .create_partnership(a, b, PartnershipStatus::Active)
    .await
    .unwrap();

  let mut last = None;
  for _ in 0..10 {
    last = Some(
      store
        .record_interaction(pair.forward.partnership_id, message(), None)
        .await
        .unwrap(),
    );
  }

  let row = last.unwrap().partnership;
  assert_eq!(row.interaction_count, 10);
  assert_eq!(row.partnership_level, 2);
  assert_eq!(row.last_milestone, Some(10));
  assert_eq!(row.stats.milestones_reached, 1);
  assert!(row.achievements.contains("ten_interactions"));
  assert!(row.achievements.contains("daily_five"));
}

#[tokio::test]
async fn grants_never_repeat() {
  let (store, _) = clocked_store().await;
  let (a, b) = two_users(&store).await;
  let pair = store
    .create_partnership(a, b, PartnershipStatus::Active)
    .await
    .unwrap();

  let first = store
    .record_interaction(pair.forward.partnership_id, message(), None)
    .await
    .unwrap();
  assert!(!first.granted.is_empty());
  let points_after_first = store.get_user(a).await.unwrap().unwrap().points;

  let second = store
    .record_interaction(pair.forward.partnership_id, message(), None)
    .await
    .unwrap();
  assert!(second.granted.is_empty());
  assert_eq!(
    store.get_user(a).await.unwrap().unwrap().points,
    points_after_first
  );
}

#[tokio::test]
async fn hundred_daily_interactions_reach_the_century_marks() {
  let (store, clock) = clocked_store().await;
  let (a, b) = two_users(&store).await;
  let pair = store
    .create_partnership(a, b, PartnershipStatus::Active)
    .await
    .unwrap();

  let mut last = None;
  for offset in 0..100 {
    *clock.lock().unwrap() = noon(1) + chrono::Duration::days(offset);
    last = Some(
      store
        .record_interaction(pair.forward.partnership_id, message(), None)
        .await
        .unwrap(),
    );
  }

  let outcome = last.unwrap();
  assert_eq!(outcome.partnership.interaction_count, 100);
  assert_eq!(outcome.partnership.streak_days, 100);
  assert!(outcome.partnership.longest_streak >= 100);
  assert!(outcome.partnership.achievements.contains("hundred_interactions"));
  assert!(outcome.partnership.achievements.contains("hundred_day_streak"));

  let reverse = store
    .get_partnership(pair.reverse.partnership_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(reverse.streak_days, 100);
  assert_eq!(reverse.longest_streak, outcome.partnership.longest_streak);
  assert!(reverse.achievements.contains("hundred_interactions"));

  // One grant row per member, and identical point totals for both.
  let century_rows: i64 = store
    .conn
    .call(|conn| {
      Ok(conn.query_row(
        "SELECT COUNT(*) FROM user_achievements \
         WHERE achievement_type = 'hundred_interactions'",
        [],
        |r| r.get(0),
      )?)
    })
    .await
    .unwrap();
  assert_eq!(century_rows, 2);

  let ua = store.get_user(a).await.unwrap().unwrap();
  let ub = store.get_user(b).await.unwrap().unwrap();
  assert!(ua.points > 0);
  assert_eq!(ua.points, ub.points);
}

#[tokio::test]
async fn expired_deadline_rolls_everything_back() {
  let (store, _) = clocked_store().await;
  let (a, b) = two_users(&store).await;
  let pair = store
    .create_partnership(a, b, PartnershipStatus::Active)
    .await
    .unwrap();

  let err = core_err(
    store
      .record_interaction(
        pair.forward.partnership_id,
        message(),
        Some(Deadline::after(Duration::ZERO)),
      )
      .await,
  )
  .await;
  assert!(matches!(err, tandem_core::Error::DeadlineExceeded));

  // No ledger entry, no counter movement, no grants.
  let ledger: i64 = store
    .conn
    .call(|conn| {
      Ok(conn.query_row("SELECT COUNT(*) FROM interactions", [], |r| {
        r.get(0)
      })?)
    })
    .await
    .unwrap();
  assert_eq!(ledger, 0);

  let row = store
    .get_partnership(pair.forward.partnership_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(row.interaction_count, 0);
  assert_eq!(store.get_user(a).await.unwrap().unwrap().points, 0);
}

#[tokio::test]
async fn missing_reverse_row_aborts_the_update() {
  let (store, _) = clocked_store().await;
  let (a, b) = two_users(&store).await;
  let pair = store
    .create_partnership(a, b, PartnershipStatus::Active)
    .await
    .unwrap();

  // Simulate out-of-band corruption.
  let reverse_id = pair.reverse.partnership_id.hyphenated().to_string();
  store
    .conn
    .call(move |conn| {
      conn.execute(
        "DELETE FROM partnerships WHERE partnership_id = ?1",
        rusqlite::params![reverse_id],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let err = core_err(
    store
      .update_status(
        pair.forward.partnership_id,
        PartnershipStatus::Blocked,
        None,
      )
      .await,
  )
  .await;
  assert!(err.is_integrity());
  assert!(matches!(err, tandem_core::Error::ReverseRelationshipMissing(_)));

  // The forward row is untouched.
  let row = store
    .get_partnership(pair.forward.partnership_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(row.status, PartnershipStatus::Active);
}

// ─── Status & settings ───────────────────────────────────────────────────────

#[tokio::test]
async fn status_change_appends_ledger_and_grants_formation() {
  let (store, _) = clocked_store().await;
  let (a, b) = two_users(&store).await;
  let pair = store
    .create_partnership(a, b, PartnershipStatus::Pending)
    .await
    .unwrap();

  let outcome = store
    .update_status(
      pair.forward.partnership_id,
      PartnershipStatus::Active,
      Some("accepted".into()),
    )
    .await
    .unwrap();

  assert_eq!(outcome.interaction.kind, InteractionKind::StatusChange);
  assert_eq!(outcome.interaction.content["status"], "active");
  assert_eq!(outcome.interaction.content["reason"], "accepted");
  assert!(outcome.partnership.achievements.contains("partnership_formed"));

  // Granted to both members.
  let formed: Vec<_> = outcome
    .granted
    .iter()
    .filter(|g| g.kind == AchievementKind::PartnershipFormed)
    .map(|g| g.user_id)
    .collect();
  assert!(formed.contains(&a) && formed.contains(&b));

  let reverse = store
    .get_partnership(pair.reverse.partnership_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(reverse.status, PartnershipStatus::Active);
}

#[tokio::test]
async fn settings_mirror_to_both_rows() {
  let (store, _) = clocked_store().await;
  let (a, b) = two_users(&store).await;
  let pair = store
    .create_partnership(a, b, PartnershipStatus::Active)
    .await
    .unwrap();

  let mut settings = pair.forward.custom_settings.clone();
  settings.display_preferences.theme = "midnight".into();
  settings.notification_preferences.daily_reminder = false;

  store
    .update_settings(pair.forward.partnership_id, settings.clone())
    .await
    .unwrap();

  for id in [pair.forward.partnership_id, pair.reverse.partnership_id] {
    let row = store.get_partnership(id).await.unwrap().unwrap();
    assert_eq!(row.custom_settings, settings);
  }
}

// ─── Answers ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_answer_records_everything_in_one_pass() {
  let (store, _) = clocked_store().await;
  let (a, _) = two_users(&store).await;
  let question = store.create_question(question_input()).await.unwrap();

  let outcome = store
    .submit_answer(a, question.question_id, NewAnswer::text("the rain stopped"))
    .await
    .unwrap();

  assert_eq!(outcome.answer.metadata.word_count, 3);
  assert!(!outcome.answer.skipped);
  assert!(
    outcome.granted.iter().any(|g| g.kind == AchievementKind::FirstAnswer)
  );

  let user = store.get_user(a).await.unwrap().unwrap();
  assert_eq!(user.questions_answered, 1);
  assert_eq!(user.streak_days, 1);
  assert_eq!(user.points, 10);

  let question =
    store.get_question(question.question_id).await.unwrap().unwrap();
  assert_eq!(question.stats.times_asked, 1);
  assert_eq!(question.stats.skip_rate, 0.0);
  assert_eq!(question.stats.avg_response_length, 16.0);
}

#[tokio::test]
async fn second_answer_same_day_is_rejected() {
  let (store, _) = clocked_store().await;
  let (a, _) = two_users(&store).await;
  let question = store.create_question(question_input()).await.unwrap();

  store
    .submit_answer(a, question.question_id, NewAnswer::text("once"))
    .await
    .unwrap();
  let err = core_err(
    store
      .submit_answer(a, question.question_id, NewAnswer::text("twice"))
      .await,
  )
  .await;
  assert!(matches!(
    err,
    tandem_core::Error::AlreadyAnswered { user_id, .. } if user_id == a
  ));
}

#[tokio::test]
async fn skip_resets_the_answer_streak() {
  let (store, clock) = clocked_store().await;
  let (a, _) = two_users(&store).await;
  let question = store
    .create_question(NewQuestion {
      repeat_after_days: Some(1),
      ..question_input()
    })
    .await
    .unwrap();

  set_day(&clock, 1);
  store
    .submit_answer(a, question.question_id, NewAnswer::text("yes"))
    .await
    .unwrap();
  set_day(&clock, 2);
  store
    .submit_answer(a, question.question_id, NewAnswer::skip("too tired"))
    .await
    .unwrap();

  let user = store.get_user(a).await.unwrap().unwrap();
  assert_eq!(user.streak_days, 0);
  assert_eq!(user.questions_answered, 2);

  let question =
    store.get_question(question.question_id).await.unwrap().unwrap();
  assert_eq!(question.stats.times_skipped, 1);
  assert_eq!(question.stats.skip_rate, 0.5);
}

#[tokio::test]
async fn repeat_window_blocks_until_it_elapses() {
  let (store, clock) = clocked_store().await;
  let (a, _) = two_users(&store).await;
  let question = store
    .create_question(NewQuestion {
      repeat_after_days: Some(7),
      ..question_input()
    })
    .await
    .unwrap();

  set_day(&clock, 1);
  store
    .submit_answer(a, question.question_id, NewAnswer::text("first"))
    .await
    .unwrap();

  set_day(&clock, 5);
  let err = core_err(
    store
      .submit_answer(a, question.question_id, NewAnswer::text("too soon"))
      .await,
  )
  .await;
  assert!(matches!(err, tandem_core::Error::AlreadyAnswered { .. }));

  set_day(&clock, 8);
  store
    .submit_answer(a, question.question_id, NewAnswer::text("long enough"))
    .await
    .unwrap();
}

#[tokio::test]
async fn level_gate_and_inactive_rows_are_enforced() {
  let (store, _) = clocked_store().await;
  let (a, _) = two_users(&store).await;

  let gated = store
    .create_question(NewQuestion { min_level: 5, ..question_input() })
    .await
    .unwrap();
  let err = core_err(
    store.submit_answer(a, gated.question_id, NewAnswer::text("hi")).await,
  )
  .await;
  assert!(matches!(
    err,
    tandem_core::Error::LevelOutOfRange { level: 1, min: 5, max: 100 }
  ));

  let question = store.create_question(question_input()).await.unwrap();
  let q_id = question.question_id.hyphenated().to_string();
  store
    .conn
    .call(move |conn| {
      conn.execute(
        "UPDATE questions SET active = 0 WHERE question_id = ?1",
        rusqlite::params![q_id],
      )?;
      Ok(())
    })
    .await
    .unwrap();
  let err = core_err(
    store.submit_answer(a, question.question_id, NewAnswer::text("hi")).await,
  )
  .await;
  assert!(matches!(err, tandem_core::Error::QuestionInactive(_)));

  let a_id = a.hyphenated().to_string();
  store
    .conn
    .call(move |conn| {
      conn.execute(
        "UPDATE users SET active = 0 WHERE user_id = ?1",
        rusqlite::params![a_id],
      )?;
      Ok(())
    })
    .await
    .unwrap();
  let fresh = store.create_question(question_input()).await.unwrap();
  let err = core_err(
    store.submit_answer(a, fresh.question_id, NewAnswer::text("hi")).await,
  )
  .await;
  assert!(matches!(err, tandem_core::Error::UserInactive(id) if id == a));
}

#[tokio::test]
async fn answer_outcome_lists_active_partners() {
  let (store, _) = clocked_store().await;
  let (a, b) = two_users(&store).await;
  let c = store
    .create_user(NewUser { display_name: "Clia".into() })
    .await
    .unwrap()
    .user_id;

  store
    .create_partnership(a, b, PartnershipStatus::Active)
    .await
    .unwrap();
  // Pending partners are not notified.
  store
    .create_partnership(a, c, PartnershipStatus::Pending)
    .await
    .unwrap();

  let question = store.create_question(question_input()).await.unwrap();
  let outcome = store
    .submit_answer(a, question.question_id, NewAnswer::text("hi"))
    .await
    .unwrap();
  assert_eq!(outcome.partner_ids, vec![b]);
}

#[tokio::test]
async fn reactions_append_in_order() {
  let (store, _) = clocked_store().await;
  let (a, _) = two_users(&store).await;
  let question = store.create_question(question_input()).await.unwrap();
  let outcome = store
    .submit_answer(a, question.question_id, NewAnswer::text("hi"))
    .await
    .unwrap();

  store.add_reaction(outcome.answer.answer_id, "❤️".into()).await.unwrap();
  let answer = store
    .add_reaction(outcome.answer.answer_id, "laugh".into())
    .await
    .unwrap();
  assert_eq!(answer.reactions, vec!["❤️".to_owned(), "laugh".to_owned()]);

  let err =
    core_err(store.add_reaction(Uuid::new_v4(), "wave".into()).await).await;
  assert!(matches!(err, tandem_core::Error::AnswerNotFound(_)));
}

// ─── Stats view ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn stats_view_aggregates_the_ledger() {
  let (store, _) = clocked_store().await;
  let (a, b) = two_users(&store).await;
  let pair = store
    .create_partnership(a, b, PartnershipStatus::Active)
    .await
    .unwrap();

  for _ in 0..2 {
    store
      .record_interaction(pair.forward.partnership_id, message(), None)
      .await
      .unwrap();
  }
  store
    .record_interaction(
      pair.forward.partnership_id,
      NewInteraction::new(InteractionKind::AnswerShared, json!({})),
      None,
    )
    .await
    .unwrap();

  let question = store.create_question(question_input()).await.unwrap();
  store
    .submit_answer(a, question.question_id, NewAnswer::text("hi"))
    .await
    .unwrap();

  let view =
    store.partnership_stats(pair.forward.partnership_id).await.unwrap();
  assert_eq!(view.total_interactions, 3);
  assert_eq!(view.interaction_breakdown.get("message"), Some(&2));
  assert_eq!(view.interaction_breakdown.get("answer_shared"), Some(&1));
  assert_eq!(view.answer_breakdown.total, 1);
  assert_eq!(view.answer_breakdown.skipped, 0);
  assert_eq!(view.answer_breakdown.shared, 1);
  assert!(view.achievements.contains("first_interaction"));
}

#[tokio::test]
async fn history_lists_the_ledger_newest_first() {
  let (store, clock) = clocked_store().await;
  let (a, b) = two_users(&store).await;
  let pair = store
    .create_partnership(a, b, PartnershipStatus::Active)
    .await
    .unwrap();

  for day in 1..=3 {
    set_day(&clock, day);
    store
      .record_interaction(pair.forward.partnership_id, message(), None)
      .await
      .unwrap();
  }
  set_day(&clock, 4);
  store
    .update_status(
      pair.forward.partnership_id,
      PartnershipStatus::Inactive,
      None,
    )
    .await
    .unwrap();

  let all = store
    .interaction_history(pair.forward.partnership_id, 50)
    .await
    .unwrap();
  assert_eq!(all.len(), 4);
  assert_eq!(all[0].kind, InteractionKind::StatusChange);
  assert!(all.windows(2).all(|w| w[0].recorded_at >= w[1].recorded_at));

  // Either mirrored row addresses the same ledger; the limit caps it.
  let capped = store
    .interaction_history(pair.reverse.partnership_id, 2)
    .await
    .unwrap();
  assert_eq!(capped.len(), 2);
  assert_eq!(capped[0].kind, InteractionKind::StatusChange);

  let err = core_err(store.interaction_history(Uuid::new_v4(), 10).await).await;
  assert!(matches!(err, tandem_core::Error::PartnershipNotFound(_)));
}

// ─── Orchestrator over the real store ────────────────────────────────────────

struct FailingSink;

impl NotificationSink for FailingSink {
  async fn broadcast<'a>(
    &'a self,
    _topic: &'a str,
    _event: &'a str,
    _payload: serde_json::Value,
  ) -> Result<(), SinkError> {
    Err(SinkError("broker unreachable".into()))
  }
}

#[tokio::test]
async fn sink_failure_never_fails_the_operation() {
  let (store, _) = clocked_store().await;
  let (a, b) = two_users(&store).await;

  let orchestrator = Orchestrator::new(Arc::new(store), Arc::new(FailingSink))
    .with_policy(DispatchPolicy::instant());

  let pair = orchestrator
    .create_partnership(a, b, PartnershipStatus::Active)
    .await
    .unwrap();
  let outcome = orchestrator
    .record_interaction(pair.forward.partnership_id, message(), None)
    .await
    .unwrap();
  assert_eq!(outcome.partnership.interaction_count, 1);
}
