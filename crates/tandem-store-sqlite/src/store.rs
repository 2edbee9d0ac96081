//! [`SqliteStore`] — the SQLite implementation of [`PartnershipStore`].
//!
//! Every composed operation is one `IMMEDIATE` transaction executed in a
//! single `conn.call` closure; domain errors raised mid-transaction travel
//! out through `tokio_rusqlite::Error::Other` and abort the whole
//! transaction via drop-rollback.

use std::{path::Path, sync::Arc};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, Transaction, TransactionBehavior};
use uuid::Uuid;

use tandem_core::{
  achievement::{self, AchievementKind, Category, MetricSnapshot},
  answer::{self, Answer, NewAnswer},
  interaction::{Interaction, InteractionKind, NewInteraction},
  partnership::{
    INTERACTIONS_PER_LEVEL, MAX_LEVEL, Partnership, PartnershipSettings,
    PartnershipStatus,
  },
  question::{NewQuestion, Question},
  store::{
    AnswerBreakdown, AnswerOutcome, Deadline, GrantedAchievement,
    InteractionOutcome, PartnershipPair, PartnershipStatsView,
    PartnershipStore, StatusOutcome,
  },
  streak,
  user::{NewUser, User, UserStats},
};

use crate::{
  Error, Result,
  encode::{
    RawAnswer, RawInteraction, RawPartnership, RawQuestion, RawUser,
    encode_achievements, encode_day, encode_dt, encode_json, encode_uuid,
  },
  schema::SCHEMA,
};

/// Injectable time source; production uses `Utc::now`.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

type TxError = tokio_rusqlite::Error;
type TxResult<T> = std::result::Result<T, TxError>;

/// Abort the enclosing transaction with a typed core error.
fn abort(e: tandem_core::Error) -> TxError { TxError::Other(Box::new(e)) }

/// Carry a store-level decode error out of a transaction closure.
fn wrap(e: Error) -> TxError { TxError::Other(Box::new(e)) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tandem store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All
/// database work runs serially on the connection's dedicated thread, which
/// combined with one-transaction-per-operation rules out interleaved
/// counter updates.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  clock:           Clock,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, clock: Arc::new(Utc::now) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, clock: Arc::new(Utc::now) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Replace the time source. Tests use this to step through calendar days.
  pub fn with_clock(mut self, clock: Clock) -> Self {
    self.clock = clock;
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Column lists ────────────────────────────────────────────────────────────

const USER_COLS: &str = "user_id, created_at, display_name, active, points, \
   level, highest_level, streak_days, questions_answered, \
   interaction_count, stats";

const PARTNERSHIP_COLS: &str = "partnership_id, pair_id, user_id, \
   partner_id, status, partnership_level, streak_days, longest_streak, \
   interaction_count, last_interaction_date, last_milestone, achievements, \
   mutual_answer_count, custom_settings, stats, created_at";

const INTERACTION_COLS: &str = "interaction_id, pair_id, partnership_id, \
   interaction_type, content, metadata, recorded_at";

const QUESTION_COLS: &str = "question_id, text, category, active, \
   min_level, max_level, repeat_after_days, times_asked, times_skipped, \
   times_rated, skip_rate, avg_response_length, avg_difficulty_rating, \
   created_at";

const ANSWER_COLS: &str = "answer_id, user_id, question_id, pair_id, text, \
   skipped, skip_reason, visibility, reactions, difficulty_rating, \
   metadata, answered_on, created_at";

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUser> {
  Ok(RawUser {
    user_id:            row.get(0)?,
    created_at:         row.get(1)?,
    display_name:       row.get(2)?,
    active:             row.get(3)?,
    points:             row.get(4)?,
    level:              row.get(5)?,
    highest_level:      row.get(6)?,
    streak_days:        row.get(7)?,
    questions_answered: row.get(8)?,
    interaction_count:  row.get(9)?,
    stats:              row.get(10)?,
  })
}

fn partnership_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawPartnership> {
  Ok(RawPartnership {
    partnership_id:        row.get(0)?,
    pair_id:               row.get(1)?,
    user_id:               row.get(2)?,
    partner_id:            row.get(3)?,
    status:                row.get(4)?,
    partnership_level:     row.get(5)?,
    streak_days:           row.get(6)?,
    longest_streak:        row.get(7)?,
    interaction_count:     row.get(8)?,
    last_interaction_date: row.get(9)?,
    last_milestone:        row.get(10)?,
    achievements:          row.get(11)?,
    mutual_answer_count:   row.get(12)?,
    custom_settings:       row.get(13)?,
    stats:                 row.get(14)?,
    created_at:            row.get(15)?,
  })
}

fn interaction_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawInteraction> {
  Ok(RawInteraction {
    interaction_id:   row.get(0)?,
    pair_id:          row.get(1)?,
    partnership_id:   row.get(2)?,
    interaction_type: row.get(3)?,
    content:          row.get(4)?,
    metadata:         row.get(5)?,
    recorded_at:      row.get(6)?,
  })
}

fn question_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawQuestion> {
  Ok(RawQuestion {
    question_id:           row.get(0)?,
    text:                  row.get(1)?,
    category:              row.get(2)?,
    active:                row.get(3)?,
    min_level:             row.get(4)?,
    max_level:             row.get(5)?,
    repeat_after_days:     row.get(6)?,
    times_asked:           row.get(7)?,
    times_skipped:         row.get(8)?,
    times_rated:           row.get(9)?,
    skip_rate:             row.get(10)?,
    avg_response_length:   row.get(11)?,
    avg_difficulty_rating: row.get(12)?,
    created_at:            row.get(13)?,
  })
}

fn answer_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAnswer> {
  Ok(RawAnswer {
    answer_id:         row.get(0)?,
    user_id:           row.get(1)?,
    question_id:       row.get(2)?,
    pair_id:           row.get(3)?,
    text:              row.get(4)?,
    skipped:           row.get(5)?,
    skip_reason:       row.get(6)?,
    visibility:        row.get(7)?,
    reactions:         row.get(8)?,
    difficulty_rating: row.get(9)?,
    metadata:          row.get(10)?,
    answered_on:       row.get(11)?,
    created_at:        row.get(12)?,
  })
}

// ─── In-transaction helpers ──────────────────────────────────────────────────

fn load_user(
  conn: &rusqlite::Connection,
  id: Uuid,
) -> TxResult<Option<User>> {
  let raw = conn
    .query_row(
      &format!("SELECT {USER_COLS} FROM users WHERE user_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      user_from_row,
    )
    .optional()?;
  raw.map(|r| r.into_user().map_err(wrap)).transpose()
}

fn load_partnership(
  conn: &rusqlite::Connection,
  id: Uuid,
) -> TxResult<Option<Partnership>> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {PARTNERSHIP_COLS} FROM partnerships WHERE partnership_id = ?1"
      ),
      rusqlite::params![encode_uuid(id)],
      partnership_from_row,
    )
    .optional()?;
  raw.map(|r| r.into_partnership().map_err(wrap)).transpose()
}

/// The mirrored row of `p`, looked up by swapped member IDs.
fn load_reverse(
  conn: &rusqlite::Connection,
  p: &Partnership,
) -> TxResult<Option<Partnership>> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {PARTNERSHIP_COLS} FROM partnerships \
         WHERE user_id = ?1 AND partner_id = ?2"
      ),
      rusqlite::params![encode_uuid(p.partner_id), encode_uuid(p.user_id)],
      partnership_from_row,
    )
    .optional()?;
  raw.map(|r| r.into_partnership().map_err(wrap)).transpose()
}

fn load_question(
  conn: &rusqlite::Connection,
  id: Uuid,
) -> TxResult<Option<Question>> {
  let raw = conn
    .query_row(
      &format!("SELECT {QUESTION_COLS} FROM questions WHERE question_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      question_from_row,
    )
    .optional()?;
  raw.map(|r| r.into_question().map_err(wrap)).transpose()
}

fn insert_partnership(tx: &Transaction<'_>, p: &Partnership) -> TxResult<()> {
  tx.execute(
    "INSERT INTO partnerships (
       partnership_id, pair_id, user_id, partner_id, status,
       partnership_level, streak_days, longest_streak, interaction_count,
       last_interaction_date, last_milestone, achievements,
       mutual_answer_count, custom_settings, stats, created_at
     ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)",
    rusqlite::params![
      encode_uuid(p.partnership_id),
      encode_uuid(p.pair_id),
      encode_uuid(p.user_id),
      encode_uuid(p.partner_id),
      p.status.discriminant(),
      p.partnership_level as i64,
      p.streak_days as i64,
      p.longest_streak as i64,
      p.interaction_count as i64,
      p.last_interaction_date.map(encode_day),
      p.last_milestone.map(|m| m as i64),
      encode_achievements(&p.achievements).map_err(wrap)?,
      p.mutual_answer_count as i64,
      encode_json(&p.custom_settings).map_err(wrap)?,
      encode_json(&p.stats).map_err(wrap)?,
      encode_dt(p.created_at),
    ],
  )?;
  Ok(())
}

/// Write the pair-level fields of one row. Called once per mirrored row
/// with identical values — the only code path that touches them.
fn write_pair_fields(tx: &Transaction<'_>, p: &Partnership) -> TxResult<()> {
  tx.execute(
    "UPDATE partnerships SET
       status = ?2, partnership_level = ?3, streak_days = ?4,
       longest_streak = ?5, interaction_count = ?6,
       last_interaction_date = ?7, last_milestone = ?8, achievements = ?9,
       mutual_answer_count = ?10, custom_settings = ?11, stats = ?12
     WHERE partnership_id = ?1",
    rusqlite::params![
      encode_uuid(p.partnership_id),
      p.status.discriminant(),
      p.partnership_level as i64,
      p.streak_days as i64,
      p.longest_streak as i64,
      p.interaction_count as i64,
      p.last_interaction_date.map(encode_day),
      p.last_milestone.map(|m| m as i64),
      encode_achievements(&p.achievements).map_err(wrap)?,
      p.mutual_answer_count as i64,
      encode_json(&p.custom_settings).map_err(wrap)?,
      encode_json(&p.stats).map_err(wrap)?,
    ],
  )?;
  Ok(())
}

fn insert_interaction(tx: &Transaction<'_>, i: &Interaction) -> TxResult<()> {
  tx.execute(
    "INSERT INTO interactions (
       interaction_id, pair_id, partnership_id, interaction_type,
       content, metadata, recorded_at
     ) VALUES (?1,?2,?3,?4,?5,?6,?7)",
    rusqlite::params![
      encode_uuid(i.interaction_id),
      encode_uuid(i.pair_id),
      encode_uuid(i.partnership_id),
      i.kind.discriminant(),
      i.content.to_string(),
      i.metadata.as_ref().map(|m| m.to_string()),
      encode_dt(i.recorded_at),
    ],
  )?;
  Ok(())
}

fn write_user_counters(tx: &Transaction<'_>, u: &User) -> TxResult<()> {
  tx.execute(
    "UPDATE users SET streak_days = ?2, questions_answered = ?3,
       interaction_count = ?4, stats = ?5
     WHERE user_id = ?1",
    rusqlite::params![
      encode_uuid(u.user_id),
      u.streak_days as i64,
      u.questions_answered as i64,
      u.interaction_count as i64,
      encode_json(&u.stats).map_err(wrap)?,
    ],
  )?;
  Ok(())
}

fn achievement_set(
  conn: &rusqlite::Connection,
  user_id: Uuid,
) -> TxResult<std::collections::BTreeSet<String>> {
  let mut stmt = conn.prepare(
    "SELECT achievement_type FROM user_achievements WHERE user_id = ?1",
  )?;
  let set = stmt
    .query_map(rusqlite::params![encode_uuid(user_id)], |r| r.get(0))?
    .collect::<rusqlite::Result<_>>()?;
  Ok(set)
}

/// Idempotent grant: `INSERT OR IGNORE` on the unique ledger key; a
/// suppressed insert is a successful no-op and awards nothing. A real
/// insert credits the user's points with a read-modify-write on the row
/// already locked by this transaction.
fn grant_achievement(
  tx: &Transaction<'_>,
  user_id: Uuid,
  kind: AchievementKind,
  now: DateTime<Utc>,
) -> TxResult<Option<GrantedAchievement>> {
  let inserted = tx.execute(
    "INSERT OR IGNORE INTO user_achievements \
       (user_id, achievement_type, granted_at) VALUES (?1, ?2, ?3)",
    rusqlite::params![
      encode_uuid(user_id),
      kind.discriminant(),
      encode_dt(now)
    ],
  )?;
  if inserted == 0 {
    return Ok(None);
  }

  let points = kind.metadata().points;
  let (cur_points, cur_highest): (i64, i64) = tx.query_row(
    "SELECT points, highest_level FROM users WHERE user_id = ?1",
    rusqlite::params![encode_uuid(user_id)],
    |r| Ok((r.get(0)?, r.get(1)?)),
  )?;

  let new_points = cur_points + points as i64;
  let new_level = i64::from(User::level_for_points(new_points as u64));
  tx.execute(
    "UPDATE users SET points = ?2, level = ?3, highest_level = ?4 \
     WHERE user_id = ?1",
    rusqlite::params![
      encode_uuid(user_id),
      new_points,
      new_level,
      cur_highest.max(new_level),
    ],
  )?;

  Ok(Some(GrantedAchievement { user_id, kind, points }))
}

/// Evaluate `categories` against `snapshot` for both members and apply the
/// grants; returns every grant that actually happened.
fn grant_for_members(
  tx: &Transaction<'_>,
  members: &[Uuid],
  snapshot: &MetricSnapshot,
  categories: &[Category],
  now: DateTime<Utc>,
) -> TxResult<Vec<GrantedAchievement>> {
  let mut granted = Vec::new();
  for &member in members {
    let already = achievement_set(tx, member)?;
    for kind in achievement::evaluate(snapshot, &already, categories) {
      if let Some(g) = grant_achievement(tx, member, kind, now)? {
        granted.push(g);
      }
    }
  }
  Ok(granted)
}

fn check_deadline(deadline: Option<Deadline>) -> TxResult<()> {
  if deadline.is_some_and(|d| d.expired()) {
    return Err(abort(tandem_core::Error::DeadlineExceeded));
  }
  Ok(())
}

// ─── PartnershipStore impl ───────────────────────────────────────────────────

impl PartnershipStore for SqliteStore {
  type Error = Error;

  // ── Users & questions ─────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:            Uuid::new_v4(),
      created_at:         (self.clock)(),
      display_name:       input.display_name,
      active:             true,
      points:             0,
      level:              1,
      highest_level:      1,
      streak_days:        0,
      questions_answered: 0,
      interaction_count:  0,
      stats:              UserStats::default(),
    };

    let id_str = encode_uuid(user.user_id);
    let at_str = encode_dt(user.created_at);
    let name = user.display_name.clone();
    let stats_str = encode_json(&user.stats)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, created_at, display_name, stats) \
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, at_str, name, stats_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    Ok(self.conn.call(move |conn| load_user(conn, id)).await?)
  }

  async fn create_question(&self, input: NewQuestion) -> Result<Question> {
    let question = Question {
      question_id:       Uuid::new_v4(),
      text:              input.text,
      category:          input.category,
      active:            true,
      min_level:         input.min_level,
      max_level:         input.max_level,
      repeat_after_days: input.repeat_after_days,
      stats:             Default::default(),
      created_at:        (self.clock)(),
    };

    let id_str = encode_uuid(question.question_id);
    let text = question.text.clone();
    let category = question.category.clone();
    let min_level = question.min_level as i64;
    let max_level = question.max_level as i64;
    let repeat = question.repeat_after_days.map(|d| d as i64);
    let at_str = encode_dt(question.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO questions (question_id, text, category, min_level, \
             max_level, repeat_after_days, created_at) \
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str, text, category, min_level, max_level, repeat, at_str
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(question)
  }

  async fn get_question(&self, id: Uuid) -> Result<Option<Question>> {
    Ok(self.conn.call(move |conn| load_question(conn, id)).await?)
  }

  // ── Partnerships ──────────────────────────────────────────────────────

  async fn create_partnership(
    &self,
    user_id: Uuid,
    partner_id: Uuid,
    status: PartnershipStatus,
  ) -> Result<PartnershipPair> {
    if user_id == partner_id {
      return Err(tandem_core::Error::SelfRelationship.into());
    }

    let now = (self.clock)();
    let pair_id = Uuid::new_v4();
    let template = Partnership {
      partnership_id:        Uuid::new_v4(),
      pair_id,
      user_id,
      partner_id,
      status,
      partnership_level:     1,
      streak_days:           0,
      longest_streak:        0,
      interaction_count:     0,
      last_interaction_date: None,
      last_milestone:        None,
      achievements:          Default::default(),
      mutual_answer_count:   0,
      custom_settings:       PartnershipSettings::default(),
      stats:                 Default::default(),
      created_at:            now,
    };
    let forward = template.clone();
    let reverse = Partnership {
      partnership_id: Uuid::new_v4(),
      user_id: partner_id,
      partner_id: user_id,
      ..template
    };

    let pair = self
      .conn
      .call(move |conn| {
        let tx =
          conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        for member in [user_id, partner_id] {
          if load_user(&tx, member)?.is_none() {
            return Err(abort(tandem_core::Error::UserNotFound(member)));
          }
        }

        let existing: Option<i64> = tx
          .query_row(
            "SELECT 1 FROM partnerships WHERE user_id = ?1 AND partner_id = ?2",
            rusqlite::params![encode_uuid(user_id), encode_uuid(partner_id)],
            |r| r.get(0),
          )
          .optional()?;
        if existing.is_some() {
          return Err(abort(tandem_core::Error::DuplicateRelationship {
            user_id,
            partner_id,
          }));
        }

        insert_partnership(&tx, &forward)?;
        insert_partnership(&tx, &reverse)?;
        tx.commit()?;
        Ok(PartnershipPair { forward, reverse })
      })
      .await?;

    Ok(pair)
  }

  async fn get_partnership(&self, id: Uuid) -> Result<Option<Partnership>> {
    Ok(self.conn.call(move |conn| load_partnership(conn, id)).await?)
  }

  async fn update_status(
    &self,
    partnership_id: Uuid,
    new_status: PartnershipStatus,
    reason: Option<String>,
  ) -> Result<StatusOutcome> {
    let now = (self.clock)();
    let today = now.date_naive();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx =
          conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut forward = load_partnership(&tx, partnership_id)?.ok_or_else(
          || abort(tandem_core::Error::PartnershipNotFound(partnership_id)),
        )?;
        let mut reverse = load_reverse(&tx, &forward)?.ok_or_else(|| {
          abort(tandem_core::Error::ReverseRelationshipMissing(partnership_id))
        })?;

        forward.status = new_status;
        reverse.status = new_status;

        let interaction = Interaction {
          interaction_id: Uuid::new_v4(),
          pair_id:        forward.pair_id,
          partnership_id: forward.partnership_id,
          kind:           InteractionKind::StatusChange,
          content:        serde_json::json!({
            "status": new_status.discriminant(),
            "reason": reason,
          }),
          metadata:       None,
          recorded_at:    now,
        };
        insert_interaction(&tx, &interaction)?;

        let snapshot = MetricSnapshot {
          partnership_level: forward.partnership_level,
          days_connected: forward.days_connected(today),
          status_active: new_status == PartnershipStatus::Active,
          ..Default::default()
        };
        let granted = grant_for_members(
          &tx,
          &[forward.user_id, forward.partner_id],
          &snapshot,
          &[Category::PartnershipStatus],
          now,
        )?;

        for grant in &granted {
          forward.achievements.insert(grant.kind.discriminant().to_owned());
          reverse.achievements.insert(grant.kind.discriminant().to_owned());
        }

        write_pair_fields(&tx, &forward)?;
        write_pair_fields(&tx, &reverse)?;
        tx.commit()?;

        Ok(StatusOutcome { partnership: forward, interaction, granted })
      })
      .await?;

    Ok(outcome)
  }

  async fn update_settings(
    &self,
    partnership_id: Uuid,
    settings: PartnershipSettings,
  ) -> Result<Partnership> {
    let updated = self
      .conn
      .call(move |conn| {
        let tx =
          conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut forward = load_partnership(&tx, partnership_id)?.ok_or_else(
          || abort(tandem_core::Error::PartnershipNotFound(partnership_id)),
        )?;
        let mut reverse = load_reverse(&tx, &forward)?.ok_or_else(|| {
          abort(tandem_core::Error::ReverseRelationshipMissing(partnership_id))
        })?;

        forward.custom_settings = settings.clone();
        reverse.custom_settings = settings;

        write_pair_fields(&tx, &forward)?;
        write_pair_fields(&tx, &reverse)?;
        tx.commit()?;

        Ok(forward)
      })
      .await?;

    Ok(updated)
  }

  async fn record_interaction(
    &self,
    partnership_id: Uuid,
    input: NewInteraction,
    deadline: Option<Deadline>,
  ) -> Result<InteractionOutcome> {
    input.validate().map_err(Error::from)?;

    let now = (self.clock)();
    let today = now.date_naive();
    let week_ago = encode_dt(now - Duration::days(7));

    let outcome = self
      .conn
      .call(move |conn| {
        check_deadline(deadline)?;
        let tx =
          conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // (1) load the pair and both member users
        let mut forward = load_partnership(&tx, partnership_id)?.ok_or_else(
          || abort(tandem_core::Error::PartnershipNotFound(partnership_id)),
        )?;
        let mut reverse = load_reverse(&tx, &forward)?.ok_or_else(|| {
          abort(tandem_core::Error::ReverseRelationshipMissing(partnership_id))
        })?;
        let mut members = Vec::with_capacity(2);
        for id in [forward.user_id, forward.partner_id] {
          members.push(
            load_user(&tx, id)?
              .ok_or_else(|| abort(tandem_core::Error::UserNotFound(id)))?,
          );
        }

        // (2) append the ledger entry
        let interaction = Interaction {
          interaction_id: Uuid::new_v4(),
          pair_id:        forward.pair_id,
          partnership_id: forward.partnership_id,
          kind:           input.kind,
          content:        input.content,
          metadata:       input.metadata,
          recorded_at:    now,
        };
        insert_interaction(&tx, &interaction)?;

        // (3) pair-level counters, streak, level milestone — mirrored
        let up = streak::advance(
          forward.last_interaction_date,
          today,
          forward.streak_days,
          forward.longest_streak,
        );
        let count = forward.interaction_count + 1;

        let mut level = forward.partnership_level;
        let mut last_milestone = forward.last_milestone;
        let mut stats = forward.stats.clone();
        if count % INTERACTIONS_PER_LEVEL == 0 && level < MAX_LEVEL {
          level += 1;
          last_milestone = Some(count);
          stats.milestones_reached += 1;
        }
        match input.kind {
          InteractionKind::Message => stats.messages_sent += 1,
          InteractionKind::AnswerShared => stats.answers_shared += 1,
          InteractionKind::Reaction => stats.reactions_given += 1,
          InteractionKind::Achievement | InteractionKind::StatusChange => {}
        }
        let mutual = forward.mutual_answer_count
          + u64::from(input.kind == InteractionKind::AnswerShared);

        for row in [&mut forward, &mut reverse] {
          row.interaction_count = count;
          row.last_interaction_date = Some(today);
          row.streak_days = up.streak;
          row.longest_streak = up.longest;
          row.partnership_level = level;
          row.last_milestone = last_milestone;
          row.stats = stats.clone();
          row.mutual_answer_count = mutual;
        }

        // (4) both members' personal counters and stats
        for user in &mut members {
          user.interaction_count += 1;
          user.stats.bump(input.kind.discriminant(), today);
          write_user_counters(&tx, user)?;
        }

        // (5) achievement evaluation on the post-update snapshot
        let daily: i64 = tx.query_row(
          "SELECT COUNT(*) FROM interactions \
           WHERE pair_id = ?1 AND substr(recorded_at, 1, 10) = ?2",
          rusqlite::params![encode_uuid(forward.pair_id), encode_day(today)],
          |r| r.get(0),
        )?;
        let weekly: i64 = tx.query_row(
          "SELECT COUNT(*) FROM interactions \
           WHERE pair_id = ?1 AND recorded_at >= ?2",
          rusqlite::params![encode_uuid(forward.pair_id), week_ago],
          |r| r.get(0),
        )?;

        let snapshot = MetricSnapshot {
          total_interactions: count,
          daily_interactions: daily as u64,
          weekly_interactions: weekly as u64,
          current_streak: up.streak,
          longest_streak: up.longest,
          partnership_level: level,
          days_connected: forward.days_connected(today),
          status_active: forward.status == PartnershipStatus::Active,
          ..Default::default()
        };
        let granted = grant_for_members(
          &tx,
          &[forward.user_id, forward.partner_id],
          &snapshot,
          &[Category::Interaction, Category::PartnershipStatus],
          now,
        )?;
        for grant in &granted {
          forward.achievements.insert(grant.kind.discriminant().to_owned());
          reverse.achievements.insert(grant.kind.discriminant().to_owned());
        }

        write_pair_fields(&tx, &forward)?;
        write_pair_fields(&tx, &reverse)?;

        // Expired deadlines roll the whole transaction back.
        check_deadline(deadline)?;
        tx.commit()?;

        Ok(InteractionOutcome { interaction, partnership: forward, granted })
      })
      .await?;

    Ok(outcome)
  }

  // ── Answers ───────────────────────────────────────────────────────────

  async fn submit_answer(
    &self,
    user_id: Uuid,
    question_id: Uuid,
    input: NewAnswer,
  ) -> Result<AnswerOutcome> {
    input.validate().map_err(Error::from)?;

    let now = (self.clock)();
    let today = now.date_naive();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx =
          conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Ordered precondition checks; all reads, no writes yet.
        let mut user = load_user(&tx, user_id)?
          .ok_or_else(|| abort(tandem_core::Error::UserNotFound(user_id)))?;
        if !user.active {
          return Err(abort(tandem_core::Error::UserInactive(user_id)));
        }

        let mut question = load_question(&tx, question_id)?.ok_or_else(
          || abort(tandem_core::Error::QuestionNotFound(question_id)),
        )?;
        if !question.active {
          return Err(abort(tandem_core::Error::QuestionInactive(question_id)));
        }

        let answered_today: Option<i64> = tx
          .query_row(
            "SELECT 1 FROM answers \
             WHERE user_id = ?1 AND question_id = ?2 AND answered_on = ?3",
            rusqlite::params![
              encode_uuid(user_id),
              encode_uuid(question_id),
              encode_day(today)
            ],
            |r| r.get(0),
          )
          .optional()?;
        if answered_today.is_some() {
          return Err(abort(tandem_core::Error::AlreadyAnswered {
            user_id,
            question_id,
          }));
        }

        if user.level < question.min_level || user.level > question.max_level {
          return Err(abort(tandem_core::Error::LevelOutOfRange {
            level: user.level,
            min:   question.min_level,
            max:   question.max_level,
          }));
        }

        let prior: Option<i64> = match question.repeat_after_days {
          // Never repeats: any prior answer rejects.
          None => tx
            .query_row(
              "SELECT 1 FROM answers \
               WHERE user_id = ?1 AND question_id = ?2 LIMIT 1",
              rusqlite::params![encode_uuid(user_id), encode_uuid(question_id)],
              |r| r.get(0),
            )
            .optional()?,
          Some(days) => tx
            .query_row(
              "SELECT 1 FROM answers \
               WHERE user_id = ?1 AND question_id = ?2 AND answered_on > ?3 \
               LIMIT 1",
              rusqlite::params![
                encode_uuid(user_id),
                encode_uuid(question_id),
                encode_day(today - Duration::days(i64::from(days))),
              ],
              |r| r.get(0),
            )
            .optional()?,
        };
        if prior.is_some() {
          return Err(abort(tandem_core::Error::AlreadyAnswered {
            user_id,
            question_id,
          }));
        }

        // All checks passed; now the writes.
        let mut metadata = input.metadata;
        if let Some(text) = input.text.as_deref()
          && metadata.word_count == 0
        {
          metadata.word_count = answer::word_count(text);
        }
        let answer = Answer {
          answer_id: Uuid::new_v4(),
          user_id,
          question_id,
          pair_id: input.pair_id,
          text: input.text,
          skipped: input.skipped,
          skip_reason: input.skip_reason,
          visibility: input.visibility,
          reactions: Vec::new(),
          difficulty_rating: input.difficulty_rating,
          metadata,
          answered_on: today,
          created_at: now,
        };
        tx.execute(
          "INSERT INTO answers (
             answer_id, user_id, question_id, pair_id, text, skipped,
             skip_reason, visibility, reactions, difficulty_rating,
             metadata, answered_on, created_at
           ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
          rusqlite::params![
            encode_uuid(answer.answer_id),
            encode_uuid(answer.user_id),
            encode_uuid(answer.question_id),
            answer.pair_id.map(encode_uuid),
            answer.text,
            answer.skipped,
            answer.skip_reason,
            answer.visibility.discriminant(),
            encode_json(&answer.reactions).map_err(wrap)?,
            answer.difficulty_rating.map(i64::from),
            encode_json(&answer.metadata).map_err(wrap)?,
            encode_day(answer.answered_on),
            encode_dt(answer.created_at),
          ],
        )?;

        // User counters: a skip resets the answer streak.
        user.questions_answered += 1;
        user.streak_days =
          if answer.skipped { 0 } else { user.streak_days + 1 };
        write_user_counters(&tx, &user)?;

        // Question running aggregates, folded incrementally.
        let response_length =
          answer.text.as_deref().map_or(0, |t| t.chars().count());
        question.stats.absorb(
          answer.skipped,
          response_length,
          answer.difficulty_rating,
        );
        tx.execute(
          "UPDATE questions SET times_asked = ?2, times_skipped = ?3,
             times_rated = ?4, skip_rate = ?5, avg_response_length = ?6,
             avg_difficulty_rating = ?7
           WHERE question_id = ?1",
          rusqlite::params![
            encode_uuid(question_id),
            question.stats.times_asked as i64,
            question.stats.times_skipped as i64,
            question.stats.times_rated as i64,
            question.stats.skip_rate,
            question.stats.avg_response_length,
            question.stats.avg_difficulty_rating,
          ],
        )?;

        // Answer-category achievement metrics.
        let total_answers: i64 = tx.query_row(
          "SELECT COUNT(*) FROM answers WHERE user_id = ?1",
          rusqlite::params![encode_uuid(user_id)],
          |r| r.get(0),
        )?;
        let days: Vec<(NaiveDate, bool)> = {
          let mut stmt = tx.prepare(
            "SELECT answered_on, MIN(skipped) FROM answers \
             WHERE user_id = ?1 GROUP BY answered_on \
             ORDER BY answered_on DESC LIMIT 366",
          )?;
          let rows = stmt
            .query_map(rusqlite::params![encode_uuid(user_id)], |r| {
              Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
            .into_iter()
            .map(|(day, min_skipped)| {
              crate::encode::decode_day(&day)
                .map(|d| (d, min_skipped != 0))
                .map_err(wrap)
            })
            .collect::<TxResult<_>>()?
        };
        let answer_streak = streak::answer_run(&days, today);

        let category_count: i64 = tx.query_row(
          "SELECT COUNT(DISTINCT q.category) FROM answers a \
           JOIN questions q ON q.question_id = a.question_id \
           WHERE a.user_id = ?1 AND a.skipped = 0",
          rusqlite::params![encode_uuid(user_id)],
          |r| r.get(0),
        )?;
        let avg_answer_length: f64 = tx.query_row(
          "SELECT COALESCE(AVG(LENGTH(text)), 0) FROM answers \
           WHERE user_id = ?1 AND skipped = 0",
          rusqlite::params![encode_uuid(user_id)],
          |r| r.get(0),
        )?;

        let snapshot = MetricSnapshot {
          total_answers: total_answers as u64,
          answer_streak,
          category_count: category_count as u64,
          avg_answer_length,
          ..Default::default()
        };
        let granted = grant_for_members(
          &tx,
          &[user_id],
          &snapshot,
          &[Category::Answer],
          now,
        )?;

        // Active partners to notify, captured inside the same transaction.
        let partner_ids: Vec<Uuid> = {
          let mut stmt = tx.prepare(
            "SELECT partner_id FROM partnerships \
             WHERE user_id = ?1 AND status = 'active'",
          )?;
          let raw = stmt
            .query_map(rusqlite::params![encode_uuid(user_id)], |r| {
              r.get::<_, String>(0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          raw
            .iter()
            .map(|s| crate::encode::decode_uuid(s).map_err(wrap))
            .collect::<TxResult<_>>()?
        };

        tx.commit()?;
        Ok(AnswerOutcome { answer, granted, partner_ids })
      })
      .await?;

    Ok(outcome)
  }

  async fn add_reaction(
    &self,
    answer_id: Uuid,
    reaction: String,
  ) -> Result<Answer> {
    let answer = self
      .conn
      .call(move |conn| {
        let tx =
          conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let raw = tx
          .query_row(
            &format!("SELECT {ANSWER_COLS} FROM answers WHERE answer_id = ?1"),
            rusqlite::params![encode_uuid(answer_id)],
            answer_from_row,
          )
          .optional()?;
        let mut answer = raw
          .ok_or_else(|| abort(tandem_core::Error::AnswerNotFound(answer_id)))?
          .into_answer()
          .map_err(wrap)?;

        answer.reactions.push(reaction);
        tx.execute(
          "UPDATE answers SET reactions = ?2 WHERE answer_id = ?1",
          rusqlite::params![
            encode_uuid(answer_id),
            encode_json(&answer.reactions).map_err(wrap)?,
          ],
        )?;
        tx.commit()?;

        Ok(answer)
      })
      .await?;

    Ok(answer)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  async fn partnership_stats(
    &self,
    partnership_id: Uuid,
  ) -> Result<PartnershipStatsView> {
    let today = (self.clock)().date_naive();

    let view = self
      .conn
      .call(move |conn| {
        let p = load_partnership(conn, partnership_id)?.ok_or_else(|| {
          abort(tandem_core::Error::PartnershipNotFound(partnership_id))
        })?;

        let mut breakdown = std::collections::BTreeMap::new();
        {
          let mut stmt = conn.prepare(
            "SELECT interaction_type, COUNT(*) FROM interactions \
             WHERE pair_id = ?1 GROUP BY interaction_type",
          )?;
          let rows = stmt
            .query_map(rusqlite::params![encode_uuid(p.pair_id)], |r| {
              Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          for (kind, count) in rows {
            breakdown.insert(kind, count as u64);
          }
        }

        let (answers_total, answers_skipped): (i64, i64) = conn.query_row(
          "SELECT COUNT(*), COALESCE(SUM(skipped), 0) FROM answers \
           WHERE user_id IN (?1, ?2)",
          rusqlite::params![
            encode_uuid(p.user_id),
            encode_uuid(p.partner_id)
          ],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        let shared = breakdown.get("answer_shared").copied().unwrap_or(0);

        Ok(PartnershipStatsView {
          partnership_id:        p.partnership_id,
          status:                p.status,
          level:                 p.partnership_level,
          streak_days:           p.streak_days,
          longest_streak:        p.longest_streak,
          total_interactions:    p.interaction_count,
          days_connected:        p.days_connected(today),
          achievements:          p.achievements.clone(),
          interaction_breakdown: breakdown,
          answer_breakdown:      AnswerBreakdown {
            total:   answers_total as u64,
            skipped: answers_skipped as u64,
            shared,
          },
        })
      })
      .await?;

    Ok(view)
  }

  async fn interaction_history(
    &self,
    partnership_id: Uuid,
    limit: u32,
  ) -> Result<Vec<Interaction>> {
    let entries = self
      .conn
      .call(move |conn| {
        let p = load_partnership(conn, partnership_id)?.ok_or_else(|| {
          abort(tandem_core::Error::PartnershipNotFound(partnership_id))
        })?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {INTERACTION_COLS} FROM interactions \
           WHERE pair_id = ?1 \
           ORDER BY recorded_at DESC, interaction_id LIMIT ?2"
        ))?;
        let raw = stmt
          .query_map(
            rusqlite::params![encode_uuid(p.pair_id), i64::from(limit)],
            interaction_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        raw
          .into_iter()
          .map(|r| r.into_interaction().map_err(wrap))
          .collect::<TxResult<_>>()
      })
      .await?;

    Ok(entries)
  }
}
