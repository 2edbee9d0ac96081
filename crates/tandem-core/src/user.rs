//! User — identity plus the cumulative personal counters the orchestrator
//! maintains on interaction, answer, and achievement events.
//!
//! Account lifecycle (registration, deletion) is owned elsewhere; this core
//! only ever mutates counters and stats of existing users.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Points needed per user level. Level 1 starts at zero points.
pub const POINTS_PER_LEVEL: u64 = 100;

// ─── Stats ───────────────────────────────────────────────────────────────────

/// Typed replacement for the ad-hoc per-user `stats` map. Every field has a
/// serde default so rows written by older versions decode cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
  /// Lifetime interaction total across all partnerships.
  #[serde(default)]
  pub total_interactions: u64,
  /// Interaction counts keyed by interaction-type discriminant.
  #[serde(default)]
  pub by_type:            BTreeMap<String, u64>,
  /// Activity buckets keyed by UTC `YYYY-MM`.
  #[serde(default)]
  pub monthly_activity:   BTreeMap<String, u64>,
}

impl UserStats {
  /// Fold one interaction into the totals.
  pub fn bump(&mut self, kind: &str, day: NaiveDate) {
    self.total_interactions += 1;
    *self.by_type.entry(kind.to_owned()).or_insert(0) += 1;
    *self.monthly_activity.entry(month_key(day)).or_insert(0) += 1;
  }
}

/// The UTC `YYYY-MM` bucket key for a calendar day.
pub fn month_key(day: NaiveDate) -> String {
  format!("{:04}-{:02}", day.year(), day.month())
}

// ─── User ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:            Uuid,
  pub created_at:         DateTime<Utc>,
  pub display_name:       String,
  pub active:             bool,
  pub points:             u64,
  pub level:              u32,
  /// Monotone high-water mark of `level`; never decreases.
  pub highest_level:      u32,
  /// Consecutive non-skipped daily answers; reset to 0 by a skip.
  pub streak_days:        u32,
  pub questions_answered: u64,
  pub interaction_count:  u64,
  pub stats:              UserStats,
}

impl User {
  /// The level implied by a points total. The store recomputes `level` and
  /// the `highest_level` high-water mark through this whenever it credits
  /// points.
  pub fn level_for_points(points: u64) -> u32 {
    (points / POINTS_PER_LEVEL) as u32 + 1
  }
}

// ─── NewUser ─────────────────────────────────────────────────────────────────

/// Input to `create_user`. Everything else starts at its zero value; the
/// store assigns the UUID and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
  pub display_name: String,
}
