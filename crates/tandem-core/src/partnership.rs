//! Partnership — one directional half of a bidirectional relationship.
//!
//! Every logical relationship is stored as two mirrored rows sharing a
//! `pair_id`. The store's single transactional write path is the only thing
//! that ever touches them, and it never updates one side without the other.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound on `partnership_level`.
pub const MAX_LEVEL: u32 = 100;

/// The partnership level advances by one every this many pair interactions.
pub const INTERACTIONS_PER_LEVEL: u64 = 10;

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PartnershipStatus {
  #[default]
  Pending,
  Active,
  Inactive,
  Blocked,
}

impl PartnershipStatus {
  /// The discriminant string stored in the `status` column.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Active => "active",
      Self::Inactive => "inactive",
      Self::Blocked => "blocked",
    }
  }

  pub fn from_discriminant(s: &str) -> Option<Self> {
    match s {
      "pending" => Some(Self::Pending),
      "active" => Some(Self::Active),
      "inactive" => Some(Self::Inactive),
      "blocked" => Some(Self::Blocked),
      _ => None,
    }
  }
}

// ─── Settings ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
  #[serde(default = "default_true")]
  pub daily_reminder:     bool,
  #[serde(default = "default_true")]
  pub achievement_alerts: bool,
  #[serde(default = "default_true")]
  pub partner_activity:   bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacySettings {
  #[serde(default = "default_true")]
  pub share_streak:       bool,
  #[serde(default = "default_true")]
  pub share_achievements: bool,
  #[serde(default)]
  pub hide_skipped:       bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayPreferences {
  #[serde(default = "default_theme")]
  pub theme:       String,
  #[serde(default = "default_true")]
  pub show_level:  bool,
  #[serde(default = "default_true")]
  pub show_streak: bool,
}

/// Typed replacement for the ad-hoc `custom_settings` map. The three
/// sub-sections are required struct fields, so the "has all required
/// sub-keys" validation the original re-ran on every write is now enforced
/// by deserialisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnershipSettings {
  pub notification_preferences: NotificationPreferences,
  pub privacy_settings:         PrivacySettings,
  pub display_preferences:      DisplayPreferences,
}

fn default_true() -> bool { true }
fn default_theme() -> String { "system".to_owned() }

impl Default for NotificationPreferences {
  fn default() -> Self {
    Self {
      daily_reminder:     true,
      achievement_alerts: true,
      partner_activity:   true,
    }
  }
}

impl Default for PrivacySettings {
  fn default() -> Self {
    Self {
      share_streak:       true,
      share_achievements: true,
      hide_skipped:       false,
    }
  }
}

impl Default for DisplayPreferences {
  fn default() -> Self {
    Self {
      theme:       default_theme(),
      show_level:  true,
      show_streak: true,
    }
  }
}

impl Default for PartnershipSettings {
  fn default() -> Self {
    Self {
      notification_preferences: NotificationPreferences::default(),
      privacy_settings:         PrivacySettings::default(),
      display_preferences:      DisplayPreferences::default(),
    }
  }
}

// ─── Stats ───────────────────────────────────────────────────────────────────

/// Pair-level interaction breakdown, mirrored on both rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnershipStats {
  #[serde(default)]
  pub messages_sent:       u64,
  #[serde(default)]
  pub answers_shared:      u64,
  #[serde(default)]
  pub reactions_given:     u64,
  #[serde(default)]
  pub milestones_reached:  u64,
}

// ─── Partnership ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partnership {
  pub partnership_id:        Uuid,
  /// Shared by exactly two mirrored rows; identifies the logical edge.
  pub pair_id:               Uuid,
  pub user_id:               Uuid,
  pub partner_id:            Uuid,
  pub status:                PartnershipStatus,
  /// 1..=100; advances every [`INTERACTIONS_PER_LEVEL`] pair interactions.
  pub partnership_level:     u32,
  pub streak_days:           u32,
  pub longest_streak:        u32,
  pub interaction_count:     u64,
  pub last_interaction_date: Option<NaiveDate>,
  /// Pair interaction count at which the level last advanced.
  pub last_milestone:        Option<u64>,
  /// Achievement-type discriminants unlocked by either member.
  pub achievements:          BTreeSet<String>,
  pub mutual_answer_count:   u64,
  pub custom_settings:       PartnershipSettings,
  pub stats:                 PartnershipStats,
  pub created_at:            DateTime<Utc>,
}

impl Partnership {
  /// Whole calendar days since the relationship was created.
  pub fn days_connected(&self, today: NaiveDate) -> i64 {
    today
      .signed_duration_since(self.created_at.date_naive())
      .num_days()
      .max(0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_discriminants_round_trip() {
    for status in [
      PartnershipStatus::Pending,
      PartnershipStatus::Active,
      PartnershipStatus::Inactive,
      PartnershipStatus::Blocked,
    ] {
      let s = status.discriminant();
      assert_eq!(PartnershipStatus::from_discriminant(s), Some(status));
    }
    assert_eq!(PartnershipStatus::from_discriminant("frozen"), None);
  }

  #[test]
  fn settings_require_all_three_sections() {
    // Missing `display_preferences` must fail to deserialise.
    let err = serde_json::from_str::<PartnershipSettings>(
      r#"{"notification_preferences": {}, "privacy_settings": {}}"#,
    );
    assert!(err.is_err());

    // All three present (even empty) deserialise with defaults filled in.
    let ok: PartnershipSettings = serde_json::from_str(
      r#"{
        "notification_preferences": {},
        "privacy_settings": {"share_streak": false},
        "display_preferences": {"theme": "dark"}
      }"#,
    )
    .unwrap();
    assert!(!ok.privacy_settings.share_streak);
    assert_eq!(ok.display_preferences.theme, "dark");
    assert!(ok.notification_preferences.daily_reminder);
  }
}
