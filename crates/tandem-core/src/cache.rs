//! Keyed daily-answer cache.
//!
//! A fast-path hint in front of the store's authoritative same-day check;
//! keyed by `(user, question, day)` rather than held in process-global
//! state. Entries for past days are dropped by `expire`.

use std::{
  collections::HashSet,
  sync::Mutex,
};

use chrono::NaiveDate;
use uuid::Uuid;

/// Get/put/expire over `(user, question, day)` markers.
pub trait DailyMarkerCache: Send + Sync {
  /// Has this user already answered this question on this day?
  fn get(&self, user_id: Uuid, question_id: Uuid, day: NaiveDate) -> bool;

  fn put(&self, user_id: Uuid, question_id: Uuid, day: NaiveDate);

  /// Drop all markers strictly before `day`.
  fn expire(&self, day: NaiveDate);
}

/// In-process implementation backed by a mutex-guarded set.
#[derive(Debug, Default)]
pub struct MemoryMarkerCache {
  inner: Mutex<HashSet<(Uuid, Uuid, NaiveDate)>>,
}

impl MemoryMarkerCache {
  pub fn new() -> Self { Self::default() }
}

impl DailyMarkerCache for MemoryMarkerCache {
  fn get(&self, user_id: Uuid, question_id: Uuid, day: NaiveDate) -> bool {
    self
      .inner
      .lock()
      .expect("marker cache poisoned")
      .contains(&(user_id, question_id, day))
  }

  fn put(&self, user_id: Uuid, question_id: Uuid, day: NaiveDate) {
    self
      .inner
      .lock()
      .expect("marker cache poisoned")
      .insert((user_id, question_id, day));
  }

  fn expire(&self, day: NaiveDate) {
    self
      .inner
      .lock()
      .expect("marker cache poisoned")
      .retain(|&(_, _, d)| d >= day);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, n).unwrap()
  }

  #[test]
  fn put_then_get() {
    let cache = MemoryMarkerCache::new();
    let (u, q) = (Uuid::new_v4(), Uuid::new_v4());

    assert!(!cache.get(u, q, day(1)));
    cache.put(u, q, day(1));
    assert!(cache.get(u, q, day(1)));
    // A different day or question is a miss.
    assert!(!cache.get(u, q, day(2)));
    assert!(!cache.get(u, Uuid::new_v4(), day(1)));
  }

  #[test]
  fn expire_drops_only_older_days() {
    let cache = MemoryMarkerCache::new();
    let (u, q) = (Uuid::new_v4(), Uuid::new_v4());

    cache.put(u, q, day(1));
    cache.put(u, q, day(5));
    cache.expire(day(5));

    assert!(!cache.get(u, q, day(1)));
    assert!(cache.get(u, q, day(5)));
  }
}
