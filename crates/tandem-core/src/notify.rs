//! Notification sink — the fire-and-forget boundary to the delivery system.
//!
//! Broadcast failures never abort a core operation. Dispatch retries a
//! bounded number of times with linear backoff, then gives up with a log
//! line. Delivery channels (email, push, websockets) live outside this core.

use std::future::Future;

use thiserror::Error;
use uuid::Uuid;

/// An error raised by a sink implementation. Only ever logged.
#[derive(Debug, Error)]
#[error("notification sink error: {0}")]
pub struct SinkError(pub String);

/// Event names emitted by the orchestrator.
pub mod event {
  pub const PARTNERSHIP_CREATED: &str = "partnership_created";
  pub const STATUS_CHANGED: &str = "partnership_status_changed";
  pub const SETTINGS_UPDATED: &str = "settings_updated";
  pub const NEW_INTERACTION: &str = "new_interaction";
  pub const ANSWER_SUBMITTED: &str = "answer_submitted";
  pub const REACTION_ADDED: &str = "reaction_added";
  pub const ACHIEVEMENT_UNLOCKED: &str = "achievement_unlocked";
}

/// The per-user broadcast topic.
pub fn user_topic(id: Uuid) -> String { format!("user:{id}") }

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A fire-and-forget broadcast target. The return value is consulted only to
/// decide whether to retry; it never influences operation control flow.
pub trait NotificationSink: Send + Sync {
  fn broadcast<'a>(
    &'a self,
    topic: &'a str,
    event: &'a str,
    payload: serde_json::Value,
  ) -> impl Future<Output = Result<(), SinkError>> + Send + 'a;
}

/// Sink that logs each event at `info` and always succeeds.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
  async fn broadcast<'a>(
    &'a self,
    topic: &'a str,
    event: &'a str,
    payload: serde_json::Value,
  ) -> Result<(), SinkError> {
    tracing::info!(%topic, %event, %payload, "notification");
    Ok(())
  }
}

/// Sink that drops everything. Useful for tests and batch tooling.
#[derive(Debug, Clone, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
  async fn broadcast<'a>(
    &'a self,
    _topic: &'a str,
    _event: &'a str,
    _payload: serde_json::Value,
  ) -> Result<(), SinkError> {
    Ok(())
  }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// Retry policy for best-effort dispatch: bounded attempts, linear backoff.
#[derive(Debug, Clone)]
pub struct DispatchPolicy {
  /// Total attempts, including the first.
  pub max_attempts: u32,
  /// Delay before attempt 2; attempt `n` waits `(n - 1) * backoff`.
  pub backoff:      std::time::Duration,
}

impl Default for DispatchPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      backoff:      std::time::Duration::from_millis(100),
    }
  }
}

impl DispatchPolicy {
  /// No real waiting; for tests.
  pub fn instant() -> Self {
    Self {
      max_attempts: 3,
      backoff:      std::time::Duration::from_millis(1),
    }
  }
}

/// Broadcast `event` on `topic`, swallowing all failures.
///
/// Retries per `policy`; the final failure is logged at `warn` and
/// discarded. This function never returns an error.
pub async fn dispatch_best_effort<N: NotificationSink>(
  sink: &N,
  policy: &DispatchPolicy,
  topic: &str,
  event: &str,
  payload: serde_json::Value,
) {
  for attempt in 1..=policy.max_attempts.max(1) {
    match sink.broadcast(topic, event, payload.clone()).await {
      Ok(()) => return,
      Err(e) if attempt == policy.max_attempts.max(1) => {
        tracing::warn!(
          %topic,
          %event,
          error = %e,
          attempts = attempt,
          "notification dropped"
        );
        return;
      }
      Err(e) => {
        tracing::debug!(%topic, %event, error = %e, attempt, "retrying notification");
        tokio::time::sleep(policy.backoff * attempt).await;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
  };

  use super::*;

  /// Fails the first `fail_first` calls, then succeeds.
  struct FlakySink {
    fail_first: u32,
    calls:      Arc<AtomicU32>,
  }

  impl NotificationSink for FlakySink {
    async fn broadcast<'a>(
      &'a self,
      _topic: &'a str,
      _event: &'a str,
      _payload: serde_json::Value,
    ) -> Result<(), SinkError> {
      let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
      if n <= self.fail_first {
        Err(SinkError(format!("attempt {n} refused")))
      } else {
        Ok(())
      }
    }
  }

  #[tokio::test]
  async fn dispatch_retries_until_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let sink = FlakySink { fail_first: 2, calls: calls.clone() };

    dispatch_best_effort(
      &sink,
      &DispatchPolicy::instant(),
      "user:x",
      event::NEW_INTERACTION,
      serde_json::json!({}),
    )
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn dispatch_gives_up_after_max_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let sink = FlakySink { fail_first: u32::MAX, calls: calls.clone() };

    // Must return despite the sink never recovering.
    dispatch_best_effort(
      &sink,
      &DispatchPolicy::instant(),
      "user:x",
      event::NEW_INTERACTION,
      serde_json::json!({}),
    )
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn topic_format() {
    let id = Uuid::nil();
    assert_eq!(
      user_topic(id),
      "user:00000000-0000-0000-0000-000000000000"
    );
  }
}
