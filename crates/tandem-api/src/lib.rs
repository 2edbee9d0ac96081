//! JSON REST API for Tandem.
//!
//! Exposes an axum [`Router`] backed by an
//! [`tandem_core::orchestrator::Orchestrator`] over any store and sink.
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tandem_api::api_router(orchestrator.clone()))
//! ```

pub mod answers;
pub mod error;
pub mod partnerships;
pub mod questions;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use tandem_core::{
  notify::NotificationSink, orchestrator::Orchestrator,
  store::PartnershipStore,
};

pub use error::ApiError;

/// Build a fully-materialised API router for `orchestrator`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, N>(orchestrator: Arc<Orchestrator<S, N>>) -> Router<()>
where
  S: PartnershipStore + 'static,
  N: NotificationSink + 'static,
{
  Router::new()
    // Users
    .route("/users", post(users::create::<S, N>))
    .route("/users/{id}", get(users::get_one::<S, N>))
    // Questions
    .route("/questions", post(questions::create::<S, N>))
    .route("/questions/{id}", get(questions::get_one::<S, N>))
    // Partnerships
    .route("/partnerships", post(partnerships::create::<S, N>))
    .route("/partnerships/{id}", get(partnerships::get_one::<S, N>))
    .route("/partnerships/{id}/status", post(partnerships::status::<S, N>))
    .route("/partnerships/{id}/settings", put(partnerships::settings::<S, N>))
    .route(
      "/partnerships/{id}/interactions",
      post(partnerships::interaction::<S, N>)
        .get(partnerships::history::<S, N>),
    )
    .route("/partnerships/{id}/stats", get(partnerships::stats::<S, N>))
    // Answers
    .route("/answers", post(answers::submit::<S, N>))
    .route("/answers/{id}/reactions", post(answers::react::<S, N>))
    .with_state(orchestrator)
}
