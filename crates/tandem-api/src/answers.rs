//! Handlers for `/answers` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tandem_core::{
  answer::{Answer, NewAnswer},
  notify::NotificationSink,
  orchestrator::Orchestrator,
  store::PartnershipStore,
};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  pub user_id:     Uuid,
  pub question_id: Uuid,
  #[serde(flatten)]
  pub answer:      NewAnswer,
}

/// `POST /answers`
pub async fn submit<S, N>(
  State(orchestrator): State<Arc<Orchestrator<S, N>>>,
  Json(body): Json<SubmitBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PartnershipStore,
  N: NotificationSink,
{
  let outcome = orchestrator
    .submit_answer(body.user_id, body.question_id, body.answer)
    .await?;
  Ok((StatusCode::CREATED, Json(outcome)))
}

#[derive(Debug, Deserialize)]
pub struct ReactionBody {
  pub reaction: String,
}

/// `POST /answers/:id/reactions`
pub async fn react<S, N>(
  State(orchestrator): State<Arc<Orchestrator<S, N>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ReactionBody>,
) -> Result<Json<Answer>, ApiError>
where
  S: PartnershipStore,
  N: NotificationSink,
{
  Ok(Json(orchestrator.add_reaction(id, body.reaction).await?))
}
