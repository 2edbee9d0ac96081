//! Handlers for `/questions` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use tandem_core::{
  notify::NotificationSink,
  orchestrator::Orchestrator,
  question::{NewQuestion, Question},
  store::PartnershipStore,
};
use uuid::Uuid;

use crate::error::ApiError;

/// `POST /questions`
pub async fn create<S, N>(
  State(orchestrator): State<Arc<Orchestrator<S, N>>>,
  Json(body): Json<NewQuestion>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PartnershipStore,
  N: NotificationSink,
{
  let question = orchestrator.create_question(body).await?;
  Ok((StatusCode::CREATED, Json(question)))
}

/// `GET /questions/:id`
pub async fn get_one<S, N>(
  State(orchestrator): State<Arc<Orchestrator<S, N>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Question>, ApiError>
where
  S: PartnershipStore,
  N: NotificationSink,
{
  let question = orchestrator
    .get_question(id)
    .await?
    .ok_or(ApiError(tandem_core::Error::QuestionNotFound(id)))?;
  Ok(Json(question))
}
