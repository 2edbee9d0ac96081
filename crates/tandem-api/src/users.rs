//! Handlers for `/users` endpoints.

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
  store::PartnershipStore,
  user::{NewUser, User},
};
use uuid::Uuid;

use crate::error::ApiError;

/// `POST /users` — body: `{"display_name":"Ada"}`
pub async fn create<S, N>(
  State(orchestrator): State<Arc<Orchestrator<S, N>>>,
  Json(body): Json<NewUser>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PartnershipStore,
  N: NotificationSink,
{
  let user = orchestrator.create_user(body).await?;
  Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /users/:id`
pub async fn get_one<S, N>(
  State(orchestrator): State<Arc<Orchestrator<S, N>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError>
where
  S: PartnershipStore,
  N: NotificationSink,
{
  let user = orchestrator
    .get_user(id)
    .await?
    .ok_or(ApiError(tandem_core::Error::UserNotFound(id)))?;
  Ok(Json(user))
}
