//! Handlers for `/partnerships` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/partnerships` | 201; 409 on duplicate, 422 on self-pairing |
//! | `GET`  | `/partnerships/:id` | 404 if not found |
//! | `POST` | `/partnerships/:id/status` | Body: `{"status":"active","reason":...}` |
//! | `PUT`  | `/partnerships/:id/settings` | Full settings document |
//! | `POST` | `/partnerships/:id/interactions` | Optional `?timeout_ms=` deadline |
//! | `GET`  | `/partnerships/:id/interactions` | Ledger, newest first; `?limit=` |
//! | `GET`  | `/partnerships/:id/stats` | Aggregated rollup |

use std::{sync::Arc, time::Duration};

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tandem_core::{
  interaction::{Interaction, NewInteraction},
  notify::NotificationSink,
  orchestrator::Orchestrator,
  partnership::{Partnership, PartnershipSettings, PartnershipStatus},
  store::{Deadline, PartnershipStatsView, PartnershipStore},
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub user_id:    Uuid,
  pub partner_id: Uuid,
  #[serde(default)]
  pub status:     PartnershipStatus,
}

/// `POST /partnerships`
pub async fn create<S, N>(
  State(orchestrator): State<Arc<Orchestrator<S, N>>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PartnershipStore,
  N: NotificationSink,
{
  let pair = orchestrator
    .create_partnership(body.user_id, body.partner_id, body.status)
    .await?;
  Ok((StatusCode::CREATED, Json(pair)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /partnerships/:id`
pub async fn get_one<S, N>(
  State(orchestrator): State<Arc<Orchestrator<S, N>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Partnership>, ApiError>
where
  S: PartnershipStore,
  N: NotificationSink,
{
  let partnership = orchestrator
    .get_partnership(id)
    .await?
    .ok_or(ApiError(tandem_core::Error::PartnershipNotFound(id)))?;
  Ok(Json(partnership))
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: PartnershipStatus,
  #[serde(default)]
  pub reason: Option<String>,
}

/// `POST /partnerships/:id/status`
pub async fn status<S, N>(
  State(orchestrator): State<Arc<Orchestrator<S, N>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PartnershipStore,
  N: NotificationSink,
{
  let outcome = orchestrator.update_status(id, body.status, body.reason).await?;
  Ok(Json(outcome))
}

// ─── Settings ────────────────────────────────────────────────────────────────

/// `PUT /partnerships/:id/settings` — the body is the full settings
/// document; missing sections are a 422 from deserialisation.
pub async fn settings<S, N>(
  State(orchestrator): State<Arc<Orchestrator<S, N>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<PartnershipSettings>,
) -> Result<Json<Partnership>, ApiError>
where
  S: PartnershipStore,
  N: NotificationSink,
{
  let updated = orchestrator.update_settings(id, body).await?;
  Ok(Json(updated))
}

// ─── Interactions ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InteractionParams {
  /// Deadline for the composed transaction, in milliseconds.
  pub timeout_ms: Option<u64>,
}

/// `POST /partnerships/:id/interactions`
pub async fn interaction<S, N>(
  State(orchestrator): State<Arc<Orchestrator<S, N>>>,
  Path(id): Path<Uuid>,
  Query(params): Query<InteractionParams>,
  Json(body): Json<NewInteraction>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PartnershipStore,
  N: NotificationSink,
{
  let deadline =
    params.timeout_ms.map(|ms| Deadline::after(Duration::from_millis(ms)));
  let outcome = orchestrator.record_interaction(id, body, deadline).await?;
  Ok((StatusCode::CREATED, Json(outcome)))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  pub limit: Option<u32>,
}

/// `GET /partnerships/:id/interactions` — the pair's ledger, most recent
/// first, capped at `?limit=` (default 50).
pub async fn history<S, N>(
  State(orchestrator): State<Arc<Orchestrator<S, N>>>,
  Path(id): Path<Uuid>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<Interaction>>, ApiError>
where
  S: PartnershipStore,
  N: NotificationSink,
{
  let limit = params.limit.unwrap_or(50);
  Ok(Json(orchestrator.interaction_history(id, limit).await?))
}

// ─── Stats ───────────────────────────────────────────────────────────────────

/// `GET /partnerships/:id/stats`
pub async fn stats<S, N>(
  State(orchestrator): State<Arc<Orchestrator<S, N>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<PartnershipStatsView>, ApiError>
where
  S: PartnershipStore,
  N: NotificationSink,
{
  Ok(Json(orchestrator.partnership_stats(id).await?))
}
