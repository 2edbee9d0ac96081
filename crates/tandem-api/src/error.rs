//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Wraps the core taxonomy and maps each class to a status code: not-found
//! to 404, conflicts to 409, validation and precondition failures to 422,
//! deadline expiry to 503, integrity and storage failures to 500.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use tandem_core::Error;

/// An error returned by an API handler.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

impl ApiError {
  fn status(&self) -> StatusCode {
    match &self.0 {
      Error::UserNotFound(_)
      | Error::PartnershipNotFound(_)
      | Error::QuestionNotFound(_)
      | Error::AnswerNotFound(_) => StatusCode::NOT_FOUND,

      Error::DuplicateRelationship { .. } | Error::AlreadyAnswered { .. } => {
        StatusCode::CONFLICT
      }

      Error::Validation { .. }
      | Error::SelfRelationship
      | Error::UserInactive(_)
      | Error::QuestionInactive(_)
      | Error::LevelOutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,

      Error::DeadlineExceeded => StatusCode::SERVICE_UNAVAILABLE,

      Error::ReverseRelationshipMissing(_)
      | Error::UnknownAchievementType(_)
      | Error::Storage(_)
      | Error::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  /// Stable machine-readable error code for clients.
  fn code(&self) -> &'static str {
    match &self.0 {
      Error::Validation { .. } => "validation",
      Error::SelfRelationship => "self_relationship",
      Error::DuplicateRelationship { .. } => "duplicate_relationship",
      Error::AlreadyAnswered { .. } => "already_answered",
      Error::ReverseRelationshipMissing(_) => "integrity",
      Error::UnknownAchievementType(_) => "integrity",
      Error::UserNotFound(_) => "user_not_found",
      Error::PartnershipNotFound(_) => "partnership_not_found",
      Error::QuestionNotFound(_) => "question_not_found",
      Error::AnswerNotFound(_) => "answer_not_found",
      Error::UserInactive(_) => "user_inactive",
      Error::QuestionInactive(_) => "question_inactive",
      Error::LevelOutOfRange { .. } => "level_out_of_range",
      Error::DeadlineExceeded => "deadline_exceeded",
      Error::Storage(_) => "storage",
      Error::Serialization(_) => "serialization",
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let mut body = json!({
      "error": self.code(),
      "message": self.0.to_string(),
    });
    if let Error::Validation { field, .. } = &self.0 {
      body["field"] = json!(field);
    }
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use uuid::Uuid;

  #[test]
  fn status_mapping_covers_the_classes() {
    let cases = [
      (Error::PartnershipNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
      (
        Error::DuplicateRelationship {
          user_id:    Uuid::nil(),
          partner_id: Uuid::nil(),
        },
        StatusCode::CONFLICT,
      ),
      (Error::SelfRelationship, StatusCode::UNPROCESSABLE_ENTITY),
      (
        Error::validation("text", "required"),
        StatusCode::UNPROCESSABLE_ENTITY,
      ),
      (
        Error::ReverseRelationshipMissing(Uuid::nil()),
        StatusCode::INTERNAL_SERVER_ERROR,
      ),
      (Error::DeadlineExceeded, StatusCode::SERVICE_UNAVAILABLE),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError(err).status(), status);
    }
  }
}
