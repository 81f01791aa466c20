use crate::import::error::{ImportError, StoreError};
use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use rusqlite::ErrorCode;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Error returned by every handler. Bodies are JSON with at least a `detail` field.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("upload exceeds the limit of {0} bytes")]
    TooLarge(usize),

    /// A uniqueness or foreign-key constraint rejected the change.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("background task failed: {0}")]
    Blocking(String),

    #[error(transparent)]
    Import(#[from] ImportError),
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        if e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
            ApiError::Conflict(e.to_string())
        } else {
            ApiError::Store(StoreError::Sqlite(e))
        }
    }
}

impl From<BlockingError> for ApiError {
    fn from(e: BlockingError) -> Self {
        ApiError::Blocking(e.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Conflict(_) | ApiError::Store(StoreError::Conflict(_)) => {
                StatusCode::CONFLICT
            }
            ApiError::Store(_) | ApiError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Import(e) => import_status(e),
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("{self}");
        }
        let body = match self {
            ApiError::Import(e) => import_body(e),
            _ => json!({ "detail": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

fn import_status(e: &ImportError) -> StatusCode {
    match e {
        ImportError::Decode(_)
        | ImportError::Schema { .. }
        | ImportError::ReferentialIntegrity { .. } => StatusCode::BAD_REQUEST,
        ImportError::Cancelled | ImportError::Conflict(_) => StatusCode::CONFLICT,
        ImportError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn import_body(e: &ImportError) -> Value {
    let mut body = Map::new();
    body.insert("error".into(), json!(e.tag()));
    body.insert("detail".into(), json!(e.to_string()));
    body.insert("retryable".into(), json!(e.is_retryable()));
    match e {
        ImportError::Schema { missing, found } => {
            body.insert("missing_columns".into(), json!(missing));
            body.insert("found_columns".into(), json!(found));
        }
        ImportError::ReferentialIntegrity { missing, .. } => {
            body.insert("missing_references".into(), json!(missing));
        }
        _ => {}
    }
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use common::model::import::EntityKind;
    use std::collections::BTreeSet;

    async fn body_of(error: ApiError) -> (StatusCode, Value) {
        let response = error.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn schema_error_lists_missing_and_found_columns() {
        let (status, body) = body_of(ApiError::from(ImportError::Schema {
            missing: vec!["dept".into()],
            found: vec!["id_number".into(), "instructor_name".into()],
        }))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "schema_error");
        assert_eq!(body["missing_columns"], json!(["dept"]));
        assert_eq!(body["found_columns"], json!(["id_number", "instructor_name"]));
    }

    #[actix_web::test]
    async fn integrity_error_names_the_missing_references() {
        let (status, body) = body_of(ApiError::from(ImportError::ReferentialIntegrity {
            kind: EntityKind::Instructor,
            referenced: EntityKind::Department,
            missing: BTreeSet::from(["NOPE".to_string()]),
        }))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["missing_references"], json!(["NOPE"]));
        assert_eq!(body["retryable"], false);
    }

    #[actix_web::test]
    async fn cancelled_and_persistence_errors() {
        let (status, _) = body_of(ImportError::Cancelled.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = body_of(
            ImportError::from(StoreError::Unavailable("locked".into())).into(),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["retryable"], true);
    }

    #[actix_web::test]
    async fn import_conflict_is_not_retryable() {
        let (status, body) = body_of(
            ImportError::from(StoreError::Conflict("UNIQUE constraint failed".into())).into(),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");
        assert_eq!(body["retryable"], false);
    }

    #[actix_web::test]
    async fn plain_errors_carry_detail() {
        let (status, body) = body_of(ApiError::NotFound("Subject not found".into())).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Subject not found");
    }
}
