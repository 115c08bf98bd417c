use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::codes;

/// Error returned by every API handler. Renders as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Too many attempts, try again in a few minutes")]
    TooManyRequests,

    #[error("Internal server error")]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Fixed client-facing message for a Postgres constraint violation.
pub fn constraint_message(code: &str) -> Option<&'static str> {
    match code {
        codes::FOREIGN_KEY_VIOLATION => Some("Referenced record does not exist"),
        codes::CHECK_VIOLATION => Some("A field has a value outside its allowed range"),
        codes::UNIQUE_VIOLATION => Some("A record with the same unique value already exists"),
        _ => None,
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = e {
            return ApiError::not_found("Record not found");
        }
        if let Some(msg) = e
            .as_database_error()
            .and_then(|db| db.code())
            .and_then(|code| constraint_message(&code))
        {
            tracing::info!("Constraint violation: {}", e);
            return ApiError::bad_request(msg);
        }
        ApiError::Internal(e.into())
    }
}

/// Malformed bodies, query strings and path segments are client errors with
/// the usual `{"error": ...}` body.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<sqlx::Error>() {
            Ok(sql) => sql.into(),
            Err(other) => match other.downcast::<ApiError>() {
                Ok(api) => api,
                Err(other) => ApiError::Internal(other),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(cause) = &self {
            tracing::error!("Request failed: {:#}", cause);
        }
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_codes_map_to_fixed_messages() {
        assert!(constraint_message("23503").is_some());
        assert!(constraint_message("23514").is_some());
        assert!(constraint_message("23505").is_some());
        assert!(constraint_message("42P01").is_none());
    }

    #[test]
    fn row_not_found_is_404() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn anyhow_keeps_api_errors() {
        let err: ApiError = anyhow::Error::new(ApiError::bad_request("nope")).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "nope");

        let err: ApiError = anyhow::anyhow!("boom").into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn anyhow_wrapped_row_not_found_is_404() {
        let err: ApiError = anyhow::Error::new(sqlx::Error::RowNotFound).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
