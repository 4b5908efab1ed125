use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;

use crate::models::Applicant;

/// Service-wide error taxonomy, mapped to HTTP at the request boundary.
///
/// NotFound and Conflict are client-correctable and map to 400 with a
/// `{ "msg": ... }` body; Store and Consistency are server faults and map
/// to 500. Consistency marks a dual-entity write that completed on one
/// side only - the reconcile path repairs those.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    Conflict {
        msg: String,
        applicant: Box<Applicant>,
    },
    Consistency(String),
    Store(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "{}", msg),
            AppError::NotFound(msg) => write!(f, "{}", msg),
            AppError::Conflict { msg, .. } => write!(f, "{}", msg),
            AppError::Consistency(msg) => write!(f, "Consistency error: {}", msg),
            AppError::Store(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::Store(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for AppError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AppError::Store(err.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::NotFound(_) | AppError::Conflict { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::Consistency(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Conflict { msg, applicant } => {
                // Existing document returned so duplicate creation stays
                // idempotent for the client.
                HttpResponse::BadRequest().json(serde_json::json!({
                    "msg": msg,
                    "applicant": applicant,
                }))
            }
            AppError::Validation(msg) | AppError::NotFound(msg) => {
                HttpResponse::BadRequest().json(serde_json::json!({ "msg": msg }))
            }
            AppError::Consistency(_) | AppError::Store(_) => HttpResponse::InternalServerError()
                .json(serde_json::json!({
                    "msg": format!("Internal server error: {}", self),
                })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        assert_eq!(
            AppError::Validation("Applicant name is missing".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("no applicant".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn server_errors_map_to_500() {
        assert_eq!(
            AppError::Store("connection reset".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Consistency("job-side write failed".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_message_is_prefixed() {
        let err = AppError::Store("boom".into());
        assert_eq!(err.to_string(), "Database error: boom");
    }
}
