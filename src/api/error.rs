//! API error type and its JSON body.
//!
//! Every failure answers `{"success": false, "error": <message>, "code": <CODE>}`.
//! Internal errors are logged and never leak their detail.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::csv_exchange::CsvError;
use crate::db::DatabaseError;
use crate::prescription::RenderError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "Erro interno do servidor".to_string(),
                )
            }
        };

        let body = ErrorBody {
            success: false,
            error: message,
            code,
        };
        (status, Json(body)).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => ApiError::NotFound(match entity_type.as_str() {
                "patient" => "Paciente não encontrado".to_string(),
                "medication" => format!("Medicamento ID {id} não encontrado"),
                "prescription" => "Receita não encontrada".to_string(),
                other => format!("{other} {id} não encontrado"),
            }),
            DatabaseError::ConstraintViolation(msg) => ApiError::BadRequest(msg),
            DatabaseError::Sqlite(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::EmptyMedications => {
                ApiError::BadRequest("Pelo menos um medicamento é obrigatório".into())
            }
            RenderError::MissingStartDate => ApiError::BadRequest("Data inicial é obrigatória".into()),
            RenderError::InvalidRepeatCount(_) | RenderError::DateOutOfRange { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            RenderError::Pdf(_) | RenderError::Io(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<CsvError> for ApiError {
    fn from(err: CsvError) -> Self {
        match err {
            CsvError::MissingContent => ApiError::BadRequest(err.to_string()),
            CsvError::Csv(e) => ApiError::BadRequest(format!("CSV inválido: {e}")),
            CsvError::Database(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("render task failed: {err}"))
    }
}
