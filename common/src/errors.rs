//! Application error types.
//!
//! One variant per failure kind. Every variant maps to an HTTP status and a
//! stable error code so handlers can simply propagate with `?`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::response::ApiResponse;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced by the NLSQL service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Reading table/column metadata from the store failed.
    #[error("schema introspection failed: {0}")]
    SchemaIntrospection(String),

    /// The store rejected or failed to run a statement.
    #[error("query execution failed: {0}")]
    QueryExecution(String),

    /// The model provider could not produce SQL.
    #[error("failed to generate SQL: {0}")]
    Translation(String),

    #[error("template '{0}' not found")]
    TemplateNotFound(String),

    /// Required template parameters absent from the request (sorted, complete).
    #[error("missing required parameters: {}", .0.join(", "))]
    MissingParameters(Vec<String>),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::TemplateNotFound(_) => StatusCode::NOT_FOUND,
            AppError::SchemaIntrospection(_)
            | AppError::QueryExecution(_)
            | AppError::Translation(_)
            | AppError::MissingParameters(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::SchemaIntrospection(_) => "SCHEMA_INTROSPECTION_ERROR",
            AppError::QueryExecution(_) => "QUERY_EXECUTION_ERROR",
            AppError::Translation(_) => "TRANSLATION_ERROR",
            AppError::TemplateNotFound(_) => "TEMPLATE_NOT_FOUND",
            AppError::MissingParameters(_) => "MISSING_PARAMETERS",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Malformed or ill-typed JSON bodies are client errors like any other
/// validation failure.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::MissingParameters(missing) => ApiResponse::err_with_details(
                self.code(),
                self.to_string(),
                json!({ "missing": missing }),
            ),
            _ => ApiResponse::err(self.code(), self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}
