//! Natural-language query models.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// One result row: column name to scalar value, in the statement's column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Request body for `POST /query`.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct QueryRequest {
    /// Natural-language question.
    #[validate(length(min = 1, message = "query is required"))]
    pub query: String,

    /// Recorded in the result metadata; no caching takes place.
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,

    /// Accepted for compatibility, currently ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_format: Option<String>,
}

fn default_use_cache() -> bool {
    true
}

/// Request body for `POST /query/template`.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct TemplateQueryRequest {
    #[validate(length(min = 1, message = "template_name is required"))]
    pub template_name: String,

    /// Placeholder values keyed by parameter name.
    #[serde(default)]
    pub parameters: HashMap<String, String>,

    /// Accepted for compatibility, currently ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_format: Option<String>,
}

/// Response envelope for one processed query.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueryResult {
    /// The natural-language text that was translated.
    pub query: String,

    /// SQL produced by the model and executed verbatim.
    pub sql: String,

    /// Materialised result rows.
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<Row>,

    pub metadata: QueryMetadata,
}

/// Timing and bookkeeping for a [`QueryResult`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueryMetadata {
    /// Echo of the request's `use_cache` flag.
    pub cached: bool,

    /// Wall-clock seconds for translate + execute, rounded to milliseconds.
    pub execution_time: f64,

    /// Number of rows in `results`.
    pub row_count: usize,
}

impl QueryResult {
    /// Assembles a result, deriving `row_count` from the rows.
    pub fn new(
        query: impl Into<String>,
        sql: impl Into<String>,
        results: Vec<Row>,
        cached: bool,
        elapsed: std::time::Duration,
    ) -> Self {
        let row_count = results.len();
        Self {
            query: query.into(),
            sql: sql.into(),
            results,
            metadata: QueryMetadata {
                cached,
                execution_time: round_millis(elapsed.as_secs_f64()),
                row_count,
            },
        }
    }
}

fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}
