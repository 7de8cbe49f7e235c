//! Query template models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for `POST /templates`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct TemplateDefinition {
    /// Unique key; re-registering a name replaces the previous template.
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Natural-language text with `{param}` placeholders.
    #[validate(length(min = 1, message = "template text is required"))]
    pub template: String,

    /// Placeholders that every invocation must supply.
    #[serde(default)]
    pub parameters: Vec<String>,
}

/// Listing view of a registered template.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TemplateSummary {
    pub name: String,
    pub description: String,
    pub parameters: Vec<String>,
    pub usage_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

/// Response body for `GET /templates`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TemplateList {
    pub templates: Vec<TemplateSummary>,
}

/// Response body for `GET /statistics`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Statistics {
    pub total_templates: usize,
    pub total_template_usage: u64,
    pub templates: Vec<TemplateSummary>,
}

impl Statistics {
    /// Aggregates a registry snapshot.
    pub fn from_templates(templates: Vec<TemplateSummary>) -> Self {
        Self {
            total_templates: templates.len(),
            total_template_usage: templates.iter().map(|t| t.usage_count).sum(),
            templates,
        }
    }
}

/// Plain acknowledgement body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
