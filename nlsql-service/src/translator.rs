//! Natural language to SQL translation.

use std::time::Duration;

use async_trait::async_trait;
use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::store::SchemaDescription;

/// Sampling temperature for SQL generation.
const TEMPERATURE: f32 = 0.1;
/// Enough for a single short statement.
const MAX_TOKENS: u32 = 150;

/// Turns a question into SQL text for a given schema.
#[async_trait]
pub trait SqlTranslator: Send + Sync {
    /// Returns the raw SQL produced for `nl_query`, trimmed.
    async fn translate(&self, nl_query: &str, schema: &SchemaDescription) -> AppResult<String>;
}

/// Renders the schema as one `- table (col, ...)` line per table.
pub fn describe_schema(schema: &SchemaDescription) -> String {
    let mut description = String::from("Available tables:\n");
    for (table, columns) in schema {
        description.push_str(&format!("- {} ({})\n", table, columns.join(", ")));
    }
    description
}

/// System prompt for the SQL-generation turn.
pub fn build_system_prompt(schema: &SchemaDescription) -> String {
    format!(
        "You are a SQL expert.\n{}\nConvert natural language queries to SQL. \
         Only respond with the SQL query, no explanations.",
        describe_schema(schema)
    )
}

/// Info-string tags accepted right after an opening fence.
const FENCE_LANGUAGE_TAGS: [&str; 4] = ["sql", "sqlite", "postgresql", "mysql"];

/// Removes a surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = rest.strip_suffix("```").unwrap_or(rest);
    strip_language_tag(body).trim()
}

/// Drops a leading language tag (`sql ...` or `sql\n...`); any other first
/// word is part of the statement.
fn strip_language_tag(body: &str) -> &str {
    let tag_end = body.find(char::is_whitespace).unwrap_or(body.len());
    let tag = &body[..tag_end];
    if FENCE_LANGUAGE_TAGS
        .iter()
        .any(|known| tag.eq_ignore_ascii_case(known))
    {
        &body[tag_end..]
    } else {
        body
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Translator backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiTranslator {
    api_key: Option<String>,
    base_url: String,
    model: String,
    client: Client,
}

impl OpenAiTranslator {
    /// Builds the translator; the HTTP client enforces the provider timeout.
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.clone(),
            model: config.openai_model.clone(),
            client,
        })
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> AppResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Translation("OPENAI_API_KEY is not configured".into()))?;

        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Translation("model provider timed out".into())
                } else {
                    AppError::Translation(format!("model provider request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Translation(format!(
                "model provider error ({}): {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            AppError::Translation(format!("invalid model provider response: {}", e))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        let sql = strip_code_fence(&content);
        if sql.is_empty() {
            return Err(AppError::Translation("model provider returned no SQL".into()));
        }
        Ok(sql.to_string())
    }
}

#[async_trait]
impl SqlTranslator for OpenAiTranslator {
    async fn translate(&self, nl_query: &str, schema: &SchemaDescription) -> AppResult<String> {
        let system_prompt = build_system_prompt(schema);

        let sql = self.complete(&system_prompt, nl_query).await.map_err(|e| {
            tracing::error!(operation = "translate", query = %nl_query, error = %e, "Error generating SQL");
            e
        })?;

        tracing::debug!(query = %nl_query, sql = %sql, "Generated SQL");
        Ok(sql)
    }
}
