//! Named query templates.
//!
//! Templates are natural-language macros: resolving one yields text that is
//! translated like any user-typed question, never SQL that runs directly.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use common::errors::{AppError, AppResult};
use common::models::{TemplateDefinition, TemplateSummary};
use tokio::sync::RwLock;
use validator::Validate;

/// A registered template plus its usage counters.
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    pub name: String,
    pub description: String,
    pub template: String,
    pub parameters: BTreeSet<String>,
    pub usage_count: u64,
    pub last_used: Option<DateTime<Utc>>,
}

impl QueryTemplate {
    /// Listing view of this template.
    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.iter().cloned().collect(),
            usage_count: self.usage_count,
            last_used: self.last_used,
        }
    }

    /// Required parameters absent from `supplied`, sorted.
    fn missing_parameters(&self, supplied: &HashMap<String, String>) -> Vec<String> {
        self.parameters
            .iter()
            .filter(|p| !supplied.contains_key(p.as_str()))
            .cloned()
            .collect()
    }

    /// Replaces each `{key}` placeholder with its supplied value.
    ///
    /// Single left-to-right pass: inserted values are never rescanned, and
    /// placeholders without a supplied value are kept verbatim.
    fn substitute(&self, supplied: &HashMap<String, String>) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            let replacement = after
                .find(|c: char| c == '{' || c == '}')
                .filter(|&end| after[end..].starts_with('}'))
                .and_then(|end| supplied.get(&after[..end]).map(|value| (end, value)));

            match replacement {
                Some((end, value)) => {
                    out.push_str(value);
                    rest = &after[end + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// In-memory template store.
///
/// Reads share the lock; `resolve` takes it exclusively so concurrent counter
/// increments are never lost.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: RwLock<HashMap<String, QueryTemplate>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `definition`, replacing any template with the same name.
    pub async fn register(&self, definition: TemplateDefinition) -> AppResult<()> {
        definition.validate().map_err(|e| {
            tracing::error!(operation = "register_template", template = %definition.name, error = %e, "Invalid template definition");
            AppError::from(e)
        })?;

        let template = QueryTemplate {
            name: definition.name.clone(),
            description: definition.description,
            template: definition.template,
            parameters: definition.parameters.into_iter().collect(),
            usage_count: 0,
            last_used: None,
        };

        let replaced = self
            .templates
            .write()
            .await
            .insert(definition.name.clone(), template)
            .is_some();

        tracing::info!(template = %definition.name, replaced, "Template registered");
        Ok(())
    }

    /// Returns a copy of the named template.
    pub async fn get(&self, name: &str) -> AppResult<QueryTemplate> {
        self.templates
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::TemplateNotFound(name.to_string()))
    }

    /// Snapshot of every template, sorted by name.
    pub async fn list(&self) -> Vec<TemplateSummary> {
        let mut summaries: Vec<TemplateSummary> = self
            .templates
            .read()
            .await
            .values()
            .map(QueryTemplate::summary)
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// Substitutes `parameters` into the named template and records the use.
    ///
    /// Fails without touching the counters when the template is unknown or
    /// any required parameter is absent.
    pub async fn resolve(
        &self,
        name: &str,
        parameters: &HashMap<String, String>,
    ) -> AppResult<String> {
        let mut templates = self.templates.write().await;

        let template = templates.get_mut(name).ok_or_else(|| {
            tracing::error!(operation = "resolve_template", template = %name, "Template not found");
            AppError::TemplateNotFound(name.to_string())
        })?;

        let missing = template.missing_parameters(parameters);
        if !missing.is_empty() {
            tracing::error!(operation = "resolve_template", template = %name, missing = ?missing, "Missing template parameters");
            return Err(AppError::MissingParameters(missing));
        }

        let text = template.substitute(parameters);
        template.usage_count += 1;
        template.last_used = Some(Utc::now());

        tracing::debug!(template = %name, usage_count = template.usage_count, "Template resolved");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn definition(name: &str, template: &str, parameters: &[&str]) -> TemplateDefinition {
        TemplateDefinition {
            name: name.to_string(),
            description: format!("{} template", name),
            template: template.to_string(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn registry_with_users_by_age() -> TemplateRegistry {
        let registry = TemplateRegistry::new();
        registry
            .register(definition(
                "users_by_age",
                "show users older than {age} living in {city}",
                &["age", "city"],
            ))
            .await
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_resolve_substitutes_every_placeholder() {
        let registry = registry_with_users_by_age().await;
        let text = registry
            .resolve("users_by_age", &params(&[("age", "30"), ("city", "Paris")]))
            .await
            .unwrap();

        assert_eq!(text, "show users older than 30 living in Paris");
    }

    #[tokio::test]
    async fn test_inserted_values_are_not_rescanned() {
        let registry = TemplateRegistry::new();
        registry
            .register(definition("pair", "first {a} second {b}", &["a", "b"]))
            .await
            .unwrap();
        let supplied = params(&[("a", "{b}"), ("b", "X")]);

        for _ in 0..64 {
            let text = registry.resolve("pair", &supplied).await.unwrap();
            assert_eq!(text, "first {b} second X");
        }
    }

    #[test]
    fn test_substitute_edge_cases() {
        let template = QueryTemplate {
            name: "t".into(),
            description: String::new(),
            template: "{a} and {a}, {unknown}, {{a}}, {open".into(),
            parameters: BTreeSet::new(),
            usage_count: 0,
            last_used: None,
        };

        assert_eq!(
            template.substitute(&params(&[("a", "1")])),
            "1 and 1, {unknown}, {1}, {open"
        );
    }

    #[tokio::test]
    async fn test_missing_parameters_names_complete_set() {
        let registry = registry_with_users_by_age().await;
        let err = registry
            .resolve("users_by_age", &params(&[("unrelated", "x")]))
            .await
            .unwrap_err();

        match err {
            AppError::MissingParameters(missing) => assert_eq!(missing, vec!["age", "city"]),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(registry.get("users_by_age").await.unwrap().usage_count, 0);
    }

    #[tokio::test]
    async fn test_missing_parameters_names_only_absent_ones() {
        let registry = registry_with_users_by_age().await;
        let err = registry
            .resolve("users_by_age", &params(&[("age", "30")]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::MissingParameters(ref m) if m == &vec!["city".to_string()]));
    }

    #[tokio::test]
    async fn test_resolve_counts_only_the_used_template() {
        let registry = registry_with_users_by_age().await;
        registry
            .register(definition("top_products", "top {n} products", &["n"]))
            .await
            .unwrap();

        registry
            .resolve("users_by_age", &params(&[("age", "30"), ("city", "Oslo")]))
            .await
            .unwrap();

        let used = registry.get("users_by_age").await.unwrap();
        assert_eq!(used.usage_count, 1);
        assert!(used.last_used.is_some());

        let untouched = registry.get("top_products").await.unwrap();
        assert_eq!(untouched.usage_count, 0);
        assert!(untouched.last_used.is_none());
    }

    #[tokio::test]
    async fn test_unknown_template() {
        let registry = TemplateRegistry::new();
        assert!(matches!(
            registry.get("nope").await,
            Err(AppError::TemplateNotFound(_))
        ));
        assert!(matches!(
            registry.resolve("nope", &HashMap::new()).await,
            Err(AppError::TemplateNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_register_overwrites_and_resets() {
        let registry = registry_with_users_by_age().await;
        registry
            .resolve("users_by_age", &params(&[("age", "1"), ("city", "x")]))
            .await
            .unwrap();

        registry
            .register(definition("users_by_age", "users aged {age}", &["age"]))
            .await
            .unwrap();

        let template = registry.get("users_by_age").await.unwrap();
        assert_eq!(template.template, "users aged {age}");
        assert_eq!(template.usage_count, 0);
        assert_eq!(registry.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_register_rejects_empty_name() {
        let registry = TemplateRegistry::new();
        let err = registry
            .register(definition("", "anything", &[]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_snapshot() {
        let registry = registry_with_users_by_age().await;
        let list = registry.list().await;

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "users_by_age");
        assert_eq!(list[0].parameters, vec!["age", "city"]);
        assert_eq!(list[0].usage_count, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolve_loses_no_updates() {
        let registry = Arc::new(registry_with_users_by_age().await);
        let supplied = Arc::new(params(&[("age", "30"), ("city", "Rome")]));

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let supplied = Arc::clone(&supplied);
                tokio::spawn(async move { registry.resolve("users_by_age", &supplied).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(registry.get("users_by_age").await.unwrap().usage_count, 100);
    }
}
