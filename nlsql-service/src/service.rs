//! 查询编排服务模块
//!
//! 组合 Translator → Store，并负责模板解析与使用统计汇总。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use common::errors::AppResult;
use common::models::{QueryResult, Statistics, TemplateDefinition, TemplateSummary};

use crate::store::Store;
use crate::templates::TemplateRegistry;
use crate::translator::SqlTranslator;

/// 自然语言查询服务
#[derive(Clone)]
pub struct NlSqlService {
    store: Store,
    translator: Arc<dyn SqlTranslator>,
    templates: Arc<TemplateRegistry>,
}

impl NlSqlService {
    /// 创建新的查询服务实例
    pub fn new(
        store: Store,
        translator: Arc<dyn SqlTranslator>,
        templates: Arc<TemplateRegistry>,
    ) -> Self {
        Self {
            store,
            translator,
            templates,
        }
    }

    /// 处理自然语言查询
    ///
    /// `use_cache` 仅写入结果元数据，不做任何缓存。
    pub async fn process_query(&self, nl_query: &str, use_cache: bool) -> AppResult<QueryResult> {
        let start = Instant::now();

        let schema = self.store.schema().await?;
        let sql = self.translator.translate(nl_query, &schema).await?;
        let rows = self.store.execute(&sql).await?;

        let result = QueryResult::new(nl_query, sql, rows, use_cache, start.elapsed());
        tracing::info!(
            query = %nl_query,
            sql = %result.sql,
            row_count = result.metadata.row_count,
            execution_time = result.metadata.execution_time,
            "查询处理完成"
        );
        Ok(result)
    }

    /// 使用模板处理查询
    pub async fn process_template(
        &self,
        template_name: &str,
        parameters: &HashMap<String, String>,
    ) -> AppResult<QueryResult> {
        let nl_query = self.templates.resolve(template_name, parameters).await?;
        self.process_query(&nl_query, true).await
    }

    /// 注册查询模板
    pub async fn add_template(&self, definition: TemplateDefinition) -> AppResult<()> {
        self.templates.register(definition).await
    }

    /// 获取单个模板
    pub async fn get_template(&self, name: &str) -> AppResult<TemplateSummary> {
        Ok(self.templates.get(name).await?.summary())
    }

    /// 列出所有模板
    pub async fn list_templates(&self) -> Vec<TemplateSummary> {
        self.templates.list().await
    }

    /// 模板使用统计
    pub async fn statistics(&self) -> Statistics {
        Statistics::from_templates(self.templates.list().await)
    }
}
