//! Handler模块

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use common::errors::AppError;
use common::extract::AppJson;
use common::models::{
    MessageResponse, QueryRequest, QueryResult, Statistics, TemplateDefinition, TemplateList,
    TemplateQueryRequest, TemplateSummary,
};
use crate::state::AppState;

const SERVICE_NAME: &str = "nlsql-service";

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// 列出所有查询模板
#[utoipa::path(
    get,
    path = "/templates",
    tag = "templates",
    responses(
        (status = 200, description = "模板列表", body = TemplateList)
    )
)]
pub async fn list_templates(State(state): State<AppState>) -> Json<TemplateList> {
    Json(TemplateList {
        templates: state.service.list_templates().await,
    })
}

/// 注册查询模板（同名覆盖）
#[utoipa::path(
    post,
    path = "/templates",
    tag = "templates",
    request_body = TemplateDefinition,
    responses(
        (status = 200, description = "模板已注册", body = MessageResponse),
        (status = 400, description = "模板定义无效或请求体格式错误")
    )
)]
pub async fn add_template(
    State(state): State<AppState>,
    AppJson(req): AppJson<TemplateDefinition>,
) -> Result<Json<MessageResponse>, AppError> {
    let name = req.name.clone();
    state.service.add_template(req).await?;
    Ok(Json(MessageResponse {
        message: format!("Template '{}' added successfully", name),
    }))
}

/// 根据名称获取模板
#[utoipa::path(
    get,
    path = "/templates/{name}",
    tag = "templates",
    params(
        ("name" = String, Path, description = "模板名称")
    ),
    responses(
        (status = 200, description = "模板详情", body = TemplateSummary),
        (status = 404, description = "模板未找到")
    )
)]
pub async fn get_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<TemplateSummary>, AppError> {
    Ok(Json(state.service.get_template(&name).await?))
}

/// 执行自然语言查询
#[utoipa::path(
    post,
    path = "/query",
    tag = "query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "查询执行成功", body = QueryResult),
        (status = 400, description = "翻译或执行失败")
    )
)]
pub async fn process_query(
    State(state): State<AppState>,
    AppJson(req): AppJson<QueryRequest>,
) -> Result<Json<QueryResult>, AppError> {
    req.validate()?;
    let result = state.service.process_query(&req.query, req.use_cache).await?;
    Ok(Json(result))
}

/// 使用模板执行查询
#[utoipa::path(
    post,
    path = "/query/template",
    tag = "query",
    request_body = TemplateQueryRequest,
    responses(
        (status = 200, description = "查询执行成功", body = QueryResult),
        (status = 400, description = "参数缺失、翻译或执行失败"),
        (status = 404, description = "模板未找到")
    )
)]
pub async fn process_template(
    State(state): State<AppState>,
    AppJson(req): AppJson<TemplateQueryRequest>,
) -> Result<Json<QueryResult>, AppError> {
    req.validate()?;
    let result = state
        .service
        .process_template(&req.template_name, &req.parameters)
        .await?;
    Ok(Json(result))
}

/// 模板使用统计
#[utoipa::path(
    get,
    path = "/statistics",
    tag = "statistics",
    responses(
        (status = 200, description = "统计信息", body = Statistics)
    )
)]
pub async fn statistics(State(state): State<AppState>) -> Json<Statistics> {
    Json(state.service.statistics().await)
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}
