//! 自然语言 SQL 查询服务
//!
//! 提供自然语言转 SQL 的查询功能，包括：
//! - 读取数据库结构并交由大模型生成 SQL
//! - 在本地 SQLite 库上执行生成的 SQL
//! - 命名查询模板与使用统计

mod handlers;
mod routes;
mod service;
mod state;
mod store;
mod templates;
mod translator;

use std::sync::Arc;

use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use common::config::{load_dotenv, AppConfig};
use common::middleware::request_id::request_id_middleware;
use service::NlSqlService;
use state::AppState;
use store::Store;
use templates::TemplateRegistry;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use translator::OpenAiTranslator;
use utoipa::OpenApi;

const SERVICE_NAME: &str = "nlsql-service";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "NLSQL API",
        version = "0.1.0",
        description = "自然语言转 SQL 查询服务"
    ),
    paths(
        handlers::health_check,
        handlers::list_templates,
        handlers::add_template,
        handlers::get_template,
        handlers::process_query,
        handlers::process_template,
        handlers::statistics,
    ),
    components(schemas(
        common::models::QueryRequest,
        common::models::TemplateQueryRequest,
        common::models::QueryResult,
        common::models::QueryMetadata,
        common::models::TemplateDefinition,
        common::models::TemplateSummary,
        common::models::TemplateList,
        common::models::Statistics,
        common::models::MessageResponse,
        handlers::HealthResponse,
    )),
    tags(
        (name = "query", description = "自然语言查询端点"),
        (name = "templates", description = "查询模板端点"),
        (name = "statistics", description = "使用统计端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 不覆盖已有环境变量
    load_dotenv();

    // 加载配置
    let config = AppConfig::load();

    // 初始化日志追踪（RUST_LOG 优先，其次 LOG_LEVEL）
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .init();

    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY 未设置，查询请求将失败");
    }

    // 初始化存储与组件
    let store = Store::open(&config.db_path)
        .await
        .context("初始化数据库失败")?;
    let translator = OpenAiTranslator::new(&config).context("创建模型客户端失败")?;
    let service = NlSqlService::new(
        store,
        Arc::new(translator),
        Arc::new(TemplateRegistry::new()),
    );

    // 创建路由
    let app = create_router(AppState::new(service));

    // 启动服务
    let addr = config.bind_addr();
    info!(service = SERVICE_NAME, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {}", addr))?;
    axum::serve(listener, app).await.context("服务启动失败")?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
