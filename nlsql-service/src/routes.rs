//! 路由模块

use axum::{
    routing::{get, post},
    Router,
};
use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/templates",
            get(handlers::list_templates).post(handlers::add_template),
        )
        .route("/templates/{name}", get(handlers::get_template))
        .route("/query", post(handlers::process_query))
        .route("/query/template", post(handlers::process_template))
        .route("/statistics", get(handlers::statistics))
}
