//! NLSQL 服务公共模块
//!
//! 包含错误类型、配置加载、统一错误响应、中间件以及对外数据模型。

pub mod config;
pub mod errors;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod response;
