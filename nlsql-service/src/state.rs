//! Application state for the NLSQL service.

use crate::service::NlSqlService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: NlSqlService,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(service: NlSqlService) -> Self {
        Self { service }
    }
}
