//! Application state shared by request handlers.

use std::sync::Arc;

use crate::service::TableService;

/// Shared application state.
///
/// Cloned for each request handler; the service and its account handles are
/// shared behind an `Arc`.
#[derive(Clone, Debug)]
pub struct AppState {
    pub service: Arc<TableService>,
}

impl AppState {
    pub fn new(service: TableService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
