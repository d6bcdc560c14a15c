pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::config::Config;
use crate::registry::ProjectRegistry;
use crate::search::SearchService;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchService>,
    pub registry: Arc<ProjectRegistry>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(search: Arc<SearchService>, registry: Arc<ProjectRegistry>, config: Arc<Config>) -> Self {
        Self {
            search,
            registry,
            config,
        }
    }
}
