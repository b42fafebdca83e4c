/// Shared application state
use crate::{
    config::ServerConfig,
    services::{AuthService, ResponseCache, SchedulingService},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub auth_service: Arc<AuthService>,
    pub scheduling: SchedulingService,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(pool: SqlitePool, auth_service: Arc<AuthService>, config: ServerConfig) -> Self {
        let cache = config.cache.enabled.then(|| {
            Arc::new(ResponseCache::new(
                config.cache.capacity,
                Duration::from_secs(config.cache.ttl_seconds),
            ))
        });

        Self {
            scheduling: SchedulingService::new(pool.clone(), cache),
            pool,
            auth_service,
            config: Arc::new(config),
        }
    }
}
