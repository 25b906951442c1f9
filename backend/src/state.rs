use std::sync::Arc;

use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, PooledConnection},
};
use tracing::warn;

use crate::{
    auth::jwt::JwtService,
    config::AppConfig,
    db::PgPool,
    error::{AppError, AppResult},
};

pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig, jwt: JwtService) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            jwt,
        }
    }

    /// Checks out a pooled connection, reporting pool pressure when none is free.
    pub fn db(&self) -> AppResult<PgPooledConnection> {
        self.pool.get().map_err(|err| {
            let pool = self.pool.state();
            warn!(
                connections = pool.connections,
                idle = pool.idle_connections,
                error = %err,
                "no database connection available"
            );
            AppError::internal(format!("database pool error: {err}"))
        })
    }
}
