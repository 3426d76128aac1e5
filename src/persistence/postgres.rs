//! PostgreSQL session lookup.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::auth::SessionLookup;
use crate::config::ServerConfig;
use crate::domain::UserId;
use crate::error::HubError;

/// Session lookup against the `sessions` table using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Persistence`] if the database is unreachable.
    pub async fn connect(config: &ServerConfig) -> Result<Self, HubError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        tracing::info!(
            max_connections = config.database_max_connections,
            "session store connected"
        );
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl SessionLookup for PgSessionStore {
    async fn resolve(&self, token: &str) -> Result<Option<UserId>, HubError> {
        let user_id = sqlx::query_scalar::<_, String>(
            "SELECT user_id::text FROM sessions \
             WHERE token = $1 AND (expires_at IS NULL OR expires_at > NOW())",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user_id.map(UserId::from))
    }
}
