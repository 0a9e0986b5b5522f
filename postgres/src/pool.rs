//! Connection pool construction.
//!
//! The pool is built once by the composition root and shared by every store
//! call; there is no process-wide pool singleton.

use slot_booking_core::StoreError;
use sqlx::Executor;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Bounds and timeouts for the `PostgreSQL` connection pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Upper bound on open connections
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// How long to wait for a connection before failing
    pub connect_timeout: Duration,
    /// Idle connections older than this are closed
    pub idle_timeout: Duration,
    /// `statement_timeout` set on every new connection; bounds lock waits too
    pub statement_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            statement_timeout: Duration::from_secs(60),
        }
    }
}

impl PoolConfig {
    /// Pool options for this configuration.
    ///
    /// Connections are health-checked before being handed out, so a broken
    /// idle connection is discarded rather than failing a request.
    #[must_use]
    pub fn options(&self) -> PgPoolOptions {
        let statement_timeout_ms = self.statement_timeout.as_millis();

        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.connect_timeout)
            .idle_timeout(Some(self.idle_timeout))
            .test_before_acquire(true)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    let sql = format!("SET statement_timeout = {statement_timeout_ms}");
                    conn.execute(sql.as_str()).await?;
                    Ok(())
                })
            })
    }

    /// Open a pool against `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the database cannot be reached.
    pub async fn connect(&self, database_url: &str) -> Result<PgPool, StoreError> {
        let pool = self
            .options()
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to connect: {e}")))?;

        tracing::info!(
            max_connections = self.max_connections,
            min_connections = self.min_connections,
            "Database pool ready"
        );
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PoolConfig::default();

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.idle_timeout, Duration::from_secs(600));
        assert_eq!(config.statement_timeout, Duration::from_secs(60));
    }

    #[test]
    fn options_carry_pool_bounds() {
        let config = PoolConfig {
            max_connections: 4,
            min_connections: 2,
            ..PoolConfig::default()
        };

        let options = config.options();

        assert_eq!(options.get_max_connections(), 4);
        assert_eq!(options.get_min_connections(), 2);
        assert!(options.get_test_before_acquire());
    }
}
