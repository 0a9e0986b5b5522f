//! Configuration management for the booking server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Blank variables count as unset.

use slot_booking_postgres::PoolConfig;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `PostgreSQL` configuration
    pub database: DatabaseConfig,
    /// Redpanda/Kafka notification configuration
    pub redpanda: RedpandaConfig,
    /// HTTP server configuration
    pub server: ServerConfig,
}

/// `PostgreSQL` configuration
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Connection URL (may carry credentials; log [`Self::masked_url`] instead)
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections in the pool
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    pub connect_timeout: u64,
    /// Idle timeout in seconds
    pub idle_timeout: u64,
    /// Statement timeout in seconds
    pub statement_timeout: u64,
}

/// Redpanda/Kafka configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedpandaConfig {
    /// Broker addresses (comma-separated); empty disables publishing
    pub brokers: String,
    /// Topic for booking notifications; empty disables publishing
    pub topic: String,
    /// Producer acknowledgment mode
    pub producer_acks: String,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Tracing filter directive; falls back to `RUST_LOG`, then the default
    pub log_level: Option<String>,
    /// Seconds to wait for in-flight notifications at shutdown
    pub shutdown_timeout: u64,
}

impl Config {
    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            database: DatabaseConfig {
                url: var("DATABASE_URL").unwrap_or_else(|| assemble_database_url(&var)),
                max_connections: parse_or(&var, "DATABASE_MAX_CONNECTIONS", 10),
                min_connections: parse_or(&var, "DATABASE_MIN_CONNECTIONS", 1),
                connect_timeout: parse_or(&var, "DATABASE_CONNECT_TIMEOUT", 30),
                idle_timeout: parse_or(&var, "DATABASE_IDLE_TIMEOUT", 600),
                statement_timeout: parse_or(&var, "DATABASE_STATEMENT_TIMEOUT", 60),
            },
            redpanda: RedpandaConfig {
                brokers: var("REDPANDA_BROKERS").unwrap_or_default(),
                topic: var("BOOKING_EVENTS_TOPIC").unwrap_or_default(),
                producer_acks: var("REDPANDA_PRODUCER_ACKS").unwrap_or_else(|| "all".to_string()),
            },
            server: ServerConfig {
                host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&var, "PORT", 3000),
                log_level: var("LOG_LEVEL"),
                shutdown_timeout: parse_or(&var, "SHUTDOWN_TIMEOUT", 30),
            },
        }
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    var(key).and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

fn assemble_database_url<F>(var: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let user = var("DB_USER").unwrap_or_else(|| "postgres".to_string());
    let password = var("DB_PASSWORD").unwrap_or_default();
    let host = var("DB_HOST").unwrap_or_else(|| "localhost".to_string());
    let port = var("DB_PORT").unwrap_or_else(|| "5432".to_string());
    let name = var("DB_NAME").unwrap_or_else(|| "booking".to_string());
    let ssl = var("DB_SSL").is_some_and(|v| v.trim() == "true");

    let mut url = format!("postgres://{user}:{password}@{host}:{port}/{name}");
    if ssl {
        url.push_str("?sslmode=require");
    }
    url
}

impl DatabaseConfig {
    /// Pool settings for this configuration.
    #[must_use]
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout: Duration::from_secs(self.connect_timeout),
            idle_timeout: Duration::from_secs(self.idle_timeout),
            statement_timeout: Duration::from_secs(self.statement_timeout),
        }
    }

    /// The connection URL with credentials and query parameters removed.
    #[must_use]
    pub fn masked_url(&self) -> String {
        let without_query = self.url.split('?').next().unwrap_or_default();
        match (without_query.split_once("://"), without_query.rsplit_once('@')) {
            (Some((scheme, _)), Some((_, target))) => format!("{scheme}://***@{target}"),
            _ => without_query.to_string(),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.masked_url())
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout", &self.connect_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .field("statement_timeout", &self.statement_timeout)
            .finish()
    }
}

impl RedpandaConfig {
    /// Whether both brokers and a topic are configured.
    #[must_use]
    pub fn publishing_enabled(&self) -> bool {
        !self.brokers.trim().is_empty() && !self.topic.trim().is_empty()
    }
}

impl ServerConfig {
    /// `host:port` to bind the listener to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Shutdown flush bound.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}
