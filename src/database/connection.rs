// Database Connection Management
//
// Handles PostgreSQL connection pooling using tokio-postgres and deadpool.
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime, Timeouts};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::config::Host;

const DEFAULT_PORT: u16 = 5432;

/// Connection settings for the trade store pool.
#[derive(Clone)]
pub struct DatabaseConfig {
    pg: tokio_postgres::Config,
    pub max_size: usize,
    pub timeouts: Timeouts,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("target", &self.target())
            .field("user", &self.pg.get_user())
            .field("password", &self.pg.get_password().map(|_| "<redacted>"))
            .field("max_size", &self.max_size)
            .finish()
    }
}

impl DatabaseConfig {
    /// Parse a `postgres://` or `postgresql://` URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = url::Url::parse(url).context("Failed to parse database URL")?;
        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            anyhow::bail!("Unsupported database URL scheme '{}'", parsed.scheme());
        }

        let pg = tokio_postgres::Config::from_str(url).context("Invalid database URL")?;

        // One trader writes one row per cycle
        Ok(Self {
            pg,
            max_size: 4,
            timeouts: Timeouts {
                wait: Some(Duration::from_secs(30)),
                create: Some(Duration::from_secs(30)),
                recycle: Some(Duration::from_secs(30)),
            },
        })
    }

    /// `host:port/dbname` without credentials, for logs.
    pub fn target(&self) -> String {
        let host = match self.pg.get_hosts().first() {
            Some(Host::Tcp(host)) => host.clone(),
            Some(Host::Unix(path)) => path.to_string_lossy().into_owned(),
            None => "localhost".to_string(),
        };
        let port = self.pg.get_ports().first().copied().unwrap_or(DEFAULT_PORT);
        format!("{}:{}/{}", host, port, self.pg.get_dbname().unwrap_or_default())
    }
}

/// Pooled PostgreSQL connection
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: Pool,
}

impl DatabaseConnection {
    /// Build the pool and verify it can reach the server.
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        tracing::info!(target_db = %config.target(), "🔌 Connecting to database");

        let connector = TlsConnector::builder().build().context("Failed to build TLS connector")?;
        let manager = Manager::from_config(
            config.pg,
            MakeTlsConnector::new(connector),
            ManagerConfig { recycling_method: RecyclingMethod::Fast },
        );

        let pool = Pool::builder(manager)
            .max_size(config.max_size)
            .wait_timeout(config.timeouts.wait)
            .create_timeout(config.timeouts.create)
            .recycle_timeout(config.timeouts.recycle)
            .runtime(Runtime::Tokio1)
            .build()
            .context("Failed to create database pool")?;

        let connection = Self { pool };
        connection.health_check().await?;
        tracing::info!("✅ Database connection established");
        Ok(connection)
    }

    pub async fn from_url(url: &str) -> Result<Self> {
        Self::new(DatabaseConfig::from_url(url)?).await
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Round-trip a trivial query through a pooled client.
    pub async fn health_check(&self) -> Result<()> {
        let client = self.pool.get().await.context("No database connection available")?;
        client.query_one("SELECT 1", &[]).await.context("Database health check failed")?;
        Ok(())
    }
}
