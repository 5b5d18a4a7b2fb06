//! Database connection primitives shared by the server and integration tests.

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use thiserror::Error;
use tracing::debug;

/// Shared connection pool alias.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing: set {0}")]
    MissingUrl(String),
    #[error("invalid {key}: {value}")]
    InvalidSetting { key: &'static str, value: String },
    #[error("database connection failed")]
    Connect(#[from] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Environment-driven connection settings.
#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    env_key: String,
    max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            env_key: "DATABASE_URL".to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl DatabaseSettings {
    pub fn new(env_key: impl Into<String>) -> Self {
        Self {
            env_key: env_key.into(),
            ..Self::default()
        }
    }

    /// Reads `DATABASE_MAX_CONNECTIONS` on top of the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let mut settings = Self::default();
        if let Some(raw) = lookup("DATABASE_MAX_CONNECTIONS") {
            settings.max_connections = parse_max_connections(&raw)?;
        }
        Ok(settings)
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }

    pub fn database_url(&self) -> DbResult<String> {
        std::env::var(&self.env_key).map_err(|_| DbError::MissingUrl(self.env_key.clone()))
    }
}

fn parse_max_connections(raw: &str) -> DbResult<u32> {
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(DbError::InvalidSetting {
            key: "DATABASE_MAX_CONNECTIONS",
            value: raw.to_string(),
        }),
    }
}

/// Open a pool using the URL named by `settings`.
pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let url = settings.database_url()?;
    connect_url(&url, settings.max_connections).await
}

pub async fn connect_url(url: &str, max_connections: u32) -> DbResult<DbPool> {
    let mut options = ConnectOptions::new(url.to_owned());
    options
        .max_connections(max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    debug!(max_connections, "opening database pool");
    Ok(Database::connect(options).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_url_names_the_variable() {
        let settings = DatabaseSettings::new("PLATFORM_DB_TEST_UNSET_URL");
        let err = settings.database_url().unwrap_err();
        assert_eq!(
            err.to_string(),
            "database url missing: set PLATFORM_DB_TEST_UNSET_URL"
        );
    }

    #[test]
    fn max_connections_must_be_positive() {
        assert_eq!(parse_max_connections(" 4 ").unwrap(), 4);
        assert!(parse_max_connections("0").is_err());
        assert!(parse_max_connections("many").is_err());
    }

    #[test]
    fn lookup_overrides_pool_size() {
        let settings = DatabaseSettings::from_lookup(|key| {
            (key == "DATABASE_MAX_CONNECTIONS").then(|| "3".to_string())
        })
        .unwrap();
        assert_eq!(settings.max_connections(), 3);
        let defaults = DatabaseSettings::from_lookup(|_| None).unwrap();
        assert_eq!(defaults.max_connections(), DEFAULT_MAX_CONNECTIONS);
        assert!(
            DatabaseSettings::from_lookup(|_| Some("0".to_string())).is_err()
        );
    }

    #[tokio::test]
    async fn connects_to_in_memory_sqlite() {
        let pool = connect_url("sqlite::memory:", 1).await.unwrap();
        pool.ping().await.unwrap();
    }
}
