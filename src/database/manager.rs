use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use super::memory::MemoryDocumentStore;
use super::postgres::PgDocumentStore;
use super::store::DocumentStore;

/// Errors from the document database boundary
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Opens the configured document store
pub struct DatabaseManager;

impl DatabaseManager {
    /// Postgres when a URL is configured, the in-process store otherwise.
    pub async fn open(config: &DatabaseConfig) -> Result<Arc<dyn DocumentStore>, DatabaseError> {
        match config.url.as_deref() {
            Some(url) => {
                let pool = Self::connect(url, config).await?;
                let store = PgDocumentStore::new(pool);
                store.ensure_schema().await?;
                info!("Using Postgres document store");
                Ok(Arc::new(store))
            }
            None => {
                tracing::warn!("DATABASE_URL not set, content is kept in memory and lost on restart");
                Ok(Arc::new(MemoryDocumentStore::new()))
            }
        }
    }

    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let parsed = url::Url::parse(url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        info!(
            host = parsed.host_str().unwrap_or("unknown"),
            database = parsed.path().trim_start_matches('/'),
            "Created database pool"
        );
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[tokio::test]
    async fn falls_back_to_memory_without_url() {
        let config = AppConfig::development().database;
        let store = DatabaseManager::open(&config).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
        store.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn rejects_non_postgres_urls() {
        let config = AppConfig::development().database;
        let err = DatabaseManager::connect("mysql://localhost/cms", &config).await.unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidDatabaseUrl));

        let err = DatabaseManager::connect("not a url", &config).await.unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidDatabaseUrl));
    }
}
