//! Opens the helpdesk's PostgreSQL store and brings its schema up to date.

use service_core::error::AppError;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::store::{PgStore, Store};

/// Organizations, users, invitations, tickets, assignees and comments.
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Opening helpdesk database pool"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await?;
    tracing::info!(migrations = MIGRATOR.iter().count(), "Helpdesk schema is current");
    Ok(())
}

/// Pool, schema and a health round trip, ready to hand to [`crate::AppState`].
pub async fn open_store(config: &DatabaseConfig) -> Result<PgStore, AppError> {
    let pool = create_pool(config)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;
    run_migrations(&pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;

    let store = PgStore::new(pool);
    store
        .health_check()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Store not ready: {}", e)))?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_covers_every_gateway() {
        let sql: String = MIGRATOR.iter().map(|m| m.sql.to_string()).collect();

        for table in [
            "organizations",
            "users",
            "invitations",
            "tickets",
            "ticket_assignees",
            "comments",
        ] {
            assert!(
                sql.contains(&format!("CREATE TABLE {} (", table)),
                "missing table {}",
                table
            );
        }
        assert!(sql.contains("CREATE UNIQUE INDEX users_email_lower_idx"));
    }

    #[tokio::test]
    #[ignore] // Requires running PostgreSQL
    async fn test_open_store() {
        let config = DatabaseConfig {
            url: "postgres://localhost/helpdesk_test".to_string(),
            max_connections: 5,
            min_connections: 1,
        };

        assert!(open_store(&config).await.is_ok());
    }
}
