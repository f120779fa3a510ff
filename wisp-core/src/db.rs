use std::str::FromStr;

use crate::config::DatabaseConfig;
use crate::error::WispError;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};

/// Connect to the server named by `url`, selecting the configured database.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, WispError> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| WispError::Other("database url is not set".to_string()))?;

    let mut options = PgConnectOptions::from_str(url)?;
    if let Some(name) = config.name.as_deref() {
        options = options.database(name);
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Create the shared documents table if it does not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            seq         BIGSERIAL PRIMARY KEY,
            id          UUID NOT NULL UNIQUE,
            collection  TEXT NOT NULL,
            body        JSONB NOT NULL,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS documents_collection_seq_idx ON documents (collection, seq)")
        .execute(pool)
        .await?;

    Ok(())
}
