use crate::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}

/// Create the `jobs` table and its query indexes if they are missing.
///
/// Scraped text columns are unbounded; tracking URLs alone run past 500 chars.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id          VARCHAR(50)  PRIMARY KEY,
            title       TEXT         NOT NULL,
            company     TEXT         NOT NULL,
            location    TEXT         NOT NULL,
            salary      TEXT,
            description TEXT,
            url         TEXT         NOT NULL,
            date_posted TIMESTAMPTZ  NOT NULL,
            date_found  TIMESTAMPTZ  NOT NULL DEFAULT NOW(),
            is_remote   BOOLEAN      NOT NULL DEFAULT FALSE,
            is_fulltime BOOLEAN      NOT NULL DEFAULT FALSE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Tables created with bounded VARCHAR columns are widened in place.
    sqlx::query(
        r#"
        ALTER TABLE jobs
            ALTER COLUMN title    TYPE TEXT,
            ALTER COLUMN company  TYPE TEXT,
            ALTER COLUMN location TYPE TEXT,
            ALTER COLUMN salary   TYPE TEXT,
            ALTER COLUMN url      TYPE TEXT
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS jobs_date_posted_idx ON jobs (date_posted DESC)")
        .execute(pool)
        .await?;

    tracing::info!("Job schema ready");
    Ok(())
}
