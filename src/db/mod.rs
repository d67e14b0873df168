//! Postgres pool setup, embedded migrations and liveness probe.
//!
//! Startup calls [`init_pool`] once; the schema lives in `migrations/` and
//! is applied before the listener binds, so handlers can assume every table
//! exists.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connect with `max_connections` and run pending migrations.
///
/// # Errors
///
/// Returns an error if the connection or a migration fails.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;
    tracing::info!(max_connections, "database ready");

    Ok(pool)
}

/// Round-trip a trivial query; used by `/healthz`.
///
/// # Errors
///
/// Returns an error if no connection can be acquired or the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}
