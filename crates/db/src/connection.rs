use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use shopbot_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Opens the SQLite pool described by `config`. Pool sizing and the acquire
/// timeout come straight from the config; the busy handler gets the same
/// budget so one knob governs both waits.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let timeout_secs = config.timeout_secs.max(1);
    let busy_timeout_ms = timeout_secs.saturating_mul(1_000);

    SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query(&format!("PRAGMA busy_timeout = {busy_timeout_ms}"))
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(&config.url)
        .await
}

/// Single-connection shared-cache pool for crate-internal tests.
#[cfg(test)]
pub(crate) async fn connect_in_memory() -> Result<DbPool, sqlx::Error> {
    connect(&DatabaseConfig {
        url: "sqlite::memory:?cache=shared".to_owned(),
        max_connections: 1,
        timeout_secs: 5,
    })
    .await
}
