use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

pub type DbPool = sqlx::SqlitePool;

/// Pool sizing and sqlite pragma knobs for the analytics store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout_ms: u32,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self { max_connections: 5, acquire_timeout_secs: 30, busy_timeout_ms: 5_000 }
    }
}

impl ConnectionSettings {
    /// A single connection keeps a `sqlite::memory:` database alive for the
    /// lifetime of the pool; more than one would see separate databases.
    pub fn single_connection() -> Self {
        Self { max_connections: 1, ..Self::default() }
    }
}

/// Open a pool with foreign keys enforced, WAL journaling and the configured
/// busy timeout applied to every connection.
pub async fn connect(
    database_url: &str,
    settings: ConnectionSettings,
) -> Result<DbPool, sqlx::Error> {
    let busy_timeout = format!("PRAGMA busy_timeout = {}", settings.busy_timeout_ms);
    SqlitePoolOptions::new()
        .max_connections(settings.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs.max(1)))
        .after_connect(move |conn, _meta| {
            let busy_timeout = busy_timeout.clone();
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query(&busy_timeout).execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}
