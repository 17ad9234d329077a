use crate::config::Config;
use crate::error::{Error, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

const CONNECT_ATTEMPTS: u32 = 3;

/// Connects with bounded retry and exponential backoff before giving up with
/// a service-unavailable error.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    let mut last_err = None;
    for attempt in 1..=CONNECT_ATTEMPTS {
        let options = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(10));
        match options.connect(&config.database_url).await {
            Ok(pool) => return Ok(pool),
            Err(err) => {
                tracing::warn!(attempt, error = ?err, "database connection failed");
                last_err = Some(err);
                if attempt < CONNECT_ATTEMPTS {
                    let backoff = Duration::from_millis(500 * 2u64.pow(attempt - 1));
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    tracing::error!(error = ?last_err, "database unreachable after {} attempts", CONNECT_ATTEMPTS);
    Err(Error::DatabaseUnavailable)
}
