// crates/hearth-core/src/db.rs

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};

const CONNECT_ATTEMPTS: u32 = 3;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Establishes the warehouse connection pool.
///
/// Connecting is the only retried operation in the pipeline: a small fixed
/// number of attempts with sleep-based backoff, then fatal to the run.
pub async fn connect(database_url: &str) -> Result<PgPool> {
    let mut attempt = 1;
    loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect(database_url)
            .await
        {
            Ok(pool) => {
                info!("warehouse connection pool established");
                return Ok(pool);
            }
            Err(err) if attempt < CONNECT_ATTEMPTS => {
                warn!(attempt, error = %err, "warehouse connection failed, retrying");
                tokio::time::sleep(RETRY_BACKOFF).await;
                attempt += 1;
            }
            Err(err) => return Err(PipelineError::Connectivity(err)),
        }
    }
}
