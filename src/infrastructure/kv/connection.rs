use std::time::Duration;

use redis::aio::MultiplexedConnection;
use tokio::time::Instant;

use super::error::KvError;

/// Backoff cap for connection retries (spec: exponential, capped at 30s).
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Connection-level bound for the liveness ping during acquisition.
pub const FAST_PING_TIMEOUT: Duration = Duration::from_millis(500);

/// One pooled connection plus the bookkeeping the pool needs around it.
pub struct PooledConn {
    pub conn: MultiplexedConnection,
    pub created_at: Instant,
    pub last_used: Instant,
}

impl PooledConn {
    /// Open a connection, retrying with exponential backoff capped at 30s.
    ///
    /// Gives up after `max_attempts` and returns the last error.
    pub async fn connect(
        client: &redis::Client,
        max_attempts: u32,
        connect_timeout: Duration,
    ) -> Result<Self, KvError> {
        let mut attempt = 0u32;
        let mut backoff = Duration::from_millis(100);
        loop {
            attempt += 1;
            let result = tokio::time::timeout(
                connect_timeout,
                client.get_multiplexed_tokio_connection(),
            )
            .await;

            match result {
                Ok(Ok(conn)) => {
                    let now = Instant::now();
                    return Ok(Self {
                        conn,
                        created_at: now,
                        last_used: now,
                    });
                }
                Ok(Err(e)) if attempt >= max_attempts => {
                    return Err(KvError::ConnectionFailed(e.to_string()));
                }
                Err(_) if attempt >= max_attempts => {
                    return Err(KvError::ConnectionFailed("connect timed out".into()));
                }
                _ => {
                    tracing::warn!(attempt, "kv connect attempt failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }

    /// Fast liveness check used on acquisition; bounded to ~500ms.
    pub async fn is_alive(&mut self) -> bool {
        let mut conn = self.conn.clone();
        let ping = tokio::time::timeout(FAST_PING_TIMEOUT, async move {
            redis::cmd("PING").query_async::<String>(&mut conn).await
        })
        .await;
        matches!(ping, Ok(Ok(response)) if response == "PONG")
    }

    pub fn idle_for(&self) -> Duration {
        self.last_used.elapsed()
    }

    pub fn touch(&mut self) {
        self.last_used = Instant::now();
    }
}
