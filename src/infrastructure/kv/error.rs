use thiserror::Error;

/// Errors surfaced by the pooled key-value client.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("timed out waiting {0:?} for a pooled connection")]
    AcquireTimeout(std::time::Duration),

    #[error("pool is shutting down")]
    ShuttingDown,

    #[error("failed to connect to key-value store: {0}")]
    ConnectionFailed(String),

    #[error("command failed: {0}")]
    CommandFailed(#[from] redis::RedisError),
}

/// What a connection-level failure means for the connection's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionFate {
    /// Connection is unusable; drop it and let the pool replace it.
    Destroy,
    /// Connection claims to be a read replica; drop and reconnect.
    Reconnect,
    /// Transient error unrelated to connection health; keep it.
    Keep,
}

/// Classify a Redis error the way the pool's release path needs to: does
/// this connection go back to the free list or get destroyed?
pub fn classify(err: &redis::RedisError) -> ConnectionFate {
    let msg = err.to_string();
    if err.is_connection_dropped()
        || err.is_connection_refusal()
        || msg.contains("closed")
        || msg.contains("ECONNRESET")
        || msg.contains("ECONNREFUSED")
    {
        return ConnectionFate::Destroy;
    }
    if msg.contains("READONLY") {
        return ConnectionFate::Reconnect;
    }
    ConnectionFate::Keep
}
