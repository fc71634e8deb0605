use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use redis::Value;
use tokio::sync::{Mutex, oneshot};

use super::connection::PooledConn;
use super::error::{ConnectionFate, KvError, classify};

/// One operation to run against the key-value store: a command name plus
/// its positional string arguments.
#[derive(Debug, Clone)]
pub struct KvOp {
    pub cmd: String,
    pub args: Vec<String>,
}

impl KvOp {
    pub fn new(cmd: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            cmd: cmd.into(),
            args,
        }
    }
}

/// Pool-wide counters reported by `status()`.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct KvPoolStatus {
    pub total: u32,
    pub free: u32,
    pub waiters: u32,
    pub min: u32,
    pub max: u32,
}

struct PoolState {
    free: Vec<PooledConn>,
    waiters: VecDeque<oneshot::Sender<PooledConn>>,
    total: u32,
    shutting_down: bool,
}

/// Tunables the pool is constructed with.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub command_timeout: Duration,
}

/// Dynamic `[min, max]` pool of connections to the key-value store.
pub struct KvPool {
    client: redis::Client,
    config: PoolConfig,
    state: Arc<Mutex<PoolState>>,
}

const CONNECT_MAX_ATTEMPTS: u32 = 5;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

impl KvPool {
    /// Build a pool and eagerly fill it to `min_connections`.
    pub async fn connect(redis_url: &str, config: PoolConfig) -> Result<Self, KvError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| KvError::ConnectionFailed(e.to_string()))?;

        let mut free = Vec::new();
        for _ in 0..config.min_connections {
            free.push(PooledConn::connect(&client, CONNECT_MAX_ATTEMPTS, CONNECT_TIMEOUT).await?);
        }
        let total = free.len() as u32;

        Ok(Self {
            client,
            config,
            state: Arc::new(Mutex::new(PoolState {
                free,
                waiters: VecDeque::new(),
                total,
                shutting_down: false,
            })),
        })
    }

    /// Acquire a connection: LIFO from the free list, discarding anything
    /// that fails the fast liveness check; create a new one if under `max`;
    /// otherwise enqueue FIFO behind the acquire timeout.
    async fn acquire(&self) -> Result<PooledConn, KvError> {
        loop {
            let mut guard = self.state.lock().await;
            if guard.shutting_down {
                return Err(KvError::ShuttingDown);
            }

            while let Some(mut conn) = guard.free.pop() {
                if conn.is_alive().await {
                    conn.touch();
                    return Ok(conn);
                }
                tracing::debug!("discarding dead pooled connection");
                guard.total = guard.total.saturating_sub(1);
            }

            if guard.total < self.config.max_connections {
                guard.total += 1;
                drop(guard);
                match PooledConn::connect(&self.client, CONNECT_MAX_ATTEMPTS, CONNECT_TIMEOUT)
                    .await
                {
                    Ok(conn) => return Ok(conn),
                    Err(e) => {
                        let mut guard = self.state.lock().await;
                        guard.total = guard.total.saturating_sub(1);
                        return Err(e);
                    }
                }
            }

            let (tx, rx) = oneshot::channel();
            guard.waiters.push_back(tx);
            drop(guard);

            match tokio::time::timeout(self.config.acquire_timeout, rx).await {
                Ok(Ok(conn)) => return Ok(conn),
                Ok(Err(_)) => continue, // sender dropped, retry from scratch
                Err(_) => return Err(KvError::AcquireTimeout(self.config.acquire_timeout)),
            }
        }
    }

    /// Release a connection back to the pool, or destroy it and top up to
    /// the floor if it came back unhealthy or the pool is shutting down.
    async fn release(&self, conn: PooledConn, healthy: bool) {
        let mut guard = self.state.lock().await;

        if guard.shutting_down || !healthy {
            guard.total = guard.total.saturating_sub(1);
            let below_floor = !guard.shutting_down && guard.total < self.config.min_connections;
            drop(guard);
            if below_floor {
                self.spawn_replacement();
            }
            return;
        }

        if let Some(waiter) = guard.waiters.pop_front() {
            // Waiter may have timed out already; fall through to free list.
            if waiter.send(conn).is_err() {
                // Can't recover the connection out of the Err; nothing lost
                // since PooledConn::drop just closes the socket.
            }
            return;
        }

        guard.free.push(conn);
    }

    fn spawn_replacement(&self) {
        let client = self.client.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            match PooledConn::connect(&client, CONNECT_MAX_ATTEMPTS, CONNECT_TIMEOUT).await {
                Ok(conn) => {
                    let mut guard = state.lock().await;
                    if guard.shutting_down {
                        return;
                    }
                    guard.total += 1;
                    if let Some(waiter) = guard.waiters.pop_front() {
                        let _ = waiter.send(conn);
                    } else {
                        guard.free.push(conn);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to replace pooled connection"),
            }
        });
    }

    /// Run one command, acquiring and releasing a connection around it.
    pub async fn execute(&self, op: &KvOp) -> Result<Value, KvError> {
        let mut conn = self.acquire().await?;
        let mut command = redis::cmd(&op.cmd);
        for arg in &op.args {
            command.arg(arg);
        }

        let result = tokio::time::timeout(
            self.config.command_timeout,
            command.query_async::<Value>(&mut conn.conn),
        )
        .await;

        match result {
            Ok(Ok(value)) => {
                self.release(conn, true).await;
                Ok(value)
            }
            Ok(Err(e)) => {
                let fate = classify(&e);
                self.release(conn, fate == ConnectionFate::Keep).await;
                Err(KvError::CommandFailed(e))
            }
            Err(_) => {
                // Timed out; we don't know the connection's state, so
                // don't trust it back into the free list.
                self.release(conn, false).await;
                Err(KvError::CommandFailed(
                    redis::RedisError::from(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "kv command timed out",
                    )),
                ))
            }
        }
    }

    /// Run a sequence of operations atomically on one connection inside a
    /// MULTI/EXEC block. The connection is released even on failure.
    pub async fn execute_transaction(&self, ops: &[KvOp]) -> Result<Vec<Value>, KvError> {
        let mut conn = self.acquire().await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in ops {
            let mut command = redis::cmd(&op.cmd);
            for arg in &op.args {
                command.arg(arg);
            }
            pipe.add_command(command);
        }

        let result = tokio::time::timeout(
            self.config.command_timeout,
            pipe.query_async::<Vec<Value>>(&mut conn.conn),
        )
        .await;

        match result {
            Ok(Ok(values)) => {
                self.release(conn, true).await;
                Ok(values)
            }
            Ok(Err(e)) => {
                let fate = classify(&e);
                self.release(conn, fate == ConnectionFate::Keep).await;
                Err(KvError::CommandFailed(e))
            }
            Err(_) => {
                self.release(conn, false).await;
                Err(KvError::CommandFailed(redis::RedisError::from(
                    std::io::Error::new(std::io::ErrorKind::TimedOut, "kv transaction timed out"),
                )))
            }
        }
    }

    pub async fn status(&self) -> KvPoolStatus {
        let guard = self.state.lock().await;
        KvPoolStatus {
            total: guard.total,
            free: guard.free.len() as u32,
            waiters: guard.waiters.len() as u32,
            min: self.config.min_connections,
            max: self.config.max_connections,
        }
    }

    /// Periodic maintenance: ping one ready connection, evict idle
    /// connections beyond the floor, top up at most one connection per
    /// tick. Intended to be driven by a loop on a 30s interval.
    pub async fn run_health_check(&self) {
        let mut guard = self.state.lock().await;
        if guard.shutting_down {
            return;
        }

        if let Some(conn) = guard.free.last_mut() {
            let started = std::time::Instant::now();
            let alive = conn.is_alive().await;
            let elapsed = started.elapsed();
            if !alive {
                guard.free.pop();
                guard.total = guard.total.saturating_sub(1);
            } else if elapsed > Duration::from_millis(100) {
                tracing::warn!(elapsed_ms = elapsed.as_millis() as u64, "kv ping slow");
            }
        } else if guard.total == 0 {
            tracing::warn!("kv pool has zero healthy connections");
        }

        let floor = self.config.min_connections;
        let idle_timeout = self.config.idle_timeout;
        let mut kept = Vec::with_capacity(guard.free.len());
        let mut evicted = 0u32;
        let current_total = guard.total;
        for conn in guard.free.drain(..) {
            let above_floor = current_total.saturating_sub(evicted) > floor;
            if above_floor && conn.idle_for() > idle_timeout {
                evicted += 1;
            } else {
                kept.push(conn);
            }
        }
        guard.free = kept;
        guard.total = guard.total.saturating_sub(evicted);

        let need_top_up = guard.total < floor;
        drop(guard);
        if need_top_up {
            self.spawn_replacement();
        }
    }

    /// Stop serving requests, drain outstanding connections, and fail any
    /// waiters who never got served.
    pub async fn shutdown(&self) {
        let mut guard = self.state.lock().await;
        guard.shutting_down = true;
        guard.free.clear();
        guard.waiters.clear();
    }
}

/// Background maintenance loop driving `run_health_check` on a fixed
/// interval, per spec §5's 30s pool health-check cadence.
pub fn spawn_health_check_loop(pool: Arc<KvPool>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            pool.run_health_check().await;
        }
    })
}
