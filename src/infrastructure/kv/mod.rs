//! Pooled key-value (Redis) client.
//!
//! A hand-rolled async connection pool rather than a pool crate: LIFO free
//! list for hot-connection reuse, FIFO waiters bounded by an acquire
//! timeout, a periodic health-check loop, and an explicit typed
//! `execute`/`execute_transaction` surface instead of a dynamic dispatcher.

mod connection;
mod error;
mod pool;

pub use error::KvError;
pub use pool::{KvOp, KvPool, KvPoolStatus, PoolConfig, spawn_health_check_loop};
