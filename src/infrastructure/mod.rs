pub mod abuse;
pub mod cache;
pub mod capacity;
pub mod chain;
pub mod facilitator;
pub mod kv;
pub mod monitoring;
