//! SQLite persistence layer for mediashelf.
//!
//! Exposes a pooled connection manager, embedded schema migrations, row
//! models and per-table query modules. All query functions take a plain
//! `&Connection` so composite operations can share a caller-scoped
//! transaction.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;

pub use pool::{get_conn, init_memory_pool, init_pool, DbPool, PooledConnection};
